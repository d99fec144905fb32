use crate::areas::repository::Repository;
use crate::artifacts::lfs::scanner::{PointerBlob, ScanScope, search_pointer_blobs};
use std::io::Write;
use tokio::sync::mpsc;

impl Repository {
    /// Print every LFS pointer blob in `scope` as `<blob id> <oid> <size>`
    pub async fn lfs_pointers(&self, scope: ScanScope) -> anyhow::Result<()> {
        let (sender, mut receiver) = mpsc::channel::<PointerBlob>(64);

        let scan = search_pointer_blobs(self, scope, self.cancel_token(), sender);
        let print = async {
            while let Some(blob) = receiver.recv().await {
                writeln!(
                    self.writer(),
                    "{} {} {}",
                    blob.hash,
                    blob.pointer.oid,
                    blob.pointer.size
                )?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (scanned, printed) = tokio::join!(scan, print);
        printed?;
        let sent = scanned?;
        tracing::debug!(sent, "listed lfs pointers");

        Ok(())
    }
}
