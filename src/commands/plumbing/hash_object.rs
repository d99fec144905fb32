use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Print the id `file` would get as a blob in this repository
    ///
    /// Nothing is written to the object database.
    pub async fn hash_object(&self, file: &Path) -> anyhow::Result<()> {
        let content = tokio::fs::read(file)
            .await
            .with_context(|| format!("unable to read {}", file.display()))?;

        let format = self.object_format().await?;
        let object_id = format.hash_blob(&content);

        writeln!(self.writer(), "{object_id}")?;

        Ok(())
    }
}
