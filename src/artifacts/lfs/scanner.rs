use crate::areas::batch::BatchHeader;
use crate::areas::repository::Repository;
use crate::artifacts::lfs::pointer::Pointer;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pipeline::stages::{CommandStage, LineStage};
use crate::artifacts::pipeline::Pipeline;
use crate::errors::GitError;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A blob whose content is a valid LFS pointer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointerBlob {
    pub hash: ObjectId,
    pub pointer: Pointer,
}

/// Which objects a scan looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScanScope {
    /// Every object in the object database, reachable or not
    #[default]
    AllObjects,
    /// Objects reachable from `head` but not from `base`
    Range { head: String, base: Option<String> },
}

/// Find every LFS pointer blob in `scope`
///
/// Runs as a chain of concurrent stages, so memory use does not depend on the
/// size of the repository:
///
/// 1. enumerate objects as `<id> <type> <size>` lines
/// 2. keep blobs no larger than the pointer ceiling
/// 3. re-check them with `cat-file --batch-check`, in case the enumeration was stale
/// 4. read their content with `cat-file --batch` and send the valid pointers
///
/// Blobs that are not pointers are skipped silently. Dropping the receiver
/// stops the scan early without an error.
///
/// # Returns
///
/// The number of pointers sent
#[tracing::instrument(level = "debug", skip(repository, cancel, sender), fields(path = %repository.path().display()))]
pub async fn search_pointer_blobs(
    repository: &Repository,
    scope: ScanScope,
    cancel: &CancellationToken,
    sender: mpsc::Sender<PointerBlob>,
) -> Result<usize, GitError> {
    let settings = repository.settings();
    let ceiling = settings.lfs.pointer_ceiling;
    let pipeline = Pipeline::new(settings.lfs.pipe_capacity);

    let pipeline = match &scope {
        ScanScope::AllObjects => pipeline.stage(CommandStage::new(
            repository
                .git("cat-file")
                .arg("--batch-check")
                .arg("--batch-all-objects"),
        )),
        ScanScope::Range { head, base } => {
            let mut rev_list = repository
                .git("rev-list")
                .arg("--objects")
                .dynamic_arg(head)?;
            if let Some(base) = base {
                rev_list = rev_list.arg("--not").dynamic_arg(base)?;
            }

            pipeline
                .stage(CommandStage::new(rev_list))
                .stage(LineStage::new("blobs from rev-list", blobs_from_rev_list_objects))
                .stage(CommandStage::new(repository.git("cat-file").arg("--batch-check")))
        }
    };

    let (tail, handle) = pipeline
        .stage(LineStage::new("small blobs", move |line: &str| {
            small_blob_id(line, ceiling)
        }))
        .stage(CommandStage::new(repository.git("cat-file").arg("--batch-check")))
        .stage(LineStage::new("confirmed small blobs", move |line: &str| {
            small_blob_id(line, ceiling)
        }))
        .stage(CommandStage::new(repository.git("cat-file").arg("--batch")))
        .spawn(cancel);

    // the reader may sit on a full channel, so it watches the token itself
    let scanned = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GitError::Cancelled),
        scanned = read_pointers(tail, &sender) => scanned,
    };

    match scanned {
        Ok(Scanned::Finished(sent)) => {
            handle.wait().await?;
            tracing::debug!(sent, "pointer scan finished");
            Ok(sent)
        }
        Ok(Scanned::ReceiverGone(sent)) => {
            tracing::debug!(sent, "pointer receiver dropped, stopping the scan");
            handle.cancel();
            let _ = handle.wait().await;
            Ok(sent)
        }
        Err(err) => {
            handle.cancel();
            // a stage failure explains a broken stream better than the read error
            match handle.wait().await {
                Err(stage_err) if !stage_err.is_cancelled() => Err(stage_err),
                _ => Err(err),
            }
        }
    }
}

enum Scanned {
    Finished(usize),
    ReceiverGone(usize),
}

/// Parse `cat-file --batch` records and send the pointers among them
async fn read_pointers(
    tail: DuplexStream,
    sender: &mpsc::Sender<PointerBlob>,
) -> Result<Scanned, GitError> {
    let mut reader = BufReader::new(tail);
    let mut line = String::new();
    let mut content = Vec::new();
    let mut sent = 0;

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(Scanned::Finished(sent));
        }

        let header = line.trim_end();
        if header.is_empty() || header.ends_with(" missing") {
            continue;
        }
        let header = BatchHeader::parse(header, header)?;

        let size = usize::try_from(header.size)
            .map_err(|_| GitError::transport(format!("blob of {} bytes too large", header.size)))?;
        content.resize(size + 1, 0);
        reader.read_exact(&mut content).await?;

        if header.object_type != ObjectType::Blob {
            continue;
        }
        let Ok(pointer) = Pointer::parse(&content[..size]) else {
            continue;
        };
        if !pointer.is_valid() {
            continue;
        }

        let blob = PointerBlob {
            hash: header.id,
            pointer,
        };
        if sender.send(blob).await.is_err() {
            return Ok(Scanned::ReceiverGone(sent));
        }
        sent += 1;
    }
}

/// Keep the id of `rev-list --objects` lines that carry a path
fn blobs_from_rev_list_objects(line: &str) -> Option<String> {
    let fields = line.split(' ').collect::<Vec<_>>();
    if fields.len() < 2 || fields[1].is_empty() {
        return None;
    }

    Some(fields[0].to_string())
}

/// Keep the id of `<id> blob <size>` lines no larger than `ceiling`
fn small_blob_id(line: &str, ceiling: u64) -> Option<String> {
    let mut fields = line.split(' ');
    let (Some(id), Some("blob"), Some(size)) = (fields.next(), fields.next(), fields.next()) else {
        return None;
    };

    (size.parse::<u64>().ok()? <= ceiling).then(|| id.to_string())
}
