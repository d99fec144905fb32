//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file data,
//! without any metadata like filename or permissions (those are stored in trees).
//!
//! A [`Blob`] is a handle: the size is fetched once through the check session
//! and memoized, the content is fetched on demand through [`Blob::data_async`].
//! Small blobs are read into memory in one go; anything at or above the
//! configured threshold is exposed as a [`BlobReader`] that streams straight
//! from the content session while holding it.

use crate::areas::batch::BatchGuard;
use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::GitError;
use bytes::Bytes;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::OnceCell;

#[derive(Debug)]
pub struct Blob<'r> {
    repository: &'r Repository,
    id: ObjectId,
    /// Name of the tree entry the blob was reached through, if any
    name: String,
    size: OnceCell<u64>,
}

impl<'r> Blob<'r> {
    pub fn new(repository: &'r Repository, id: ObjectId, name: impl Into<String>) -> Self {
        Blob {
            repository,
            id,
            name: name.into(),
            size: OnceCell::new(),
        }
    }

    /// Create a handle whose size is already known
    pub fn with_size(
        repository: &'r Repository,
        id: ObjectId,
        name: impl Into<String>,
        size: u64,
    ) -> Self {
        Blob {
            repository,
            id,
            name: name.into(),
            size: OnceCell::new_with(Some(size)),
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes, fetched once through the check session
    pub async fn size(&self) -> Result<u64, GitError> {
        self.size
            .get_or_try_init(|| async { self.repository.database().object_size(&self.id).await })
            .await
            .copied()
    }

    /// Open the blob content
    ///
    /// # Returns
    ///
    /// The buffered content for small blobs, or a reader holding the content
    /// session for large ones. The session is released when the reader is
    /// closed or dropped.
    pub async fn data_async(&self) -> Result<BlobData, GitError> {
        let requested = self.id.to_hex();
        let mut batch = self.repository.cat_file_batch().await?;

        batch.request(&requested).await?;
        let header = batch.read_header(&requested).await?;
        if header.object_type != ObjectType::Blob {
            batch.discard(header.size).await?;
            return Err(GitError::unprocessable(
                requested,
                format!("expected a blob, found a {}", header.object_type),
            ));
        }
        let _ = self.size.set(header.size);

        if header.size < self.repository.settings().blob_buffer_threshold {
            let content = batch.read_content(header.size).await?;
            return Ok(BlobData::Buffered(io::Cursor::new(Bytes::from(content))));
        }

        tracing::debug!(id = %self.id, size = header.size, "streaming blob content");
        Ok(BlobData::Streaming(BlobReader::new(batch, header.size)))
    }

    /// Read at most `limit` bytes of content
    pub async fn get_blob_bytes(&self, limit: u64) -> Result<Bytes, GitError> {
        let mut data = self.data_async().await?;

        let mut content = Vec::new();
        (&mut data).take(limit).read_to_end(&mut content).await?;
        data.close().await?;

        Ok(Bytes::from(content))
    }

    /// Read at most `limit` bytes of content as (lossy) text
    pub async fn get_blob_content(&self, limit: u64) -> Result<String, GitError> {
        let content = self.get_blob_bytes(limit).await?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}

impl Object for Blob<'_> {
    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }
}

/// Blob content, either fully buffered or streamed from a live session
pub enum BlobData {
    Buffered(io::Cursor<Bytes>),
    Streaming(BlobReader),
}

impl BlobData {
    /// Release the underlying session, draining any unread content
    pub async fn close(self) -> Result<(), GitError> {
        match self {
            BlobData::Buffered(_) => Ok(()),
            BlobData::Streaming(reader) => reader.close().await,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, BlobData::Streaming(_))
    }
}

impl AsyncRead for BlobData {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            BlobData::Buffered(cursor) => Pin::new(cursor).poll_read(cx, buf),
            BlobData::Streaming(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

/// Bounded reader over exactly `size` bytes of a batch content record
///
/// Holds the content session for its whole lifetime. Reading to the end also
/// consumes the record's trailing newline, leaving the session ready for the
/// next request. Dropping a reader before that point poisons the session,
/// since its remaining bytes would otherwise be misread as the next response.
pub struct BlobReader {
    batch: Option<BatchGuard>,
    remaining: u64,
    trailer_pending: bool,
}

impl BlobReader {
    pub(crate) fn new(batch: BatchGuard, size: u64) -> Self {
        BlobReader {
            batch: Some(batch),
            remaining: size,
            trailer_pending: true,
        }
    }

    /// Bytes of content not read yet
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Drain whatever is left and hand the session back
    pub async fn close(mut self) -> Result<(), GitError> {
        if let Some(mut batch) = self.batch.take() {
            if self.trailer_pending {
                batch.discard(self.remaining).await?;
            }
        }
        self.remaining = 0;
        self.trailer_pending = false;

        Ok(())
    }
}

impl AsyncRead for BlobReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(batch) = this.batch.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        if this.remaining == 0 {
            if this.trailer_pending {
                let mut stdout = Pin::new(batch.stdout_mut());
                let available = ready!(stdout.as_mut().poll_fill_buf(cx))?;
                let has_trailer = available.first() == Some(&b'\n');
                if !has_trailer {
                    batch.poison();
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "missing newline after blob content",
                    )));
                }
                stdout.consume(1);
                this.trailer_pending = false;
                batch.finish_record();
            }
            return Poll::Ready(Ok(()));
        }

        let max = buf.remaining().min(usize::try_from(this.remaining).unwrap_or(usize::MAX));
        let mut limited = ReadBuf::new(buf.initialize_unfilled_to(max));
        ready!(Pin::new(batch.stdout_mut()).poll_read(cx, &mut limited))?;

        let read = limited.filled().len();
        if read == 0 && max > 0 {
            batch.poison();
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "session closed in the middle of a blob",
            )));
        }

        buf.advance(read);
        this.remaining -= read as u64;
        Poll::Ready(Ok(()))
    }
}

impl Drop for BlobReader {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.as_mut() {
            if self.trailer_pending {
                tracing::debug!(remaining = self.remaining, "blob reader dropped mid-record");
                batch.poison();
            }
        }
    }
}
