//! Local files to upload.
//!
//! A [`LocalFile`] is the client-side counterpart of a
//! [`FileDescriptor`]: the same name, size, and type, plus access to the
//! bytes. Bodies are produced as chunked streams so large files on disk are
//! never read into memory whole.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use updraft_model::FileDescriptor;

/// Chunk size of upload body streams.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content type used when none is given for a file on disk.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Where the bytes of a [`LocalFile`] live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileData {
    /// In memory.
    Memory(Bytes),
    /// On disk.
    Path(PathBuf),
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// File name sent to the server.
    pub name: String,
    /// MIME type sent to the server and used as `Content-Type`.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// The bytes.
    pub data: FileData,
}

impl LocalFile {
    /// A file held in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            data: FileData::Memory(data),
        }
    }

    /// A file on disk. The name is the path's final component.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or cannot be inspected.
    pub async fn from_path(
        path: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
            .to_owned();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }

        Ok(Self {
            name,
            content_type: content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_owned(),
            size: metadata.len(),
            data: FileData::Path(path.to_path_buf()),
        })
    }

    /// The descriptor sent in the signed-URL request.
    #[must_use]
    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor::new(&self.name, self.size, &self.content_type)
    }

    /// Stream `len` bytes starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] if the range extends past the
    /// end of the file, or any error from opening the file on disk.
    pub async fn stream_range(&self, start: u64, len: u64) -> io::Result<ByteStream> {
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.size)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("range {start}+{len} exceeds file size {}", self.size),
                )
            })?;

        match &self.data {
            FileData::Memory(bytes) => {
                let range = usize::try_from(start)
                    .ok()
                    .zip(usize::try_from(end).ok())
                    .filter(|(_, e)| *e <= bytes.len())
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "range exceeds buffer")
                    })?;
                let slice = bytes.slice(range.0..range.1);
                let chunks = (0..slice.len())
                    .step_by(CHUNK_SIZE)
                    .map(move |offset| Ok(slice.slice(offset..(offset + CHUNK_SIZE).min(slice.len()))))
                    .collect::<Vec<_>>();
                Ok(Box::pin(stream::iter(chunks)))
            }
            FileData::Path(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                file.seek(SeekFrom::Start(start)).await?;
                Ok(Box::pin(ReaderStream::with_capacity(file.take(len), CHUNK_SIZE)))
            }
        }
    }
}
