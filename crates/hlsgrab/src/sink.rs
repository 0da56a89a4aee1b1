use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::error::GrabResult;

/// Receives the assembled media of a finished job.
pub trait MediaSink {
    fn write(&self, file_name: &str, data: Bytes) -> impl Future<Output = GrabResult<()>> + Send;
}

impl<T> MediaSink for Arc<T>
where
    T: MediaSink + Send + Sync,
{
    fn write(&self, file_name: &str, data: Bytes) -> impl Future<Output = GrabResult<()>> + Send {
        self.as_ref().write(file_name, data)
    }
}

/// Writes each result into a directory, never overwriting an existing file.
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new<P>(dir: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { dir: dir.into() }
    }

    async fn create_file(&self, file_name: &str) -> io::Result<(PathBuf, tokio::fs::File)> {
        let mut attempt = 0;
        loop {
            let path = candidate_path(&self.dir, file_name, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

impl MediaSink for FileSink {
    async fn write(&self, file_name: &str, data: Bytes) -> GrabResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let (path, mut file) = self.create_file(file_name).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        tracing::info!(
            "All finished. Please checkout your file at {}",
            path.display()
        );
        Ok(())
    }
}

/// `name.mp4`, `name (1).mp4`, `name (2).mp4`, ...
fn candidate_path(dir: &Path, file_name: &str, attempt: u32) -> PathBuf {
    if attempt == 0 {
        return dir.join(file_name);
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(extension) => format!("{stem} ({attempt}).{}", extension.to_string_lossy()),
        None => format!("{stem} ({attempt})"),
    };
    dir.join(name)
}

/// Keeps every delivered file in memory.
#[derive(Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<(String, Bytes)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered `(file_name, data)` pairs in delivery order.
    pub fn files(&self) -> Vec<(String, Bytes)> {
        match self.files.lock() {
            Ok(files) => files.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MediaSink for MemorySink {
    async fn write(&self, file_name: &str, data: Bytes) -> GrabResult<()> {
        let mut files = match self.files.lock() {
            Ok(files) => files,
            Err(poisoned) => poisoned.into_inner(),
        };
        files.push((file_name.to_string(), data));
        Ok(())
    }
}
