//! Blocking side of the archive builder
//!
//! Deflate and disk writes run on the blocking pool. The async side talks to
//! the writer over a bounded channel: one `Start` per source, its chunks, then
//! `End` or `Abort`. Closing the channel finalizes the container.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{ArchiveError, EntryError};

/// Chunks buffered between the network and the writer thread
const QUEUE_DEPTH: usize = 16;

/// Destination of an archive
///
/// Aborted entries leave stale bytes past the central directory, so the sink
/// must be able to cut itself at the final position.
pub trait ArchiveSink: Write + Seek + Send + 'static {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl ArchiveSink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl ArchiveSink for BufWriter<File> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.flush()?;
        self.get_ref().set_len(len)
    }
}

enum Command {
    Start {
        name: String,
        reply: oneshot::Sender<Result<(), String>>,
    },
    Chunk(Bytes),
    End {
        reply: oneshot::Sender<io::Result<()>>,
    },
    Abort,
}

/// Handle to a zip writer running on the blocking pool
pub(crate) struct ZipSink {
    tx: mpsc::Sender<Command>,
    handle: JoinHandle<Result<(), ArchiveError>>,
}

impl ZipSink {
    pub(crate) fn spawn<W: ArchiveSink>(sink: W) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let handle = tokio::task::spawn_blocking(move || write_loop(sink, rx));
        Self { tx, handle }
    }

    pub(crate) async fn start_entry(&self, name: &str) -> Result<(), EntryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start {
            name: name.to_string(),
            reply,
        })
        .await
        .map_err(|e| EntryError::CreateEntry(e.to_string()))?;

        rx.await
            .map_err(|_| EntryError::CreateEntry("archive writer stopped".to_string()))?
            .map_err(EntryError::CreateEntry)
    }

    pub(crate) async fn write(&self, chunk: Bytes) -> Result<(), EntryError> {
        self.send(Command::Chunk(chunk))
            .await
            .map_err(|e| EntryError::Copy(e.to_string()))
    }

    /// Close the current entry; a write error seen by the writer surfaces here
    pub(crate) async fn end_entry(&self) -> Result<(), EntryError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::End { reply })
            .await
            .map_err(|e| EntryError::Copy(e.to_string()))?;

        rx.await
            .map_err(|_| EntryError::Copy("archive writer stopped".to_string()))?
            .map_err(|e| EntryError::Copy(e.to_string()))
    }

    pub(crate) async fn abort_entry(&self) {
        // A stopped writer has nothing left to abort
        let _ = self.send(Command::Abort).await;
    }

    /// Write the central directory and wait for the writer to exit
    pub(crate) async fn finish(self) -> Result<(), ArchiveError> {
        let Self { tx, handle } = self;
        drop(tx);
        handle.await?
    }

    async fn send(&self, command: Command) -> io::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive writer stopped"))
    }
}

fn write_loop<W: ArchiveSink>(
    sink: W,
    mut rx: mpsc::Receiver<Command>,
) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(sink);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut open = false;
    let mut failed: Option<io::Error> = None;

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Start { name, reply } => {
                let result = zip
                    .start_file(name.as_str(), options)
                    .map_err(|e| e.to_string());
                open = result.is_ok();
                failed = None;
                let _ = reply.send(result);
            }
            Command::Chunk(chunk) => {
                if open && failed.is_none() {
                    if let Err(e) = zip.write_all(&chunk) {
                        failed = Some(e);
                    }
                }
            }
            Command::End { reply } => {
                let result = match failed.take() {
                    Some(e) => {
                        discard(&mut zip);
                        Err(e)
                    }
                    None => Ok(()),
                };
                open = false;
                let _ = reply.send(result);
            }
            Command::Abort => {
                if open {
                    discard(&mut zip);
                }
                open = false;
                failed = None;
            }
        }
    }

    // Builder went away mid-entry
    if open {
        discard(&mut zip);
    }

    let mut sink = zip.finish()?;
    sink.flush()?;
    let end = sink.stream_position()?;
    sink.truncate(end)?;
    Ok(())
}

/// Drop the entry being written so earlier entries stay intact
fn discard<W: Write + Seek>(zip: &mut ZipWriter<W>) {
    if let Err(e) = zip.abort_file() {
        warn!(error = %e, "Failed to discard partial entry");
    }
}
