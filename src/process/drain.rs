//! Drain tasks for the child's output pipes.
//!
//! Each task owns exactly one stream and reports back through its return
//! value; nothing is shared between the two tasks or with the caller while
//! they run.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// How a stream stopped delivering bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The writing end closed normally.
    Eof,
    /// The pipe was torn down underneath the reader. Treated like EOF.
    Closed,
}

/// Result of a read attempt, with benign closure separated from real failures.
enum ReadStep {
    Data(usize),
    End(StreamEnd),
}

/// Outcome of draining one stream to completion.
#[derive(Debug)]
pub struct DrainReport<T> {
    pub end: StreamEnd,
    /// What the task produced: bytes forwarded for stdout, captured text for stderr.
    pub value: T,
    /// First genuine read or write failure, if any.
    pub error: Option<io::Error>,
}

fn is_benign_close(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof
    )
}

fn classify(res: io::Result<usize>) -> io::Result<ReadStep> {
    match res {
        Ok(0) => Ok(ReadStep::End(StreamEnd::Eof)),
        Ok(n) => Ok(ReadStep::Data(n)),
        Err(e) if is_benign_close(&e) => {
            tracing::debug!(error = %e, "pipe already closed, treating as end of stream");
            Ok(ReadStep::End(StreamEnd::Closed))
        }
        Err(e) => Err(e),
    }
}

/// Longest run of bytes held back while waiting for a newline.
pub const MAX_LINE_CHUNK: u64 = 64 * 1024;

/// Copy `reader` to `sink` one line at a time, flushing after each line.
/// Lines longer than [`MAX_LINE_CHUNK`] are forwarded in pieces of that size.
///
/// A failing sink does not stop the drain: the rest of the stream is read and
/// discarded so the child never blocks on a full pipe.
pub async fn forward_lines<R, W>(reader: R, sink: W) -> DrainReport<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    forward_chunks(reader, sink, MAX_LINE_CHUNK).await
}

async fn forward_chunks<R, W>(reader: R, mut sink: W, limit: u64) -> DrainReport<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(1024);
    let mut forwarded = 0u64;
    let mut error: Option<io::Error> = None;
    let mut sink_ok = true;

    let end = loop {
        line.clear();
        let read = (&mut reader).take(limit).read_until(b'\n', &mut line).await;
        match classify(read) {
            Ok(ReadStep::Data(n)) => {
                if !sink_ok {
                    continue;
                }
                let written = async {
                    sink.write_all(&line).await?;
                    sink.flush().await
                }
                .await;
                match written {
                    Ok(()) => forwarded += n as u64,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdout sink failed, discarding remaining output");
                        sink_ok = false;
                        error = Some(e);
                    }
                }
            }
            Ok(ReadStep::End(end)) => break end,
            Err(e) => {
                error.get_or_insert(e);
                break StreamEnd::Closed;
            }
        }
    };

    DrainReport { end, value: forwarded, error }
}

/// Read `reader` to completion and return everything it produced as text.
pub async fn collect<R>(mut reader: R) -> DrainReport<String>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut error = None;

    let end = loop {
        match classify(reader.read(&mut chunk).await) {
            Ok(ReadStep::Data(n)) => captured.extend_from_slice(&chunk[..n]),
            Ok(ReadStep::End(end)) => break end,
            Err(e) => {
                error = Some(e);
                break StreamEnd::Closed;
            }
        }
    };

    DrainReport {
        end,
        value: String::from_utf8_lossy(&captured).into_owned(),
        error,
    }
}
