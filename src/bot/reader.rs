//! Stream reader task.
//!
//! Drives a [`FramedRead`] with [`LineCodec`] over one bot output stream,
//! trims each completed line, discards empties, classifies the rest by
//! stream origin, and forwards them as [`UiEvent::Output`] through a tokio
//! [`mpsc`] channel.
//!
//! EOF ends the task without emitting anything: the process-exit notice is
//! owned by the supervisor's exit monitor, which produces it exactly once
//! per child lifetime regardless of how many streams closed first.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bot::classifier::{classify, StreamSource};
use crate::bot::codec::LineCodec;
use crate::bot::UiEvent;
use crate::{AppError, Result};

/// Read `stream` to EOF, emitting one classified event per completed line.
///
/// Lines are trimmed of surrounding whitespace; lines that are empty after
/// trimming are discarded. Per-stream ordering is preserved. On stream
/// close a non-empty trailing fragment is flushed as a final line by the
/// codec before the task returns.
///
/// # Cancellation
///
/// Respects `cancel`: when the token fires the reader exits without
/// draining the remainder of the stream.
///
/// # Errors
///
/// Returns `Ok(())` on clean EOF or cancellation. Oversized lines are
/// logged and skipped; an I/O error on the underlying stream stops the
/// task and returns `Ok(())` (the exit monitor reports the process fate).
pub async fn run_reader<R>(
    source: StreamSource,
    stream: R,
    event_tx: mpsc::Sender<UiEvent>,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(stream, LineCodec::new());

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(?source, "reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(?source, "reader: EOF detected");
                        break;
                    }

                    Some(Err(AppError::Parse(ref msg))) => {
                        // Oversized line — log and continue with the stream.
                        warn!(?source, error = msg.as_str(), "reader: framing error, skipping");
                    }

                    Some(Err(e)) => {
                        warn!(?source, error = %e, "reader: IO error, stopping");
                        break;
                    }

                    Some(Ok(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }

                        let event = UiEvent::Output(classify(source, trimmed));
                        if event_tx.send(event).await.is_err() {
                            debug!(?source, "reader: event channel closed, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
