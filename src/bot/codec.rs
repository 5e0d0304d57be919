//! Line codec for bot output streams.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length to
//! prevent memory exhaustion caused by an unterminated or runaway line from
//! a misbehaving bot process.
//!
//! On stream close, [`LineCodec::decode_eof`] flushes a non-empty trailing
//! partial line as a final item instead of dropping it.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum line length accepted from a bot output stream: 64 KiB.
///
/// Lines exceeding this limit cause [`LineCodec::decode`] to return
/// [`AppError::Parse`] with `"line too long"` rather than buffering
/// unbounded memory for a single line.
pub const MAX_LINE_BYTES: usize = 65_536;

/// Newline framing for a single bot output stream.
///
/// Delegates buffering to [`LinesCodec`] with a fixed [`MAX_LINE_BYTES`]
/// limit. Each `\n`-terminated UTF-8 string is one complete line; the
/// trailing fragment is held until more data arrives or the stream closes.
#[derive(Debug)]
pub struct LineCodec(LinesCodec);

impl LineCodec {
    /// Create a new `LineCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` contains no complete line yet
    /// (buffering). Returns `Err(AppError::Parse("line too long: …"))` when
    /// the line exceeds [`MAX_LINE_BYTES`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    /// Decode the final line when the stream reaches EOF.
    ///
    /// A non-empty trailing fragment without a terminating `\n` is yielded
    /// as a final line here, so stream close never discards buffered output.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Map a [`LinesCodecError`] to an [`AppError`].
fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Parse(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
