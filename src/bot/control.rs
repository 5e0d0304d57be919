//! Control channel — live settings commands over the bot's stdin.
//!
//! Each command is serialised as a single `<TAG>:<value>` line and written
//! to the child's standard input. The protocol is fire-and-forget: no
//! acknowledgment is awaited, and success means only that the write itself
//! did not raise an I/O error. Whether the bot acted on the command is
//! never guaranteed by this layer.

use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tracing::warn;

use crate::{AppError, Result};

/// A live-settings command understood by the bot's stdin listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// Switch the active text-to-speech voice.
    ChangeVoice(String),
    /// Replace the Gemini API key.
    UpdateGeminiKey(String),
    /// Replace the `ElevenLabs` API key.
    UpdateElevenlabsKey(String),
    /// Replace the bot personality prompt.
    UpdatePersonality(String),
    /// Switch the output audio device.
    UpdateAudioDevice(String),
    /// Set the playback volume (0–100).
    UpdateVolume(u8),
    /// Change the chat command that triggers the AI responder.
    UpdateIaCommand(String),
}

impl ControlCommand {
    /// Wire tag for this command.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ChangeVoice(_) => "CHANGE_VOICE",
            Self::UpdateGeminiKey(_) => "UPDATE_GEMINI_KEY",
            Self::UpdateElevenlabsKey(_) => "UPDATE_ELEVENLABS_KEY",
            Self::UpdatePersonality(_) => "UPDATE_PERSONALITY",
            Self::UpdateAudioDevice(_) => "UPDATE_AUDIO_DEVICE",
            Self::UpdateVolume(_) => "UPDATE_VOLUME",
            Self::UpdateIaCommand(_) => "UPDATE_IA_COMMAND",
        }
    }

    /// Serialise as one protocol line, without the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        match self {
            Self::ChangeVoice(value)
            | Self::UpdateGeminiKey(value)
            | Self::UpdateElevenlabsKey(value)
            | Self::UpdatePersonality(value)
            | Self::UpdateAudioDevice(value)
            | Self::UpdateIaCommand(value) => format!("{}:{value}", self.tag()),
            Self::UpdateVolume(volume) => format!("{}:{volume}", self.tag()),
        }
    }
}

/// Write one command as a newline-terminated line to the bot's stdin.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the write or flush fails (e.g. the bot
/// process has exited and the pipe is closed).
pub async fn write_command(stdin: &mut ChildStdin, command: &ControlCommand) -> Result<()> {
    let mut line = command.to_line();
    line.push('\n');

    stdin.write_all(line.as_bytes()).await.map_err(|e| {
        warn!(tag = command.tag(), error = %e, "control channel: write to stdin failed");
        AppError::Io(format!("write failed: {e}"))
    })?;

    stdin.flush().await.map_err(|e| {
        warn!(tag = command.tag(), error = %e, "control channel: flush failed");
        AppError::Io(format!("flush failed: {e}"))
    })?;

    Ok(())
}
