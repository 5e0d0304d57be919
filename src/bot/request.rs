//! Start-request and settings-update payloads.
//!
//! Both arrive from the UI bridge as JSON. `StartRequest` is validated in
//! full before a process is ever spawned; a rejected request has no side
//! effects. `SettingsUpdate` carries the subset of fields that can change
//! while the bot runs and expands into control-channel commands.

use serde::Deserialize;

use crate::bot::control::ControlCommand;
use crate::{AppError, Result};

/// Required prefix for a Twitch `OAuth` token.
pub const TOKEN_PREFIX: &str = "oauth:";

/// Minimum accepted token length, prefix included.
pub const TOKEN_MIN_LEN: usize = 15;

/// Maximum accepted token length, prefix included.
pub const TOKEN_MAX_LEN: usize = 50;

/// Parameters for starting the bot process.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StartRequest {
    /// Twitch channel the bot joins.
    pub channel: String,
    /// `OAuth` token, `oauth:`-prefixed.
    pub token: String,
    /// Output audio device id (all digits), passed positionally.
    #[serde(default)]
    pub audio_device: Option<String>,
    /// `ElevenLabs` voice id.
    #[serde(default)]
    pub voice: Option<String>,
    /// Playback volume, 0–100.
    #[serde(default)]
    pub volume: Option<u8>,
    /// Gemini API key.
    #[serde(default)]
    pub gemini_key: Option<String>,
    /// `ElevenLabs` API key.
    #[serde(default)]
    pub elevenlabs_key: Option<String>,
    /// Bot personality prompt text.
    #[serde(default)]
    pub personality: Option<String>,
    /// Chat command that triggers the AI responder.
    #[serde(default)]
    pub ia_command: Option<String>,
}

impl StartRequest {
    /// Validate the request without side effects.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the channel is empty, the token
    /// is missing the [`TOKEN_PREFIX`] or falls outside
    /// [`TOKEN_MIN_LEN`]..=[`TOKEN_MAX_LEN`], the volume exceeds 100, the
    /// audio device is not all digits, or any field spans multiple lines.
    pub fn validate(&self) -> Result<()> {
        if self.channel.trim().is_empty() {
            return Err(AppError::Validation("channel must not be empty".into()));
        }

        validate_token(&self.token)?;

        if let Some(volume) = self.volume {
            validate_volume(volume)?;
        }

        if let Some(device) = non_empty(self.audio_device.as_deref()) {
            validate_audio_device(device)?;
        }

        validate_single_line(&self.channel)?;
        validate_single_line(&self.token)?;
        for value in self
            .audio_device
            .as_deref()
            .into_iter()
            .chain(self.voice.as_deref())
            .chain(self.gemini_key.as_deref())
            .chain(self.elevenlabs_key.as_deref())
            .chain(self.personality.as_deref())
            .chain(self.ia_command.as_deref())
        {
            validate_single_line(value)?;
        }

        Ok(())
    }
}

/// Partial update of live-tunable bot settings.
///
/// Present fields are forwarded verbatim over the control channel; absent
/// fields are left untouched in the running bot.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SettingsUpdate {
    /// `ElevenLabs` voice id.
    #[serde(default)]
    pub voice: Option<String>,
    /// Gemini API key.
    #[serde(default)]
    pub gemini_key: Option<String>,
    /// `ElevenLabs` API key.
    #[serde(default)]
    pub elevenlabs_key: Option<String>,
    /// Bot personality prompt text.
    #[serde(default)]
    pub personality: Option<String>,
    /// Output audio device id (all digits).
    #[serde(default)]
    pub audio_device: Option<String>,
    /// Playback volume, 0–100.
    #[serde(default)]
    pub volume: Option<u8>,
    /// Chat command that triggers the AI responder.
    #[serde(default)]
    pub ia_command: Option<String>,
}

impl SettingsUpdate {
    /// Validate the update without side effects.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an out-of-range volume, a
    /// non-numeric audio device, or any multi-line field value.
    pub fn validate(&self) -> Result<()> {
        if let Some(volume) = self.volume {
            validate_volume(volume)?;
        }

        if let Some(device) = non_empty(self.audio_device.as_deref()) {
            validate_audio_device(device)?;
        }

        for value in self
            .voice
            .as_deref()
            .into_iter()
            .chain(self.gemini_key.as_deref())
            .chain(self.elevenlabs_key.as_deref())
            .chain(self.personality.as_deref())
            .chain(self.audio_device.as_deref())
            .chain(self.ia_command.as_deref())
        {
            validate_single_line(value)?;
        }

        Ok(())
    }

    /// Expand the present fields into control-channel commands, in a fixed
    /// order so a batched update always writes the same sequence of lines.
    #[must_use]
    pub fn commands(&self) -> Vec<ControlCommand> {
        let mut commands = Vec::new();

        if let Some(ref voice) = self.voice {
            commands.push(ControlCommand::ChangeVoice(voice.clone()));
        }
        if let Some(ref key) = self.gemini_key {
            commands.push(ControlCommand::UpdateGeminiKey(key.clone()));
        }
        if let Some(ref key) = self.elevenlabs_key {
            commands.push(ControlCommand::UpdateElevenlabsKey(key.clone()));
        }
        if let Some(ref text) = self.personality {
            commands.push(ControlCommand::UpdatePersonality(text.clone()));
        }
        if let Some(ref device) = self.audio_device {
            commands.push(ControlCommand::UpdateAudioDevice(device.clone()));
        }
        if let Some(volume) = self.volume {
            commands.push(ControlCommand::UpdateVolume(volume));
        }
        if let Some(ref command) = self.ia_command {
            commands.push(ControlCommand::UpdateIaCommand(command.clone()));
        }

        commands
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// `Some` only when the value is present and non-empty.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(AppError::Validation(
            "oauth token is required; get one at https://twitchtokengenerator.com/".into(),
        ));
    }

    if !token.starts_with(TOKEN_PREFIX) {
        return Err(AppError::Validation(format!(
            "token must start with \"{TOKEN_PREFIX}\""
        )));
    }

    if token.len() < TOKEN_MIN_LEN || token.len() > TOKEN_MAX_LEN {
        return Err(AppError::Validation(format!(
            "token length must be between {TOKEN_MIN_LEN} and {TOKEN_MAX_LEN} characters"
        )));
    }

    Ok(())
}

fn validate_volume(volume: u8) -> Result<()> {
    if volume > 100 {
        return Err(AppError::Validation(
            "volume must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn validate_audio_device(device: &str) -> Result<()> {
    if device.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "audio device id must be numeric".into(),
        ))
    }
}

/// Reject values that would span multiple protocol lines.
fn validate_single_line(value: &str) -> Result<()> {
    if value.contains('\n') || value.contains('\r') {
        return Err(AppError::Validation(
            "field values must not contain line breaks".into(),
        ));
    }
    Ok(())
}
