//! Bridge wire protocol.
//!
//! Requests are one JSON object per line, dispatched on the `command`
//! field:
//!
//! ```json
//! {"command": "start-bot", "channel": "somechannel", "token": "oauth:…"}
//! {"command": "stop-bot"}
//! {"command": "check-bot-status"}
//! {"command": "change-voice", "voice_id": "EXAVITQu4vr4xnSDxMaL"}
//! {"command": "update-settings", "volume": 80, "personality": "…"}
//! {"command": "list-audio-devices"}
//! {"command": "list-voices", "elevenlabs_key": "…"}
//! ```
//!
//! Responses are one JSON object per line: `{status, message}` acks,
//! `{running}` for status checks, `{devices: […]}` / `{voices: […]}` for
//! queries (or `{error: true, message, …: []}` on query failure).
//!
//! Event frames are pushed without a preceding request:
//!
//! ```json
//! {"event": "bot-output", "type": "info", "message": "…"}
//! {"event": "bot-stopped"}
//! ```

use serde::Deserialize;
use serde_json::{json, Value};

use crate::bot::query::AudioDevice;
use crate::bot::request::{SettingsUpdate, StartRequest};
use crate::bot::supervisor::StatusReport;
use crate::bot::UiEvent;

/// Inbound bridge request from the presentation layer.
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum BridgeRequest {
    /// Launch the bot process.
    StartBot(StartRequest),
    /// Request termination of the bot process.
    StopBot,
    /// Read whether a bot process slot is occupied.
    CheckBotStatus,
    /// Switch the active voice of the running bot.
    ChangeVoice {
        /// `ElevenLabs` voice id.
        voice_id: String,
    },
    /// Forward a batch of live settings changes to the running bot.
    UpdateSettings(SettingsUpdate),
    /// One-shot query for output audio devices.
    ListAudioDevices,
    /// One-shot query for text-to-speech voices.
    ListVoices {
        /// `ElevenLabs` API key; forwarded only when non-empty.
        #[serde(default)]
        elevenlabs_key: String,
    },
}

/// `{status: "success", message}` ack frame.
#[must_use]
pub fn ack_success(message: &str) -> Value {
    json!({ "status": "success", "message": message })
}

/// `{status: "error", message}` ack frame.
#[must_use]
pub fn ack_error(message: &str) -> Value {
    json!({ "status": "error", "message": message })
}

/// `{running}` frame for a status check.
#[must_use]
pub fn running_frame(report: StatusReport) -> Value {
    json!({ "running": report.running })
}

/// `{devices: […]}` frame for a successful device listing.
#[must_use]
pub fn devices_frame(devices: &[AudioDevice]) -> Value {
    json!({ "devices": devices })
}

/// `{voices: […]}` frame for a successful voice listing.
#[must_use]
pub fn voices_frame(voices: &[Value]) -> Value {
    json!({ "voices": voices })
}

/// `{error: true, message, <list_key>: []}` frame for a failed query.
#[must_use]
pub fn query_error_frame(list_key: &str, message: &str) -> Value {
    json!({ "error": true, "message": message, list_key: [] })
}

/// Serialise a supervisor event as its pushed wire frame.
#[must_use]
pub fn event_frame(event: &UiEvent) -> Value {
    match event {
        UiEvent::Output(output) => json!({
            "event": "bot-output",
            "type": output.kind,
            "message": output.text,
        }),
        UiEvent::Stopped => json!({ "event": "bot-stopped" }),
    }
}
