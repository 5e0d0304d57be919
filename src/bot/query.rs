//! Auxiliary one-shot queries against the bot script.
//!
//! Device and voice listings spawn the script with a query flag, capture
//! its stdout under a bounded wait, and extract the payload. The script
//! interleaves human-readable log lines with the result; the payload is
//! defined as the last stdout line that parses as a JSON array, so log
//! lines that merely start with a bracket (`[AUDIO] …`) are skipped
//! structurally rather than by textual marker.

use std::process::Stdio;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::bot::spawner::SpawnConfig;
use crate::{AppError, Result};

/// One output-capable audio device reported by the bot script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Platform device index; the value passed back as `audioDeviceId`.
    pub id: u64,
    /// Human-readable device name.
    pub name: String,
    /// Output channel count.
    pub channels: u64,
}

/// List the bot script's output audio devices.
///
/// # Errors
///
/// - [`AppError::Spawn`] if the query process cannot be created.
/// - [`AppError::Timeout`] if it does not finish within the configured bound.
/// - [`AppError::Parse`] if no JSON array payload is found in its output.
pub async fn list_audio_devices(config: &SpawnConfig) -> Result<Vec<AudioDevice>> {
    let stdout = run_query(config, &["--list-audio-devices"]).await?;
    let devices: Vec<AudioDevice> = extract_payload(&stdout)?;
    info!(count = devices.len(), "audio devices listed");
    Ok(devices)
}

/// List the available text-to-speech voices.
///
/// Voice objects are provider-defined (`voice_id`, `name`, plus extras)
/// and are relayed verbatim. The API key is forwarded only when non-empty,
/// matching the script's argv contract.
///
/// # Errors
///
/// Same failure modes as [`list_audio_devices`].
pub async fn list_voices(
    config: &SpawnConfig,
    elevenlabs_key: &str,
) -> Result<Vec<serde_json::Value>> {
    let mut args = vec!["--list-voices"];
    if !elevenlabs_key.is_empty() {
        args.push("--elevenlabs-key");
        args.push(elevenlabs_key);
    }

    let stdout = run_query(config, &args).await?;
    let voices: Vec<serde_json::Value> = extract_payload(&stdout)?;
    info!(count = voices.len(), "voices listed");
    Ok(voices)
}

/// Extract the last stdout line that parses as a JSON array.
///
/// # Errors
///
/// Returns [`AppError::Parse`] when no line parses as a JSON array, or
/// when the array does not match the requested payload shape.
pub fn extract_payload<T>(stdout: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    for line in stdout.lines().rev() {
        let trimmed = line.trim();
        if !trimmed.starts_with('[') {
            continue;
        }

        let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            // Log lines like `[AUDIO] …` start with a bracket but are not JSON.
            continue;
        };

        if !value.is_array() {
            continue;
        }

        return serde_json::from_value(value)
            .map_err(|err| AppError::Parse(format!("unexpected payload shape: {err}")));
    }

    Err(AppError::Parse(
        "no json payload found in query output".into(),
    ))
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Run the bot script once with `args` and capture its stdout.
///
/// The child carries `kill_on_drop(true)`; on timeout the in-flight wait
/// is dropped, which reaps the process.
async fn run_query(config: &SpawnConfig, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new(&config.interpreter);
    cmd.arg(&config.script_path);
    for arg in args {
        cmd.arg(arg);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|err| AppError::Spawn(format!("failed to spawn query process: {err}")))?;

    debug!(?args, "query process spawned");

    match tokio::time::timeout(config.query_timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
        Ok(Err(err)) => Err(AppError::Io(format!("failed to read query output: {err}"))),
        Err(_elapsed) => Err(AppError::Timeout(format!(
            "query did not complete within {:?} and was killed",
            config.query_timeout
        ))),
    }
}
