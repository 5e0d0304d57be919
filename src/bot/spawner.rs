//! Bot process spawner.
//!
//! Builds the bot's argv from a validated [`StartRequest`] and launches the
//! script with piped stdio and `kill_on_drop(true)` so an abandoned child
//! is cleaned up automatically.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::info;

use crate::bot::request::StartRequest;
use crate::{AppError, Result};

// ── Configuration ────────────────────────────────────────────────────────────

/// Configuration for launching the bot script.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Interpreter binary (e.g. `python3`).
    pub interpreter: String,
    /// Path to the bot script.
    pub script_path: PathBuf,
    /// Bound on auxiliary one-shot queries before the child is killed.
    pub query_timeout: Duration,
}

// ── Process handle ───────────────────────────────────────────────────────────

/// A freshly spawned bot process with its stdio captured.
///
/// The caller is responsible for keeping `child` alive (it has
/// `kill_on_drop(true)`), writing control commands through `stdin`, and
/// draining `stdout`/`stderr`.
#[derive(Debug)]
pub struct BotProcess {
    /// Child process handle.
    pub child: Child,
    /// Bot's stdin, used by the control channel.
    pub stdin: ChildStdin,
    /// Bot's stdout stream.
    pub stdout: ChildStdout,
    /// Bot's stderr stream.
    pub stderr: ChildStderr,
}

// ── Argv assembly ────────────────────────────────────────────────────────────

/// Build the bot's argument list from a validated start request.
///
/// Layout: `<channel> <token> [audioDeviceId] [--voice V] [--volume N]
/// [--gemini-key K] [--elevenlabs-key K] [--bot-personality P]
/// [--ia-command C]`. A flag is omitted entirely when its value is empty.
#[must_use]
pub fn build_args(req: &StartRequest) -> Vec<String> {
    let mut args = vec![req.channel.clone(), req.token.clone()];

    if let Some(device) = present(req.audio_device.as_deref()) {
        args.push(device.to_owned());
    }

    if let Some(voice) = present(req.voice.as_deref()) {
        args.push("--voice".to_owned());
        args.push(voice.to_owned());
    }

    if let Some(volume) = req.volume {
        args.push("--volume".to_owned());
        args.push(volume.to_string());
    }

    if let Some(key) = present(req.gemini_key.as_deref()) {
        args.push("--gemini-key".to_owned());
        args.push(key.to_owned());
    }

    if let Some(key) = present(req.elevenlabs_key.as_deref()) {
        args.push("--elevenlabs-key".to_owned());
        args.push(key.to_owned());
    }

    if let Some(text) = present(req.personality.as_deref()) {
        args.push("--bot-personality".to_owned());
        args.push(text.to_owned());
    }

    if let Some(command) = present(req.ia_command.as_deref()) {
        args.push("--ia-command".to_owned());
        args.push(command.to_owned());
    }

    args
}

// ── Spawner ──────────────────────────────────────────────────────────────────

/// Spawn the bot process for a validated start request.
///
/// The child inherits the shell's environment (the bot script needs the
/// platform audio stack and `PATH`), runs with all three stdio streams
/// piped, and carries `kill_on_drop(true)`.
///
/// # Errors
///
/// - `AppError::Spawn("failed to spawn bot process: …")` — OS spawn
///   failure, platform message propagated.
/// - `AppError::Spawn("failed to capture …")` — a piped stream handle was
///   unexpectedly absent.
pub fn spawn_bot(config: &SpawnConfig, req: &StartRequest) -> Result<BotProcess> {
    let mut cmd = Command::new(&config.interpreter);
    cmd.arg(&config.script_path);

    for arg in build_args(req) {
        cmd.arg(arg);
    }

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Spawn(format!("failed to spawn bot process: {err}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture bot stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture bot stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture bot stderr".into()))?;

    info!(
        channel = req.channel,
        pid = child.id().unwrap_or(0),
        interpreter = config.interpreter,
        "bot process spawned"
    );

    Ok(BotProcess {
        child,
        stdin,
        stdout,
        stderr,
    })
}

// ── Private helper ───────────────────────────────────────────────────────────

/// `Some` only when the value is present and non-empty.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
