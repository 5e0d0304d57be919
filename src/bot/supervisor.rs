//! Process supervisor — owns the at-most-one bot process slot.
//!
//! The supervisor is an explicit object injected into the UI bridge rather
//! than ambient module state. Its single slot is guarded by an async mutex
//! held across validation and spawn, so a concurrent `start` observes
//! `AlreadyRunning` once the handle is set and can never race into a
//! second child.
//!
//! Stop-requested and process-exited are two independent signals:
//! [`Supervisor::stop`] fires a termination token and clears the slot
//! without waiting, while the exit monitor keeps owning the [`Child`] and
//! still delivers the `system` exit notice (and [`UiEvent::Stopped`]) when
//! the process actually ends — in either order relative to the stop ack,
//! or never, if the bot ignores the signal.

use std::sync::Arc;

use serde::Serialize;
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bot::classifier::{exit_event, OutputEvent, OutputKind, StreamSource};
use crate::bot::control::{write_command, ControlCommand};
use crate::bot::reader::run_reader;
use crate::bot::request::{SettingsUpdate, StartRequest};
use crate::bot::spawner::{spawn_bot, SpawnConfig};
use crate::bot::UiEvent;
use crate::{AppError, Result};

/// Pure read of whether a bot process slot is currently occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// `true` while a handle exists, even if the process has been signalled
    /// but has not yet exited.
    pub running: bool,
}

/// Live handle to the supervised bot process.
#[derive(Debug)]
struct BotHandle {
    /// Bot's stdin for the control channel. Dropped on `stop()`, which
    /// closes the pipe and signals EOF to the bot's stdin listener.
    stdin: ChildStdin,
    /// Fires when termination was requested for this process.
    term: CancellationToken,
    /// Start counter value this handle was created under.
    generation: u64,
}

/// Slot state behind the supervisor mutex.
#[derive(Debug, Default)]
struct Slot {
    current: Option<BotHandle>,
    generation: u64,
}

/// Supervisor for the external bot process.
#[derive(Debug)]
pub struct Supervisor {
    spawn: SpawnConfig,
    event_tx: mpsc::Sender<UiEvent>,
    shutdown: CancellationToken,
    slot: Mutex<Slot>,
}

impl Supervisor {
    /// Create a supervisor with an empty slot.
    ///
    /// `event_tx` receives every classified output line plus the exit
    /// notice and stop event; `shutdown` is the application-level token —
    /// cancelling it kills any live bot process without emitting events.
    #[must_use]
    pub fn new(
        spawn: SpawnConfig,
        event_tx: mpsc::Sender<UiEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            spawn,
            event_tx,
            shutdown,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Spawn parameters used for the bot and for auxiliary queries.
    #[must_use]
    pub fn spawn_config(&self) -> &SpawnConfig {
        &self.spawn
    }

    /// Validate `req`, launch the bot process, and attach its observers.
    ///
    /// On success the slot holds the new handle and the child's stdout,
    /// stderr, and exit are consumed asynchronously.
    ///
    /// # Errors
    ///
    /// - [`AppError::AlreadyRunning`] if a handle exists; nothing is spawned.
    /// - [`AppError::Validation`] for a malformed request; nothing is spawned.
    /// - [`AppError::Spawn`] if process creation fails.
    pub async fn start(self: &Arc<Self>, req: StartRequest) -> Result<()> {
        req.validate()?;

        // Hold the slot lock across the spawn so a concurrent start cannot
        // slip in between the check and the handle installation.
        let mut slot = self.slot.lock().await;
        if slot.current.is_some() {
            return Err(AppError::AlreadyRunning);
        }

        let process = spawn_bot(&self.spawn, &req)?;

        slot.generation += 1;
        let generation = slot.generation;
        let term = CancellationToken::new();

        tokio::spawn(run_reader(
            StreamSource::Stdout,
            process.stdout,
            self.event_tx.clone(),
            self.shutdown.child_token(),
        ));
        tokio::spawn(run_reader(
            StreamSource::Stderr,
            process.stderr,
            self.event_tx.clone(),
            self.shutdown.child_token(),
        ));
        monitor_exit(Arc::clone(self), generation, process.child, term.clone());

        slot.current = Some(BotHandle {
            stdin: process.stdin,
            term,
            generation,
        });

        info!(channel = req.channel, generation, "bot started");
        Ok(())
    }

    /// Request termination of the running bot and clear the slot.
    ///
    /// Fire-and-forget: the slot is cleared immediately and the call does
    /// not wait for the process to exit. The exit monitor still delivers
    /// the `system` exit notice when (and if) the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotRunning`] if no handle exists; no side effects.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        let Some(handle) = slot.current.take() else {
            return Err(AppError::NotRunning);
        };
        drop(slot);

        handle.term.cancel();
        info!(generation = handle.generation, "bot stop requested");
        Ok(())
    }

    /// Whether a bot handle currently exists.
    pub async fn status(&self) -> StatusReport {
        let slot = self.slot.lock().await;
        StatusReport {
            running: slot.current.is_some(),
        }
    }

    /// Write one control command to the running bot's stdin.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotRunning`] if no handle exists (nothing is
    /// written), or [`AppError::Io`] if the write fails.
    pub async fn send(&self, command: ControlCommand) -> Result<()> {
        let mut slot = self.slot.lock().await;
        match slot.current {
            None => Err(AppError::NotRunning),
            Some(ref mut handle) => write_command(&mut handle.stdin, &command).await,
        }
    }

    /// Write a batch of settings commands, one line each.
    ///
    /// Commands are written in the fixed [`SettingsUpdate::commands`]
    /// order. On a failed write the error is surfaced immediately; earlier
    /// writes remain in effect (no rollback).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a malformed update,
    /// [`AppError::NotRunning`] if no handle exists, or [`AppError::Io`]
    /// for the first failed write.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        update.validate()?;

        let mut slot = self.slot.lock().await;
        let Some(handle) = slot.current.as_mut() else {
            return Err(AppError::NotRunning);
        };

        for command in update.commands() {
            write_command(&mut handle.stdin, &command).await?;
        }

        Ok(())
    }
}

// ── Exit monitor ─────────────────────────────────────────────────────────────

/// First outcome observed by the exit monitor.
enum Waited {
    /// The process ended on its own (or after an earlier signal).
    Exited(std::io::Result<std::process::ExitStatus>),
    /// `stop()` fired the termination token; the process may still run.
    StopRequested,
    /// Application shutdown; the child is killed without events.
    Shutdown,
}

/// Spawn the background task that owns the [`Child`] and reports its fate.
///
/// The task waits for process exit, clears the supervisor slot (only if it
/// still holds this generation's handle), and emits the `system` exit
/// notice followed by [`UiEvent::Stopped`]. When `term` fires first it
/// sends a termination signal and keeps waiting, so a stopped bot still
/// gets its exit reported. Application shutdown kills the child silently.
fn monitor_exit(
    supervisor: Arc<Supervisor>,
    generation: u64,
    mut child: Child,
    term: CancellationToken,
) -> JoinHandle<()> {
    let shutdown = supervisor.shutdown.child_token();

    tokio::spawn(async move {
        let first = tokio::select! {
            biased;

            () = shutdown.cancelled() => Waited::Shutdown,
            result = child.wait() => Waited::Exited(result),
            () = term.cancelled() => Waited::StopRequested,
        };

        let status = match first {
            Waited::Exited(result) => Some(result),
            Waited::Shutdown => None,
            Waited::StopRequested => {
                request_termination(&mut child);
                // The signal is best-effort; keep waiting so the exit is
                // still reported when the process ends.
                tokio::select! {
                    biased;

                    () = shutdown.cancelled() => None,
                    result = child.wait() => Some(result),
                }
            }
        };

        let Some(status) = status else {
            child.kill().await.ok();
            info!(generation, "exit monitor: shutdown, bot process killed");
            return;
        };

        let event = match status {
            Ok(exit) => exit_event(exit.code()),
            Err(err) => {
                warn!(generation, %err, "exit monitor: error waiting for bot process");
                OutputEvent {
                    kind: OutputKind::System,
                    text: format!("wait error: {err}"),
                }
            }
        };

        // Free the slot before notifying, so a status query issued right
        // after the stop event already reads `running: false`.
        {
            let mut slot = supervisor.slot.lock().await;
            if slot
                .current
                .as_ref()
                .is_some_and(|handle| handle.generation == generation)
            {
                slot.current = None;
            }
        }

        info!(generation, notice = event.text, "bot process exited");

        if supervisor.event_tx.send(UiEvent::Output(event)).await.is_err() {
            debug!(generation, "exit monitor: event channel closed");
            return;
        }
        if supervisor.event_tx.send(UiEvent::Stopped).await.is_err() {
            debug!(generation, "exit monitor: event channel closed");
        }
    })
}

/// Best-effort termination signal: SIGTERM on unix so the bot can
/// disconnect cleanly, `start_kill` elsewhere or as fallback.
fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Ok(raw) = i32::try_from(pid) {
                if kill(Pid::from_raw(raw), Signal::SIGTERM).is_ok() {
                    return;
                }
            }
        }
    }

    if let Err(err) = child.start_kill() {
        warn!(%err, "failed to deliver kill to bot process");
    }
}
