//! Local IPC server for the presentation layer.
//!
//! Listens on a named pipe (Windows) or Unix domain socket (Linux/macOS)
//! using the `interprocess` crate. Each connection runs three tasks: the
//! request loop (reads command lines, dispatches, queues responses), an
//! event forwarder (fans supervisor events out to this client), and a
//! single writer that serialises both onto the socket so response and
//! event lines never interleave mid-frame.

use std::sync::Arc;

use interprocess::local_socket::tokio::{RecvHalf, SendHalf};
use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::bot::query;
use crate::bot::request::SettingsUpdate;
use crate::bot::supervisor::Supervisor;
use crate::bot::UiEvent;
use crate::bridge::protocol::{
    ack_error, ack_success, devices_frame, event_frame, query_error_frame, running_frame,
    voices_frame, BridgeRequest,
};
use crate::{AppError, Result};

/// Per-client fan-out capacity; a client lagging further than this loses
/// the oldest events and is told how many were skipped.
const EVENT_FANOUT_CAPACITY: usize = 256;

/// Per-connection outbound line queue capacity.
const OUTBOUND_CAPACITY: usize = 64;

/// Spawn the bridge server task.
///
/// `event_rx` is the supervisor's event stream; it is fanned out to every
/// connected client for as long as the server runs.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be created.
pub fn spawn_bridge_server(
    supervisor: Arc<Supervisor>,
    ipc_name: &str,
    mut event_rx: mpsc::Receiver<UiEvent>,
    ct: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let name = ipc_name.to_owned();

    let listener_name = name
        .clone()
        .to_ns_name::<GenericNamespaced>()
        .map_err(|err| AppError::Ipc(format!("invalid ipc socket name '{name}': {err}")))?;

    let listener = ListenerOptions::new()
        .name(listener_name)
        .create_tokio()
        .map_err(|err| AppError::Ipc(format!("failed to create ipc listener: {err}")))?;

    info!(ipc_name = %name, "bridge listening");

    let (fanout_tx, _) = broadcast::channel::<UiEvent>(EVENT_FANOUT_CAPACITY);

    // Pump supervisor events into the per-client fan-out channel.
    let pump_tx = fanout_tx.clone();
    let pump_ct = ct.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = pump_ct.cancelled() => break,
                event = event_rx.recv() => {
                    match event {
                        None => break,
                        // A send error only means no client is connected.
                        Some(event) => drop(pump_tx.send(event)),
                    }
                }
            }
        }
    });

    let handle = tokio::spawn(async move {
        let span = info_span!("bridge_server", name = %name);
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("bridge shutting down");
                        break;
                    }
                    accept_result = listener.accept() => {
                        match accept_result {
                            Ok(stream) => {
                                let supervisor = Arc::clone(&supervisor);
                                let events = fanout_tx.subscribe();
                                tokio::spawn(handle_connection(stream, supervisor, events));
                            }
                            Err(err) => {
                                warn!(%err, "bridge accept failed");
                            }
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;
    });

    Ok(handle)
}

/// Handle a single UI client connection.
async fn handle_connection(
    stream: interprocess::local_socket::tokio::Stream,
    supervisor: Arc<Supervisor>,
    events: broadcast::Receiver<UiEvent>,
) {
    let span = info_span!("bridge_conn");
    async move {
        let (reader, writer) = stream.split();
        let (out_tx, out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

        let writer_task = tokio::spawn(write_outbound(writer, out_rx));
        let event_task = tokio::spawn(forward_events(events, out_tx.clone()));

        let mut buf_reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match buf_reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let response = match serde_json::from_str::<BridgeRequest>(trimmed) {
                        Ok(request) => dispatch_command(request, &supervisor).await,
                        Err(err) => ack_error(&format!("invalid json: {err}")),
                    };

                    let mut response_line = serde_json::to_string(&response).unwrap_or_else(|_| {
                        r#"{"status":"error","message":"serialization failed"}"#.to_owned()
                    });
                    response_line.push('\n');

                    if out_tx.send(response_line).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(%err, "bridge read error");
                    break;
                }
            }
        }

        event_task.abort();
        drop(out_tx);
        let _ = writer_task.await;

        info!("bridge connection closed");
    }
    .instrument(span)
    .await;
}

/// Drain the outbound queue onto the socket; the only task that writes.
async fn write_outbound(mut writer: SendHalf, mut out_rx: mpsc::Receiver<String>) {
    while let Some(line) = out_rx.recv().await {
        if let Err(err) = writer.write_all(line.as_bytes()).await {
            warn!(%err, "failed to write bridge frame");
            break;
        }
    }
}

/// Forward supervisor events to this client as pushed frames.
async fn forward_events(mut events: broadcast::Receiver<UiEvent>, out_tx: mpsc::Sender<String>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let mut frame = event_frame(&event).to_string();
                frame.push('\n');
                if out_tx.send(frame).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "slow ui client, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("event fan-out closed");
                break;
            }
        }
    }
}

/// Route a bridge request to the supervisor or a query, mapping every
/// failure to a `{status: "error", message}` frame (queries to their
/// `{error: true, …}` shape). No failure propagates past this boundary.
async fn dispatch_command(request: BridgeRequest, supervisor: &Arc<Supervisor>) -> Value {
    match request {
        BridgeRequest::StartBot(req) => match supervisor.start(req).await {
            Ok(()) => ack_success("bot started"),
            Err(err) => ack_error(&err.to_string()),
        },

        BridgeRequest::StopBot => match supervisor.stop().await {
            Ok(()) => ack_success("bot stopped"),
            Err(err) => ack_error(&err.to_string()),
        },

        BridgeRequest::CheckBotStatus => running_frame(supervisor.status().await),

        BridgeRequest::ChangeVoice { voice_id } => {
            // Routed through the settings path so the value gets the same
            // validation as any other live update.
            let update = SettingsUpdate {
                voice: Some(voice_id),
                ..SettingsUpdate::default()
            };
            match supervisor.update_settings(update).await {
                Ok(()) => ack_success("voice change sent"),
                Err(err) => ack_error(&err.to_string()),
            }
        }

        BridgeRequest::UpdateSettings(update) => match supervisor.update_settings(update).await {
            Ok(()) => ack_success("settings update sent"),
            Err(err) => ack_error(&err.to_string()),
        },

        BridgeRequest::ListAudioDevices => {
            match query::list_audio_devices(supervisor.spawn_config()).await {
                Ok(devices) => devices_frame(&devices),
                Err(err) => query_error_frame("devices", &err.to_string()),
            }
        }

        BridgeRequest::ListVoices { elevenlabs_key } => {
            match query::list_voices(supervisor.spawn_config(), &elevenlabs_key).await {
                Ok(voices) => voices_frame(&voices),
                Err(err) => query_error_frame("voices", &err.to_string()),
            }
        }
    }
}
