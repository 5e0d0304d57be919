//! Integration tests for the UI bridge over a real local socket.

use std::sync::Arc;

use interprocess::local_socket::tokio::{RecvHalf, SendHalf, Stream};
use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use botshell::bot::classifier::{OutputEvent, OutputKind};
use botshell::bot::supervisor::Supervisor;
use botshell::bot::UiEvent;
use botshell::bridge::server::spawn_bridge_server;

use super::test_helpers::{sh_config, write_script, EVENT_TIMEOUT};

/// Everything a bridge test needs, bundled so the tempdir and the
/// cancellation token outlive the test body.
struct BridgeFixture {
    ipc_name: String,
    event_tx: mpsc::Sender<UiEvent>,
    _supervisor: Arc<Supervisor>,
    _ct: CancellationToken,
    _dir: tempfile::TempDir,
}

/// Start a bridge server over a stand-in bot script. `tag` keeps socket
/// names unique across concurrently running tests.
fn bridge_fixture(tag: &str, script_body: &str) -> BridgeFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(&dir, script_body);

    let (event_tx, event_rx) = mpsc::channel(64);
    let ct = CancellationToken::new();
    let supervisor = Arc::new(Supervisor::new(
        sh_config(script),
        event_tx.clone(),
        ct.clone(),
    ));

    let ipc_name = format!("botshell-test-{tag}-{}", std::process::id());
    spawn_bridge_server(Arc::clone(&supervisor), &ipc_name, event_rx, ct.clone())
        .expect("bridge server must start");

    BridgeFixture {
        ipc_name,
        event_tx,
        _supervisor: supervisor,
        _ct: ct,
        _dir: dir,
    }
}

/// Connect to the bridge and split the stream for line-based use.
async fn connect(ipc_name: &str) -> (BufReader<RecvHalf>, SendHalf) {
    let name = ipc_name
        .to_ns_name::<GenericNamespaced>()
        .expect("namespaced socket name");
    let stream = Stream::connect(name).await.expect("connect to bridge");
    let (recv, send) = stream.split();
    (BufReader::new(recv), send)
}

/// Send one request line.
async fn send_line(send: &mut SendHalf, request: &Value) {
    let mut line = request.to_string();
    line.push('\n');
    send.write_all(line.as_bytes()).await.expect("write request");
}

/// Read the next frame of any kind.
async fn next_frame(recv: &mut BufReader<RecvHalf>) -> Value {
    let mut line = String::new();
    let n = tokio::time::timeout(EVENT_TIMEOUT, recv.read_line(&mut line))
        .await
        .expect("timed out waiting for a frame")
        .expect("read frame");
    assert!(n > 0, "bridge closed the connection unexpectedly");
    serde_json::from_str(line.trim()).expect("frame must be valid json")
}

/// Read frames until a response (non-event) arrives, skipping pushed
/// event frames that may interleave.
async fn next_response(recv: &mut BufReader<RecvHalf>) -> Value {
    loop {
        let frame = next_frame(recv).await;
        if frame.get("event").is_none() {
            return frame;
        }
    }
}

/// A status check on a fresh bridge reports not running.
#[tokio::test]
async fn check_status_reports_not_running() {
    let fixture = bridge_fixture("status", "sleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(&mut send, &serde_json::json!({"command": "check-bot-status"})).await;
    let response = next_response(&mut recv).await;

    assert_eq!(response, serde_json::json!({"running": false}));
}

/// Stopping with no bot running yields the structured error ack.
#[tokio::test]
async fn stop_without_bot_is_an_error_ack() {
    let fixture = bridge_fixture("stop", "sleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(&mut send, &serde_json::json!({"command": "stop-bot"})).await;
    let response = next_response(&mut recv).await;

    assert_eq!(response["status"], "error");
    assert_eq!(response["message"], "bot is not running");
}

/// A line that is not valid JSON is answered, not dropped.
#[tokio::test]
async fn invalid_json_is_answered_with_error() {
    let fixture = bridge_fixture("badjson", "sleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send.write_all(b"this is not json\n").await.expect("write");
    let response = next_response(&mut recv).await;

    assert_eq!(response["status"], "error");
    let message = response["message"].as_str().expect("message is a string");
    assert!(
        message.contains("invalid json"),
        "error must mention invalid json, got: {message}"
    );
}

/// A rejected start surfaces the validation message through the ack.
#[tokio::test]
async fn rejected_start_surfaces_validation_message() {
    let fixture = bridge_fixture("badstart", "sleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(
        &mut send,
        &serde_json::json!({
            "command": "start-bot",
            "channel": "testchannel",
            "token": "oauth:abc",
        }),
    )
    .await;
    let response = next_response(&mut recv).await;

    assert_eq!(response["status"], "error");
    let message = response["message"].as_str().expect("message is a string");
    assert!(
        message.starts_with("validation:"),
        "message must carry the validation error, got: {message}"
    );
}

/// A device query round-trips through the bridge as a payload frame.
#[tokio::test]
async fn device_query_returns_payload_frame() {
    let fixture = bridge_fixture(
        "devices",
        "echo '[{\"id\":0,\"name\":\"Speakers\",\"channels\":2}]'\n",
    );
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(&mut send, &serde_json::json!({"command": "list-audio-devices"})).await;
    let response = next_response(&mut recv).await;

    assert_eq!(
        response,
        serde_json::json!({
            "devices": [{"id": 0, "name": "Speakers", "channels": 2}],
        })
    );
}

/// A failed voice query surfaces the documented `{error: true, …}` shape.
#[tokio::test]
async fn failed_voice_query_uses_error_shape() {
    let fixture = bridge_fixture("voiceerr", "echo no payload here\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(&mut send, &serde_json::json!({"command": "list-voices"})).await;
    let response = next_response(&mut recv).await;

    assert_eq!(response["error"], true);
    assert_eq!(response["voices"], serde_json::json!([]));
    let message = response["message"].as_str().expect("message is a string");
    assert!(
        message.starts_with("parse:"),
        "message must carry the parse error, got: {message}"
    );
}

/// Supervisor events are pushed to a connected client as event frames.
#[tokio::test]
async fn events_are_pushed_to_connected_clients() {
    let fixture = bridge_fixture("events", "sleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    // One round trip first: proves the connection (and its event
    // subscription) is fully set up before events are injected.
    send_line(&mut send, &serde_json::json!({"command": "check-bot-status"})).await;
    let _response = next_response(&mut recv).await;

    fixture
        .event_tx
        .send(UiEvent::Output(OutputEvent {
            kind: OutputKind::Info,
            text: "bot connected".into(),
        }))
        .await
        .expect("inject output event");
    fixture
        .event_tx
        .send(UiEvent::Stopped)
        .await
        .expect("inject stop event");

    let first = next_frame(&mut recv).await;
    assert_eq!(
        first,
        serde_json::json!({
            "event": "bot-output",
            "type": "info",
            "message": "bot connected",
        })
    );

    let second = next_frame(&mut recv).await;
    assert_eq!(second, serde_json::json!({"event": "bot-stopped"}));
}

/// Full lifecycle through the bridge: start, observe status, stop.
#[tokio::test]
async fn lifecycle_round_trip_over_the_bridge() {
    let fixture = bridge_fixture("lifecycle", "echo ready\nsleep 30\n");
    let (mut recv, mut send) = connect(&fixture.ipc_name).await;

    send_line(
        &mut send,
        &serde_json::json!({
            "command": "start-bot",
            "channel": "testchannel",
            "token": super::test_helpers::TEST_TOKEN,
        }),
    )
    .await;
    let response = next_response(&mut recv).await;
    assert_eq!(response["status"], "success");

    send_line(&mut send, &serde_json::json!({"command": "check-bot-status"})).await;
    let response = next_response(&mut recv).await;
    assert_eq!(response, serde_json::json!({"running": true}));

    send_line(&mut send, &serde_json::json!({"command": "stop-bot"})).await;
    let response = next_response(&mut recv).await;
    assert_eq!(response["status"], "success");

    send_line(&mut send, &serde_json::json!({"command": "check-bot-status"})).await;
    let response = next_response(&mut recv).await;
    assert_eq!(response, serde_json::json!({"running": false}));
}
