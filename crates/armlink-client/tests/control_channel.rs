//! Control channel behavior against a real in-process WebSocket peer.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use armlink_client::{endpoints, ClientConfig, ClientError, ConnectionState, ControlChannel};
use armlink_wire::Method;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerWs = WebSocketStream<TcpStream>;

/// Bind an ephemeral port, accept one connection, and hand it to `behavior`.
async fn spawn_server<F, Fut>(behavior: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an addr");
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("server should accept");
        let ws = accept_async(stream).await.expect("handshake should succeed");
        behavior(ws).await;
    });
    (format!("ws://{addr}"), handle)
}

/// Read the next text frame from the client and parse it as JSON.
async fn next_request(ws: &mut ServerWs) -> Value {
    loop {
        let msg = ws
            .next()
            .await
            .expect("client closed early")
            .expect("server read should succeed");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("request should be JSON");
        }
    }
}

async fn reply(ws: &mut ServerWs, body: Value) {
    ws.send(Message::text(body.to_string()))
        .await
        .expect("server send should succeed");
}

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation timed out")
}

#[tokio::test]
async fn request_resolves_with_matching_payload() {
    let (url, server) = spawn_server(|mut ws| async move {
        let request = next_request(&mut ws).await;
        assert_eq!(request["endpoint"], "/app/servos/getAll");
        assert_eq!(request["method"], "GET");
        reply(
            &mut ws,
            json!({
                "request_id": request["request_id"],
                "payload": {"content": [{"id": 1, "angle": 90}]}
            }),
        )
        .await;
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    let payload = within(channel.send_request(endpoints::SERVOS_GET_ALL, Method::Get, json!({})))
        .await
        .expect("request should resolve");

    assert_eq!(payload, json!({"content": [{"id": 1, "angle": 90}]}));
    assert_eq!(channel.pending_requests(), 0);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn error_response_rejects_only_the_issuing_caller() {
    let (url, server) = spawn_server(|mut ws| async move {
        let request = next_request(&mut ws).await;
        reply(
            &mut ws,
            json!({
                "request_id": request["request_id"],
                "error": {"message": "servo jammed"}
            }),
        )
        .await;
        // The session survives a protocol error: answer one more request.
        let request = next_request(&mut ws).await;
        reply(
            &mut ws,
            json!({"request_id": request["request_id"], "payload": {"ok": true}}),
        )
        .await;
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    let err = within(channel.send_request(endpoints::SERVOS_GET, Method::Get, json!({"id": 3})))
        .await
        .expect_err("request should be rejected");
    assert!(matches!(err, ClientError::Remote(message) if message == "servo jammed"));

    // Connection state is untouched by a per-request failure.
    assert_eq!(channel.current_state(), ConnectionState::Connected);
    let payload = within(channel.send_request(endpoints::SERVOS_GET, Method::Get, json!({"id": 4})))
        .await
        .expect("next request should still work");
    assert_eq!(payload, json!({"ok": true}));

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn out_of_order_replies_resolve_independently() {
    let (url, server) = spawn_server(|mut ws| async move {
        let first = next_request(&mut ws).await;
        let second = next_request(&mut ws).await;
        for request in [second, first] {
            reply(
                &mut ws,
                json!({
                    "request_id": request["request_id"],
                    "payload": {"echo": request["endpoint"]}
                }),
            )
            .await;
        }
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    let (a, b) = within(async {
        tokio::join!(
            channel.send_request(endpoints::SERVOS_GET, Method::Get, json!({"id": 1})),
            channel.send_request(endpoints::POSITIONS_GET, Method::Get, json!({"id": 2})),
        )
    })
    .await;

    assert_eq!(a.expect("first should resolve"), json!({"echo": "/app/servos/get"}));
    assert_eq!(b.expect("second should resolve"), json!({"echo": "/app/positions/get"}));

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn duplicate_response_is_dropped_without_effect() {
    let (url, server) = spawn_server(|mut ws| async move {
        let request = next_request(&mut ws).await;
        let body = json!({"request_id": request["request_id"], "payload": {"n": 1}});
        reply(&mut ws, body.clone()).await;
        reply(&mut ws, body).await;
        // A later round trip proves the duplicate was consumed first.
        let request = next_request(&mut ws).await;
        reply(
            &mut ws,
            json!({"request_id": request["request_id"], "payload": {"n": 2}}),
        )
        .await;
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    let first = within(channel.send_request(endpoints::SERVOS_GET, Method::Get, json!({})))
        .await
        .expect("first request should resolve");
    assert_eq!(first, json!({"n": 1}));

    let second = within(channel.send_request(endpoints::SERVOS_GET, Method::Get, json!({})))
        .await
        .expect("second request should resolve");
    assert_eq!(second, json!({"n": 2}));

    assert_eq!(channel.stats().uncorrelated, 1);
    assert_eq!(channel.stats().malformed, 0);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn malformed_messages_are_counted_and_dropped() {
    let (url, server) = spawn_server(|mut ws| async move {
        ws.send(Message::text("this is not json"))
            .await
            .expect("server send should succeed");
        ws.send(Message::text(r#"{"no_request_id": true}"#))
            .await
            .expect("server send should succeed");
        let request = next_request(&mut ws).await;
        reply(
            &mut ws,
            json!({"request_id": request["request_id"], "payload": {}}),
        )
        .await;
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    // The round trip orders the assertion after both junk messages.
    within(channel.send_request(endpoints::SERVOS_GET_ALL, Method::Get, json!({})))
        .await
        .expect("request should resolve despite junk traffic");

    assert_eq!(channel.stats().malformed, 2);
    assert_eq!(channel.stats().uncorrelated, 0);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn raw_tap_sees_every_inbound_text_frame() {
    let (url, server) = spawn_server(|mut ws| async move {
        ws.send(Message::text("unparsable notification"))
            .await
            .expect("server send should succeed");
        let request = next_request(&mut ws).await;
        reply(
            &mut ws,
            json!({"request_id": request["request_id"], "payload": {}}),
        )
        .await;
    })
    .await;

    let channel = ControlChannel::default();
    let mut tap = channel.subscribe_raw();
    channel.connect(&url).await.expect("connect should succeed");

    within(channel.send_request(endpoints::VIDEO_START, Method::Post, json!({})))
        .await
        .expect("request should resolve");

    let first = within(tap.recv()).await.expect("tap should receive");
    assert_eq!(first, "unparsable notification");
    let second = within(tap.recv()).await.expect("tap should receive");
    assert!(second.contains("request_id"));

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn concurrent_requests_get_distinct_ids_and_drain_the_table() {
    const REQUESTS: usize = 8;

    let (release_tx, release_rx) = oneshot::channel::<()>();
    let (url, server) = spawn_server(move |mut ws| async move {
        let mut requests = Vec::new();
        for _ in 0..REQUESTS {
            requests.push(next_request(&mut ws).await);
        }
        let ids: HashSet<String> = requests
            .iter()
            .map(|r| r["request_id"].as_str().expect("id should be a string").to_string())
            .collect();
        assert_eq!(ids.len(), REQUESTS, "request ids must be distinct");

        release_rx.await.expect("test should release the replies");
        for request in requests {
            reply(
                &mut ws,
                json!({"request_id": request["request_id"], "payload": {}}),
            )
            .await;
        }
    })
    .await;

    let channel = Arc::new(ControlChannel::default());
    channel.connect(&url).await.expect("connect should succeed");

    let mut callers = Vec::new();
    for i in 0..REQUESTS {
        let channel = Arc::clone(&channel);
        callers.push(tokio::spawn(async move {
            channel
                .send_request(endpoints::SERVOS_GET, Method::Get, json!({"id": i}))
                .await
        }));
    }

    // All dispatched, none settled: the table holds one entry per caller.
    within(async {
        while channel.pending_requests() < REQUESTS {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_eq!(channel.pending_requests(), REQUESTS);

    release_tx.send(()).expect("server should be waiting");
    for caller in callers {
        within(caller)
            .await
            .expect("task should join")
            .expect("request should resolve");
    }
    assert_eq!(channel.pending_requests(), 0);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn close_before_reply_rejects_pending_requests() {
    let (url, server) = spawn_server(|mut ws| async move {
        let _request = next_request(&mut ws).await;
        ws.close(None).await.expect("server close should succeed");
    })
    .await;

    let channel = ControlChannel::default();
    let mut changes = channel.state_changes();
    channel.connect(&url).await.expect("connect should succeed");

    let err = within(channel.send_request(endpoints::SERVOS_GET_ALL, Method::Get, json!({})))
        .await
        .expect_err("request should be rejected on close");
    assert!(matches!(err, ClientError::ConnectionClosed));
    assert_eq!(channel.pending_requests(), 0);

    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Connecting);
    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Connected);
    assert_eq!(
        within(changes.recv()).await.unwrap(),
        ConnectionState::Disconnected
    );

    server.await.expect("server should complete");
}

#[tokio::test]
async fn transport_error_surfaces_error_text_before_failed() {
    let (url, server) = spawn_server(|ws| async move {
        // Drop the socket without a close handshake to force a protocol
        // error on the client side.
        drop(ws);
    })
    .await;

    let channel = ControlChannel::default();
    let mut changes = channel.state_changes();
    channel.connect(&url).await.expect("connect should succeed");

    within(async {
        loop {
            if changes.recv().await.unwrap() == ConnectionState::Failed {
                break;
            }
        }
    })
    .await;

    // A subscriber arriving after the failure sees both signals at once.
    assert_eq!(*channel.state().borrow(), ConnectionState::Failed);
    let error = channel.last_error().borrow().clone();
    assert!(error.expect("error text should be set").contains("websocket error"));

    server.await.expect("server should complete");
}

#[tokio::test]
async fn reconnect_after_failure_reenters_connecting() {
    let (url, server) = spawn_server(|ws| async move {
        drop(ws);
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");
    let mut state = channel.state();
    within(async {
        while *state.borrow_and_update() != ConnectionState::Failed {
            state.changed().await.unwrap();
        }
    })
    .await;
    server.await.expect("server should complete");

    // A fresh peer accepts the retry; Failed is not terminal.
    let (url, server) = spawn_server(|mut ws| async move {
        // Hold the connection open until the client disconnects.
        while ws.next().await.is_some() {}
    })
    .await;
    channel.connect(&url).await.expect("reconnect should succeed");
    assert_eq!(channel.current_state(), ConnectionState::Connected);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn connect_while_connected_fails_fast() {
    let (url, server) = spawn_server(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;

    let channel = ControlChannel::default();
    channel.connect(&url).await.expect("connect should succeed");

    let err = channel.connect(&url).await.expect_err("second connect must fail");
    assert!(matches!(err, ClientError::AlreadyConnected));
    assert_eq!(channel.current_state(), ConnectionState::Connected);

    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn send_while_disconnected_returns_not_connected() {
    let channel = ControlChannel::default();

    let err = channel
        .send_request(endpoints::SERVOS_GET_ALL, Method::Get, json!({}))
        .await
        .expect_err("send must fail when disconnected");
    assert!(matches!(err, ClientError::NotConnected));
    assert_eq!(channel.pending_requests(), 0);
}

#[tokio::test]
async fn unanswered_request_times_out_and_is_abandoned() {
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let (url, server) = spawn_server(move |mut ws| async move {
        let _request = next_request(&mut ws).await;
        // Never reply; hold the socket open until the test finishes.
        done_rx.await.ok();
        let _ = ws.close(None).await;
    })
    .await;

    let config = ClientConfig {
        request_timeout: Duration::from_millis(200),
        ..ClientConfig::default()
    };
    let channel = ControlChannel::new(config);
    channel.connect(&url).await.expect("connect should succeed");

    let err = within(channel.send_request(endpoints::SERVOS_GET_ALL, Method::Get, json!({})))
        .await
        .expect_err("request should time out");
    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(channel.pending_requests(), 0);

    done_tx.send(()).ok();
    channel.disconnect().await;
    server.await.expect("server should complete");
}

#[tokio::test]
async fn state_sequence_for_clean_connect_disconnect() {
    let (url, server) = spawn_server(|mut ws| async move {
        while ws.next().await.is_some() {}
    })
    .await;

    let channel = ControlChannel::default();
    let mut changes = channel.state_changes();

    channel.connect(&url).await.expect("connect should succeed");
    channel.disconnect().await;

    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Connecting);
    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Connected);
    assert_eq!(
        within(changes.recv()).await.unwrap(),
        ConnectionState::Disconnected
    );

    // Disconnect again: idempotent, no extra transition.
    channel.disconnect().await;
    assert!(changes.try_recv().is_err());

    server.await.expect("server should complete");
}

#[tokio::test]
async fn connect_to_unreachable_peer_fails() {
    let channel = ControlChannel::default();
    let mut changes = channel.state_changes();

    // Bind-then-drop guarantees nothing is listening on the port.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = channel
        .connect(&format!("ws://{addr}"))
        .await
        .expect_err("connect must fail");
    assert!(matches!(err, ClientError::Ws(_)));

    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Connecting);
    assert_eq!(within(changes.recv()).await.unwrap(), ConnectionState::Failed);
    assert!(channel.last_error().borrow().is_some());
}
