use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::mock_broker::{Behavior, MockBroker};
use crate::client::supervisor::HEARTBEAT_INTERVAL;
use crate::client::{ConnectionState, MeterClient};
use crate::dispatch::{AlertEvent, ClientEvent, ReadingEvent};
use crate::protocol::extract_json;

const HANDSHAKE_FRAMES: usize = 4;

async fn next_event(events: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

fn expected_handshake() -> Vec<String> {
    vec![
        "CONNECT\naccept-version:1.1,1.0\nhost:127.0.0.1\nheart-beat:10000,10000\n\n\0".to_string(),
        "SUBSCRIBE\nid:sub-0\ndestination:/notification/alert\n\n\0".to_string(),
        "SUBSCRIBE\nid:sub-1\ndestination:/notification/alert/meter-test\n\n\0".to_string(),
        "SUBSCRIBE\nid:sub-2\ndestination:/notification/readingResult/meter-test\n\n\0"
            .to_string(),
    ]
}

fn texts(frames: Vec<(usize, String)>) -> Vec<String> {
    frames.into_iter().map(|(_, text)| text).collect()
}

#[tokio::test]
async fn test_connect_sends_handshake_then_subscriptions() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(100));

    client.connect().unwrap();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(
        texts(broker.next_frames(HANDSHAKE_FRAMES).await),
        expected_handshake()
    );

    client.disconnect();
}

#[tokio::test]
async fn test_inbound_frames_reach_consumer_in_order() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(100));
    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;

    broker.push("CONNECTED\nversion:1.1\nheart-beat:0,0\n\n\0");
    broker.push(
        "MESSAGE\ndestination:/notification/readingResult/meter-test\nsubscription:sub-2\nmessage-id:1\n\n{\"currentUsage\":1.23,\"currentCost\":4.56,\"totalBill\":7.89,\"timestamp\":1700000000}\n\0",
    );
    broker.push("MESSAGE\ndestination:/notification/alert\n\nnot json at all\n\0");
    broker.push(
        "MESSAGE\ndestination:/notification/alert\nsubscription:sub-0\nmessage-id:2\n\n{\"message\":\"overload\"}\n\0",
    );

    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Reading(ReadingEvent::new(1.23, 4.56, 7.89).at(1_700_000_000.0))
    );
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Alert(AlertEvent::new("overload"))
    );
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test]
async fn test_send_reading_reaches_broker_after_handshake() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(100));
    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);

    assert!(client.send_reading(4.2));

    let frames = texts(broker.next_frames(HANDSHAKE_FRAMES + 1).await);
    assert_eq!(frames[..HANDSHAKE_FRAMES], expected_handshake()[..]);
    let send = &frames[HANDSHAKE_FRAMES];
    assert!(send.starts_with("SEND\ndestination:/app/meterReading\nclientId:meter-test\n"));
    let body: serde_json::Value = serde_json::from_str(extract_json(send).unwrap()).unwrap();
    assert_eq!(body["currentUsage"].as_f64(), Some(4.2));

    client.disconnect();
}

#[tokio::test]
async fn test_reconnects_after_transport_failure_with_same_subscriptions() {
    let delay = Duration::from_millis(200);
    let mut broker = MockBroker::start(Behavior::CloseFirstAfter(HANDSHAKE_FRAMES)).await;
    let (client, mut events) = MeterClient::new(broker.settings(delay.as_millis() as u64));
    client.connect().unwrap();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    let first = broker.next_frames(HANDSHAKE_FRAMES).await;
    assert!(first.iter().all(|(connection, _)| *connection == 1));

    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);
    let lost_at = Instant::now();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    let second = broker.next_frames(HANDSHAKE_FRAMES).await;
    assert!(lost_at.elapsed() >= delay / 2);
    assert!(second.iter().all(|(connection, _)| *connection == 2));
    assert_eq!(broker.accepted(), 2);

    // Byte-identical subscriptions across connection epochs.
    assert_eq!(texts(first), texts(second));

    // The second connection stays up: no further reconnect.
    tokio::time::sleep(delay * 3).await;
    assert_eq!(broker.accepted(), 2);
    assert_eq!(client.state(), ConnectionState::Connected);

    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_during_backoff_prevents_reconnect() {
    let mut broker = MockBroker::start(Behavior::CloseAfter(HANDSHAKE_FRAMES)).await;
    let (client, mut events) = MeterClient::new(broker.settings(300));
    client.connect().unwrap();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;
    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);

    // The supervisor is now sleeping in backoff.
    client.disconnect();
    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(broker.accepted(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_while_connected_stops_for_good() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(50));
    let mut states = client.state_changes();
    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;

    client.disconnect();

    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ConnectionState::Disconnected),
    )
    .await
    .expect("state never returned to Disconnected")
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(broker.accepted(), 1);

    assert!(!client.send_reading(1.0));
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Alert(AlertEvent::unreachable())
    );
}

#[tokio::test]
async fn test_connect_twice_opens_one_connection() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(100));

    client.connect().unwrap();
    client.connect().unwrap();

    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(broker.accepted(), 1);

    client.disconnect();
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(50));

    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;
    client.disconnect();
    assert_eq!(next_event(&mut events).await, ClientEvent::Disconnected);

    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    let frames = broker.next_frames(HANDSHAKE_FRAMES).await;
    assert!(frames.iter().all(|(connection, _)| *connection == 2));

    client.disconnect();
}

#[tokio::test]
async fn test_unreachable_broker_is_retried_and_readings_alert() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut settings = crate::config::Settings::default();
    settings.tls.mode = crate::config::TlsMode::None;
    settings.broker.port = port;
    settings.client.reconnect_delay_ms = 20;
    let (client, mut events) = MeterClient::new(settings);
    let mut states = client.state_changes();
    client.connect().unwrap();

    // Observed transitions may coalesce; retries every 20ms still show
    // several distinct connection attempts well within the deadline.
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut attempts = 0;
        while attempts < 2 {
            states.changed().await.unwrap();
            if *states.borrow_and_update() == ConnectionState::Connecting {
                attempts += 1;
            }
        }
    })
    .await
    .expect("supervisor stopped retrying");

    assert!(!client.send_reading(9.9));
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Alert(AlertEvent::unreachable())
    );

    client.disconnect();
}

#[tokio::test]
async fn test_disconnect_while_event_queue_is_full() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let mut settings = broker.settings(50);
    settings.client.event_buffer = 1;
    // Events are never read: `Connected` takes the only slot.
    let (client, _events) = MeterClient::new(settings);
    let mut states = client.state_changes();
    client.connect().unwrap();

    broker.next_frames(HANDSHAKE_FRAMES).await;
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ConnectionState::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();

    broker.push("MESSAGE\ndestination:/notification/alert\n\n{\"message\":\"overload\"}\n\0");
    tokio::time::sleep(Duration::from_millis(200)).await;

    client.disconnect();
    tokio::time::timeout(
        Duration::from_secs(2),
        states.wait_for(|state| *state == ConnectionState::Disconnected),
    )
    .await
    .expect("stop blocked behind a full event queue")
    .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(broker.accepted(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_heartbeat_sent_while_idle() {
    let mut broker = MockBroker::start(Behavior::Hold).await;
    let (client, mut events) = MeterClient::new(broker.settings(100));
    client.connect().unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Connected);
    broker.next_frames(HANDSHAKE_FRAMES).await;
    assert_eq!(broker.heartbeats(), 0);

    tokio::time::sleep(HEARTBEAT_INTERVAL + Duration::from_millis(500)).await;
    assert_eq!(broker.heartbeats(), 1);
    assert_eq!(broker.accepted(), 1);

    client.disconnect();
}
