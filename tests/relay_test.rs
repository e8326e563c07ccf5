//! Relay session tests against the in-memory bus

mod common;

use chrono::{TimeZone, Utc};
use common::{transport_pair, ClientEvent};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tickertape::bus::{Envelope, MemoryBus, PriceUpdate, Publisher};
use tickertape::relay::{CloseCode, Relay, RelayExit};
use tickertape::store::PriceStore;
use tokio::time::{sleep, timeout};

const POLL: Duration = Duration::from_millis(20);
const SETTLE: Duration = Duration::from_millis(200);
const WAIT: Duration = Duration::from_secs(5);

fn update(price: rust_decimal::Decimal) -> PriceUpdate {
    PriceUpdate {
        name: "ticker_00".to_string(),
        price,
        created_at: Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap(),
    }
}

async fn spawn_relay(
    bus: Arc<MemoryBus>,
    store: PriceStore,
) -> (
    tokio::task::JoinHandle<RelayExit>,
    tokio::sync::mpsc::Sender<String>,
    tokio::sync::mpsc::Receiver<ClientEvent>,
) {
    let (transport, to_relay, from_relay) = transport_pair();
    let relay = Relay::new(transport, bus, store).poll_interval(POLL);
    let handle = tokio::spawn(relay.run());
    (handle, to_relay, from_relay)
}

#[tokio::test]
async fn test_data_envelope_is_forwarded_and_session_stays_open() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    to_relay.send("ticker_00".to_string()).await.unwrap();
    sleep(SETTLE).await;

    let sent = update(dec!(15));
    bus.publish("ticker_00", &Envelope::data(&sent).unwrap())
        .await
        .unwrap();

    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    let ClientEvent::Text(payload) = event else {
        panic!("expected a forwarded update, got {:?}", event);
    };
    assert_eq!(serde_json::from_str::<PriceUpdate>(&payload).unwrap(), sent);

    // Session is still open: a second update arrives too
    let second = update(dec!(16));
    bus.publish("ticker_00", &Envelope::data(&second).unwrap())
        .await
        .unwrap();
    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    assert!(matches!(event, ClientEvent::Text(_)));

    // Client hangs up; the relay terminates cleanly
    drop(to_relay);
    assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), RelayExit::ClientGone);
}

#[tokio::test]
async fn test_control_envelope_is_skipped() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    to_relay.send("ticker_00".to_string()).await.unwrap();
    sleep(SETTLE).await;

    // A stray control message, then real data
    bus.publish("ticker_00", &Envelope::control("unsubscribe"))
        .await
        .unwrap();
    let sent = update(dec!(7));
    bus.publish("ticker_00", &Envelope::data(&sent).unwrap())
        .await
        .unwrap();

    // Only the data envelope comes through
    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    let ClientEvent::Text(payload) = event else {
        panic!("expected a forwarded update, got {:?}", event);
    };
    assert_eq!(serde_json::from_str::<PriceUpdate>(&payload).unwrap(), sent);

    drop(to_relay);
    assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), RelayExit::ClientGone);
}

#[tokio::test]
async fn test_invalid_payload_closes_with_internal_error() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    to_relay.send("ticker_00".to_string()).await.unwrap();
    sleep(SETTLE).await;

    // A data envelope whose payload fails schema validation
    let bad = Envelope {
        kind: "message".to_string(),
        data: Some(r#"{"price": 15, "created_at": "2022-03-01T00:00:00+00:00"}"#.to_string()),
    };
    bus.publish("ticker_00", &bad).await.unwrap();

    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    assert_eq!(event, ClientEvent::Closed(CloseCode::InternalError));
    assert_eq!(
        timeout(WAIT, handle).await.unwrap().unwrap(),
        RelayExit::Closed(CloseCode::InternalError)
    );
}

#[tokio::test]
async fn test_bus_failure_closes_with_try_again_later() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    to_relay.send("ticker_00".to_string()).await.unwrap();
    sleep(SETTLE).await;

    bus.close_channel("ticker_00").await;

    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    assert_eq!(event, ClientEvent::Closed(CloseCode::TryAgainLater));
    assert_eq!(
        timeout(WAIT, handle).await.unwrap().unwrap(),
        RelayExit::Closed(CloseCode::TryAgainLater)
    );
}

#[tokio::test]
async fn test_disconnect_before_tracking_terminates_cleanly() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    let (handle, to_relay, _from_relay) = spawn_relay(bus, store).await;

    // Client goes away without ever naming a ticker
    drop(to_relay);

    assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), RelayExit::ClientGone);
}

#[tokio::test]
async fn test_gap_fill_page_precedes_live_updates() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    store.create_ticker("ticker_00").await.unwrap();
    for (day, price) in [(1, dec!(1)), (2, dec!(2))] {
        store
            .append_price(
                "ticker_00",
                price,
                Some(Utc.with_ymd_and_hms(2022, 3, day, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();
    }
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    to_relay
        .send(r#"["ticker_00", null]"#.to_string())
        .await
        .unwrap();

    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    let ClientEvent::Text(payload) = event else {
        panic!("expected a gap-fill page, got {:?}", event);
    };
    let page: Vec<PriceUpdate> = serde_json::from_str(&payload).unwrap();
    let prices: Vec<rust_decimal::Decimal> = page.iter().map(|u| u.price).collect();
    assert_eq!(prices, vec![dec!(1), dec!(2)]);

    // Live updates follow on the same session
    sleep(SETTLE).await;
    let live = update(dec!(3));
    bus.publish("ticker_00", &Envelope::data(&live).unwrap())
        .await
        .unwrap();
    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    let ClientEvent::Text(payload) = event else {
        panic!("expected a live update, got {:?}", event);
    };
    assert_eq!(serde_json::from_str::<PriceUpdate>(&payload).unwrap(), live);

    drop(to_relay);
    assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), RelayExit::ClientGone);
}

#[tokio::test]
async fn test_empty_gap_fill_sends_nothing() {
    let bus = Arc::new(MemoryBus::new());
    let store = PriceStore::in_memory().await.unwrap();
    store.create_ticker("ticker_00").await.unwrap();
    store
        .append_price(
            "ticker_00",
            dec!(1),
            Some(Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap()),
        )
        .await
        .unwrap();
    let (handle, to_relay, mut from_relay) = spawn_relay(bus.clone(), store).await;

    // Everything is older than the requested timestamp
    to_relay
        .send(r#"["ticker_00", "2023-01-01T00:00:00+00:00"]"#.to_string())
        .await
        .unwrap();
    sleep(SETTLE).await;

    // No page; the first thing the client sees is the next live update
    let live = update(dec!(2));
    bus.publish("ticker_00", &Envelope::data(&live).unwrap())
        .await
        .unwrap();
    let event = timeout(WAIT, from_relay.recv()).await.unwrap().unwrap();
    assert_eq!(
        event,
        ClientEvent::Text(serde_json::to_string(&live).unwrap())
    );

    drop(to_relay);
    assert_eq!(timeout(WAIT, handle).await.unwrap().unwrap(), RelayExit::ClientGone);
}
