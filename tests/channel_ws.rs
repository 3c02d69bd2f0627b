use futures_util::{SinkExt, StreamExt};
use kaspazof::{
    channel::{ChannelClient, WsConnector},
    client_state::ConnectionState,
    config::ChannelConfig,
    events::{ChannelEvent, EventReceiver, create_event_channel},
    types::PriceUpdate,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use url::Url;

async fn next_matching(
    rx: &mut EventReceiver,
    pred: impl Fn(&ChannelEvent) -> bool,
) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("status channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for channel event")
}

fn client(port: u16) -> (ChannelClient, EventReceiver) {
    let config = ChannelConfig {
        url: Url::parse(&format!("ws://127.0.0.1:{port}/ws")).unwrap(),
        reconnect_delay: Duration::from_millis(50),
        max_reconnects: 3,
        connect_timeout: Duration::from_secs(2),
    };
    let (tx, rx) = create_event_channel();
    let connector = Arc::new(WsConnector::new(config.connect_timeout));
    (ChannelClient::new(config, connector, Some(tx)), rx)
}

#[tokio::test]
async fn price_update_round_trip_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text("not json".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"event":"price_update","payload":{"kaspa_usd":0.0234}}"#.into(),
        ))
        .await
        .unwrap();

        // echo the client's first frame back to the test
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    });

    let (channel, mut events) = client(port);
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    channel.subscribe_typed("price_update", move |update: PriceUpdate| {
        sink.lock().push(update.kaspa_usd);
    });

    channel.connect();
    next_matching(&mut events, ChannelEvent::is_connected).await;
    assert_eq!(channel.state(), ConnectionState::Connected);
    assert!(channel.connection_id().is_some());

    channel.send("subscribe", &serde_json::json!({"topic": "prices"}));
    let outbound = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    let outbound: serde_json::Value = serde_json::from_str(&outbound).unwrap();
    assert_eq!(outbound["event"], "subscribe");
    assert_eq!(outbound["data"]["topic"], "prices");

    tokio::time::timeout(Duration::from_secs(5), async {
        while received.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("price update never dispatched");
    assert_eq!(*received.lock(), vec![0.0234]);
    assert_eq!(channel.total_messages(), 2);

    channel.disconnect();
    next_matching(&mut events, |e| {
        matches!(e, ChannelEvent::Disconnected { by_user: true })
    })
    .await;
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn server_close_triggers_a_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        for _ in 0..2 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let _ = ws.close(None).await;
        }
    });

    let (channel, mut events) = client(port);
    channel.connect();

    next_matching(&mut events, ChannelEvent::is_connected).await;
    next_matching(&mut events, |e| {
        matches!(e, ChannelEvent::Disconnected { by_user: false })
    })
    .await;
    let retry = next_matching(&mut events, |e| {
        matches!(e, ChannelEvent::Reconnecting { .. })
    })
    .await;
    assert!(matches!(retry, ChannelEvent::Reconnecting { attempt: 1, max: 3, .. }));
    next_matching(&mut events, ChannelEvent::is_connected).await;

    channel.disconnect();
}
