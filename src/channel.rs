/// file: src/channel.rs
/// description: realtime channel client with fixed-delay reconnection and event dispatch
/// reference: https://docs.rs/tokio-tungstenite/latest/tokio_tungstenite/

use crate::{
    bus::{EventBus, SubscriptionId},
    client_state::{ClientState, ConnectionState, ReconnectStep},
    config::ChannelConfig,
    error::{DashboardError, Result},
    events::{ChannelEvent, EventSender},
    monitoring::{
        CHANNEL_MESSAGES_COUNTER, CONNECTED_GAUGE, DECODE_FAILURE_COUNTER, RECONNECT_COUNTER,
    },
    types::{InboundMessage, OutboundMessage},
};
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::{pin::Pin, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::sleep,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};
use url::Url;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = DashboardError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// An open full-duplex text channel. The stream ending means the peer
/// closed the connection.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &Url) -> Result<Transport>;
}

/// WebSocket transport over tokio-tungstenite. Only text frames reach the
/// client; ping/pong is answered by the library.
pub struct WsConnector {
    timeout: Duration,
}

impl WsConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Transport> {
        let (ws_stream, _) = tokio::time::timeout(self.timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| DashboardError::Timeout)?
            .map_err(|e| {
                error!("Failed to connect to WebSocket: {}", e);
                DashboardError::WebSocketError(e)
            })?;

        info!("WebSocket connection established to {}", url);

        let (write, read) = ws_stream.split();
        let sink = write
            .sink_map_err(DashboardError::from)
            .with(|text: String| future::ok::<Message, DashboardError>(Message::Text(text.into())));
        let stream = read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(data)) => {
                    warn!("Binary messages not currently supported ({} bytes)", data.len());
                    None
                }
                Ok(Message::Close(frame)) => {
                    debug!("Received close frame: {:?}", frame);
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(DashboardError::from(e))),
            })
        });

        Ok(Transport {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

// Best-effort outbound queue per connection; a full queue drops the frame.
const OUTBOUND_CAPACITY: usize = 64;

struct Session {
    client: ClientState,
    outbound: Option<mpsc::Sender<String>>,
    shutdown: Option<watch::Sender<bool>>,
    driver: Option<JoinHandle<()>>,
    /// `connect()` arrived while a user close was still winding down.
    reconnect_pending: bool,
}

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    bus: Arc<EventBus>,
    events: Option<EventSender>,
    session: Mutex<Session>,
}

enum SessionEnd {
    ByUser,
    Closed,
    Failed(DashboardError),
}

/// Single logical connection to the realtime endpoint plus the
/// subscription registry its inbound events are routed through. Cloning
/// shares the same connection.
#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

impl ChannelClient {
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                bus: Arc::new(EventBus::new()),
                events,
                session: Mutex::new(Session {
                    client: ClientState::new(),
                    outbound: None,
                    shutdown: None,
                    driver: None,
                    reconnect_pending: false,
                }),
            }),
        }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.inner.bus.clone()
    }

    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(event, handler)
    }

    pub fn subscribe_typed<T, F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe_typed(event, handler)
    }

    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(event, id)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.session.lock().client.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.session.lock().client.reconnect_attempts
    }

    pub fn connection_id(&self) -> Option<String> {
        self.inner.session.lock().client.connection_id.clone()
    }

    pub fn total_messages(&self) -> u64 {
        self.inner.session.lock().client.total_messages_received
    }

    /// Opens the connection. A no-op while a connection is opening, open,
    /// or waiting to reconnect. Called while a `disconnect()` is still
    /// closing, it reopens once the close completes.
    pub fn connect(&self) {
        let mut session = self.inner.session.lock();
        let driver_alive = session.driver.as_ref().is_some_and(|h| !h.is_finished());
        if driver_alive && session.shutdown.is_none() {
            debug!("connect() queued behind a closing connection");
            session.reconnect_pending = true;
            return;
        }
        if driver_alive || !session.client.begin_connect() {
            debug!(
                "connect() ignored, channel is {:?}",
                session.client.state
            );
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        session.shutdown = Some(shutdown_tx);
        session.driver = Some(tokio::spawn(run_driver(self.inner.clone(), shutdown_rx)));
    }

    /// Closes the connection on the user's behalf. No reconnect follows,
    /// including one that was already waiting out its delay.
    pub fn disconnect(&self) {
        let mut session = self.inner.session.lock();
        session.client.closed_by_user = true;
        session.reconnect_pending = false;
        match session.shutdown.take() {
            Some(shutdown) => {
                info!("Closing channel connection");
                let _ = shutdown.send(true);
            }
            None => debug!("disconnect() with no live connection"),
        }
    }

    /// Sends `{event, data}` if connected; otherwise the frame is dropped
    /// with a warning. There is no queueing across reconnects.
    pub fn send<T: Serialize>(&self, event: &str, data: &T) {
        let outbound = {
            let session = self.inner.session.lock();
            if session.client.state != ConnectionState::Connected {
                warn!(event, "WebSocket not connected, cannot send message");
                return;
            }
            session.outbound.clone()
        };
        let Some(outbound) = outbound else {
            warn!(event, "WebSocket not connected, cannot send message");
            return;
        };

        let frame = serde_json::to_value(data)
            .and_then(|data| serde_json::to_string(&OutboundMessage::new(event, data)));
        match frame {
            Ok(frame) => {
                if let Err(e) = outbound.try_send(frame) {
                    warn!(event, "Dropping outbound message: {}", e);
                }
            }
            Err(e) => warn!(event, "Failed to serialize outbound message: {}", e),
        }
    }

}

impl Inner {
    fn emit(&self, event: ChannelEvent) {
        if let Some(events) = &self.events
            && let Err(e) = events.try_send(event)
        {
            debug!("Status event dropped: {}", e);
        }
    }

    fn on_message(&self, raw: &str) {
        CHANNEL_MESSAGES_COUNTER.increment(1);
        self.session.lock().client.record_message();

        match serde_json::from_str::<InboundMessage>(raw) {
            Ok(message) => {
                trace!(event = %message.event, "Dispatching inbound message");
                let outcome = self.bus.publish(&message.event, &message.payload);
                trace!(
                    event = %message.event,
                    delivered = outcome.delivered,
                    failed = outcome.failed,
                    "Dispatch complete"
                );
            }
            Err(e) => {
                DECODE_FAILURE_COUNTER.increment(1);
                warn!(
                    "WebSocket message parse error: {}. Message: {}",
                    e,
                    raw.chars().take(100).collect::<String>()
                );
            }
        }
    }
}

async fn run_driver(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    while drive_connection(&inner, &mut shutdown).await {
        // closed by the user; reopen only if connect() was called meanwhile
        let mut session = inner.session.lock();
        session.outbound = None;
        session.client.mark_disconnected();
        info!("Channel closed by user");
        inner.emit(ChannelEvent::Disconnected { by_user: true });

        if !std::mem::take(&mut session.reconnect_pending) {
            session.driver = None;
            return;
        }
        session.client.begin_connect();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        session.shutdown = Some(shutdown_tx);
        shutdown = shutdown_rx;
        info!("Reopening channel after close");
    }
}

/// Runs connect/reconnect cycles until the user closes the channel
/// (returns true) or the reconnect budget runs out (returns false).
async fn drive_connection(inner: &Inner, shutdown: &mut watch::Receiver<bool>) -> bool {
    let url = inner.config.url.clone();
    let max = inner.config.max_reconnects;
    let delay = inner.config.reconnect_delay;

    loop {
        let attempt = inner.session.lock().client.reconnect_attempts;
        inner.emit(ChannelEvent::Connecting {
            url: url.to_string(),
            attempt,
        });

        let opened = tokio::select! {
            result = inner.connector.connect(&url) => Some(result),
            _ = shutdown.changed() => None,
        };

        match opened {
            None => return true,
            Some(Ok(transport)) => {
                let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
                let connection_id = {
                    let mut session = inner.session.lock();
                    session.outbound = Some(outbound_tx);
                    session.client.reset_connection()
                };
                CONNECTED_GAUGE.set(1.0);
                info!(%connection_id, "WebSocket connected");
                inner.emit(ChannelEvent::Connected { connection_id });

                let end = pump(inner, transport, outbound_rx, shutdown).await;

                {
                    let mut session = inner.session.lock();
                    session.outbound = None;
                    session.client.mark_disconnected();
                }
                CONNECTED_GAUGE.set(0.0);

                match end {
                    SessionEnd::ByUser => return true,
                    SessionEnd::Closed => {
                        info!("WebSocket disconnected");
                        inner.emit(ChannelEvent::Disconnected { by_user: false });
                    }
                    SessionEnd::Failed(e) => {
                        error!("WebSocket stream error: {}", e);
                        inner.emit(ChannelEvent::Disconnected { by_user: false });
                    }
                }
            }
            Some(Err(e)) => {
                error!("WebSocket connection error: {}", e);
                inner.session.lock().client.mark_disconnected();
                inner.emit(ChannelEvent::ConnectionFailed(e.to_string()));
            }
        }

        let step = {
            let mut session = inner.session.lock();
            let step = session.client.next_step(max);
            if matches!(step, ReconnectStep::GiveUp { .. }) {
                session.driver = None;
            }
            step
        };
        match step {
            ReconnectStep::Stop => return true,
            ReconnectStep::GiveUp { attempts } => {
                error!("Max reconnection attempts ({}) reached", attempts);
                inner.emit(ChannelEvent::GaveUp { attempts });
                return false;
            }
            ReconnectStep::Retry { attempt } => {
                RECONNECT_COUNTER.increment(1);
                warn!(
                    "Attempting to reconnect in {:?}... ({}/{})",
                    delay, attempt, max
                );
                inner.emit(ChannelEvent::Reconnecting {
                    attempt,
                    max,
                    delay,
                });

                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown.changed() => return true,
                }
                inner.session.lock().client.state = ConnectionState::Connecting;
            }
        }
    }
}

async fn pump(
    inner: &Inner,
    transport: Transport,
    mut outbound: mpsc::Receiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let Transport {
        mut sink,
        mut stream,
    } = transport;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if let Err(e) = sink.close().await {
                    debug!("Error while closing transport: {}", e);
                }
                return SessionEnd::ByUser;
            }
            Some(frame) = outbound.recv() => {
                if let Err(e) = sink.send(frame).await {
                    return SessionEnd::Failed(e);
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(text)) => inner.on_message(&text),
                Some(Err(e)) => return SessionEnd::Failed(e),
                None => return SessionEnd::Closed,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Server side of an in-memory transport.
    pub struct ServerEnd {
        pub to_client: mpsc::UnboundedSender<Result<String>>,
        pub from_client: mpsc::UnboundedReceiver<String>,
    }

    pub fn memory_transport() -> (Transport, ServerEnd) {
        let (to_client, client_rx) = mpsc::unbounded_channel::<Result<String>>();
        let (client_tx, from_client) = mpsc::unbounded_channel::<String>();

        let sink = futures_util::sink::unfold(client_tx, |tx, frame: String| async move {
            tx.send(frame).map_err(|_| DashboardError::ConnectionClosed)?;
            Ok::<_, DashboardError>(tx)
        });
        let stream = futures_util::stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        (
            Transport {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            },
            ServerEnd {
                to_client,
                from_client,
            },
        )
    }

    /// Hands out scripted transports in order; once the script is used up
    /// every attempt fails.
    #[derive(Default)]
    pub struct ScriptedConnector {
        script: parking_lot::Mutex<VecDeque<Option<Transport>>>,
        calls: AtomicU32,
    }

    impl ScriptedConnector {
        pub fn failing() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn with_script(script: Vec<Option<Transport>>) -> Arc<Self> {
            Arc::new(Self {
                script: parking_lot::Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self, _url: &Url) -> Result<Transport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(Some(transport)) => Ok(transport),
                _ => Err(DashboardError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
            }
        }
    }

    pub fn channel_config(max_reconnects: u32, delay: Duration) -> ChannelConfig {
        ChannelConfig {
            url: Url::parse("ws://localhost:8000/ws").unwrap(),
            reconnect_delay: delay,
            max_reconnects,
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub async fn wait_for(
        rx: &mut crate::events::EventReceiver,
        pred: impl Fn(&ChannelEvent) -> bool,
    ) -> ChannelEvent {
        loop {
            let event = rx.recv().await.expect("status channel closed");
            if pred(&event) {
                return event;
            }
        }
    }
}
