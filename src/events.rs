/// file: src/events.rs
/// description: connection status events, decoupling the channel client from the status indicator
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connecting { url: String, attempt: u32 },
    Connected { connection_id: String },
    ConnectionFailed(String),
    Disconnected { by_user: bool },
    Reconnecting { attempt: u32, max: u32, delay: Duration },
    GaveUp { attempts: u32 },
}

impl ChannelEvent {
    /// Whether the status indicator should show "connected" after this event.
    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelEvent::Connected { .. })
    }
}

// Status events are low volume; a full queue means the indicator is not
// being drained and further events are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type EventSender = mpsc::Sender<ChannelEvent>;
pub type EventReceiver = mpsc::Receiver<ChannelEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
