/// file: src/client_state.rs
/// description: Separate connection lifecycle state from the channel driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect budget exhausted; only an explicit `connect()` leaves it.
    GivingUp,
}

/// What the driver does after a connection closes or fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    /// The close was requested by the user.
    Stop,
    GiveUp { attempts: u32 },
    Retry { attempt: u32 },
}

#[derive(Debug)]
pub struct ClientState {
    pub connection_id: Option<String>,
    pub state: ConnectionState,
    pub reconnect_attempts: u32,
    pub closed_by_user: bool,
    pub total_messages_received: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            connection_id: None,
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            closed_by_user: false,
            total_messages_received: 0,
        }
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters `Connecting` unless a connection is already opening or open.
    /// An explicit connect always starts a fresh reconnect budget.
    pub fn begin_connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => false,
            ConnectionState::GivingUp | ConnectionState::Disconnected => {
                self.reconnect_attempts = 0;
                self.closed_by_user = false;
                self.state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// Called once the transport is open. Returns the new connection id.
    pub fn reset_connection(&mut self) -> String {
        let connection_id = uuid::Uuid::new_v4().to_string();
        self.connection_id = Some(connection_id.clone());
        self.state = ConnectionState::Connected;
        self.reconnect_attempts = 0;
        connection_id
    }

    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Fixed-delay policy: retry until `max_reconnects` attempts have been
    /// spent (0 = never give up), counting the attempt before it is made.
    pub fn next_step(&mut self, max_reconnects: u32) -> ReconnectStep {
        if self.closed_by_user {
            return ReconnectStep::Stop;
        }
        if max_reconnects > 0 && self.reconnect_attempts >= max_reconnects {
            self.state = ConnectionState::GivingUp;
            return ReconnectStep::GiveUp {
                attempts: self.reconnect_attempts,
            };
        }
        self.reconnect_attempts += 1;
        ReconnectStep::Retry {
            attempt: self.reconnect_attempts,
        }
    }

    pub fn record_message(&mut self) {
        self.total_messages_received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_is_idempotent_while_opening_or_open() {
        let mut state = ClientState::new();
        assert!(state.begin_connect());
        assert!(!state.begin_connect());
        state.reset_connection();
        assert!(!state.begin_connect());
    }

    #[test]
    fn retries_until_budget_then_gives_up() {
        let mut state = ClientState::new();
        state.begin_connect();
        let steps: Vec<_> = (0..4).map(|_| state.next_step(3)).collect();
        assert_eq!(
            steps,
            vec![
                ReconnectStep::Retry { attempt: 1 },
                ReconnectStep::Retry { attempt: 2 },
                ReconnectStep::Retry { attempt: 3 },
                ReconnectStep::GiveUp { attempts: 3 },
            ]
        );
        assert_eq!(state.state, ConnectionState::GivingUp);

        assert!(state.begin_connect());
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn successful_open_resets_attempts() {
        let mut state = ClientState::new();
        state.begin_connect();
        state.next_step(5);
        state.next_step(5);
        let id = state.reset_connection();
        assert_eq!(state.reconnect_attempts, 0);
        assert_eq!(state.connection_id.as_deref(), Some(id.as_str()));
        assert_eq!(state.state, ConnectionState::Connected);
    }

    #[test]
    fn connect_after_user_close_gets_fresh_budget() {
        let mut state = ClientState::new();
        state.begin_connect();
        state.next_step(5);
        state.next_step(5);
        state.closed_by_user = true;
        state.mark_disconnected();

        assert!(state.begin_connect());
        assert_eq!(state.reconnect_attempts, 0);
        assert!(!state.closed_by_user);
    }

    #[test]
    fn user_close_never_retries() {
        let mut state = ClientState::new();
        state.begin_connect();
        state.closed_by_user = true;
        assert_eq!(state.next_step(0), ReconnectStep::Stop);
        assert_eq!(state.reconnect_attempts, 0);
    }

    #[test]
    fn zero_budget_retries_forever() {
        let mut state = ClientState::new();
        for attempt in 1..=50 {
            assert_eq!(state.next_step(0), ReconnectStep::Retry { attempt });
        }
    }
}
