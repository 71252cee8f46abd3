use std::net::Ipv4Addr;
use std::time::Duration;

pub const BOARD_SIZE: usize = 10;

/// Row labels, top to bottom. Columns are labelled `1` through `10`.
pub const ROW_LABELS: [&str; BOARD_SIZE] = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"];

/// Fleet composition as `(ship length, number of ships)`, longest first.
pub const FLEET: [(u8, u8); 4] = [(4, 1), (3, 2), (2, 3), (1, 4)];
pub const MAX_SHIP_LEN: usize = 4;

pub const DEFAULT_PORT: u16 = 12345;

/// Maximum frame payload (10 MiB) to prevent excessive memory allocation.
pub const MAX_FRAME_LEN: u32 = 10 * 1024 * 1024;

/// How long a single `accept` waits before re-checking for a stop request.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long one frame write may stall before the link is considered lost.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `shutdown` waits for the receive loop before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Runtime knobs for one network session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interface the host listens on.
    pub bind_ip: Ipv4Addr,
    /// Port the host listens on and the client dials.
    pub port: u16,
    /// Host address the client dials.
    pub peer_ip: Ipv4Addr,
    pub accept_poll: Duration,
    pub dial_timeout: Duration,
    /// Upper bound on a single frame write to a peer that stopped reading.
    pub send_timeout: Duration,
    pub max_frame_len: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_ip: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_PORT,
            peer_ip: Ipv4Addr::LOCALHOST,
            accept_poll: ACCEPT_POLL_INTERVAL,
            dial_timeout: DIAL_TIMEOUT,
            send_timeout: SEND_TIMEOUT,
            max_frame_len: MAX_FRAME_LEN,
        }
    }
}

impl SessionConfig {
    /// Configuration for hosting on `port` on all interfaces.
    pub fn host(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Configuration for joining the host at `peer_ip:port`.
    pub fn join(peer_ip: Ipv4Addr, port: u16) -> Self {
        Self {
            peer_ip,
            port,
            ..Self::default()
        }
    }

    pub fn with_bind_ip(mut self, bind_ip: Ipv4Addr) -> Self {
        self.bind_ip = bind_ip;
        self
    }

    pub fn with_accept_poll(mut self, accept_poll: Duration) -> Self {
        self.accept_poll = accept_poll;
        self
    }

    pub fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }
}

/// Number of ships of `length` the fleet contains, zero for lengths not in it.
pub fn ships_of_length(length: u8) -> u8 {
    FLEET
        .iter()
        .find(|(len, _)| *len == length)
        .map(|(_, count)| *count)
        .unwrap_or(0)
}

/// Total number of ships in a complete fleet.
pub fn fleet_size() -> usize {
    FLEET.iter().map(|(_, count)| *count as usize).sum()
}
