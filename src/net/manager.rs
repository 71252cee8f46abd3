use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::common::Role;
use crate::config::SessionConfig;
use crate::error::NetError;
use crate::protocol::Message;
use crate::transport::TcpTransport;

use super::{addrs, Connection, LinkState, NetEvent};

/// Establishes and owns the current [`Connection`].
///
/// Host and client share this type; [`Role`] picks between listening and
/// dialing. All connections created by one manager report into the same
/// event queue.
pub struct NetworkManager {
    config: SessionConfig,
    events: mpsc::UnboundedSender<NetEvent>,
    current: Option<Arc<Connection>>,
}

impl NetworkManager {
    pub fn new(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<NetEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                events,
                current: None,
            },
            rx,
        )
    }

    /// Tear down any previous connection, then start hosting or joining in
    /// the background. Progress is reported through status events.
    pub async fn start(&mut self, role: Role) -> Arc<Connection> {
        if let Some(previous) = self.current.take() {
            previous.disconnect("Starting a new session.");
            previous.shutdown().await;
        }
        let conn = Connection::new(role, self.events.clone(), &self.config);
        let config = self.config.clone();
        let task = match role {
            Role::Host => tokio::spawn(host(Arc::clone(&conn), config)),
            Role::Client => tokio::spawn(join(Arc::clone(&conn), config)),
        };
        conn.track(task);
        self.current = Some(Arc::clone(&conn));
        conn
    }

    pub fn connection(&self) -> Option<&Arc<Connection>> {
        self.current.as_ref()
    }

    pub fn state(&self) -> LinkState {
        self.current
            .as_ref()
            .map(|conn| conn.state())
            .unwrap_or(LinkState::Idle)
    }

    pub async fn send(&self, message: &Message) -> Result<(), NetError> {
        match &self.current {
            Some(conn) => conn.send(message).await,
            None => Err(NetError::NotConnected),
        }
    }

    pub fn disconnect(&self, reason: impl Into<String>) -> bool {
        self.current
            .as_ref()
            .map(|conn| conn.disconnect(reason))
            .unwrap_or(false)
    }

    /// Disconnect and wait for the background tasks to exit.
    pub async fn shutdown(&mut self) {
        if let Some(conn) = self.current.take() {
            conn.shutdown().await;
        }
    }
}

impl Drop for NetworkManager {
    fn drop(&mut self) {
        if let Some(conn) = &self.current {
            conn.disconnect("Session closed.");
        }
    }
}

async fn host(conn: Arc<Connection>, config: SessionConfig) {
    let addr = SocketAddr::from((config.bind_ip, config.port));
    let listener = match TcpTransport::bind(addr) {
        Ok(listener) => listener,
        Err(e) => {
            conn.disconnect(e.to_string());
            return;
        }
    };
    let local = listener.local_addr().unwrap_or(addr);
    conn.set_local_addr(local);

    let ips = addrs::local_ipv4_addrs().await;
    let waiting = format!(
        "Hosting on port {}. Your IPs: {}. Waiting for a player...",
        local.port(),
        addrs::describe(&ips)
    );
    if !conn.transition(&[LinkState::Idle], LinkState::Listening, waiting) {
        return;
    }
    info!("listening on {}", local);

    loop {
        if conn.stop_requested() {
            break;
        }
        let accepted = tokio::select! {
            _ = conn.stopped() => break,
            accepted = timeout(config.accept_poll, listener.accept()) => accepted,
        };
        let (stream, peer) = match accepted {
            Err(_) => continue,
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) if conn.state() == LinkState::Listening => {
                conn.disconnect(format!("Failed to accept a player: {}", e));
                break;
            }
            Ok(Err(e)) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        if conn.state() != LinkState::Listening {
            info!("rejecting second player from {}", peer);
            drop(stream);
            continue;
        }
        let joined = format!("Player connected from {}", peer.ip());
        if conn.attach(stream, peer, joined).await.is_err() {
            break;
        }
    }
    debug!("accept loop on {} stopped", local);
}

async fn join(conn: Arc<Connection>, config: SessionConfig) {
    let addr = SocketAddr::from((config.peer_ip, config.port));
    let dialing = format!("Connecting to {}...", addr);
    if !conn.transition(&[LinkState::Idle], LinkState::Connecting, dialing) {
        return;
    }
    let dialed = tokio::select! {
        _ = conn.stopped() => return,
        dialed = TcpTransport::connect(addr, config.dial_timeout) => dialed,
    };
    match dialed {
        Ok(stream) => {
            let joined = format!("Connected to host {}", addr);
            if let Err(e) = conn.attach(stream, addr, joined).await {
                debug!("dropped late connection to {}: {}", addr, e);
            }
        }
        Err(e) => {
            conn.disconnect(e.to_string());
        }
    }
}
