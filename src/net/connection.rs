use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::common::Role;
use crate::config::{SessionConfig, SHUTDOWN_GRACE};
use crate::error::NetError;
use crate::protocol::Message;
use crate::transport::{FrameReader, FrameWriter, TcpTransport};

use super::{LinkState, NetEvent, StatusUpdate};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One logical link to the peer.
///
/// Owns at most one socket. Lifecycle changes are serialised by the state
/// mutex and each one emits exactly one status event while that mutex is
/// held, so observers see transitions in the order they happened. Frames
/// are written under a separate async mutex so concurrent senders never
/// interleave.
#[derive(Debug)]
pub struct Connection {
    role: Role,
    max_frame_len: u32,
    send_timeout: Duration,
    state: Mutex<LinkState>,
    local: Mutex<Option<SocketAddr>>,
    remote: Mutex<Option<SocketAddr>>,
    writer: AsyncMutex<Option<FrameWriter<OwnedWriteHalf>>>,
    stop: watch::Sender<bool>,
    events: mpsc::UnboundedSender<NetEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    pub fn new(
        role: Role,
        events: mpsc::UnboundedSender<NetEvent>,
        config: &SessionConfig,
    ) -> Arc<Self> {
        let (stop, _) = watch::channel(false);
        Arc::new(Self {
            role,
            max_frame_len: config.max_frame_len,
            send_timeout: config.send_timeout,
            state: Mutex::new(LinkState::Idle),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            writer: AsyncMutex::new(None),
            stop,
            events,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn state(&self) -> LinkState {
        *lock(&self.state)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Address the host is listening on, or the client's end of the socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local)
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *lock(&self.remote)
    }

    /// Whether every background task of this connection has exited.
    pub fn is_finished(&self) -> bool {
        lock(&self.tasks).iter().all(JoinHandle::is_finished)
    }

    pub fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once teardown has been requested, immediately if it
    /// already was.
    pub async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    pub(crate) fn set_local_addr(&self, addr: SocketAddr) {
        *lock(&self.local) = Some(addr);
    }

    pub(crate) fn track(&self, task: JoinHandle<()>) {
        lock(&self.tasks).push(task);
    }

    /// Move to `to` if currently in one of `from`, emitting the status
    /// event. Returns whether the transition happened.
    pub(crate) fn transition(
        &self,
        from: &[LinkState],
        to: LinkState,
        message: impl Into<String>,
    ) -> bool {
        let mut state = lock(&self.state);
        if !from.contains(&*state) {
            return false;
        }
        let message = message.into();
        debug!("{} link {} -> {}: {}", self.role, *state, to, message);
        *state = to;
        let _ = self
            .events
            .send(NetEvent::Status(StatusUpdate::new(to, message)));
        true
    }

    /// Take ownership of an established socket and start receiving.
    ///
    /// Fails with [`NetError::NotConnected`] when the connection was torn
    /// down while the socket was being established; the socket is closed.
    pub(crate) async fn attach(
        self: &Arc<Self>,
        stream: TcpStream,
        peer: SocketAddr,
        message: impl Into<String>,
    ) -> Result<(), NetError> {
        if let Ok(local) = stream.local_addr() {
            lock(&self.local).get_or_insert(local);
        }
        let (reader, writer) = TcpTransport::with_limit(stream, peer, self.max_frame_len).split();
        *self.writer.lock().await = Some(writer);
        *lock(&self.remote) = Some(peer);

        let connectable = [LinkState::Listening, LinkState::Connecting];
        if !self.transition(&connectable, LinkState::Connected, message) {
            self.writer.lock().await.take();
            return Err(NetError::NotConnected);
        }
        info!("{} connected to {}", self.role, peer);
        let receiver = tokio::spawn(receive_loop(Arc::clone(self), reader));
        self.track(receiver);
        Ok(())
    }

    /// Send one message. Safe to call from any number of tasks at once.
    ///
    /// A write that fails, or stalls for longer than the send timeout, tears
    /// the connection down before the error is returned. A write still in
    /// progress when teardown is requested is abandoned with
    /// [`NetError::NotConnected`].
    pub async fn send(&self, message: &Message) -> Result<(), NetError> {
        if !self.is_connected() {
            return Err(NetError::NotConnected);
        }
        let payload = message.to_json()?;
        let mut writer = tokio::select! {
            _ = self.stopped() => return Err(NetError::NotConnected),
            writer = self.writer.lock() => writer,
        };
        let frames = writer.as_mut().ok_or(NetError::NotConnected)?;
        let sent = tokio::select! {
            _ = self.stopped() => Err(NetError::NotConnected),
            sent = timeout(self.send_timeout, frames.send(&payload)) => {
                sent.unwrap_or_else(|_| {
                    Err(NetError::Transport(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "peer stopped reading",
                    )))
                })
            }
        };
        match sent {
            Ok(()) => {
                debug!("{} sent {}", self.role, message.kind());
                Ok(())
            }
            Err(e @ NetError::FrameTooLarge { .. }) => Err(e),
            Err(e) => {
                // Part of a frame may be on the wire, nothing can follow it.
                writer.take();
                drop(writer);
                self.disconnect(format!("Connection lost: {}", e));
                Err(e)
            }
        }
    }

    /// Tear the link down. Idempotent and non-blocking: only the first call
    /// emits a status event, and nothing is joined here, so the receive
    /// loop and the event consumer may call it too.
    pub fn disconnect(&self, reason: impl Into<String>) -> bool {
        let mut state = lock(&self.state);
        if *state == LinkState::Disconnected {
            return false;
        }
        let reason = reason.into();
        info!("{} disconnected: {}", self.role, reason);
        *state = LinkState::Disconnected;
        self.stop.send_replace(true);
        let _ = self.events.send(NetEvent::Status(StatusUpdate::new(
            LinkState::Disconnected,
            reason,
        )));
        true
    }

    /// Disconnect and wait for background tasks to finish, aborting any
    /// that overrun the grace period. Must not be called from those tasks.
    pub async fn shutdown(&self) {
        self.disconnect("Session closed.");
        let tasks: Vec<_> = lock(&self.tasks).drain(..).collect();
        for mut task in tasks {
            if timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("{} task did not stop in time, aborting", self.role);
                task.abort();
            }
        }
    }

    fn emit(&self, event: NetEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

async fn receive_loop(conn: Arc<Connection>, mut reader: FrameReader<OwnedReadHalf>) {
    loop {
        if conn.stop_requested() {
            break;
        }
        let frame = tokio::select! {
            _ = conn.stopped() => break,
            frame = reader.receive() => frame,
        };
        match frame.and_then(|payload| Message::from_json(&payload)) {
            Ok(message) => {
                debug!("{} received {}", conn.role, message.kind());
                if conn.stop_requested() {
                    break;
                }
                if !conn.emit(NetEvent::Message(message)) {
                    conn.disconnect("Event consumer went away.");
                    break;
                }
            }
            Err(e) if e.is_recoverable() => {
                warn!("{} dropped a frame: {}", conn.role, e);
                conn.emit(NetEvent::ProtocolError(e.to_string()));
            }
            Err(NetError::PeerClosed) => {
                conn.disconnect("Connection closed by the remote side.");
                break;
            }
            Err(e @ NetError::FrameTooLarge { .. }) => {
                warn!("{} lost frame sync: {}", conn.role, e);
                conn.emit(NetEvent::ProtocolError(e.to_string()));
                conn.disconnect(format!("Connection lost: {}", e));
                break;
            }
            Err(e) => {
                conn.disconnect(format!("Connection lost: {}", e));
                break;
            }
        }
    }
    match timeout(SHUTDOWN_GRACE, conn.writer.lock()).await {
        Ok(mut writer) => {
            if let Some(mut writer) = writer.take() {
                let _ = writer.close().await;
            }
        }
        Err(_) => warn!("{} writer still busy after the receive loop stopped", conn.role),
    }
    debug!("{} receive loop stopped", conn.role);
}
