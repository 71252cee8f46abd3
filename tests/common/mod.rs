#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::time::Duration;

use seabattle::{
    Battlefield, Coord, LinkState, Message, NetEvent, NetworkManager, Role, Session,
    SessionConfig, StatusUpdate,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

/// Upper bound for any single network step in tests.
pub const STEP: Duration = Duration::from_secs(5);

/// A legal fleet that leaves 3B and 5C open water.
pub const FLEET_LAYOUT: &[&[&str]] = &[
    &["1J", "2J", "3J", "4J"],
    &["6J", "7J", "8J"],
    &["10F", "10G", "10H"],
    &["10A", "10B"],
    &["6A", "7A"],
    &["1D", "1E"],
    &["8C"],
    &["5E"],
    &["8E"],
    &["3G"],
];

pub fn at(cell: &str) -> Coord {
    cell.parse().expect("valid cell")
}

pub fn cells(list: &[&str]) -> Vec<Coord> {
    list.iter().map(|cell| at(cell)).collect()
}

/// Every cell of [`FLEET_LAYOUT`].
pub fn fleet_cells() -> Vec<Coord> {
    FLEET_LAYOUT.iter().flat_map(|ship| cells(ship)).collect()
}

/// Place [`FLEET_LAYOUT`] and return everything the session wants sent.
pub fn place_fleet(session: &mut Session) -> Vec<Message> {
    let mut outgoing = Vec::new();
    for ship in FLEET_LAYOUT {
        let outcome = session
            .place_ship(&cells(ship))
            .expect("fleet layout is legal");
        outgoing.extend(outcome.outgoing);
    }
    outgoing
}

/// Hand `messages` to `to` and collect its replies.
pub fn relay(to: &mut Session, messages: Vec<Message>) -> Vec<Message> {
    let mut replies = Vec::new();
    for message in messages {
        let outcome = to.handle(message).expect("message accepted");
        replies.extend(outcome.outgoing);
    }
    replies
}

/// A connected host and client, both in placement.
pub fn connected_pair(first: Role) -> (Session, Session) {
    let mut host = Session::new(Role::Host, "Alice", Battlefield::new()).with_first_turn(first);
    let mut client = Session::new(Role::Client, "Bob", Battlefield::new());
    for session in [&mut host, &mut client] {
        session.begin_network_setup();
        assert!(session.connection_changed(true));
    }
    (host, client)
}

/// A host and client with both fleets placed and the game running.
pub fn started_pair(first: Role) -> (Session, Session) {
    let (mut host, mut client) = connected_pair(first);
    let from_client = place_fleet(&mut client);
    assert!(relay(&mut host, from_client).is_empty());
    let from_host = place_fleet(&mut host);
    assert!(relay(&mut client, from_host).is_empty());
    (host, client)
}

/// Loopback config with short polling so tests run quickly.
pub fn loopback_config(port: u16) -> SessionConfig {
    SessionConfig::join(Ipv4Addr::LOCALHOST, port)
        .with_bind_ip(Ipv4Addr::LOCALHOST)
        .with_accept_poll(Duration::from_millis(50))
        .with_dial_timeout(Duration::from_secs(2))
}

pub async fn next_event(rx: &mut UnboundedReceiver<NetEvent>) -> NetEvent {
    timeout(STEP, rx.recv())
        .await
        .expect("event within timeout")
        .expect("event queue open")
}

pub async fn next_status(rx: &mut UnboundedReceiver<NetEvent>) -> StatusUpdate {
    loop {
        if let NetEvent::Status(status) = next_event(rx).await {
            return status;
        }
    }
}

pub async fn wait_for_state(rx: &mut UnboundedReceiver<NetEvent>, state: LinkState) -> StatusUpdate {
    loop {
        let status = next_status(rx).await;
        if status.state == state {
            return status;
        }
    }
}

/// Everything queued within `window`.
pub async fn drain(rx: &mut UnboundedReceiver<NetEvent>, window: Duration) -> Vec<NetEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = timeout(window, rx.recv()).await {
        events.push(event);
    }
    events
}

pub fn count_disconnects(events: &[NetEvent]) -> usize {
    events
        .iter()
        .filter(|event| {
            matches!(event, NetEvent::Status(status) if status.state == LinkState::Disconnected)
        })
        .count()
}

/// Host on an ephemeral loopback port; returns once it is listening.
pub async fn listening_host() -> (NetworkManager, UnboundedReceiver<NetEvent>, u16) {
    let (mut manager, mut rx) = NetworkManager::new(loopback_config(0));
    let conn = manager.start(Role::Host).await;
    wait_for_state(&mut rx, LinkState::Listening).await;
    let port = conn.local_addr().expect("listening address").port();
    (manager, rx, port)
}

pub async fn joining_client(port: u16) -> (NetworkManager, UnboundedReceiver<NetEvent>) {
    let (mut manager, rx) = NetworkManager::new(loopback_config(port));
    manager.start(Role::Client).await;
    (manager, rx)
}

/// Host and client with the link up on both ends.
pub async fn connected_managers() -> (
    (NetworkManager, UnboundedReceiver<NetEvent>),
    (NetworkManager, UnboundedReceiver<NetEvent>),
) {
    let (host, mut host_rx, port) = listening_host().await;
    let (client, mut client_rx) = joining_client(port).await;
    wait_for_state(&mut host_rx, LinkState::Connected).await;
    wait_for_state(&mut client_rx, LinkState::Connected).await;
    ((host, host_rx), (client, client_rx))
}
