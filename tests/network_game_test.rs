mod common;

use common::*;
use seabattle::{
    Battlefield, CellState, GamePhase, LinkState, NetEvent, NetworkManager, Role, Session,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Process one network event the way the terminal front-end does.
async fn pump(
    manager: &NetworkManager,
    rx: &mut UnboundedReceiver<NetEvent>,
    session: &mut Session,
) -> anyhow::Result<()> {
    match next_event(rx).await {
        NetEvent::Status(status) => {
            if status.state == LinkState::Disconnected {
                anyhow::bail!("link dropped: {}", status.message);
            }
            session.connection_changed(status.connected());
        }
        NetEvent::Message(message) => {
            let outcome = session.handle(message)?;
            for reply in &outcome.outgoing {
                manager.send(reply).await?;
            }
        }
        NetEvent::ProtocolError(e) => anyhow::bail!("protocol error: {}", e),
    }
    Ok(())
}

async fn pump_until(
    manager: &NetworkManager,
    rx: &mut UnboundedReceiver<NetEvent>,
    session: &mut Session,
    done: impl Fn(&Session) -> bool,
) -> anyhow::Result<()> {
    while !done(session) {
        pump(manager, rx, session).await?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn client_miss_over_tcp_hands_the_turn_to_the_host() -> anyhow::Result<()> {
    let (mut host_net, mut host_rx) = NetworkManager::new(loopback_config(0));
    let conn = host_net.start(Role::Host).await;
    let mut host =
        Session::new(Role::Host, "Alice", Battlefield::new()).with_first_turn(Role::Client);
    host.begin_network_setup();
    pump_until(&host_net, &mut host_rx, &mut host, |_| {
        conn.state() == LinkState::Listening
    })
    .await?;
    let port = conn.local_addr().expect("listening address").port();

    let (mut client_net, mut client_rx) = NetworkManager::new(loopback_config(port));
    client_net.start(Role::Client).await;
    let mut client = Session::new(Role::Client, "Bob", Battlefield::new());
    client.begin_network_setup();

    let in_placement = |s: &Session| s.phase() == GamePhase::Placement;
    pump_until(&host_net, &mut host_rx, &mut host, in_placement).await?;
    pump_until(&client_net, &mut client_rx, &mut client, in_placement).await?;

    for message in place_fleet(&mut client) {
        client_net.send(&message).await?;
    }
    pump_until(&host_net, &mut host_rx, &mut host, |s| s.opponent_ready()).await?;

    for message in place_fleet(&mut host) {
        host_net.send(&message).await?;
    }
    assert_eq!(host.phase(), GamePhase::InProgress);
    pump_until(&client_net, &mut client_rx, &mut client, |s| {
        s.phase() == GamePhase::InProgress
    })
    .await?;
    assert_eq!(client.turn(), Some(Role::Client));
    assert_eq!(host.turn(), Some(Role::Client));

    let shot = client.fire(at("3B"))?;
    client_net.send(&shot).await?;
    pump_until(&host_net, &mut host_rx, &mut host, |s| {
        s.turn() == Some(Role::Host)
    })
    .await?;
    pump_until(&client_net, &mut client_rx, &mut client, |s| {
        s.pending_shot().is_none()
    })
    .await?;

    assert_eq!(
        client.opponent_board().state_at(at("3B")),
        Some(CellState::Miss)
    );
    assert_eq!(client.turn(), Some(Role::Host));
    assert_eq!(host.turn(), Some(Role::Host));

    client_net.shutdown().await;
    let status = wait_for_state(&mut host_rx, LinkState::Disconnected).await;
    assert!(!status.connected());
    host_net.shutdown().await;
    Ok(())
}
