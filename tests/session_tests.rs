mod common;

use common::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use seabattle::protocol::{GameStart, NewGameResponse, Shot, ShotResult};
use seabattle::{
    ActionError, Battlefield, CellState, CellView, EngineError, GameEvent, GamePhase, Message,
    ProtocolWarning, Role, Session,
};

fn shot_result(message: &Message) -> &ShotResult {
    match message {
        Message::ShotResult(result) => result,
        other => panic!("expected a shot result, got {other:?}"),
    }
}

/// `shooter` fires at `cell`; returns the defender's reply.
fn exchange(shooter: &mut Session, defender: &mut Session, cell: &str) -> ShotResult {
    let shot = shooter.fire(at(cell)).expect("shot allowed");
    let reply = defender.handle(shot).expect("shot accepted");
    assert_eq!(reply.outgoing.len(), 1);
    let result = shot_result(&reply.outgoing[0]).clone();
    shooter
        .handle(reply.outgoing[0].clone())
        .expect("result accepted");
    result
}

#[test]
fn miss_passes_the_turn_on_both_sides() {
    let (mut host, mut client) = started_pair(Role::Host);
    assert_eq!(host.turn(), Some(Role::Host));
    assert_eq!(client.turn(), Some(Role::Host));

    let shot = host.fire(at("5C")).unwrap();
    let reply = client.handle(shot).unwrap();
    assert_eq!(client.turn(), Some(Role::Client));
    assert!(reply.events.contains(&GameEvent::TurnChanged(Role::Client)));

    let result = shot_result(&reply.outgoing[0]).clone();
    assert_eq!(result.cell_state, CellState::Miss);
    assert_eq!(result.message, "Miss at 5C.");
    assert_eq!((result.x.as_str(), result.y.as_str()), ("5", "C"));

    let resolved = host.handle(reply.outgoing[0].clone()).unwrap();
    assert_eq!(host.turn(), Some(Role::Client));
    assert!(resolved.events.contains(&GameEvent::TurnChanged(Role::Client)));
    assert_eq!(host.opponent_view().get(at("5C")), CellView::Miss);
}

#[test]
fn hit_keeps_the_turn_with_the_shooter() {
    let (mut host, mut client) = started_pair(Role::Host);
    let result = exchange(&mut host, &mut client, "1J");
    assert_eq!(result.cell_state, CellState::Hit);
    assert_eq!(result.message, "Hit at 1J!");
    assert_eq!(host.turn(), Some(Role::Host));
    assert_eq!(client.turn(), Some(Role::Host));
    assert_eq!(client.own_view().get(at("1J")), CellView::Hit);
}

#[test]
fn sinking_reports_the_ship_and_marks_it() {
    let (mut host, mut client) = started_pair(Role::Host);
    exchange(&mut host, &mut client, "6A");
    let result = exchange(&mut host, &mut client, "7A");
    assert_eq!(result.cell_state, CellState::Killed);
    assert_eq!(result.ship_sunk_id.as_deref(), Some("2-6A7A"));
    assert_eq!(result.message, "Hit at 7A! Ship 2-6A7A sunk!");
    assert_eq!(host.opponent_view().get(at("6A")), CellView::Killed);
    assert_eq!(host.opponent_board().sunk_count(), 1);
    assert_eq!(host.turn(), Some(Role::Host));
}

#[test]
fn shot_during_own_turn_is_a_desync() {
    let (mut host, _client) = started_pair(Role::Host);
    let before = host.own_view();
    let warning = host.handle(Message::Shot(Shot::at(at("1J")))).unwrap_err();
    assert!(matches!(warning, ProtocolWarning::Desync(_)));
    assert_eq!(host.own_view(), before);
    assert_eq!(host.turn(), Some(Role::Host));
}

#[test]
fn repeated_shot_is_a_desync() {
    let (mut host, mut client) = started_pair(Role::Host);
    exchange(&mut host, &mut client, "1J");
    let before = client.own_view();
    let warning = client.handle(Message::Shot(Shot::at(at("1J"))));
    assert!(matches!(warning, Err(ProtocolWarning::Desync(_))));
    assert_eq!(client.own_view(), before);
}

#[test]
fn bad_shot_coordinates_are_invalid() {
    let (_host, mut client) = started_pair(Role::Host);
    let shot = Message::Shot(Shot {
        x: "11".into(),
        y: "A".into(),
    });
    assert!(matches!(
        client.handle(shot),
        Err(ProtocolWarning::Invalid { kind: "shot", .. })
    ));
}

#[test]
fn redelivered_result_is_ignored() {
    let (mut host, mut client) = started_pair(Role::Host);

    let shot = host.fire(at("8C")).unwrap();
    let reply = client.handle(shot).unwrap();
    let kill = reply.outgoing[0].clone();
    host.handle(kill.clone()).unwrap();
    assert_eq!(host.opponent_board().sunk_count(), 1);

    let again = host.handle(kill).unwrap();
    assert!(again.events.is_empty() && again.outgoing.is_empty());
    assert_eq!(host.opponent_board().sunk_count(), 1);

    let shot = host.fire(at("5C")).unwrap();
    let reply = client.handle(shot).unwrap();
    let miss = reply.outgoing[0].clone();
    host.handle(miss.clone()).unwrap();
    assert_eq!(host.turn(), Some(Role::Client));
    host.handle(miss).unwrap();
    assert_eq!(host.turn(), Some(Role::Client));
}

#[test]
fn result_without_a_shot_is_a_desync() {
    let (mut host, _client) = started_pair(Role::Host);
    let stray = Message::ShotResult(ShotResult {
        x: "2".into(),
        y: "B".into(),
        cell_state: CellState::Hit,
        ship_sunk_id: None,
        game_over: false,
        message: "Hit at 2B!".into(),
    });
    assert!(matches!(host.handle(stray), Err(ProtocolWarning::Desync(_))));
    assert_eq!(host.opponent_board().state_at(at("2B")), None);
}

#[test]
fn result_for_another_cell_is_a_desync() {
    let (mut host, mut client) = started_pair(Role::Host);
    host.fire(at("5C")).unwrap();
    let reply = client.handle(Message::Shot(Shot::at(at("5C")))).unwrap();
    let mut wrong = shot_result(&reply.outgoing[0]).clone();
    wrong.x = "6".into();
    assert!(matches!(
        host.handle(Message::ShotResult(wrong)),
        Err(ProtocolWarning::Desync(_))
    ));
    assert_eq!(host.pending_shot(), Some(at("5C")));
}

#[test]
fn shots_before_the_game_are_unexpected() {
    let (_host, mut client) = connected_pair(Role::Host);
    let warning = client.handle(Message::Shot(Shot::at(at("1A")))).unwrap_err();
    assert_eq!(
        warning,
        ProtocolWarning::Unexpected {
            kind: "shot",
            phase: GamePhase::Placement
        }
    );
}

#[test]
fn host_opens_the_game_once_both_are_ready() {
    let (mut host, mut client) = connected_pair(Role::Client);

    let from_host = place_fleet(&mut host);
    assert_eq!(host.phase(), GamePhase::PreGameReady);
    assert!(from_host
        .iter()
        .all(|m| matches!(m, Message::ShipPlacement(_))));
    assert!(relay(&mut client, from_host).is_empty());
    assert!(client.opponent_ready());
    assert_eq!(client.opponent_name(), Some("Alice"));

    let from_client = place_fleet(&mut client);
    assert_eq!(client.phase(), GamePhase::PreGameReady);
    let to_client = relay(&mut host, from_client);
    assert_eq!(
        to_client,
        vec![Message::GameStart(GameStart {
            starting_player_index: 1
        })]
    );
    assert_eq!(host.phase(), GamePhase::InProgress);
    assert_eq!(host.turn(), Some(Role::Client));

    relay(&mut client, to_client);
    assert_eq!(client.phase(), GamePhase::InProgress);
    assert!(client.is_my_turn());
}

#[test]
fn game_start_rules() {
    let (mut host, mut client) = connected_pair(Role::Host);
    let start = Message::GameStart(GameStart {
        starting_player_index: 0,
    });

    assert!(matches!(
        client.handle(start.clone()),
        Err(ProtocolWarning::Unexpected { .. })
    ));

    place_fleet(&mut host);
    assert!(matches!(
        host.handle(start.clone()),
        Err(ProtocolWarning::Desync(_))
    ));

    place_fleet(&mut client);
    let bogus = Message::GameStart(GameStart {
        starting_player_index: 7,
    });
    assert!(matches!(
        client.handle(bogus),
        Err(ProtocolWarning::Invalid { .. })
    ));
    assert_eq!(client.phase(), GamePhase::PreGameReady);
    client.handle(start).unwrap();
    assert_eq!(client.turn(), Some(Role::Host));
}

#[test]
fn placement_enforces_the_fleet() {
    let mut lonely = Session::new(Role::Host, "Alice", Battlefield::new());
    assert_eq!(
        lonely.place_ship(&cells(&["1A"])),
        Err(ActionError::WrongPhase(GamePhase::Setup))
    );

    let (mut host, _client) = connected_pair(Role::Host);
    host.place_ship(&cells(&["1A", "2A", "3A", "4A"])).unwrap();
    assert_eq!(
        host.place_ship(&cells(&["1C", "2C", "3C", "4C"])),
        Err(ActionError::LengthExhausted(4))
    );
    assert_eq!(
        host.place_ship(&cells(&["1C", "2C", "3C", "4C", "5C"])),
        Err(ActionError::Engine(EngineError::ShipTooLong(5)))
    );
    assert_eq!(
        host.place_ship(&cells(&["5B"])),
        Err(ActionError::Engine(EngineError::TooClose(at("5B"))))
    );
    assert_eq!(host.placement().total_placed(), 1);
}

#[test]
fn auto_place_completes_the_fleet() {
    let (mut host, _client) = connected_pair(Role::Host);
    host.place_ship(&cells(&["1A", "2A"])).unwrap();
    let mut rng = SmallRng::seed_from_u64(7);
    let outcome = host.auto_place(&mut rng).unwrap();
    assert!(host.placement().is_complete());
    assert_eq!(host.phase(), GamePhase::PreGameReady);
    assert_eq!(host.engine().ship_count(), 10);
    match outcome.outgoing.last() {
        Some(Message::ShipPlacement(p)) => assert!(p.finished_placement),
        other => panic!("expected a placement message, got {other:?}"),
    }
}

#[test]
fn firing_rules() {
    let (mut host, mut client) = started_pair(Role::Host);
    assert_eq!(client.fire(at("1A")), Err(ActionError::NotYourTurn));

    host.fire(at("1J")).unwrap();
    assert_eq!(host.fire(at("2J")), Err(ActionError::ShotPending(at("1J"))));

    let reply = client.handle(Message::Shot(Shot::at(at("1J")))).unwrap();
    host.handle(reply.outgoing[0].clone()).unwrap();
    assert_eq!(host.fire(at("1J")), Err(ActionError::AlreadyTargeted(at("1J"))));
}

#[test]
fn sinking_every_ship_ends_the_game() {
    let (mut host, mut client) = started_pair(Role::Host);
    let targets = fleet_cells();
    let last = targets.len() - 1;
    for (i, cell) in targets.into_iter().enumerate() {
        let result = exchange(&mut host, &mut client, &cell.to_string());
        assert_eq!(result.game_over, i == last);
    }
    assert_eq!(host.phase(), GamePhase::GameOver);
    assert_eq!(client.phase(), GamePhase::GameOver);
    assert_eq!(host.winner(), Some(Role::Host));
    assert_eq!(client.winner(), Some(Role::Host));
    assert_eq!(host.opponent_board().sunk_count(), 10);
    assert_eq!(host.fire(at("1A")), Err(ActionError::WrongPhase(GamePhase::GameOver)));
}

#[test]
fn host_request_wins_a_simultaneous_new_game() {
    let (mut host, mut client) = started_pair(Role::Host);
    let from_host = host.request_new_game().unwrap();
    let from_client = client.request_new_game().unwrap();

    let ignored = host.handle(from_client).unwrap();
    assert!(ignored.events.is_empty());
    assert!(!host.has_incoming_request());

    let surfaced = client.handle(from_host).unwrap();
    assert_eq!(
        surfaced.events,
        vec![GameEvent::NewGameRequested {
            player_name: "Alice".into()
        }]
    );

    let answer = client.answer_new_game(true).unwrap();
    assert_eq!(client.phase(), GamePhase::Placement);
    assert_eq!(
        answer.outgoing,
        vec![Message::NewGameResponse(NewGameResponse { accepted: true })]
    );

    let accepted = host.handle(answer.outgoing[0].clone()).unwrap();
    assert_eq!(accepted.events, vec![GameEvent::NewGameAccepted]);
    assert_eq!(host.phase(), GamePhase::Placement);
    assert_eq!(host.turn(), None);
    assert_eq!(host.placement().total_placed(), 0);
}

#[test]
fn rejected_request_can_be_repeated() {
    let (mut host, mut client) = started_pair(Role::Host);
    let request = client.request_new_game().unwrap();
    assert_eq!(client.request_new_game(), Err(ActionError::RequestPending));

    host.handle(request).unwrap();
    let answer = host.answer_new_game(false).unwrap();
    assert_eq!(host.phase(), GamePhase::InProgress);

    let rejected = client.handle(answer.outgoing[0].clone()).unwrap();
    assert_eq!(rejected.events, vec![GameEvent::NewGameRejected]);
    assert!(client.request_new_game().is_ok());
    assert_eq!(host.answer_new_game(true), Err(ActionError::NoRequest));
}

#[test]
fn unsolicited_new_game_response_is_a_desync() {
    let (mut host, _client) = started_pair(Role::Host);
    let response = Message::NewGameResponse(NewGameResponse { accepted: true });
    assert!(matches!(
        host.handle(response),
        Err(ProtocolWarning::Desync(_))
    ));
    assert_eq!(host.phase(), GamePhase::InProgress);
}
