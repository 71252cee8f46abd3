//! Interpretation of messages from the peer against local game state.
//!
//! Every handler checks its preconditions before mutating anything, so a
//! rejected message leaves the session exactly as it was.

use log::{debug, warn};

use crate::common::{CellState, Coord, Role};
use crate::engine::GameEngine;
use crate::error::{EngineError, ProtocolWarning};
use crate::protocol::{
    GameStart, Message, NewGameRequest, NewGameResponse, Shot, ShipPlacement, ShotResult,
};

use super::{GameEvent, GamePhase, NewGame, Outcome, PlacementProgress, Session};

/// Text carried in `shot_result.message`.
pub(crate) fn describe_shot(at: Coord, state: CellState, ship_sunk_id: Option<&str>) -> String {
    match (state, ship_sunk_id) {
        (CellState::Miss, _) => format!("Miss at {}.", at),
        (_, Some(id)) => format!("Hit at {}! Ship {} sunk!", at, id),
        (_, None) => format!("Hit at {}!", at),
    }
}

impl<E: GameEngine + Default> Session<E> {
    /// Route one message from the peer.
    pub fn handle(&mut self, message: Message) -> Result<Outcome, ProtocolWarning> {
        let kind = message.kind();
        let result = match message {
            Message::ShipPlacement(p) => self.on_ship_placement(p),
            Message::Shot(s) => self.on_shot(s),
            Message::ShotResult(r) => self.on_shot_result(r),
            Message::GameStart(g) => self.on_game_start(g),
            Message::NewGameRequest(r) => self.on_new_game_request(r),
            Message::NewGameResponse(r) => self.on_new_game_response(r),
        };
        if let Err(warning) = &result {
            warn!("{} ignored {}: {}", self.role, kind, warning);
        }
        result
    }

    fn unexpected(&self, kind: &'static str) -> ProtocolWarning {
        ProtocolWarning::Unexpected {
            kind,
            phase: self.phase,
        }
    }

    fn on_ship_placement(&mut self, placement: ShipPlacement) -> Result<Outcome, ProtocolWarning> {
        let allowed = matches!(
            self.phase,
            GamePhase::NetworkSetup | GamePhase::Placement | GamePhase::PreGameReady
        );
        if !allowed {
            return Err(self.unexpected("ship_placement"));
        }

        let progress = PlacementProgress::from_wire(&placement.ships_placed_count);
        let mut outcome = Outcome::default();
        outcome.event(GameEvent::OpponentPlacement {
            player_name: placement.player_name.clone(),
            ships_placed: progress.total_placed(),
            finished: placement.finished_placement,
        });
        self.opponent_name = Some(placement.player_name);
        self.opponent_placement = progress;

        if placement.finished_placement && !self.opponent_ready {
            self.opponent_ready = true;
            outcome.event(GameEvent::OpponentReady);
            self.maybe_start(&mut outcome);
        }
        Ok(outcome)
    }

    fn on_shot(&mut self, shot: Shot) -> Result<Outcome, ProtocolWarning> {
        if self.phase != GamePhase::InProgress {
            return Err(self.unexpected("shot"));
        }
        if self.turn == Some(self.role) {
            return Err(ProtocolWarning::Desync(format!(
                "shot at {}{} arrived during our own turn",
                shot.x, shot.y
            )));
        }
        let at = shot.coord().map_err(|e| ProtocolWarning::Invalid {
            kind: "shot",
            reason: e.to_string(),
        })?;
        let result = match self.engine.apply_shot(at) {
            Ok(result) => result,
            Err(EngineError::AlreadyTargeted(at)) => {
                return Err(ProtocolWarning::Desync(format!(
                    "opponent fired at {} twice",
                    at
                )))
            }
            Err(e) => {
                return Err(ProtocolWarning::Invalid {
                    kind: "shot",
                    reason: e.to_string(),
                })
            }
        };

        let mut outcome = Outcome::default();
        let message = describe_shot(at, result.cell_state, result.ship_sunk_id.as_deref());
        outcome.send(Message::ShotResult(ShotResult {
            x: at.x(),
            y: at.y().to_string(),
            cell_state: result.cell_state,
            ship_sunk_id: result.ship_sunk_id.clone(),
            game_over: result.game_over,
            message,
        }));
        outcome.event(GameEvent::ShotReceived {
            at,
            outcome: result.cell_state,
            ship_sunk_id: result.ship_sunk_id,
        });

        if result.game_over {
            self.finish(self.role.opponent(), &mut outcome);
        } else if result.cell_state.passes_turn() {
            self.pass_turn(self.role, &mut outcome);
        }
        Ok(outcome)
    }

    fn on_shot_result(&mut self, result: ShotResult) -> Result<Outcome, ProtocolWarning> {
        let at = result.coord().map_err(|e| ProtocolWarning::Invalid {
            kind: "shot_result",
            reason: e.to_string(),
        })?;
        if self.opponent_board.is_resolved(at) && self.pending_shot != Some(at) {
            debug!("{} ignoring repeated result for {}", self.role, at);
            return Ok(Outcome::default());
        }
        if self.phase != GamePhase::InProgress {
            return Err(self.unexpected("shot_result"));
        }
        match self.pending_shot {
            Some(pending) if pending == at => {}
            Some(pending) => {
                return Err(ProtocolWarning::Desync(format!(
                    "result for {} while waiting on {}",
                    at, pending
                )))
            }
            None => {
                return Err(ProtocolWarning::Desync(format!(
                    "result for {} without a pending shot",
                    at
                )))
            }
        }

        self.pending_shot = None;
        self.opponent_board
            .record(at, result.cell_state, result.ship_sunk_id.as_deref());
        let mut outcome = Outcome::default();
        outcome.event(GameEvent::ShotResolved {
            at,
            outcome: result.cell_state,
            message: result.message,
        });

        if result.game_over {
            self.finish(self.role, &mut outcome);
        } else if result.cell_state.passes_turn() {
            self.pass_turn(self.role.opponent(), &mut outcome);
        }
        Ok(outcome)
    }

    fn on_game_start(&mut self, start: GameStart) -> Result<Outcome, ProtocolWarning> {
        if self.phase != GamePhase::PreGameReady {
            return Err(self.unexpected("game_start"));
        }
        if self.role == Role::Host {
            return Err(ProtocolWarning::Desync(
                "the client announced the game start".to_string(),
            ));
        }
        let first =
            Role::from_index(start.starting_player_index).ok_or_else(|| ProtocolWarning::Invalid {
                kind: "game_start",
                reason: format!("no player with index {}", start.starting_player_index),
            })?;
        let mut outcome = Outcome::default();
        self.start_game(first, &mut outcome);
        Ok(outcome)
    }

    fn on_new_game_request(&mut self, request: NewGameRequest) -> Result<Outcome, ProtocolWarning> {
        let mut outcome = Outcome::default();
        if self.new_game == NewGame::Outgoing {
            if self.role == Role::Host {
                debug!("host keeps its own new game request over the client's");
                return Ok(outcome);
            }
            debug!("client withdraws its new game request in favour of the host's");
        }
        self.new_game = NewGame::Incoming(request.player_name.clone());
        outcome.event(GameEvent::NewGameRequested {
            player_name: request.player_name,
        });
        Ok(outcome)
    }

    fn on_new_game_response(
        &mut self,
        response: NewGameResponse,
    ) -> Result<Outcome, ProtocolWarning> {
        if self.new_game != NewGame::Outgoing {
            return Err(ProtocolWarning::Desync(
                "new game response without a request".to_string(),
            ));
        }
        let mut outcome = Outcome::default();
        if response.accepted {
            self.reset();
            outcome.event(GameEvent::NewGameAccepted);
        } else {
            self.new_game = NewGame::None;
            outcome.event(GameEvent::NewGameRejected);
        }
        Ok(outcome)
    }

    fn pass_turn(&mut self, to: Role, outcome: &mut Outcome) {
        self.turn = Some(to);
        outcome.event(GameEvent::TurnChanged(to));
    }

    fn finish(&mut self, winner: Role, outcome: &mut Outcome) {
        self.phase = GamePhase::GameOver;
        self.turn = None;
        self.pending_shot = None;
        self.winner = Some(winner);
        outcome.event(GameEvent::GameOver { winner });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_messages() {
        let at: Coord = "3B".parse().unwrap();
        assert_eq!(describe_shot(at, CellState::Miss, None), "Miss at 3B.");
        assert_eq!(describe_shot(at, CellState::Hit, None), "Hit at 3B!");
        assert_eq!(
            describe_shot(at, CellState::Killed, Some("2-3B4B")),
            "Hit at 3B! Ship 2-3B4B sunk!"
        );
    }
}
