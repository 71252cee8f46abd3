//! Game state held by one peer and the local actions that change it.
//!
//! A [`Session`] is owned by whoever drains the network event queue. Local
//! player actions are methods here; messages from the peer go through
//! [`Session::handle`]. Both return the messages to send and the events to
//! show, and never touch the network themselves.

use core::fmt;

use log::{debug, info};
use rand::Rng;

use crate::common::{CellState, Coord, Role};
use crate::config::{BOARD_SIZE, FLEET, MAX_SHIP_LEN};
use crate::engine::{Battlefield, BoardView, GameEngine};
use crate::error::{ActionError, EngineError};
use crate::protocol::{GameStart, Message, NewGameRequest, NewGameResponse, Shot, ShipPlacement};

mod opponent;
mod placement;
mod router;

pub use opponent::OpponentBoard;
pub use placement::PlacementProgress;

/// Random positions tried per ship before starting the fleet over.
const AUTO_PLACE_TRIES: usize = 200;
/// Fresh boards tried before giving up on random placement.
const AUTO_PLACE_ROUNDS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Nothing started yet.
    Setup,
    /// Hosting or joining, waiting for the link.
    NetworkSetup,
    Placement,
    /// Own fleet placed, waiting for the opponent or for `game_start`.
    PreGameReady,
    InProgress,
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GamePhase::Setup => "setup",
            GamePhase::NetworkSetup => "network_setup",
            GamePhase::Placement => "placement",
            GamePhase::PreGameReady => "pre_game_ready",
            GamePhase::InProgress => "in_progress",
            GamePhase::GameOver => "game_over",
        })
    }
}

/// Something the player should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    OpponentPlacement {
        player_name: String,
        ships_placed: usize,
        finished: bool,
    },
    OpponentReady,
    GameStarted {
        first: Role,
    },
    /// The opponent shot at our board.
    ShotReceived {
        at: Coord,
        outcome: CellState,
        ship_sunk_id: Option<String>,
    },
    /// The result of our own shot arrived.
    ShotResolved {
        at: Coord,
        outcome: CellState,
        message: String,
    },
    TurnChanged(Role),
    GameOver {
        winner: Role,
    },
    NewGameRequested {
        player_name: String,
    },
    NewGameAccepted,
    NewGameRejected,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::OpponentPlacement {
                player_name,
                ships_placed,
                finished,
            } => {
                if *finished {
                    write!(f, "{} has placed all ships.", player_name)
                } else {
                    write!(f, "{} has placed {} ships.", player_name, ships_placed)
                }
            }
            GameEvent::OpponentReady => f.write_str("Opponent is ready."),
            GameEvent::GameStarted { first } => write!(f, "Game started, {} moves first.", first),
            GameEvent::ShotReceived {
                at,
                outcome,
                ship_sunk_id,
            } => match ship_sunk_id {
                Some(id) => write!(f, "Opponent fired at {}: {}, ship {} sunk.", at, outcome, id),
                None => write!(f, "Opponent fired at {}: {}.", at, outcome),
            },
            GameEvent::ShotResolved { message, .. } => f.write_str(message),
            GameEvent::TurnChanged(role) => write!(f, "Turn: {}.", role),
            GameEvent::GameOver { winner } => write!(f, "Game over, {} wins.", winner),
            GameEvent::NewGameRequested { player_name } => {
                write!(f, "{} wants a new game. Answer with yes or no.", player_name)
            }
            GameEvent::NewGameAccepted => f.write_str("New game started, place your ships."),
            GameEvent::NewGameRejected => f.write_str("New game request declined."),
        }
    }
}

/// Messages to send to the peer and events to show, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub outgoing: Vec<Message>,
    pub events: Vec<GameEvent>,
}

impl Outcome {
    fn send(&mut self, message: Message) {
        self.outgoing.push(message);
    }

    fn event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NewGame {
    None,
    /// We asked and wait for the answer.
    Outgoing,
    /// The peer asked and waits for our answer.
    Incoming(String),
}

/// One peer's view of a networked game.
#[derive(Debug)]
pub struct Session<E = Battlefield> {
    role: Role,
    player_name: String,
    opponent_name: Option<String>,
    phase: GamePhase,
    engine: E,
    placement: PlacementProgress,
    opponent_placement: PlacementProgress,
    opponent_ready: bool,
    opponent_board: OpponentBoard,
    turn: Option<Role>,
    pending_shot: Option<Coord>,
    new_game: NewGame,
    winner: Option<Role>,
    first_turn: Role,
}

impl<E: GameEngine + Default> Session<E> {
    pub fn new(role: Role, player_name: impl Into<String>, engine: E) -> Self {
        Self {
            role,
            player_name: player_name.into(),
            opponent_name: None,
            phase: GamePhase::Setup,
            engine,
            placement: PlacementProgress::new(),
            opponent_placement: PlacementProgress::new(),
            opponent_ready: false,
            opponent_board: OpponentBoard::new(),
            turn: None,
            pending_shot: None,
            new_game: NewGame::None,
            winner: None,
            first_turn: Role::Host,
        }
    }

    /// Which side the host lets move first. Only the host's choice matters.
    pub fn with_first_turn(mut self, first: Role) -> Self {
        self.first_turn = first;
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn opponent_name(&self) -> Option<&str> {
        self.opponent_name.as_deref()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn turn(&self) -> Option<Role> {
        self.turn
    }

    pub fn is_my_turn(&self) -> bool {
        self.turn == Some(self.role)
    }

    pub fn pending_shot(&self) -> Option<Coord> {
        self.pending_shot
    }

    pub fn winner(&self) -> Option<Role> {
        self.winner
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn placement(&self) -> &PlacementProgress {
        &self.placement
    }

    pub fn opponent_placement(&self) -> &PlacementProgress {
        &self.opponent_placement
    }

    pub fn opponent_ready(&self) -> bool {
        self.opponent_ready
    }

    pub fn opponent_board(&self) -> &OpponentBoard {
        &self.opponent_board
    }

    /// Whether the peer is waiting for us to answer a new game request.
    pub fn has_incoming_request(&self) -> bool {
        matches!(self.new_game, NewGame::Incoming(_))
    }

    pub fn own_view(&self) -> BoardView {
        self.engine.board_view(true)
    }

    pub fn opponent_view(&self) -> BoardView {
        self.opponent_board.view()
    }

    /// The network layer has started hosting or joining.
    pub fn begin_network_setup(&mut self) {
        if self.phase == GamePhase::Setup {
            self.phase = GamePhase::NetworkSetup;
        }
    }

    /// React to a connection status change. Returns `true` when placement
    /// was unlocked.
    pub fn connection_changed(&mut self, connected: bool) -> bool {
        let waiting = matches!(self.phase, GamePhase::Setup | GamePhase::NetworkSetup);
        if connected && waiting {
            info!("{} connected, placement unlocked", self.role);
            self.phase = GamePhase::Placement;
            return true;
        }
        false
    }

    /// Place one ship of our fleet and report progress to the peer.
    pub fn place_ship(&mut self, cells: &[Coord]) -> Result<Outcome, ActionError> {
        if self.phase != GamePhase::Placement {
            return Err(ActionError::WrongPhase(self.phase));
        }
        self.check_length(cells.len())?;
        self.engine.place_ship(cells)?;
        self.placement.record(cells.len());

        let mut outcome = Outcome::default();
        outcome.send(self.placement_message());
        self.finish_placement_if_complete(&mut outcome);
        Ok(outcome)
    }

    /// Randomly place every ship still missing. If the board gets boxed in,
    /// the whole fleet is placed again from scratch.
    pub fn auto_place<R: Rng>(&mut self, rng: &mut R) -> Result<Outcome, ActionError> {
        if self.phase != GamePhase::Placement {
            return Err(ActionError::WrongPhase(self.phase));
        }
        for round in 0..AUTO_PLACE_ROUNDS {
            if self.place_remaining(rng) {
                debug!("auto placement finished after {} restarts", round);
                let mut outcome = Outcome::default();
                outcome.send(self.placement_message());
                self.finish_placement_if_complete(&mut outcome);
                return Ok(outcome);
            }
            self.engine = E::default();
            self.placement = PlacementProgress::new();
        }
        Err(ActionError::NoRoom)
    }

    /// Fire at the opponent. The caller sends the returned message; the turn
    /// is only resolved once the `shot_result` comes back.
    pub fn fire(&mut self, at: Coord) -> Result<Message, ActionError> {
        if self.phase != GamePhase::InProgress {
            return Err(ActionError::WrongPhase(self.phase));
        }
        if !self.is_my_turn() {
            return Err(ActionError::NotYourTurn);
        }
        if let Some(pending) = self.pending_shot {
            return Err(ActionError::ShotPending(pending));
        }
        if self.opponent_board.is_resolved(at) {
            return Err(ActionError::AlreadyTargeted(at));
        }
        self.pending_shot = Some(at);
        Ok(Message::Shot(Shot::at(at)))
    }

    pub fn request_new_game(&mut self) -> Result<Message, ActionError> {
        if matches!(self.phase, GamePhase::Setup | GamePhase::NetworkSetup) {
            return Err(ActionError::WrongPhase(self.phase));
        }
        if self.new_game != NewGame::None {
            return Err(ActionError::RequestPending);
        }
        self.new_game = NewGame::Outgoing;
        Ok(Message::NewGameRequest(NewGameRequest {
            player_name: self.player_name.clone(),
        }))
    }

    /// Answer the peer's new game request. Accepting resets the board.
    pub fn answer_new_game(&mut self, accept: bool) -> Result<Outcome, ActionError> {
        if !self.has_incoming_request() {
            return Err(ActionError::NoRequest);
        }
        let mut outcome = Outcome::default();
        outcome.send(Message::NewGameResponse(NewGameResponse { accepted: accept }));
        if accept {
            self.reset();
            outcome.event(GameEvent::NewGameAccepted);
        } else {
            self.new_game = NewGame::None;
        }
        Ok(outcome)
    }

    fn check_length(&self, len: usize) -> Result<(), ActionError> {
        match len {
            0 => Err(EngineError::EmptyShip.into()),
            len if len > MAX_SHIP_LEN => Err(EngineError::ShipTooLong(len).into()),
            len if !self.placement.can_place(len) => Err(ActionError::LengthExhausted(len)),
            _ => Ok(()),
        }
    }

    fn place_remaining<R: Rng>(&mut self, rng: &mut R) -> bool {
        for (len, _) in FLEET {
            while self.placement.remaining_of(len) > 0 {
                if !self.place_random(rng, len as usize) {
                    return false;
                }
                self.placement.record(len as usize);
            }
        }
        true
    }

    fn place_random<R: Rng>(&mut self, rng: &mut R, len: usize) -> bool {
        for _ in 0..AUTO_PLACE_TRIES {
            let horizontal = rng.random::<bool>();
            let (cols, rows) = if horizontal {
                (BOARD_SIZE - len + 1, BOARD_SIZE)
            } else {
                (BOARD_SIZE, BOARD_SIZE - len + 1)
            };
            let col = rng.random_range(0..cols);
            let row = rng.random_range(0..rows);
            let cells: Option<Vec<Coord>> = (0..len)
                .map(|i| {
                    if horizontal {
                        Coord::new(col + i, row)
                    } else {
                        Coord::new(col, row + i)
                    }
                })
                .collect();
            if let Some(cells) = cells {
                if self.engine.place_ship(&cells).is_ok() {
                    return true;
                }
            }
        }
        false
    }

    fn placement_message(&self) -> Message {
        Message::ShipPlacement(ShipPlacement {
            player_name: self.player_name.clone(),
            finished_placement: self.placement.is_complete(),
            ships_placed_count: self.placement.to_wire(),
        })
    }

    fn finish_placement_if_complete(&mut self, outcome: &mut Outcome) {
        if self.placement.is_complete() {
            info!("{} fleet placed ({})", self.role, self.placement.summary());
            self.phase = GamePhase::PreGameReady;
            self.maybe_start(outcome);
        }
    }

    /// The host opens the game once both fleets are placed.
    fn maybe_start(&mut self, outcome: &mut Outcome) {
        if self.role != Role::Host || self.phase != GamePhase::PreGameReady || !self.opponent_ready
        {
            return;
        }
        let first = self.first_turn;
        outcome.send(Message::GameStart(GameStart {
            starting_player_index: first.index(),
        }));
        self.start_game(first, outcome);
    }

    fn start_game(&mut self, first: Role, outcome: &mut Outcome) {
        info!("{} game started, {} moves first", self.role, first);
        self.phase = GamePhase::InProgress;
        self.turn = Some(first);
        outcome.event(GameEvent::GameStarted { first });
        outcome.event(GameEvent::TurnChanged(first));
    }

    fn reset(&mut self) {
        info!("{} starting a new game", self.role);
        self.engine = E::default();
        self.placement = PlacementProgress::new();
        self.opponent_placement = PlacementProgress::new();
        self.opponent_ready = false;
        self.opponent_board = OpponentBoard::new();
        self.turn = None;
        self.pending_shot = None;
        self.new_game = NewGame::None;
        self.winner = None;
        self.phase = GamePhase::Placement;
    }
}
