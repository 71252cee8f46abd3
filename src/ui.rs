//! Player-facing side of a session: the callbacks the network layer reports
//! into and a plain terminal rendering of both boards.

use std::io::{self, Write};

use crate::common::Coord;
use crate::engine::GameEngine;
use crate::net::NetEvent;
use crate::protocol::Message;
use crate::session::{GameEvent, Session};

/// Receives connection and message notifications, always on the task that
/// drains the event queue.
pub trait SessionUi {
    fn on_connection_status(&mut self, connected: bool, message: &str);

    fn on_message(&mut self, message: &Message);

    /// Undecodable frames and desyncs. The connection stays up.
    fn on_protocol_warning(&mut self, warning: &str) {
        log::warn!("{}", warning);
    }
}

/// Dispatch one network event to the matching callback.
pub fn deliver<U: SessionUi + ?Sized>(event: &NetEvent, ui: &mut U) {
    match event {
        NetEvent::Status(status) => ui.on_connection_status(status.connected(), &status.message),
        NetEvent::Message(message) => ui.on_message(message),
        NetEvent::ProtocolError(error) => ui.on_protocol_warning(error),
    }
}

/// A line typed by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Place(Vec<Coord>),
    Auto,
    Fire(Coord),
    Board,
    NewGame,
    Answer(bool),
    Quit,
    Help,
}

pub const HELP: &str = "\
Commands:
  place <cells...>   place a ship, e.g. `place 1A 2A 3A`
  auto               place the remaining ships at random
  fire <cell>        shoot at the opponent, e.g. `fire 3B`
  board              show both boards
  new                ask the opponent for a new game
  yes | no           answer a new game request
  quit               leave the game";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    let cells = |words: std::str::SplitWhitespace<'_>| -> Result<Vec<Coord>, String> {
        words
            .map(|w| w.parse::<Coord>().map_err(|e| e.to_string()))
            .collect()
    };
    match verb.to_ascii_lowercase().as_str() {
        "place" | "p" => {
            let cells = cells(words)?;
            if cells.is_empty() {
                return Err("place needs at least one cell".to_string());
            }
            Ok(Command::Place(cells))
        }
        "auto" => Ok(Command::Auto),
        "fire" | "f" => match cells(words)?.as_slice() {
            [at] => Ok(Command::Fire(*at)),
            _ => Err("fire needs exactly one cell".to_string()),
        },
        "board" | "b" => Ok(Command::Board),
        "new" => Ok(Command::NewGame),
        "yes" | "y" => Ok(Command::Answer(true)),
        "no" | "n" => Ok(Command::Answer(false)),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        "help" | "h" | "?" => Ok(Command::Help),
        other => Err(format!("unknown command `{}`", other)),
    }
}

/// Both boards one under the other, opponent first.
pub fn render_boards<E: GameEngine + Default>(session: &Session<E>) -> String {
    let opponent = session.opponent_name().unwrap_or("Opponent");
    format!(
        "{}'s board:\n{}\nYour board ({}):\n{}",
        opponent,
        session.opponent_view(),
        session.placement().summary(),
        session.own_view()
    )
}

/// Prints everything to stdout.
#[derive(Debug, Default)]
pub struct TerminalUi;

impl TerminalUi {
    pub fn new() -> Self {
        Self
    }

    pub fn show_events(&mut self, events: &[GameEvent]) {
        for event in events {
            println!("{}", event);
        }
    }

    pub fn show_boards<E: GameEngine + Default>(&mut self, session: &Session<E>) {
        println!("{}", render_boards(session));
    }

    pub fn prompt(&mut self) {
        print!("> ");
        let _ = io::stdout().flush();
    }
}

impl SessionUi for TerminalUi {
    fn on_connection_status(&mut self, connected: bool, message: &str) {
        if connected {
            println!("[connected] {}", message);
        } else {
            println!("{}", message);
        }
    }

    fn on_message(&mut self, message: &Message) {
        log::debug!("received {}", message.kind());
    }

    fn on_protocol_warning(&mut self, warning: &str) {
        println!("Warning: {}", warning);
    }
}
