use std::net::Ipv4Addr;

use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};

use seabattle::config::DEFAULT_PORT;
use seabattle::ui::{parse_command, Command, TerminalUi, HELP};
use seabattle::{
    deliver, init_logging, Battlefield, GameEvent, LinkState, NetEvent, NetworkManager, Outcome,
    Role, Session, SessionConfig, SessionUi,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a game and wait for a player to join.
    Host {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "Host")]
        name: String,
        /// Place the whole fleet at random once connected.
        #[arg(long)]
        auto_place: bool,
        #[arg(long, help = "Fix RNG seed for reproducible placement (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Join a game hosted on another machine.
    Join {
        /// IPv4 address of the host.
        #[arg(long, default_value_t = Ipv4Addr::LOCALHOST)]
        address: Ipv4Addr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "Player")]
        name: String,
        #[arg(long)]
        auto_place: bool,
        #[arg(long, help = "Fix RNG seed for reproducible placement (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
}

struct Game {
    manager: NetworkManager,
    session: Session<Battlefield>,
    ui: TerminalUi,
    rng: SmallRng,
    auto_place: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let (role, config, name, auto_place, seed) = match cli.command {
        Commands::Host {
            port,
            name,
            auto_place,
            seed,
        } => (Role::Host, SessionConfig::host(port), name, auto_place, seed),
        Commands::Join {
            address,
            port,
            name,
            auto_place,
            seed,
        } => (
            Role::Client,
            SessionConfig::join(address, port),
            name,
            auto_place,
            seed,
        ),
    };
    let rng = if let Some(s) = seed {
        println!("Using fixed seed: {}", s);
        SmallRng::seed_from_u64(s)
    } else {
        let mut seed_rng = rand::rng();
        SmallRng::from_rng(&mut seed_rng)
    };

    let (manager, mut events) = NetworkManager::new(config);
    let mut game = Game {
        manager,
        session: Session::new(role, name, Battlefield::new()),
        ui: TerminalUi::new(),
        rng,
        auto_place,
    };
    game.manager.start(role).await;
    game.session.begin_network_setup();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !game.on_event(event).await {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    if !game.on_line(&line).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    eprintln!("Could not read input: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    game.manager.shutdown().await;
    Ok(())
}

impl Game {
    /// Returns `false` once the session is over.
    async fn on_event(&mut self, event: NetEvent) -> bool {
        deliver(&event, &mut self.ui);
        match event {
            NetEvent::Status(status) => {
                if self.session.connection_changed(status.connected()) {
                    println!("{}", HELP);
                    if self.auto_place {
                        self.run(Command::Auto).await;
                    } else {
                        self.ui.show_boards(&self.session);
                    }
                }
                status.state != LinkState::Disconnected
            }
            NetEvent::Message(message) => {
                match self.session.handle(message) {
                    Ok(outcome) => self.dispatch(outcome).await,
                    Err(warning) => self.ui.on_protocol_warning(&warning.to_string()),
                }
                true
            }
            NetEvent::ProtocolError(_) => true,
        }
    }

    async fn on_line(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Ok(command) => self.run(command).await,
            Err(e) => {
                println!("{}. Type `help` for the list of commands.", e);
                true
            }
        }
    }

    async fn run(&mut self, command: Command) -> bool {
        let placing = matches!(command, Command::Place(_) | Command::Auto);
        let result = match command {
            Command::Place(cells) => self.session.place_ship(&cells),
            Command::Auto => self.session.auto_place(&mut self.rng),
            Command::Fire(at) => self.session.fire(at).map(|shot| Outcome {
                outgoing: vec![shot],
                events: Vec::new(),
            }),
            Command::NewGame => self.session.request_new_game().map(|request| {
                println!("Waiting for the opponent to answer...");
                Outcome {
                    outgoing: vec![request],
                    events: Vec::new(),
                }
            }),
            Command::Answer(accept) => self.session.answer_new_game(accept),
            Command::Board => {
                self.ui.show_boards(&self.session);
                return true;
            }
            Command::Help => {
                println!("{}", HELP);
                return true;
            }
            Command::Quit => {
                self.manager.disconnect("You left the game.");
                return false;
            }
        };
        match result {
            Ok(outcome) => {
                self.dispatch(outcome).await;
                if placing {
                    self.ui.show_boards(&self.session);
                }
            }
            Err(e) => println!("{}", e),
        }
        true
    }

    async fn dispatch(&mut self, outcome: Outcome) {
        for message in &outcome.outgoing {
            if let Err(e) = self.manager.send(message).await {
                println!("Could not send {}: {}", message.kind(), e);
            }
        }
        self.ui.show_events(&outcome.events);
        let board_changed = outcome.events.iter().any(|event| {
            matches!(
                event,
                GameEvent::ShotReceived { .. }
                    | GameEvent::ShotResolved { .. }
                    | GameEvent::GameStarted { .. }
                    | GameEvent::NewGameAccepted
            )
        });
        if board_changed {
            self.ui.show_boards(&self.session);
        }
        if self.session.is_my_turn() && self.session.pending_shot().is_none() && board_changed {
            println!("Your turn. Fire with `fire <cell>`.");
        }
    }
}
