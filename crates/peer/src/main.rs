mod config;
mod events;
mod players;
mod runner;
mod script;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::PeerConfig;
use lockstep::{PacketLossSimulation, SessionConfig, TransportConfig};
use players::PlayerList;
use runner::PeerRunner;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "lockstep-peer")]
#[command(about = "Lockstep peer: hosts or joins a session and runs the simulation")]
struct Args {
    #[arg(help = "Number of players (1-4)")]
    num_players: Option<usize>,

    #[arg(help = "One entry per player: a local port, or host:port of a remote peer")]
    players: Vec<String>,

    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(long, default_value_t = 0, help = "Stop after this many frames (0 runs until quit)")]
    frames: u32,

    #[arg(long, default_value_t = 2, help = "Frames rolled back and re-simulated every step")]
    check_distance: u32,

    #[arg(long, default_value_t = 30, help = "Frames each scripted direction is held")]
    hold_frames: u32,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Enable packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let players = PlayerList::parse(args.num_players, &args.players)?;

    let packet_loss = PacketLossSimulation {
        enabled: args.simulate_packet_loss,
        loss_percent: args.loss_percent,
    };

    let config = PeerConfig {
        session: SessionConfig {
            transport: TransportConfig {
                bind_address: args.bind,
                packet_loss,
                ..Default::default()
            },
            ..Default::default()
        },
        check_distance: args.check_distance,
        max_frames: (args.frames > 0).then_some(args.frames),
        hold_frames: args.hold_frames,
        ..Default::default()
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let mut runner = PeerRunner::new(config, &players)?;
        runner.run()?;
        log::info!("Peer shutting down");
    } else {
        let mut runner = PeerRunner::new(config, &players)?;
        run_with_tui(&mut runner)?;
    }

    Ok(())
}

fn run_with_tui(runner: &mut PeerRunner) -> Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = tui_loop(&mut terminal, runner);
    runner.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    result
}

fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    runner: &mut PeerRunner,
) -> Result<()> {
    let running = runner.running();
    let mut tui_state = TuiState::new();

    if let Some(addr) = runner.status().local_addr {
        tui_state.log_info(format!("Listening on {}", addr));
    }

    while running.load(Ordering::SeqCst) {
        let tick = runner.tick_once();

        for event in runner.drain_events() {
            tui_state.log(event.level(), event.message());
        }
        if let Err(e) = tick {
            tui_state.log_error(e.to_string());
            return Err(e);
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let KeyCode::Char('q') | KeyCode::Esc = key.code {
                        running.store(false, Ordering::SeqCst);
                    }
                }
            }
        }

        let status = runner.status();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &status);
        })?;
    }

    Ok(())
}
