use std::collections::VecDeque;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};

use lockstep::{
    Frame, NetworkStats, Pacer, PlayerHandle, PlayerKind, RollbackScheduler, Role,
    SchedulerConfig, Session, SessionConfig, SessionEvent, SessionState, Simulation, SlotState,
    SyncTestScheduler, check_events,
};

use crate::config::PeerConfig;
use crate::events::PeerEvent;
use crate::players::{PlayerEntry, PlayerList};
use crate::script::InputScript;

#[derive(Debug, Clone)]
pub struct PeerStatus {
    pub role: Role,
    pub state: SessionState,
    pub local_addr: Option<SocketAddr>,
    pub local_slot: Option<usize>,
    pub slots: Vec<SlotState>,
    pub frame: Frame,
    pub checksum: u32,
    pub accumulator: f32,
    pub network_stats: Option<NetworkStats>,
    pub uptime_secs: u64,
}

/// One peer's cooperative loop: pacing, session upkeep and simulation steps.
pub struct PeerRunner {
    config: PeerConfig,
    session: Session,
    pacer: Pacer,
    scheduler: SyncTestScheduler,
    simulation: Simulation,
    script: InputScript,
    local_handles: Vec<PlayerHandle>,
    local_index: usize,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<PeerEvent>,
}

impl PeerRunner {
    pub fn new(config: PeerConfig, players: &PlayerList) -> Result<Self> {
        let num_players = players.num_players();

        let mut scheduler = SyncTestScheduler::new(
            SchedulerConfig::for_players(num_players),
            config.check_distance,
        );
        let mut local_handles = Vec::new();
        for entry in &players.entries {
            let kind = match entry {
                PlayerEntry::Local => PlayerKind::Local,
                PlayerEntry::Remote(addr) => PlayerKind::Remote(resolve(addr)?),
            };
            let local = kind == PlayerKind::Local;
            let handle = scheduler.add_player(kind)?;
            if local {
                local_handles.push(handle);
            }
        }

        let mut session: Session = Session::new(SessionConfig {
            max_players: num_players,
            local_slot: Some(players.local_index),
            ..config.session.clone()
        });
        match players.host_address() {
            None => session
                .host(players.local_port)
                .with_context(|| format!("hosting on port {}", players.local_port))?,
            Some(host) => session
                .connect_addr(resolve(host)?)
                .with_context(|| format!("joining {}", host))?,
        }

        log::info!(
            "Playing as player {} (port {}, {})",
            players.local_index,
            players.local_port,
            if players.is_host() { "hosting" } else { "joining" }
        );

        Ok(Self {
            pacer: Pacer::new(config.pacing.clone()),
            script: InputScript::new(config.hold_frames),
            simulation: Simulation::new(num_players),
            session,
            scheduler,
            local_handles,
            local_index: players.local_index,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = PeerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Headless loop; events go to the log.
    pub fn run(&mut self) -> Result<()> {
        let result = self.run_loop();
        self.shutdown();
        self.log_events();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once()?;
            self.log_events();
        }
        Ok(())
    }

    fn log_events(&mut self) {
        for event in self.pending_events.drain(..) {
            log::log!(event.level(), "{}", event.message());
        }
    }

    /// One real-time iteration. Errors are fatal to the session.
    pub fn tick_once(&mut self) -> Result<()> {
        self.pacer
            .tick(Instant::now(), self.scheduler.frames_ahead());

        if let Err(e) = self.session.poll() {
            self.pending_events.push_back(PeerEvent::Error {
                message: format!("Network error: {}", e),
            });
        }
        for event in self.session.drain_events() {
            self.handle_session_event(event);
        }

        // Clients hold the simulation until the host lets them in.
        if !self.session.is_connected() {
            self.pacer.reset();
            return Ok(());
        }

        for _ in 0..self.pacer.due_steps() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ended { .. } => self.running.store(false, Ordering::SeqCst),
            // The script drives the argv player index; any other grant would
            // move a player this peer does not own.
            SessionEvent::Connected { slot, .. } if slot != self.local_index => {
                self.running.store(false, Ordering::SeqCst);
                self.pending_events.push_back(PeerEvent::Session(event));
                self.pending_events.push_back(PeerEvent::Error {
                    message: format!(
                        "Host granted slot {} but this peer is player {}",
                        slot, self.local_index
                    ),
                });
                return;
            }
            _ => {}
        }
        self.pending_events.push_back(PeerEvent::Session(event));
    }

    pub fn step(&mut self) -> Result<()> {
        let frame = self.scheduler.current_frame();
        for &handle in &self.local_handles {
            self.scheduler
                .add_local_input(handle, self.script.input_for(frame, handle))?;
        }

        let requests = self.scheduler.advance_frame()?;
        self.simulation.fulfil(&mut self.scheduler, requests)?;

        let events = self.scheduler.events();
        self.pending_events
            .extend(events.iter().cloned().map(PeerEvent::Scheduler));
        check_events(&events)?;

        if self
            .config
            .max_frames
            .is_some_and(|max| self.simulation.frame() >= max)
        {
            self.running.store(false, Ordering::SeqCst);
            self.pending_events.push_back(PeerEvent::Finished {
                frame: self.simulation.frame(),
                checksum: self.simulation.checksum(),
            });
        }
        Ok(())
    }

    /// Leaves gracefully, falling back to a forced teardown once the
    /// shutdown timeout passes.
    pub fn shutdown(&mut self) {
        self.session.try_disconnect();
        let deadline =
            Instant::now() + std::time::Duration::from_millis(self.config.shutdown_timeout_ms);
        while self.session.exists() && Instant::now() < deadline {
            if self.session.poll().is_err() {
                break;
            }
            for event in self.session.drain_events() {
                self.pending_events.push_back(PeerEvent::Session(event));
            }
        }
        self.session.disconnect();
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn status(&self) -> PeerStatus {
        PeerStatus {
            role: self.session.role(),
            state: self.session.state(),
            local_addr: self.session.local_addr(),
            local_slot: self.session.local_slot(),
            slots: self
                .session
                .slots()
                .iter()
                .take(self.session.slots().capacity())
                .map(|(_, state)| state)
                .collect(),
            frame: self.simulation.frame(),
            checksum: self.simulation.checksum(),
            accumulator: self.pacer.accumulator(),
            network_stats: self.session.stats(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .with_context(|| format!("resolving {}", addr))?
        .next()
        .ok_or_else(|| anyhow!("{} resolves to no address", addr))
}
