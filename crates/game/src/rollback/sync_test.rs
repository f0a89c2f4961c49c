use std::collections::BTreeMap;

use crate::simulation::{Frame, PackedInput};

use super::config::{PlayerHandle, PlayerKind, SchedulerConfig};
use super::desync::DesyncDetector;
use super::events::{GameRequest, SchedulerEvent};
use super::{RollbackScheduler, SchedulerError};

/// Local scheduler that rolls back `check_distance` frames on every advance
/// and re-runs them, so any non-determinism in the simulation shows up as a
/// checksum mismatch against the first run.
///
/// Mismatches are reported as [`SchedulerEvent::DesyncDetected`] with
/// `remote_handle` 0, the re-run standing in for the remote peer. Remote
/// players receive no input and are treated as idle.
#[derive(Debug)]
pub struct SyncTestScheduler {
    config: SchedulerConfig,
    check_distance: u32,
    players: Vec<PlayerKind>,
    pending: Vec<Option<PackedInput>>,
    current_frame: Frame,
    started: bool,
    inputs: BTreeMap<Frame, Vec<PackedInput>>,
    states: BTreeMap<Frame, Vec<u8>>,
    detector: DesyncDetector,
    events: Vec<SchedulerEvent>,
}

impl SyncTestScheduler {
    pub fn new(config: SchedulerConfig, check_distance: u32) -> Self {
        Self {
            detector: DesyncDetector::new(check_distance as usize + 2),
            config,
            check_distance,
            players: Vec::new(),
            pending: Vec::new(),
            current_frame: 0,
            started: false,
            inputs: BTreeMap::new(),
            states: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn check_distance(&self) -> u32 {
        self.check_distance
    }

    /// The next frame [`RollbackScheduler::advance_frame`] will produce.
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    pub fn players(&self) -> &[PlayerKind] {
        &self.players
    }

    fn inputs_for(&self, frame: Frame) -> Vec<PackedInput> {
        self.inputs
            .get(&frame)
            .cloned()
            .unwrap_or_else(|| vec![PackedInput::empty(); self.config.num_players])
    }

    /// Drops everything older than `oldest`.
    fn prune(&mut self, oldest: Frame) {
        self.inputs = self.inputs.split_off(&oldest);
        self.states = self.states.split_off(&oldest);
    }
}

impl RollbackScheduler for SyncTestScheduler {
    fn add_player(&mut self, kind: PlayerKind) -> Result<PlayerHandle, SchedulerError> {
        if self.players.len() >= self.config.num_players {
            return Err(SchedulerError::TooManyPlayers(self.config.num_players));
        }

        let handle = self.players.len();
        self.players.push(kind);
        self.pending.push(None);
        self.events.push(SchedulerEvent::PlayerConnected { handle });
        Ok(handle)
    }

    fn add_local_input(
        &mut self,
        handle: PlayerHandle,
        input: PackedInput,
    ) -> Result<(), SchedulerError> {
        match self.players.get(handle) {
            None => Err(SchedulerError::InvalidPlayer(handle)),
            Some(PlayerKind::Remote(_)) => Err(SchedulerError::NotLocal(handle)),
            Some(PlayerKind::Local) => {
                self.pending[handle] = Some(input);
                Ok(())
            }
        }
    }

    fn frames_ahead(&self) -> f32 {
        0.0
    }

    fn events(&mut self) -> Vec<SchedulerEvent> {
        std::mem::take(&mut self.events)
    }

    fn advance_frame(&mut self) -> Result<Vec<GameRequest>, SchedulerError> {
        let frame = self.current_frame;
        // The rollback below loads `frame - check_distance`.
        self.prune(frame.saturating_sub(self.check_distance));

        let missing = self
            .players
            .iter()
            .zip(&self.pending)
            .position(|(kind, input)| *kind == PlayerKind::Local && input.is_none());
        if let Some(handle) = missing {
            return Err(SchedulerError::MissingInput { handle, frame });
        }

        let mut sampled = vec![PackedInput::empty(); self.config.num_players];
        for (handle, input) in self.pending.iter_mut().enumerate() {
            if let (Some(input), Some(slot)) = (input.take(), sampled.get_mut(handle)) {
                *slot = input;
            }
        }
        self.inputs
            .insert(frame.wrapping_add(self.config.local_delay), sampled);

        let mut requests = Vec::new();
        if !self.started {
            requests.push(GameRequest::Save { frame });
            self.started = true;
        }

        if self.check_distance > 0 && frame >= self.check_distance {
            let start = frame - self.check_distance;
            requests.push(GameRequest::Load { frame: start });
            for resim in start..frame {
                requests.push(GameRequest::Advance {
                    frame: resim,
                    inputs: self.inputs_for(resim),
                });
                requests.push(GameRequest::Save { frame: resim + 1 });
            }
        }

        requests.push(GameRequest::Advance {
            frame,
            inputs: self.inputs_for(frame),
        });
        requests.push(GameRequest::Save { frame: frame + 1 });

        self.current_frame = frame + 1;
        Ok(requests)
    }

    fn store_state(&mut self, frame: Frame, data: Vec<u8>, checksum: u32) {
        if self.config.desync_detection {
            if self.detector.local_checksum(frame).is_some() {
                if let Some(event) = self.detector.check_remote(frame, 0, checksum) {
                    self.events.push(event);
                }
            } else {
                self.detector.record_local(frame, checksum);
            }
        }
        self.states.insert(frame, data);
    }

    fn state_for(&self, frame: Frame) -> Option<&[u8]> {
        self.states.get(&frame).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollback::check_events;
    use crate::simulation::Simulation;

    fn last_advance(requests: &[GameRequest]) -> (Frame, Vec<PackedInput>) {
        requests
            .iter()
            .rev()
            .find_map(|r| match r {
                GameRequest::Advance { frame, inputs } => Some((*frame, inputs.clone())),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_request_order_rolls_back_check_distance() {
        let mut scheduler = SyncTestScheduler::new(
            SchedulerConfig {
                num_players: 1,
                local_delay: 0,
                ..Default::default()
            },
            2,
        );
        scheduler.add_player(PlayerKind::Local).unwrap();
        let mut sim = Simulation::new(1);

        let mut all = Vec::new();
        for _ in 0..3 {
            scheduler.add_local_input(0, PackedInput::RIGHT).unwrap();
            let requests = scheduler.advance_frame().unwrap();
            all.push(requests.clone());
            sim.fulfil(&mut scheduler, requests).unwrap();
        }

        assert_eq!(all[0][0], GameRequest::Save { frame: 0 });
        assert_eq!(all[1].len(), 2);
        assert_eq!(all[2][0], GameRequest::Load { frame: 0 });
        assert_eq!(all[2].len(), 1 + 2 * 2 + 2);
        assert_eq!(sim.frame(), 3);
        assert!(check_events(&scheduler.events()).is_ok());
    }

    #[test]
    fn test_local_delay_shifts_inputs() {
        let mut scheduler = SyncTestScheduler::new(SchedulerConfig::for_players(1), 0);
        assert_eq!(scheduler.config().local_delay, 0);

        let mut scheduler = SyncTestScheduler::new(
            SchedulerConfig {
                num_players: 1,
                local_delay: 3,
                ..Default::default()
            },
            2,
        );
        scheduler.add_player(PlayerKind::Local).unwrap();

        let mut seen = Vec::new();
        for frame in 0..5 {
            let input = if frame == 0 {
                PackedInput::RIGHT
            } else {
                PackedInput::empty()
            };
            scheduler.add_local_input(0, input).unwrap();
            seen.push(last_advance(&scheduler.advance_frame().unwrap()));
        }

        assert_eq!(seen[0], (0, vec![PackedInput::empty()]));
        assert_eq!(seen[3], (3, vec![PackedInput::RIGHT]));
        assert_eq!(seen[4], (4, vec![PackedInput::empty()]));
    }

    #[test]
    fn test_missing_local_input_is_an_error() {
        let mut scheduler = SyncTestScheduler::new(SchedulerConfig::default(), 2);
        scheduler.add_player(PlayerKind::Local).unwrap();
        scheduler.add_player(PlayerKind::Local).unwrap();
        scheduler.add_local_input(0, PackedInput::UP).unwrap();

        assert!(matches!(
            scheduler.advance_frame(),
            Err(SchedulerError::MissingInput { handle: 1, frame: 0 })
        ));
        assert!(matches!(
            scheduler.add_player(PlayerKind::Local),
            Err(SchedulerError::TooManyPlayers(2))
        ));
    }

    #[test]
    fn test_remote_players_take_no_local_input() {
        let mut scheduler = SyncTestScheduler::new(SchedulerConfig::default(), 2);
        scheduler.add_player(PlayerKind::Local).unwrap();
        let remote = scheduler
            .add_player(PlayerKind::Remote("127.0.0.1:6700".parse().unwrap()))
            .unwrap();

        assert!(matches!(
            scheduler.add_local_input(remote, PackedInput::UP),
            Err(SchedulerError::NotLocal(1))
        ));
        assert!(matches!(
            scheduler.add_local_input(5, PackedInput::UP),
            Err(SchedulerError::InvalidPlayer(5))
        ));

        scheduler.add_local_input(0, PackedInput::DOWN).unwrap();
        assert!(scheduler.advance_frame().is_ok());
        assert_eq!(
            scheduler.events(),
            vec![
                SchedulerEvent::PlayerConnected { handle: 0 },
                SchedulerEvent::PlayerConnected { handle: 1 },
            ]
        );
    }

    #[test]
    fn test_mismatched_resave_is_reported() {
        let mut scheduler = SyncTestScheduler::new(SchedulerConfig::for_players(1), 2);
        scheduler.add_player(PlayerKind::Local).unwrap();
        scheduler.events();

        scheduler.store_state(0, vec![0; 4], 0x1111);
        scheduler.store_state(0, vec![0; 4], 0x1111);
        assert!(scheduler.events().is_empty());

        scheduler.store_state(0, vec![1; 4], 0x2222);
        assert_eq!(
            scheduler.events(),
            vec![SchedulerEvent::DesyncDetected {
                frame: 0,
                remote_handle: 0,
                local_checksum: 0x1111,
                remote_checksum: 0x2222,
            }]
        );
    }
}
