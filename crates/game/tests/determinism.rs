use lockstep::{
    GameRequest, IntegrityError, PackedInput, PlayerKind, RollbackScheduler, STATE_SIZE,
    SchedulerConfig, SchedulerEvent, Simulation, SyncTestScheduler, check_events,
};
use proptest::prelude::*;

fn scripted_input(frame: u32, player: usize) -> PackedInput {
    let bits = (frame.wrapping_mul(31).wrapping_add(player as u32 * 7) >> 2) as u8;
    PackedInput::decode(bits)
}

fn run(frames: u32, players: usize) -> Vec<u32> {
    let mut sim = Simulation::new(players);
    (0..frames)
        .map(|frame| {
            let inputs: Vec<_> = (0..players).map(|p| scripted_input(frame, p)).collect();
            sim.advance(&inputs, frame);
            sim.checksum()
        })
        .collect()
}

fn sync_test(players: usize, check_distance: u32) -> (SyncTestScheduler, Simulation) {
    let mut scheduler =
        SyncTestScheduler::new(SchedulerConfig::for_players(players), check_distance);
    for _ in 0..players {
        scheduler.add_player(PlayerKind::Local).unwrap();
    }
    (scheduler, Simulation::new(players))
}

#[test]
fn test_identical_inputs_give_identical_checksums() {
    let first = run(100, 2);
    let second = run(100, 2);
    assert_eq!(first, second);
    // The script actually moves something.
    assert_ne!(first[0], first[99]);
}

#[test]
fn test_sync_test_runs_clean() {
    let (mut scheduler, mut sim) = sync_test(2, 2);
    assert!(check_events(&scheduler.events()).is_ok());

    for frame in 0..100 {
        for handle in 0..2 {
            scheduler
                .add_local_input(handle, scripted_input(frame, handle))
                .unwrap();
        }
        let requests = scheduler.advance_frame().unwrap();
        sim.fulfil(&mut scheduler, requests).unwrap();
        assert_eq!(check_events(&scheduler.events()), Ok(()));
    }

    assert_eq!(sim.frame(), 100);
    assert_eq!(scheduler.current_frame(), 100);
}

#[test]
fn test_tampered_snapshot_is_a_desync() {
    let (mut scheduler, mut sim) = sync_test(1, 2);
    scheduler.events();

    for frame in 0..5 {
        scheduler
            .add_local_input(0, scripted_input(frame, 0))
            .unwrap();
        let requests = scheduler.advance_frame().unwrap();
        sim.fulfil(&mut scheduler, requests).unwrap();
    }
    assert!(scheduler.events().is_empty());

    // A re-save of frame 4 that disagrees with the first one.
    sim.fulfil(&mut scheduler, vec![GameRequest::Load { frame: 4 }])
        .unwrap();
    let mut buffer = vec![0u8; STATE_SIZE];
    let saved = sim.save(&mut buffer).unwrap();
    scheduler.store_state(4, buffer, saved.checksum ^ 1);

    let events = scheduler.events();
    assert!(matches!(
        events.as_slice(),
        [SchedulerEvent::DesyncDetected { frame: 4, .. }]
    ));
    assert!(matches!(
        check_events(&events),
        Err(IntegrityError::Desync { frame: 4, .. })
    ));
}

#[test]
fn test_load_restores_saved_frame() {
    let (mut scheduler, mut sim) = sync_test(1, 0);
    let mut checksums = Vec::new();

    for frame in 0..10 {
        scheduler
            .add_local_input(0, scripted_input(frame, 0))
            .unwrap();
        let requests = scheduler.advance_frame().unwrap();
        sim.fulfil(&mut scheduler, requests).unwrap();
        checksums.push(sim.checksum());
    }

    // Without rollback only the latest snapshots are kept.
    assert!(scheduler.state_for(5).is_none());
    sim.fulfil(&mut scheduler, vec![GameRequest::Load { frame: 9 }])
        .unwrap();
    assert_eq!(sim.frame(), 9);
    assert_eq!(sim.checksum(), checksums[8]);
}

proptest! {
    #[test]
    fn test_prop_rollback_replay_matches_straight_run(
        bits in proptest::collection::vec(any::<u8>(), 1..60),
        check_distance in 1u32..6,
    ) {
        let inputs: Vec<PackedInput> = bits.iter().map(|b| PackedInput::decode(*b)).collect();

        let mut straight = Simulation::new(1);
        for (frame, input) in inputs.iter().enumerate() {
            straight.advance(&[*input], frame as u32);
        }

        let mut scheduler = SyncTestScheduler::new(
            SchedulerConfig { num_players: 1, local_delay: 0, ..Default::default() },
            check_distance,
        );
        scheduler.add_player(PlayerKind::Local).unwrap();
        let mut replayed = Simulation::new(1);
        for input in &inputs {
            scheduler.add_local_input(0, *input).unwrap();
            let requests = scheduler.advance_frame().unwrap();
            replayed.fulfil(&mut scheduler, requests).unwrap();
            prop_assert!(check_events(&scheduler.events()).is_ok());
        }

        prop_assert_eq!(straight.checksum(), replayed.checksum());
        prop_assert_eq!(straight.state(), replayed.state());
    }
}
