use super::support::*;

const RAMP: &[(&str, &str)] =
    &[("1", "easy"), ("2", "easy"), ("3", "hard"), ("4", "hard"), ("5", "hard")];

#[test]
fn checkpoint_is_set_when_the_next_gate_is_harder() {
    let mut run = start(RunMode::Practice, RAMP);

    clear_gate(&mut run, true);
    assert_eq!(run.checkpoint(), None, "easy to easy is not a step up");

    clear_gate(&mut run, true);
    let respawn = chunk_start_of_gate(&run, 2);
    assert_eq!(
        run.checkpoint(),
        Some(Checkpoint { gate_index: 2, respawn_x: respawn.x, respawn_y: respawn.y })
    );
    assert!(
        run.drain_events()
            .iter()
            .any(|event| matches!(event, RunEvent::CheckpointReached { .. }))
    );
}

#[test]
fn death_after_a_checkpoint_rewinds_to_it() {
    let mut run = start(RunMode::Practice, RAMP);
    for _ in 0..3 {
        clear_gate(&mut run, true);
    }
    assert_eq!(run.pointer(), 3);
    assert_eq!(run.checkpoint().map(|checkpoint| checkpoint.gate_index), Some(2));

    let tile = hazard_tile(&run);
    assert!(run.on_tile_contact(tile));

    assert_eq!(run.pointer(), 2);
    assert_eq!(run.world().active_triggers(), vec![GateId(2)]);
    assert_eq!(run.player().pos, chunk_start_of_gate(&run, 2));
    assert_eq!(run.player().health, run.config().max_health);
}

#[test]
fn wrong_answer_without_a_checkpoint_restarts_from_the_spawn() {
    let (mut run, layout) =
        start_with(TemplateLibrary::build_default(), RunMode::Practice, questions(RAMP));
    clear_gate(&mut run, true);
    clear_gate(&mut run, false);

    assert_eq!(run.pointer(), 0);
    assert_eq!(run.player().pos, layout.spawn_point);
    assert_eq!(run.world().active_triggers(), vec![GateId(0)]);
    assert!(run.extended_chunk_log().is_empty(), "practice never extends the map");
    assert_eq!(run.gate_count(), 5);
}

#[test]
fn wrong_answer_opens_the_fail_zone_until_resolution() {
    let mut run = start(RunMode::Practice, RAMP);
    enter_current_gate(&mut run);
    answer(&mut run, false);

    let gate = run.world().gate(GateId(0)).cloned().expect("gate 0");
    let launch = run.config().fail_launch;
    assert_eq!(
        run.on_zone_overlap(gate.fail),
        ZoneResponse::Launch { vx: launch.vx, vy: launch.vy }
    );
    settle(&mut run);
    assert!(!run.world().zone(gate.fail).expect("fail zone").active);
}

#[test]
fn falling_out_of_the_world_kills_the_player() {
    let mut run = start(RunMode::Practice, RAMP);
    clear_gate(&mut run, true);
    let below = run.world().bounds().height + run.config().fall_margin + 1;

    run.on_player_moved(Pos { x: 500, y: 100 });
    assert_eq!(run.player().pos, Pos { x: 500, y: 100 });
    run.on_player_moved(Pos { x: 500, y: below });

    assert_eq!(run.pointer(), 0);
    assert_eq!(Some(run.player().pos), run.world().spawn_point());
}

#[test]
fn contact_with_solid_tiles_is_harmless() {
    let mut run = start(RunMode::Practice, RAMP);
    let solid = run.world().tiles().iter().position(|tile| !tile.hazard).expect("ground tile");
    assert!(!run.on_tile_contact(solid));
    assert!(!run.on_tile_contact(usize::MAX));
}

#[test]
fn deaths_while_a_question_is_open_are_ignored() {
    let mut run = start(RunMode::Practice, RAMP);
    clear_gate(&mut run, true);
    enter_current_gate(&mut run);

    let tile = hazard_tile(&run);
    assert!(!run.on_tile_contact(tile));
    assert_eq!(run.pointer(), 1);
    assert_eq!(run.phase(), RunPhase::WaitingForQuiz);
}

#[test]
fn bonus_pads_rearm_after_a_death() {
    let (mut run, layout) =
        start_with(TemplateLibrary::build_default(), RunMode::Practice, questions(RAMP));
    let pad = layout.bonus_pads[0];
    run.on_zone_overlap(pad);
    assert_eq!(run.on_zone_overlap(pad), ZoneResponse::Ignored);

    let tile = hazard_tile(&run);
    run.on_tile_contact(tile);

    assert!(matches!(run.on_zone_overlap(pad), ZoneResponse::Launch { .. }));
}

#[test]
fn pickups_are_collected_once_and_raise_reward_events() {
    let (mut run, layout) =
        start_with(TemplateLibrary::build_default(), RunMode::Practice, questions(RAMP));
    let coin = layout.coins[0];
    let value = run.world().pickup(coin).expect("coin").value;

    assert!(run.on_pickup_overlap(coin));
    assert!(!run.on_pickup_overlap(coin));

    assert_eq!(run.coin_total(), value);
    let identity = run.world().pickup(coin).expect("coin").identity.clone();
    assert!(run.collected().coins.contains(&identity));
    let events = run.drain_events();
    assert!(events.contains(&RunEvent::RewardChanged {
        collectible: CollectibleKind::Coin,
        new_total: value,
    }));

    let egg = layout.eggs[0];
    let egg_value = run.world().pickup(egg).expect("egg").value;
    assert!(run.on_pickup_overlap(egg));
    assert_eq!(run.egg_total(), egg_value);
}

#[test]
fn expired_timers_do_not_end_practice_runs() {
    let mut run = start(RunMode::Practice, RAMP);
    enter_current_gate(&mut run);
    assert!(run.on_answer(AnswerReceived { correct: true, time_left: 0.0 }));
    settle(&mut run);
    assert_eq!(run.phase(), RunPhase::Running);
    assert_eq!(run.pointer(), 1);
}
