//! End-to-end turn flows through the public engine API.

use tokio::sync::mpsc::{self, UnboundedReceiver};

use trouble_game_engine::engine::bus::EventBus;
use trouble_game_engine::engine::models::{GameConfig, Player};
use trouble_game_engine::engine::plugin::{GamePlugin, JsonAdapter, RulesPlugin};
use trouble_game_engine::games::trouble::board::{finish_space_id, track_space_id};
use trouble_game_engine::games::trouble::engine::{RollOutcome, TurnResolution};
use trouble_game_engine::games::trouble::error::MoveError;
use trouble_game_engine::games::trouble::types::{
    EntryChoice, InboundEvent, MoveResponse, PieceState, TroubleEvent, TroubleState,
};
use trouble_game_engine::games::trouble::{RulesConfig, TroubleEngine, TroublePlugin};

fn players(n: usize) -> Vec<Player> {
    (0..n)
        .map(|i| Player::new(format!("p{}", i + 1), format!("Player {}", i + 1)))
        .collect()
}

fn initial_state(n: usize) -> TroubleState {
    TroublePlugin::default()
        .create_initial_state(&players(n), &GameConfig::default())
        .unwrap()
}

fn engine_with(
    n: usize,
    tweak: impl FnOnce(&mut TroubleState),
) -> (TroubleEngine, UnboundedReceiver<TroubleEvent>) {
    let mut state = initial_state(n);
    tweak(&mut state);
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TroubleEngine::from_state(TroublePlugin::default(), state).with_sink(tx),
        rx,
    )
}

fn events(rx: &mut UnboundedReceiver<TroubleEvent>) -> Vec<TroubleEvent> {
    let mut out = Vec::new();
    while let Ok(e) = rx.try_recv() {
        out.push(e);
    }
    out
}

fn count(events: &[TroubleEvent], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}

/// Put a piece `steps` spaces past its owner's entry, on the track or in the lane.
fn place(state: &mut TroubleState, pi: usize, ki: usize, steps: u32) {
    let c = RulesConfig::default();
    let piece = &mut state.players[pi].pieces[ki];
    piece.steps_from_start = Some(steps);
    if steps < c.track_length {
        piece.state = PieceState::Track;
        piece.finish_index = None;
        piece.current_space_id =
            track_space_id(&c, i64::from(c.start_index_for_player(pi) + steps));
    } else {
        let fi = steps - c.track_length;
        piece.state = if fi == c.finish_length - 1 {
            PieceState::Done
        } else {
            PieceState::Finish
        };
        piece.finish_index = Some(fi);
        piece.current_space_id = finish_space_id(pi, fi);
    }
}

#[test]
fn home_piece_needs_a_six_and_a_free_entry() {
    let plugin = TroublePlugin::default();
    let mut state = initial_state(2);
    for roll in 1..=5 {
        assert!(plugin.compute_legal_moves(&state, 0, roll).is_empty());
    }
    assert_eq!(plugin.compute_legal_moves(&state, 0, 6).len(), 4);

    // Own piece on the entry space blocks every bring-out.
    place(&mut state, 0, 0, 0);
    let moves = plugin.compute_legal_moves(&state, 0, 6);
    assert!(moves.iter().all(|m| !m.is_entry()));

    // An opponent there does not.
    let mut state = initial_state(2);
    place(&mut state, 1, 0, 21); // 7 + 21 wraps to t0
    assert_eq!(state.players[1].pieces[0].current_space_id, "t0");
    assert_eq!(plugin.compute_legal_moves(&state, 0, 6).len(), 4);
}

#[test]
fn lone_home_piece_comes_out_and_rolls_again() {
    let (mut engine, mut rx) = engine_with(2, |s| {
        for ki in 1..4 {
            place(s, 0, ki, 31);
        }
    });
    let outcome = engine.handle_roll(6).unwrap();
    let RollOutcome::Moved {
        applied,
        resolution,
    } = outcome
    else {
        panic!("expected an automatic bring-out, got {outcome:?}");
    };
    assert_eq!(applied.to_space_id, "t0");
    assert_eq!(resolution, TurnResolution::ExtraRoll);

    let piece = &engine.state().players[0].pieces[0];
    assert_eq!(piece.state, PieceState::Track);
    assert_eq!(piece.steps_from_start, Some(0));
    assert_eq!(engine.current_player_id(), Some("p1"));
    assert_eq!(count(&events(&mut rx), "extraRollGranted"), 1);
}

#[test]
fn finish_lane_requires_exact_count() {
    let plugin = TroublePlugin::default();
    let mut state = initial_state(2);
    place(&mut state, 0, 0, 26);

    let moves = plugin.compute_legal_moves(&state, 0, 3);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].target_state, PieceState::Finish);
    assert_eq!(moves[0].finish_index, Some(1));
    assert_eq!(moves[0].target_space_id, "p0-f1");

    let moves = plugin.compute_legal_moves(&state, 0, 5);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].target_state, PieceState::Done);
    assert_eq!(moves[0].finish_index, Some(3));

    let moves = plugin.compute_legal_moves(&state, 0, 6);
    assert!(moves.iter().all(|m| m.piece_id != "p1-piece-1"));
}

#[test]
fn landing_on_opponent_sends_it_home() {
    let (mut engine, mut rx) = engine_with(2, |s| {
        place(s, 0, 0, 2);
        place(s, 1, 2, 26); // 7 + 26 wraps to t5
    });
    assert_eq!(engine.state().players[1].pieces[2].current_space_id, "t5");

    let outcome = engine.handle_roll(3).unwrap();
    assert!(matches!(
        outcome,
        RollOutcome::Moved { ref applied, resolution: TurnResolution::TurnEnded }
            if applied.to_space_id == "t5"
    ));

    let mover = &engine.state().players[0].pieces[0];
    assert_eq!(mover.state, PieceState::Track);
    assert_eq!(mover.current_space_id, "t5");

    let captured = &engine.state().players[1].pieces[2];
    assert_eq!(captured.state, PieceState::Home);
    assert_eq!(captured.steps_from_start, None);
    assert_eq!(captured.finish_index, None);
    assert_eq!(captured.current_space_id, "p1-home-2");

    let emitted = events(&mut rx);
    assert_eq!(count(&emitted, "pieceCaptured"), 1);
    assert_eq!(count(&emitted, "pieceMoved"), 1);
    assert!(emitted.contains(&TroubleEvent::PieceCaptured {
        captured_piece_id: "p2-piece-3".into(),
        player_index: 1,
    }));
}

#[test]
fn six_keeps_the_turn_after_a_board_move() {
    let (mut engine, _rx) = engine_with(2, |s| place(s, 0, 0, 4));
    engine.handle_roll(6).unwrap();
    let outcome = engine.resolve_choice(EntryChoice::MoveOnBoard).unwrap();
    assert!(matches!(
        outcome,
        RollOutcome::Moved {
            resolution: TurnResolution::ExtraRoll,
            ..
        }
    ));
    assert_eq!(engine.current_player_id(), Some("p1"));
    assert!(engine.roll_enabled());
}

#[test]
fn completing_all_pieces_wins_once_and_passes_the_turn() {
    let (mut engine, mut rx) = engine_with(3, |s| {
        place(s, 0, 0, 29);
        for ki in 1..4 {
            place(s, 0, ki, 31);
        }
    });
    let outcome = engine.handle_roll(2).unwrap();
    assert!(matches!(
        outcome,
        RollOutcome::Moved {
            resolution: TurnResolution::Won,
            ..
        }
    ));
    assert_eq!(engine.winners(), ["p1".to_string()]);
    assert_eq!(engine.current_player_id(), Some("p2"));

    let emitted = events(&mut rx);
    assert_eq!(count(&emitted, "playerWon"), 1);
    assert_eq!(count(&emitted, "gameWon"), 1);
    assert_eq!(count(&emitted, "extraRollGranted"), 0);
    assert!(emitted.contains(&TroubleEvent::GameWon {
        winner: "p1".into()
    }));
}

#[test]
fn winners_never_move_again() {
    let (mut engine, mut rx) = engine_with(3, |s| {
        for ki in 0..4 {
            place(s, 0, ki, 31);
        }
        s.winners.push("p1".into());
    });
    for roll in 1..=6 {
        assert!(engine
            .plugin()
            .compute_legal_moves(engine.state(), 0, roll)
            .is_empty());
    }

    assert_eq!(engine.handle_roll(6).unwrap(), RollOutcome::Skipped);
    engine.handle_roll(1).unwrap(); // p2
    engine.handle_roll(1).unwrap(); // p3
    assert_eq!(engine.current_player_id(), Some("p1"));
    assert_eq!(engine.handle_roll(6).unwrap(), RollOutcome::Skipped);
    assert_eq!(engine.winners(), ["p1".to_string()]);
    assert_eq!(count(&events(&mut rx), "playerWon"), 0);
}

#[test]
fn move_requests_report_host_messages() {
    let (mut engine, _rx) = engine_with(2, |s| {
        place(s, 0, 0, 2);
        place(s, 0, 1, 10);
    });

    let response: MoveResponse = engine.request_move("p1", "p1-piece-1", "t5").into();
    let v = serde_json::to_value(&response).unwrap();
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "Roll the die first");

    engine.handle_roll(3).unwrap();
    let before = engine.state().clone();
    let rejected = engine.request_move("p1", "p1-piece-1", "t9");
    assert_eq!(rejected, Err(MoveError::InvalidMove));
    let response: MoveResponse = rejected.into();
    assert_eq!(response.error.as_deref(), Some("Invalid move for this roll"));
    assert_eq!(engine.state(), &before);

    let response: MoveResponse = engine.request_move("p1", "p1-piece-2", "t13").into();
    let v = serde_json::to_value(&response).unwrap();
    assert_eq!(v["success"], true);
    assert_eq!(v["data"]["pieceId"], "p1-piece-2");
    assert_eq!(v["data"]["toSpaceId"], "t13");
    assert_eq!(v["data"]["state"], "track");
}

#[test]
fn inbound_bus_drives_a_pick() {
    let bus = EventBus::<InboundEvent>::new();
    let (mut engine, _rx) = engine_with(2, |s| {
        place(s, 0, 0, 2);
        place(s, 0, 1, 10);
    });
    engine.subscribe_to(&bus);

    bus.publish(InboundEvent::RollComplete { value: 3 });
    bus.publish(InboundEvent::PieceClicked {
        piece_id: "p1-piece-1".into(),
        player_id: "p2".into(),
    });
    assert_eq!(engine.pump(), 2);
    assert!(engine.awaiting_move_choice());

    bus.publish(InboundEvent::SpaceClicked {
        space_id: "t13".into(),
    });
    assert_eq!(engine.pump(), 1);
    assert_eq!(engine.state().players[0].pieces[1].current_space_id, "t13");
    assert_eq!(engine.current_player_id(), Some("p2"));

    drop(engine);
    assert_eq!(bus.subscriber_count(), 0);
}

#[test]
fn json_boundary_rechecks_moves_against_the_roll() {
    let adapter = JsonAdapter(TroublePlugin::default());
    let data = adapter
        .create_initial_state(&players(2), &GameConfig::default())
        .unwrap();

    let moves = adapter.get_valid_moves(&data, 0, 6).unwrap();
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[0]["targetSpaceId"], "t0");

    let result = adapter.apply_move(&data, 0, 3, &moves[0]).unwrap();
    assert!(!result.applied);
    assert!(result.events.is_empty());
    assert_eq!(result.game_data, data);

    let result = adapter.apply_move(&data, 0, 6, &moves[0]).unwrap();
    assert!(result.applied);
    assert!(!result.player_won);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].event_type, "pieceMoved");
    assert_eq!(result.events[0].player_id.as_deref(), Some("p1"));
    assert_eq!(
        result.game_data["players"][0]["pieces"][0]["currentSpaceId"],
        "t0"
    );
}

#[test]
fn json_boundary_records_a_completed_player() {
    let adapter = JsonAdapter(TroublePlugin::default());
    let mut state = initial_state(3);
    place(&mut state, 0, 0, 30);
    for ki in 1..4 {
        place(&mut state, 0, ki, 31);
    }
    let data = serde_json::to_value(&state).unwrap();

    let moves = adapter.get_valid_moves(&data, 0, 1).unwrap();
    assert_eq!(moves.len(), 1);
    let result = adapter.apply_move(&data, 0, 1, &moves[0]).unwrap();

    assert!(result.applied);
    assert!(result.player_won);
    assert_eq!(result.game_data["winners"], serde_json::json!(["p1"]));
    let kinds: Vec<&str> = result.events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(kinds, vec!["pieceMoved", "playerWon", "gameWon"]);
    assert_eq!(result.events[2].payload["winner"], "p1");

    // The recorded winner has nothing left to move.
    assert!(adapter
        .get_valid_moves(&result.game_data, 0, 6)
        .unwrap()
        .is_empty());
}

#[test]
fn six_with_a_piece_in_the_lane_lets_the_player_pick_who_comes_out() {
    let (mut engine, _rx) = engine_with(2, |s| place(s, 0, 0, 28));
    let outcome = engine.handle_roll(6).unwrap();
    assert!(matches!(outcome, RollOutcome::AwaitingMoveChoice { .. }));
    assert!(engine.available_moves().iter().all(|m| m.is_entry()));

    let applied = engine.request_move("p1", "p1-piece-4", "t0").unwrap();
    assert_eq!(applied.piece_id, "p1-piece-4");
    assert_eq!(engine.state().players[0].pieces[3].state, PieceState::Track);
    assert_eq!(engine.state().players[0].pieces[1].state, PieceState::Home);
    assert!(engine.roll_enabled());
    assert_eq!(engine.current_player_id(), Some("p1"));
}
