mod common;

use synthmob_net::protocol::ServerReply;
use synthmob_types::WayfindingAction;

fn move_to(x: f64, z: f64) -> WayfindingAction {
    WayfindingAction::MoveTo {
        x,
        z,
        reason: "test".to_string(),
    }
}

#[test]
fn test_move_target_is_clamped_to_the_arena() {
    let server = common::start_server();
    let mut w = common::registered_client(&server, "w");

    match w.wayfinding_action(move_to(100.0, 0.0)).unwrap() {
        ServerReply::ActionResult { outcome } => {
            assert!(outcome.accepted);
            let to = outcome.state.self_view.movement_to.unwrap();
            assert!((to.0 - 50.0).abs() < 1e-9);
            assert_eq!(to.1, 0.0);
            // Second move while traveling is rejected.
            match w.wayfinding_action(move_to(0.0, 0.0)).unwrap() {
                ServerReply::ActionResult { outcome } => {
                    assert!(!outcome.accepted);
                    assert_eq!(
                        outcome.reason_code.as_deref(),
                        Some("movement_in_progress")
                    );
                }
                other => panic!("expected ActionResult, got {:?}", other),
            }
        }
        other => panic!("expected ActionResult, got {:?}", other),
    }
}

#[test]
fn test_state_read_includes_policy_and_events() {
    let server = common::start_server();
    let mut w = common::registered_client(&server, "w");
    w.wayfinding_action(move_to(-100.0, 0.0)).unwrap();

    match w.wayfinding_state().unwrap() {
        ServerReply::Wayfinding { state } => {
            assert_eq!(state.policy.arena_radius, 50.0);
            assert_eq!(state.policy.move_speed_mps, 4.0);
            assert!(state
                .recent_events
                .iter()
                .any(|e| e.event_type == "bot_nav_path_started"));
        }
        other => panic!("expected Wayfinding, got {:?}", other),
    }
}

#[test]
fn test_legacy_actions_rejected_with_code() {
    let server = common::start_server();
    let mut w = common::registered_client(&server, "w");
    match w
        .wayfinding_action(WayfindingAction::ClaimStagePosition {})
        .unwrap()
    {
        ServerReply::ActionResult { outcome } => {
            assert!(!outcome.accepted);
            assert_eq!(
                outcome.reason_code.as_deref(),
                Some("legacy_action_unsupported")
            );
        }
        other => panic!("expected ActionResult, got {:?}", other),
    }
}
