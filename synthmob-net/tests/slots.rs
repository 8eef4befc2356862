mod common;

use synthmob_net::protocol::ServerReply;

#[test]
fn test_slot_write_and_cooldown() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");

    match alice.write_slot(1, r#"s("bd sd")"#).unwrap() {
        ServerReply::SlotWritten { slot, warnings } => {
            assert_eq!(slot.id, 1);
            assert_eq!(slot.code.as_deref(), Some(r#"s("bd sd")"#));
            assert!(warnings.is_empty());
        }
        other => panic!("expected SlotWritten, got {:?}", other),
    }

    // An immediate second write hits the 60s cooldown.
    match alice.write_slot(2, r#"s("hh*4")"#).unwrap() {
        ServerReply::Error {
            code, retry_after, ..
        } => {
            assert_eq!(code, "cooldown");
            let retry = retry_after.unwrap();
            assert!((59..=60).contains(&retry), "retry_after {}", retry);
        }
        other => panic!("expected cooldown, got {:?}", other),
    }
}

#[test]
fn test_overwrite_is_last_write_wins() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");
    let mut bob = common::registered_client(&server, "bob");

    alice.write_slot(1, r#"s("bd sd")"#).unwrap();
    match bob.write_slot(1, r#"s("bd*4")"#).unwrap() {
        ServerReply::SlotWritten { slot, .. } => {
            assert_eq!(slot.code.as_deref(), Some(r#"s("bd*4")"#));
            assert_eq!(slot.agent.unwrap().name, "bob");
        }
        other => panic!("expected SlotWritten, got {:?}", other),
    }
}

#[test]
fn test_validation_failure_reports_details() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");

    match alice.write_slot(1, "eval(danger)").unwrap() {
        ServerReply::Error { code, details, .. } => {
            assert_eq!(code, "validation_failed");
            assert!(!details.unwrap().is_empty());
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_invalid_slot_id() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");
    match alice.write_slot(9, r#"s("bd")"#).unwrap() {
        ServerReply::Error { code, .. } => assert_eq!(code, "invalid_slot"),
        other => panic!("expected invalid_slot, got {:?}", other),
    }
}
