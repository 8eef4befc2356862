mod common;

use synthmob_net::protocol::{ClientRequest, ServerReply};
use synthmob_types::SessionType;

fn session_of(reply: ServerReply) -> synthmob_types::Session {
    match reply {
        ServerReply::Session { session, .. } => session,
        other => panic!("expected Session, got {:?}", other),
    }
}

#[test]
fn test_session_lifecycle_over_the_wire() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");
    let mut bob = common::registered_client(&server, "bob");

    let session = session_of(alice.start_session(SessionType::Music).unwrap());
    assert_eq!(session.creator_bot_name, "alice");

    let joined = session_of(bob.join_session(&session.id).unwrap());
    assert_eq!(joined.participants.len(), 2);

    // Creator leaves; bob is promoted.
    match alice.leave_session().unwrap() {
        ServerReply::Left { session_id } => assert_eq!(session_id, session.id),
        other => panic!("expected Left, got {:?}", other),
    }
    match bob.call(&ClientRequest::Sessions).unwrap() {
        ServerReply::Sessions { sessions } => {
            assert_eq!(sessions.len(), 1);
            assert_eq!(sessions[0].creator_bot_name, "bob");
        }
        other => panic!("expected Sessions, got {:?}", other),
    }
}

#[test]
fn test_join_missing_session_is_not_found() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");
    let missing = synthmob_types::SessionId("ses_missing".to_string());
    match alice.join_session(&missing).unwrap() {
        ServerReply::Error { code, .. } => assert_eq!(code, "session_not_found"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn test_legacy_jam_aliases_map_to_music_sessions() {
    let server = common::start_server();
    let mut alice = common::registered_client(&server, "alice");
    let token = alice.token().unwrap().to_string();

    let session = session_of(
        alice
            .call(&ClientRequest::StartJam {
                token,
                title: Some("old client".to_string()),
                pattern: None,
            })
            .unwrap(),
    );
    assert_eq!(session.session_type, SessionType::Music);

    match alice.call(&ClientRequest::Jams).unwrap() {
        ServerReply::Sessions { sessions } => assert_eq!(sessions.len(), 1),
        other => panic!("expected Sessions, got {:?}", other),
    }
}
