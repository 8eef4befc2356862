mod common;

use synthmob_net::client::AgentClient;
use synthmob_net::protocol::{ClientRequest, ServerReply};

#[test]
fn test_register_returns_token() {
    let server = common::start_server();
    let mut client = AgentClient::connect(&server.addr).unwrap();

    match client.register("alice").unwrap() {
        ServerReply::Registered { name, token, .. } => {
            assert_eq!(name, "alice");
            assert_eq!(token.len(), 64);
        }
        other => panic!("expected Registered, got {:?}", other),
    }
}

#[test]
fn test_duplicate_name_is_conflict() {
    let server = common::start_server();
    common::registered_client(&server, "alice");

    let mut second = AgentClient::connect(&server.addr).unwrap();
    match second.register("alice").unwrap() {
        ServerReply::Error { code, .. } => assert_eq!(code, "name_taken"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn test_invalid_name_rejected() {
    let server = common::start_server();
    let mut client = AgentClient::connect(&server.addr).unwrap();
    match client.register("has space").unwrap() {
        ServerReply::Error { code, .. } => assert_eq!(code, "invalid_name"),
        other => panic!("expected error, got {:?}", other),
    }
}

#[test]
fn test_status_requires_token() {
    let server = common::start_server();
    let mut client = AgentClient::connect(&server.addr).unwrap();
    let reply = client
        .call(&ClientRequest::AgentStatus {
            token: "bogus".to_string(),
        })
        .unwrap();
    match reply {
        ServerReply::Error { code, .. } => assert_eq!(code, "unauthorized"),
        other => panic!("expected error, got {:?}", other),
    }

    let mut registered = common::registered_client(&server, "bob");
    let token = registered.token().unwrap().to_string();
    match registered.call(&ClientRequest::AgentStatus { token }).unwrap() {
        ServerReply::Status { status } => {
            assert_eq!(status.name, "bob");
            assert!(status.online);
        }
        other => panic!("expected status, got {:?}", other),
    }
}
