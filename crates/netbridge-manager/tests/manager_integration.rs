//! Integration tests for `NetworkManager` over the in-process transport.
//!
//! # Purpose
//!
//! These tests drive the manager through its *public* API the same way a
//! host application's tick loop does: open a listen socket, connect, pump,
//! react to events, move messages.  They verify:
//!
//! - The happy path: connect, accept, join a poll group, exchange messages.
//! - The event contract: events appear only after `pump()`, in order, once.
//! - Closure: closing one end reports `ClosedByPeer` to the other.
//! - Failure paths: unreachable ports, duplicate listen sockets, remote hosts.
//!
//! # Connection lifecycle as seen through events
//!
//! ```text
//! Client side                          Server side
//! ───────────                          ───────────
//! connect_by_address("127.0.0.1:p")
//!   None -> Connecting                 None -> Connecting   (incoming request)
//!                                      accept_connection()
//!   Connecting -> Connected            Connecting -> Connected
//! close_connection()
//!                                      Connected -> ClosedByPeer
//! ```

use netbridge_core::{end_reason, ConnectionHandle, ConnectionState, Datagram, Event, SendFlags};
use netbridge_manager::{LocalTransport, NetworkManager};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn local_manager() -> NetworkManager {
    NetworkManager::new(Some(Box::new(LocalTransport::default())))
}

fn drain_events(mgr: &mut NetworkManager) -> Vec<Event> {
    mgr.pump();
    std::iter::from_fn(|| mgr.poll_next_event()).collect()
}

/// Accepts every incoming request in `events`; returns the accepted handles.
fn accept_incoming(mgr: &mut NetworkManager, events: &[Event]) -> Vec<ConnectionHandle> {
    let mut accepted = Vec::new();
    for conn in events.iter().filter(|e| e.is_incoming_request()).map(Event::connection) {
        if mgr.get_connection_info(conn).is_some_and(|info| info.is_inbound()) {
            mgr.accept_connection(conn);
            accepted.push(conn);
        }
    }
    accepted
}

/// Listens on 27015, connects and accepts; returns (server end, client end).
fn connected_pair(mgr: &mut NetworkManager) -> (ConnectionHandle, ConnectionHandle) {
    assert!(mgr.create_ip_listen_socket(27015).is_valid());
    let client = mgr.connect_by_address("127.0.0.1:27015");
    assert!(client.is_valid());
    let events = drain_events(mgr);
    let server = accept_incoming(mgr, &events)[0];
    drain_events(mgr);
    (server, client)
}

fn text(s: &str) -> Vec<u8> {
    let mut dg = Datagram::new();
    dg.add_string(s).unwrap();
    dg.into_bytes()
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[test]
fn test_connect_and_accept_produces_expected_event_sequence() {
    // Arrange
    let mut mgr = local_manager();
    assert!(mgr.create_ip_listen_socket(27015).is_valid());

    // Act
    let client = mgr.connect_by_address("127.0.0.1:27015");
    let first = drain_events(&mut mgr);
    let accepted = accept_incoming(&mut mgr, &first);
    let second = drain_events(&mut mgr);

    // Assert
    assert_eq!(first.len(), 2);
    assert_eq!(first[0], Event::new(client, ConnectionState::None, ConnectionState::Connecting));
    assert_eq!(accepted.len(), 1);
    let server = accepted[0];
    assert_eq!(first[1], Event::new(server, ConnectionState::None, ConnectionState::Connecting));
    assert!(second.contains(&Event::new(server, ConnectionState::Connecting, ConnectionState::Connected)));
    assert!(second.contains(&Event::new(client, ConnectionState::Connecting, ConnectionState::Connected)));
    assert!(mgr.poll_next_event().is_none());
    assert_eq!(mgr.client_connection(), Some(client));
}

#[test]
fn test_events_appear_only_after_pump() {
    let mut mgr = local_manager();
    mgr.create_ip_listen_socket(27015);

    mgr.connect_by_address("127.0.0.1:27015");

    assert!(mgr.poll_next_event().is_none());
    mgr.pump();
    assert_eq!(mgr.pending_events(), 2);
}

#[test]
fn test_identity_connect_reports_finding_route() {
    // Arrange
    let mut mgr = local_manager();
    let identity = LocalTransport::default().local_identity().to_string();
    assert!(mgr.create_identity_listen_socket(0).is_valid());

    // Act
    let client = mgr.connect_by_identity(&identity);
    let events = drain_events(&mut mgr);
    let server = accept_incoming(&mut mgr, &events)[0];
    let after_accept = drain_events(&mut mgr);

    // Assert
    assert!(events.contains(&Event::new(client, ConnectionState::Connecting, ConnectionState::FindingRoute)));
    assert!(after_accept.contains(&Event::new(client, ConnectionState::FindingRoute, ConnectionState::Connected)));
    let info = mgr.get_connection_info(server).unwrap();
    assert_eq!(info.remote_identity.map(|id| id.to_string()), Some(identity));
}

#[test]
fn test_connect_to_port_without_listener_reports_problem() {
    let mut mgr = local_manager();

    let client = mgr.connect_by_address("127.0.0.1:1");
    let events = drain_events(&mut mgr);

    assert_eq!(
        events.last(),
        Some(&Event::new(client, ConnectionState::Connecting, ConnectionState::ProblemDetectedLocally))
    );
    let info = mgr.get_connection_info(client).unwrap();
    assert_eq!(info.end_reason, end_reason::REMOTE_BAD_CONNECT);
    assert!(!info.end_debug.is_empty());
}

#[test]
fn test_connect_to_unspecified_address_reaches_local_listener() {
    // Arrange
    let mut mgr = local_manager();
    assert!(mgr.create_ip_listen_socket(27015).is_valid());

    // Act
    let client = mgr.connect_by_address("0.0.0.0:27015");
    let events = drain_events(&mut mgr);

    // Assert
    assert!(client.is_valid());
    assert_eq!(mgr.client_connection(), Some(client));
    assert_eq!(accept_incoming(&mut mgr, &events).len(), 1);
}

#[test]
fn test_second_listen_socket_on_same_port_is_invalid() {
    let mut mgr = local_manager();

    let first = mgr.create_ip_listen_socket(27015);
    let second = mgr.create_ip_listen_socket(27015);

    assert!(first.is_valid());
    assert!(!second.is_valid());
}

#[test]
fn test_failed_connect_to_remote_host_keeps_previous_client() {
    // Arrange
    let mut mgr = local_manager();
    let (_, client) = connected_pair(&mut mgr);

    // Act – the in-process transport has no route off the machine.
    let failed = mgr.connect_by_address("192.0.2.10:27015");

    // Assert
    assert_eq!(failed, ConnectionHandle::INVALID);
    assert_eq!(mgr.client_connection(), Some(client));
}

// ── Messages ──────────────────────────────────────────────────────────────────

#[test]
fn test_server_echoes_through_poll_group() {
    // Arrange
    let mut mgr = local_manager();
    let (server, client) = connected_pair(&mut mgr);
    let group = mgr.create_poll_group();
    mgr.assign_connection_to_group(server, group);

    // Act – client greets, server echoes from its group.
    mgr.send_to_client(&text("Hello from client"), SendFlags::RELIABLE);
    let mut request = mgr.receive_next_message_on_group(group).expect("greeting arrived");
    let greeting = request.iterator().get_string().unwrap();
    mgr.send(request.connection(), &text(&format!("echo: {greeting}")), SendFlags::RELIABLE);
    let mut reply = mgr.receive_next_message(client).expect("echo arrived");

    // Assert
    assert_eq!(request.connection(), server);
    assert_eq!(reply.connection(), client);
    assert_eq!(reply.iterator().position(), 0);
    assert_eq!(reply.iterator().get_string().unwrap(), "echo: Hello from client");
    assert!(mgr.receive_next_message_on_group(group).is_none());
    assert!(mgr.receive_next_message(client).is_none());
}

#[test]
fn test_poll_group_serves_two_clients_in_arrival_order() {
    // Arrange
    let mut mgr = local_manager();
    mgr.create_ip_listen_socket(27015);
    let a = mgr.connect_by_address("127.0.0.1:27015");
    let b = mgr.connect_by_address("127.0.0.1:27015");
    let events = drain_events(&mut mgr);
    let group = mgr.create_poll_group();
    for server in accept_incoming(&mut mgr, &events) {
        mgr.assign_connection_to_group(server, group);
    }
    drain_events(&mut mgr);

    // Act
    mgr.send(b, b"from b", SendFlags::RELIABLE);
    mgr.send(a, b"from a", SendFlags::UNRELIABLE_NO_DELAY);

    // Assert
    let first = mgr.receive_next_message_on_group(group).unwrap();
    let second = mgr.receive_next_message_on_group(group).unwrap();
    assert_eq!(first.payload(), b"from b");
    assert_eq!(second.payload(), b"from a");
    assert_ne!(first.connection(), second.connection());
}

#[test]
fn test_send_to_client_targets_latest_connection() {
    let mut mgr = local_manager();
    mgr.create_ip_listen_socket(27015);
    let _first = mgr.connect_by_address("127.0.0.1:27015");
    let second = mgr.connect_by_address("127.0.0.1:27015");

    assert_eq!(mgr.client_connection(), Some(second));
}

// ── Closure ───────────────────────────────────────────────────────────────────

#[test]
fn test_client_close_reports_closed_by_peer_to_server() {
    // Arrange
    let mut mgr = local_manager();
    let (server, client) = connected_pair(&mut mgr);

    // Act
    mgr.close_connection(client);
    let events = drain_events(&mut mgr);

    // Assert
    assert_eq!(events, vec![Event::new(server, ConnectionState::Connected, ConnectionState::ClosedByPeer)]);
    let info = mgr.get_connection_info(server).unwrap();
    assert_eq!(info.state, ConnectionState::ClosedByPeer);
    assert_eq!(info.end_reason, end_reason::APP_GENERIC);
    assert!(mgr.get_connection_info(client).is_none());
    // The remembered client connection is not cleared by closing it.
    assert_eq!(mgr.client_connection(), Some(client));
}

#[test]
fn test_messages_sent_before_close_are_still_received() {
    let mut mgr = local_manager();
    let (server, client) = connected_pair(&mut mgr);

    mgr.send(client, b"goodbye", SendFlags::RELIABLE);
    mgr.close_connection(client);

    assert_eq!(mgr.receive_next_message(server).unwrap().payload(), b"goodbye");
}

#[test]
fn test_closing_connection_leaves_queued_events() {
    let mut mgr = local_manager();
    mgr.create_ip_listen_socket(27015);
    let client = mgr.connect_by_address("127.0.0.1:27015");
    mgr.pump();

    mgr.close_connection(client);

    assert_eq!(mgr.poll_next_event().map(|e| e.connection()), Some(client));
}

#[test]
fn test_bounded_event_queue_drops_overflow() {
    let mut mgr = NetworkManager::with_event_capacity(Some(Box::new(LocalTransport::default())), Some(1));
    mgr.create_ip_listen_socket(27015);

    mgr.connect_by_address("127.0.0.1:27015");
    mgr.pump();

    assert_eq!(mgr.pending_events(), 1);
    assert_eq!(mgr.dropped_events(), 1);
}
