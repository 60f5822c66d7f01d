//! Criterion benchmarks for the event queue and the manager's tick loop.
//!
//! Run with:
//! ```bash
//! cargo bench --package netbridge-manager --bench event_queue_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netbridge_core::{ConnectionHandle, ConnectionState, Event, NetworkAddress, SendFlags};
use netbridge_manager::{EventQueue, LocalTransport, NetworkManager};

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_queue_push_pop");
    for batch in [1u32, 64, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &n| {
            let queue = EventQueue::new();
            b.iter(|| {
                for i in 0..n {
                    queue.push(Event::new(
                        ConnectionHandle(i + 1),
                        ConnectionState::Connecting,
                        ConnectionState::Connected,
                    ));
                }
                while let Some(event) = queue.pop() {
                    black_box(event);
                }
            })
        });
    }
    group.finish();
}

fn bench_echo_round_trip(c: &mut Criterion) {
    // One connected pair, reused across iterations.
    let mut manager = NetworkManager::new(Some(Box::new(LocalTransport::default())));
    assert!(manager.create_ip_listen_socket(27015).is_valid());
    let client = manager.connect_by_address(&NetworkAddress::any(27015).to_string());
    assert!(client.is_valid());
    manager.pump();
    let mut server = ConnectionHandle::INVALID;
    while let Some(event) = manager.poll_next_event() {
        if event.is_incoming_request() && event.connection() != client {
            server = event.connection();
            manager.accept_connection(server);
        }
    }
    assert!(server.is_valid());
    manager.pump();
    while manager.poll_next_event().is_some() {}

    c.bench_function("echo_round_trip", |b| {
        b.iter(|| {
            manager.send_to_client(black_box(b"ping"), SendFlags::RELIABLE);
            let msg = manager.receive_next_message(server);
            if let Some(msg) = msg {
                manager.send(server, msg.payload(), SendFlags::RELIABLE);
            }
            black_box(manager.receive_next_message(client))
        })
    });
}

criterion_group!(benches, bench_push_pop, bench_echo_round_trip);
criterion_main!(benches);
