//! End-to-end tests for the frame streaming server.
//!
//! Each test runs a real server on an ephemeral localhost port and talks to
//! it with plain `TcpStream` clients through the reference wire decoder.

use framecast::wire::{read_frame, DecodedFrame};
use framecast::{RawChannel, RawFrame, ServerConfig, StreamServer};
use std::io;
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

fn start_server(queue_capacity: usize) -> StreamServer {
    let server = StreamServer::new(ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        queue_capacity,
        idle_poll_ms: 2,
    });
    server.start().unwrap();
    server
}

fn connect(server: &StreamServer) -> TcpStream {
    let stream = TcpStream::connect(server.local_addr().unwrap()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

/// Poll `cond` until it holds or the deadline passes.
fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "Timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Push one frame whose payload bytes encode `marker`.
fn push_marked(server: &StreamServer, marker: u8) {
    let depth = vec![marker; 6];
    let ir = vec![marker.wrapping_add(1); 4];
    server.push_frame(&RawFrame {
        depth: Some(RawChannel {
            width: 3,
            height: 1,
            byte_size: depth.len() as u32,
            data: &depth,
        }),
        color: None,
        ir: Some(RawChannel {
            width: 2,
            height: 2,
            byte_size: ir.len() as u32,
            data: &ir,
        }),
    });
}

fn read_one(stream: &mut TcpStream) -> io::Result<DecodedFrame> {
    read_frame(stream)
}

#[test]
fn test_fifo_delivery_and_wire_round_trip() {
    let server = start_server(10);
    let mut client = connect(&server);
    wait_until("client registration", || server.connected_clients() == 1);

    for marker in [7u8, 8, 9] {
        push_marked(&server, marker);
    }

    let mut last_timestamp = 0u64;
    for (i, marker) in [7u8, 8, 9].iter().enumerate() {
        let frame = read_one(&mut client).unwrap();
        assert_eq!(frame.header.sequence_id, i as u32 + 1);
        assert!(frame.header.timestamp_us >= last_timestamp);
        last_timestamp = frame.header.timestamp_us;

        assert_eq!(frame.header.depth.width, 3);
        assert_eq!(frame.header.depth.height, 1);
        assert_eq!(frame.depth, vec![*marker; 6]);

        // Absent channel: zero dims, zero payload bytes
        assert_eq!(frame.header.color.byte_size, 0);
        assert!(frame.color.is_empty());

        assert_eq!(frame.ir, vec![marker.wrapping_add(1); 4]);
    }

    server.stop();
}

#[test]
fn test_malformed_channel_streams_as_absent() {
    let server = start_server(10);
    let mut client = connect(&server);
    wait_until("client registration", || server.connected_clients() == 1);

    let depth = vec![5u8; 8];
    let bad_color = vec![1u8; 4];
    server.push_frame(&RawFrame {
        depth: Some(RawChannel {
            width: 2,
            height: 2,
            byte_size: depth.len() as u32,
            data: &depth,
        }),
        color: Some(RawChannel {
            width: 2,
            height: 2,
            byte_size: 999, // does not match the slice: downgraded
            data: &bad_color,
        }),
        ir: None,
    });

    let frame = read_one(&mut client).unwrap();
    assert_eq!(frame.depth, depth);
    assert_eq!(frame.header.color.byte_size, 0);
    assert!(frame.color.is_empty());

    server.stop();
}

#[test]
fn test_slow_client_does_not_stall_a_reading_client() {
    let server = start_server(10);

    let mut reader = connect(&server);
    let _stalled = connect(&server); // never reads
    wait_until("both clients", || server.connected_clients() == 2);

    // The reading client keeps up with production frame by frame while the
    // stalled one just accumulates and evicts.
    for i in 0..60u8 {
        push_marked(&server, i);
        let frame = read_one(&mut reader).unwrap();
        assert_eq!(frame.header.sequence_id, i as u32 + 1);
        assert_eq!(frame.depth, vec![i; 6]);
    }

    assert_eq!(server.connected_clients(), 2);
    server.stop();
}

#[test]
fn test_producer_latency_independent_of_queue_pressure() {
    let server = start_server(10);

    let _stalled = connect(&server); // never reads
    wait_until("client registration", || server.connected_clients() == 1);

    // Push far more frames than the queue holds; each call must return in
    // bounded time regardless of accumulated pressure.
    let mut max_push = Duration::ZERO;
    for i in 0..500u32 {
        let started = Instant::now();
        push_marked(&server, (i % 256) as u8);
        max_push = max_push.max(started.elapsed());
    }

    assert_eq!(server.frames_pushed(), 500);
    assert!(
        max_push < Duration::from_millis(100),
        "push_frame took {:?} under queue pressure",
        max_push
    );

    server.stop();
}

#[test]
fn test_disconnect_is_contained_to_one_session() {
    let server = start_server(10);

    let mut survivor = connect(&server);
    let doomed = connect(&server);
    wait_until("both clients", || server.connected_clients() == 2);

    doomed.shutdown(Shutdown::Both).unwrap();
    drop(doomed);

    // Keep producing until the dead session notices its writes failing.
    // Large-ish frames fill the kernel buffer faster.
    let filler = vec![0xEE; 16 * 1024];
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.connected_clients() != 1 {
        assert!(Instant::now() < deadline, "Dead session never torn down");
        server.push_frame(&RawFrame {
            depth: Some(RawChannel {
                width: 128,
                height: 64,
                byte_size: filler.len() as u32,
                data: &filler,
            }),
            color: None,
            ir: None,
        });
        std::thread::sleep(Duration::from_millis(5));
    }

    // The surviving client still receives: push a marker and drain to it.
    push_marked(&server, 42);
    let final_seq = server.frames_pushed() as u32;
    let mut last_seq = 0;
    loop {
        let frame = read_one(&mut survivor).unwrap();
        assert!(frame.header.sequence_id > last_seq, "Out-of-order delivery");
        last_seq = frame.header.sequence_id;
        if frame.header.sequence_id == final_seq {
            assert_eq!(frame.depth, vec![42u8; 6]);
            break;
        }
    }

    server.stop();
}

#[test]
fn test_stop_winds_down_sessions_and_releases_port() {
    let server = start_server(10);
    let addr = server.local_addr().unwrap();

    let mut client = connect(&server);
    wait_until("client registration", || server.connected_clients() == 1);

    server.stop();
    assert!(!server.is_running());

    // Sessions observe shutdown and close their sockets; the client sees
    // either a clean EOF or a reset, never a hang.
    wait_until("sessions to wind down", || server.connected_clients() == 0);
    let mut rest = Vec::new();
    let _ = io::Read::read_to_end(&mut client, &mut rest);

    // Listener is gone: new connections are refused
    assert!(TcpStream::connect(addr).is_err());

    // And the server can be started again afterwards
    server.start().unwrap();
    let mut reconnected = connect(&server);
    wait_until("client after restart", || server.connected_clients() == 1);
    push_marked(&server, 3);
    let frame = read_one(&mut reconnected).unwrap();
    assert_eq!(frame.header.sequence_id, 1);
    assert_eq!(frame.depth, vec![3u8; 6]);
    server.stop();
}

#[test]
fn test_synthetic_source_streams_end_to_end() {
    use framecast::source::TestPatternSource;
    use framecast::SourceConfig;

    let server = start_server(10);
    let mut client = connect(&server);
    wait_until("client registration", || server.connected_clients() == 1);

    let mut source = TestPatternSource::new(SourceConfig {
        width: 16,
        height: 8,
        frame_rate: 30,
        color: true,
        ir: false,
    });

    for _ in 0..3 {
        let raw = source.next_frame();
        server.push_frame(&raw);
    }

    for expected_seq in 1..=3u32 {
        let frame = read_one(&mut client).unwrap();
        assert_eq!(frame.header.sequence_id, expected_seq);
        assert_eq!(frame.header.depth.byte_size, 16 * 8 * 2);
        assert_eq!(frame.header.color.byte_size, 16 * 8 * 3);
        assert_eq!(frame.header.ir.byte_size, 0);
        assert_eq!(frame.depth.len(), 16 * 8 * 2);
    }

    server.stop();
}
