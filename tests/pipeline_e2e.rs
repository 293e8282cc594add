use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use satscope::config::PipelineConfig;
use satscope::event::{Polarity, TraceEvent};
use satscope::graph::GraphSnapshot;
use satscope::lifecycle::{LifecycleEvent, LifecycleHub, MemorySink};
use satscope::pipeline::{Pipeline, PipelineHandle};
use satscope::wire::encode_frame;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

fn quiet_config(addr: &str) -> PipelineConfig {
    PipelineConfig::new(addr)
        // Decay far in the future so weight/heat assertions are exact.
        .with_decay_interval(Duration::from_secs(3600))
        .with_layout_interval(Duration::from_millis(30))
        .with_backoff(Duration::from_millis(50), Duration::from_millis(200))
}

/// Poll the latest snapshot until `predicate` holds or 5s elapse.
async fn wait_for_snapshot(
    handle: &PipelineHandle,
    predicate: impl Fn(&GraphSnapshot) -> bool,
) -> Arc<GraphSnapshot> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = handle.latest();
            if predicate(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("snapshot condition not reached in time")
}

fn weight_of(snapshot: &GraphSnapshot, a: u64, b: u64) -> Option<f32> {
    snapshot
        .edges
        .iter()
        .find(|e| (e.a, e.b) == (a.min(b), a.max(b)))
        .map(|e| e.weight)
}

#[tokio::test]
async fn chunked_stream_end_to_end() {
    let (listener, addr) = bind().await;
    let sink = MemorySink::new();
    let hub = LifecycleHub::with_sink(sink.clone());
    let handle = Pipeline::new(quiet_config(&addr))
        .with_lifecycle_hub(hub)
        .start();

    let producer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let events = [
            TraceEvent::ClauseObserved { vars: vec![1, 2] },
            TraceEvent::ClauseObserved { vars: vec![1, 2] },
            TraceEvent::VariableTouched {
                var: 1,
                polarity: Polarity::Positive,
                step: 9,
            },
            TraceEvent::Heartbeat,
            TraceEvent::StreamEnded,
        ];
        let bytes: Vec<u8> = events.iter().flat_map(encode_frame).collect();
        // Deliver in awkward chunks; framing must absorb any split.
        for chunk in bytes.chunks(3) {
            socket.write_all(chunk).await.unwrap();
            socket.flush().await.unwrap();
        }
        // Hold the socket open; the consumer drains on the end-of-stream
        // frame, not on EOF.
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    let defaults = PipelineConfig::default();
    let snapshot = wait_for_snapshot(&handle, |s| weight_of(s, 1, 2).is_some()).await;
    assert_eq!(snapshot.nodes.len(), 2);
    assert_eq!(
        weight_of(&snapshot, 1, 2),
        Some(defaults.weight_floor + 2.0 * defaults.clause_increment)
    );

    let snapshot =
        wait_for_snapshot(&handle, |s| s.nodes.get(&1).is_some_and(|n| n.heat > 0.0)).await;
    assert_eq!(snapshot.nodes[&1].heat, defaults.heat_max);
    assert_eq!(snapshot.nodes[&2].heat, 0.0);

    producer.await.unwrap();
    handle.shutdown().await;

    let events = sink.snapshot();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Connected { .. }))
    );
    assert!(
        events
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Disconnected { graceful: true, .. }))
    );
}

#[tokio::test]
async fn abrupt_disconnect_preserves_state_and_reconnects() {
    let (listener, addr) = bind().await;
    let sink = MemorySink::new();
    let hub = LifecycleHub::with_sink(sink.clone());
    let handle = Pipeline::new(quiet_config(&addr))
        .with_lifecycle_hub(hub)
        .start();

    let producer = tokio::spawn(async move {
        // First connection: three structural events, then vanish without
        // an end-of-stream frame.
        let (mut socket, _) = listener.accept().await.unwrap();
        for vars in [vec![1u64, 2], vec![2, 3], vec![3, 4]] {
            socket
                .write_all(&encode_frame(&TraceEvent::ClauseObserved { vars }))
                .await
                .unwrap();
        }
        socket.flush().await.unwrap();
        drop(socket);

        // The consumer reconnects with backoff; serve a fresh stream.
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(&encode_frame(&TraceEvent::ClauseObserved {
                vars: vec![4, 5],
            }))
            .await
            .unwrap();
        socket
            .write_all(&encode_frame(&TraceEvent::StreamEnded))
            .await
            .unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    // All three effects from the severed connection survive it.
    let snapshot = wait_for_snapshot(&handle, |s| s.edges.len() == 3).await;
    let defaults = PipelineConfig::default();
    let unit = defaults.weight_floor + defaults.clause_increment;
    for (a, b) in [(1, 2), (2, 3), (3, 4)] {
        assert_eq!(weight_of(&snapshot, a, b), Some(unit));
    }

    // Reconnection neither rolls back nor duplicates them.
    let snapshot = wait_for_snapshot(&handle, |s| s.edges.len() == 4).await;
    for (a, b) in [(1, 2), (2, 3), (3, 4), (4, 5)] {
        assert_eq!(weight_of(&snapshot, a, b), Some(unit));
    }

    producer.await.unwrap();
    handle.shutdown().await;

    let events = sink.snapshot();
    let connects = events
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::Connected { .. }))
        .count();
    assert_eq!(connects, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        LifecycleEvent::Disconnected {
            graceful: false,
            ..
        }
    )));
}

#[tokio::test]
async fn protocol_error_closes_and_reconnects() {
    let (listener, addr) = bind().await;
    let sink = MemorySink::new();
    let hub = LifecycleHub::with_sink(sink.clone());
    let handle = Pipeline::new(quiet_config(&addr))
        .with_lifecycle_hub(hub)
        .start();

    let producer = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(&encode_frame(&TraceEvent::ClauseObserved {
                vars: vec![1, 2],
            }))
            .await
            .unwrap();
        // Garbage frame: unknown tag.
        socket.write_all(&2u32.to_be_bytes()).await.unwrap();
        socket.write_all(&[0x66, 0x00]).await.unwrap();
        socket.flush().await.unwrap();

        // Consumer should close on the protocol error and come back.
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(&encode_frame(&TraceEvent::StreamEnded))
            .await
            .unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    // The valid frame before the garbage still lands.
    wait_for_snapshot(&handle, |s| s.edges.len() == 1).await;

    producer.await.unwrap();
    handle.shutdown().await;

    let events = sink.snapshot();
    assert!(events.iter().any(|e| matches!(
        e,
        LifecycleEvent::Error {
            kind: satscope::lifecycle::ErrorKind::Protocol,
            ..
        }
    )));
    let connects = events
        .iter()
        .filter(|e| matches!(e, LifecycleEvent::Connected { .. }))
        .count();
    assert_eq!(connects, 2);
}
