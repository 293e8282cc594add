use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;

use satscope::event::{Literal, Polarity, TraceEvent};
use satscope::graph::{GraphParams, InteractionGraph};
use satscope::ingest::{EventProcessor, ingest_channel};
use satscope::lifecycle::{LifecycleEvent, LifecycleHub, MemorySink};

fn touch(var: u64) -> TraceEvent {
    TraceEvent::VariableTouched {
        var,
        polarity: Polarity::Positive,
        step: 0,
    }
}

fn spawn_processor(
    decay_interval: Duration,
    hub: &LifecycleHub,
) -> (
    Arc<RwLock<InteractionGraph>>,
    satscope::ingest::EventQueue,
    watch::Sender<bool>,
    tokio::task::JoinHandle<()>,
) {
    let graph = Arc::new(RwLock::new(InteractionGraph::new(GraphParams::default())));
    let (queue, rx) = ingest_channel(64, Duration::from_secs(1), hub.emitter());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = EventProcessor::new(
        graph.clone(),
        rx,
        decay_interval,
        hub.emitter(),
        shutdown_rx,
    );
    let task = tokio::spawn(processor.run());
    (graph, queue, shutdown_tx, task)
}

#[tokio::test]
async fn clause_touch_heartbeat_scenario() {
    let hub = LifecycleHub::with_sink(MemorySink::new());
    // Decay interval far in the future so heat stays untouched.
    let (graph, queue, shutdown, task) = spawn_processor(Duration::from_secs(600), &hub);

    for event in [
        TraceEvent::ClauseObserved { vars: vec![1, 2] },
        TraceEvent::ClauseObserved { vars: vec![1, 2] },
        touch(1),
        TraceEvent::Heartbeat,
    ] {
        assert!(queue.push(event).await);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    {
        let g = graph.read();
        let p = GraphParams::default();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(
            g.weight_of(1, 2),
            Some(p.weight_floor + 2.0 * p.clause_increment)
        );
        assert_eq!(g.heat_of(1), Some(p.heat_max));
        assert_eq!(g.heat_of(2), Some(0.0));
    }

    shutdown.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn solution_marks_terminal_and_notifies() {
    let sink = MemorySink::new();
    let hub = LifecycleHub::with_sink(sink.clone());
    hub.listen();
    let (graph, queue, shutdown, task) = spawn_processor(Duration::from_secs(600), &hub);

    queue
        .push(TraceEvent::SolutionFound {
            assignment: vec![Literal::new(1, true)],
        })
        .await;
    // Terminal does not stop ingestion of later liveness events.
    queue.push(TraceEvent::Heartbeat).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(graph.read().is_terminal());
    assert!(
        sink.snapshot()
            .iter()
            .any(|e| matches!(e, LifecycleEvent::Terminal))
    );

    shutdown.send(true).unwrap();
    task.await.unwrap();
    hub.stop().await;
}

#[tokio::test]
async fn stream_end_closes_structural_ingestion_but_decay_continues() {
    let hub = LifecycleHub::with_sink(MemorySink::new());
    let (graph, queue, shutdown, task) = spawn_processor(Duration::from_millis(20), &hub);

    queue
        .push(TraceEvent::ClauseObserved { vars: vec![1, 2] })
        .await;
    queue.push(touch(1)).await;
    queue.push(TraceEvent::StreamEnded).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let heat_after_end = graph.read().heat_of(1).unwrap();
    let generation_after_end = graph.read().generation();

    // Structural events after the end are ignored.
    queue
        .push(TraceEvent::ClauseObserved { vars: vec![8, 9] })
        .await;
    // Decay keeps ticking: heat cools below where it was.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let g = graph.read();
    assert_eq!(g.edge_count(), 1);
    assert_eq!(g.heat_of(8), None);
    assert!(g.heat_of(1).unwrap() < heat_after_end);
    assert!(g.generation() > generation_after_end);

    drop(g);
    shutdown.send(true).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn queue_closure_keeps_decay_alive() {
    let hub = LifecycleHub::with_sink(MemorySink::new());
    let (graph, queue, shutdown, task) = spawn_processor(Duration::from_millis(20), &hub);

    queue.push(touch(1)).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(queue); // connection side gone for good

    let heat_before = graph.read().heat_of(1).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(graph.read().heat_of(1).unwrap() < heat_before);

    shutdown.send(true).unwrap();
    task.await.unwrap();
}
