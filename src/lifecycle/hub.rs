use std::sync::{Arc, Mutex};

use tokio::{sync::oneshot, task};

use super::LifecycleEvent;
use super::sink::{LifecycleSink, TracingSink};

/// Cloneable handle pipeline tasks use to emit lifecycle events.
///
/// Emission is synchronous and non-blocking; if the hub is gone the event is
/// silently discarded (observers are best-effort by design).
#[derive(Clone, Debug)]
pub struct LifecycleEmitter {
    tx: flume::Sender<LifecycleEvent>,
}

impl LifecycleEmitter {
    pub fn emit(&self, event: LifecycleEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("lifecycle hub closed; event dropped");
        }
    }

    /// An emitter wired to nothing, for tests and standalone components.
    pub fn disconnected() -> Self {
        let (tx, _) = flume::unbounded();
        Self { tx }
    }
}

/// Receives lifecycle events and broadcasts them to registered sinks.
pub struct LifecycleHub {
    sinks: Arc<Mutex<Vec<Box<dyn LifecycleSink>>>>,
    channel: (flume::Sender<LifecycleEvent>, flume::Receiver<LifecycleEvent>),
    listener: Arc<Mutex<Option<ListenerState>>>,
}

impl Default for LifecycleHub {
    fn default() -> Self {
        Self::with_sink(TracingSink)
    }
}

impl LifecycleHub {
    /// Create a hub with a single sink.
    pub fn with_sink<S>(sink: S) -> Self
    where
        S: LifecycleSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create a hub with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn LifecycleSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Dynamically add a sink.
    pub fn add_sink<S: LifecycleSink + 'static>(&self, sink: S) {
        self.sinks.lock().unwrap().push(Box::new(sink));
    }

    /// Get an emitter for producers.
    pub fn emitter(&self) -> LifecycleEmitter {
        LifecycleEmitter {
            tx: self.channel.0.clone(),
        }
    }

    /// Spawn a background task that listens for events and broadcasts to all
    /// sinks. Idempotent: calling multiple times has no effect.
    pub fn listen(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            let broadcast = |event: LifecycleEvent| {
                let mut sinks_guard = sinks.lock().unwrap();
                for sink in sinks_guard.iter_mut() {
                    if let Err(e) = sink.handle(&event) {
                        tracing::debug!(error = %e, "lifecycle sink error");
                    }
                }
            };
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        // Flush whatever was queued before the stop request.
                        while let Ok(event) = receiver.try_recv() {
                            broadcast(event);
                        }
                        break;
                    }
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => broadcast(event),
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the background listener task, flushing events already queued.
    pub async fn stop(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for LifecycleHub {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
