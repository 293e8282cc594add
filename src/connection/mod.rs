//! Producer connection lifecycle.
//!
//! The [`ConnectionManager`] owns one active transport connection to the
//! producer, reads and decodes frames, and pushes typed events into the
//! bounded ingestion queue. On unexpected loss it reconnects with capped
//! exponential backoff, leaving the graph untouched in the meantime; on a
//! graceful `StreamEnded` it drains and stops. No replay or resume is
//! attempted on reconnection — the producer either restarts the trace or
//! the consumer accepts a fresh stream.

mod backoff;

pub use backoff::BackoffPolicy;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::event::TraceEvent;
use crate::ingest::EventQueue;
use crate::lifecycle::{ErrorKind, LifecycleEmitter, LifecycleEvent};
use crate::wire::{FrameDecoder, WireError};

/// Externally visible connection states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// A graceful end-of-stream frame arrived; remaining buffered frames
    /// are delivered before the connection closes for good.
    Draining,
}

enum ReadOutcome {
    /// `StreamEnded` was delivered; the trace is complete.
    Graceful,
    /// External stop request.
    Stopped,
    /// Event processor is gone; nothing left to feed.
    QueueClosed,
    /// The stream violated the frame format.
    Protocol(WireError),
    /// Socket-level failure.
    Transport(String),
}

/// Owns the socket lifecycle, reconnection, and frame dispatch.
pub struct ConnectionManager {
    addr: String,
    queue: EventQueue,
    lifecycle: LifecycleEmitter,
    backoff: BackoffPolicy,
    read_buffer_size: usize,
    max_frame_len: usize,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
}

impl ConnectionManager {
    pub fn new(
        config: &PipelineConfig,
        queue: EventQueue,
        lifecycle: LifecycleEmitter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            addr: config.producer_addr.clone(),
            queue,
            lifecycle,
            backoff: BackoffPolicy::new(config.backoff_base, config.backoff_cap),
            read_buffer_size: config.read_buffer_size,
            max_frame_len: config.max_frame_len,
            shutdown,
            state: ConnectionState::Disconnected,
        }
    }

    fn transition(&mut self, state: ConnectionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "connection state");
            self.state = state;
        }
    }

    /// Connect-read-reconnect loop. Returns on graceful stream end, on the
    /// external stop signal, or when the processing side has shut down.
    pub async fn run(mut self) {
        let mut shutdown = self.shutdown.clone();
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.transition(ConnectionState::Connecting);
            let attempt = self.backoff.attempts() + 1;
            let connect = tokio::select! {
                _ = shutdown.changed() => break,
                connect = TcpStream::connect(&self.addr) => connect,
            };
            let stream = match connect {
                Ok(stream) => stream,
                Err(e) => {
                    self.transition(ConnectionState::Disconnected);
                    self.lifecycle.emit(LifecycleEvent::Error {
                        kind: ErrorKind::Transport,
                        detail: e.to_string(),
                    });
                    let delay = self.backoff.next_delay();
                    tracing::warn!(addr = %self.addr, attempt, error = %e, delay = ?delay, "connect failed; backing off");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            };

            let connection_id = Uuid::new_v4().to_string();
            self.backoff.reset();
            self.transition(ConnectionState::Connected);
            self.lifecycle.emit(LifecycleEvent::Connected {
                connection_id: connection_id.clone(),
                addr: self.addr.clone(),
                attempt,
            });
            tracing::info!(connection_id = %connection_id, addr = %self.addr, "producer connected");

            match self.read_loop(stream).await {
                ReadOutcome::Graceful => {
                    self.transition(ConnectionState::Disconnected);
                    self.lifecycle.emit(LifecycleEvent::Disconnected {
                        connection_id,
                        graceful: true,
                        reason: None,
                    });
                    break;
                }
                ReadOutcome::Stopped | ReadOutcome::QueueClosed => break,
                ReadOutcome::Protocol(err) => {
                    // The stream is unreliable from here; close and retry
                    // with a fresh connection.
                    self.transition(ConnectionState::Disconnected);
                    tracing::warn!(connection_id = %connection_id, error = %err, "protocol error; closing connection");
                    self.lifecycle.emit(LifecycleEvent::Error {
                        kind: ErrorKind::Protocol,
                        detail: err.to_string(),
                    });
                    self.lifecycle.emit(LifecycleEvent::Disconnected {
                        connection_id,
                        graceful: false,
                        reason: Some(err.to_string()),
                    });
                    let delay = self.backoff.next_delay();
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                ReadOutcome::Transport(detail) => {
                    self.transition(ConnectionState::Disconnected);
                    tracing::warn!(connection_id = %connection_id, detail = %detail, "connection lost");
                    self.lifecycle.emit(LifecycleEvent::Error {
                        kind: ErrorKind::Transport,
                        detail: detail.clone(),
                    });
                    self.lifecycle.emit(LifecycleEvent::Disconnected {
                        connection_id,
                        graceful: false,
                        reason: Some(detail),
                    });
                    let delay = self.backoff.next_delay();
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn read_loop(&mut self, mut stream: TcpStream) -> ReadOutcome {
        let mut decoder = FrameDecoder::new(self.max_frame_len);
        let mut buf = vec![0u8; self.read_buffer_size];
        let mut shutdown = self.shutdown.clone();
        loop {
            let read = tokio::select! {
                _ = shutdown.changed() => return ReadOutcome::Stopped,
                read = stream.read(&mut buf) => read,
            };
            let n = match read {
                Ok(0) => return ReadOutcome::Transport("unexpected end of stream".into()),
                Ok(n) => n,
                Err(e) => return ReadOutcome::Transport(e.to_string()),
            };
            decoder.feed(&buf[..n]);
            loop {
                match decoder.next_frame() {
                    Ok(Some(event)) => {
                        let ended = matches!(event, TraceEvent::StreamEnded);
                        if ended {
                            self.transition(ConnectionState::Draining);
                        }
                        let pushed = tokio::select! {
                            _ = shutdown.changed() => return ReadOutcome::Stopped,
                            pushed = self.queue.push(event) => pushed,
                        };
                        if !pushed {
                            return ReadOutcome::QueueClosed;
                        }
                        if ended {
                            return ReadOutcome::Graceful;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => return ReadOutcome::Protocol(err),
                }
            }
        }
    }
}
