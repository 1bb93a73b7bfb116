//! Realtime link supervision.
//!
//! Spawns a thread that owns the `Realtime` connector, decodes every frame at
//! the boundary and forwards `LinkEvent`s over an unbounded channel. On error
//! or close it waits a fixed delay and reconnects; a reconnect re-delivers
//! `Open` followed by the same message stream, which consumers handle
//! idempotently.
//!
//! Each `RealtimeSupervisor` spawns exactly one thread that is shut down and
//! joined when the supervisor is dropped.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use washcall_traits::clock::Clock;
use washcall_traits::{Incoming, Realtime};

use crate::wire::{self, RealtimeMessage};

/// Backoff is slept in slices of this size so shutdown stays responsive.
const BACKOFF_SLICE: Duration = Duration::from_millis(100);

/// The open / message / error callbacks of the link, as values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Open,
    Message(RealtimeMessage),
    /// The link dropped (or never came up); a reconnect follows.
    Error(String),
}

pub struct RealtimeSupervisor {
    rx: xch::Receiver<LinkEvent>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl RealtimeSupervisor {
    pub fn spawn<R, C>(mut realtime: R, reconnect_delay: Duration, clock: C) -> Self
    where
        R: Realtime + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            'link: loop {
                if stop.load(Ordering::Relaxed) {
                    break;
                }

                let reason = match realtime.connect() {
                    Ok(mut stream) => {
                        tracing::info!("realtime link open");
                        if tx.send(LinkEvent::Open).is_err() {
                            break;
                        }
                        loop {
                            if stop.load(Ordering::Relaxed) {
                                break 'link;
                            }
                            match stream.recv() {
                                Ok(Incoming::Text(text)) => match wire::decode_message(&text) {
                                    Ok(msg) => {
                                        if tx.send(LinkEvent::Message(msg)).is_err() {
                                            tracing::debug!("link consumer gone, exiting");
                                            break 'link;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!(error = %e, "dropping undecodable frame");
                                    }
                                },
                                Ok(Incoming::Idle) => continue,
                                Ok(Incoming::Closed) => break "connection closed".to_string(),
                                Err(e) => break e.to_string(),
                            }
                        }
                    }
                    Err(e) => e.to_string(),
                };

                tracing::warn!(%reason, delay_ms = reconnect_delay.as_millis() as u64, "realtime link down; will reconnect");
                if tx.send(LinkEvent::Error(reason)).is_err() {
                    break;
                }

                let mut waited = Duration::ZERO;
                while waited < reconnect_delay {
                    if stop.load(Ordering::Relaxed) {
                        break 'link;
                    }
                    let step = BACKOFF_SLICE.min(reconnect_delay - waited);
                    clock.sleep(step);
                    waited += step;
                }
                tracing::debug!("reconnecting realtime link");
            }
            tracing::trace!("realtime supervisor exiting cleanly");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<LinkEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Drop for RealtimeSupervisor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread notices within one backoff slice, or after the current
        // recv() returns (bounded by the stream's read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("realtime supervisor joined"),
                Err(e) => tracing::warn!(?e, "realtime supervisor panicked during shutdown"),
            }
        }
    }
}
