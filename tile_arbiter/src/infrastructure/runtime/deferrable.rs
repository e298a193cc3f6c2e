// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Deferrable Executor
//!
//! Deferred execution of a named task, with the possibility to move the
//! scheduled execution time and to repeat the execution at a configured
//! period. On each wakeup the nearest pending request wins and all older
//! (non-periodic) requests are discarded, so a burst of `schedule` calls
//! coalesces into a single execution at the earliest requested time.
//!
//! ## Semantics
//!
//! - Each deferrable owns one private worker task; executions are strictly
//!   serialized in time.
//! - `schedule(Duration::ZERO)` requests immediate execution; a positive
//!   delay requests a future one. The earliest pending request wins.
//! - In periodic mode the next execution is armed at `now + period` after
//!   each run; a sooner `schedule` request pre-empts the period.
//! - `stop` is idempotent and cooperative: it wakes the worker and joins
//!   it, never interrupting an in-flight execution.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tile_arbiter::infrastructure::runtime::Deferrable;
//!
//! # async fn example() {
//! let deferrable = Deferrable::new(
//!     "rescheduler",
//!     Arc::new(|| Box::pin(async { /* one scheduling round */ })),
//!     None,
//! );
//! deferrable.start();
//! deferrable.schedule(Duration::from_millis(40));
//! # deferrable.stop().await;
//! # }
//! ```

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// The deferred operation: a factory producing one execution future.
pub type DeferredTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug)]
struct SchedState {
    period: Option<Duration>,
    next_fire: Option<Instant>,
    fire_now: bool,
    done: bool,
}

struct Shared {
    state: Mutex<SchedState>,
    notify: Notify,
    task: DeferredTask,
}

/// A named task with coalesced, optionally periodic execution.
pub struct Deferrable {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Deferrable {
    /// Build a new "on-demand" (`period: None`) or "repetitive" deferrable.
    ///
    /// The worker is not running until [`start`](Self::start) is called.
    pub fn new(name: impl Into<String>, task: DeferredTask, period: Option<Duration>) -> Self {
        Deferrable {
            name: name.into(),
            shared: Arc::new(Shared {
                state: Mutex::new(SchedState {
                    period,
                    next_fire: None,
                    fire_now: false,
                    done: false,
                }),
                notify: Notify::new(),
                task,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Deferrable name, used for logging
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the private worker. Must be called within a tokio runtime; a
    /// second call on a running deferrable is a no-op.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        {
            let mut state = self.shared.state.lock();
            state.done = false;
            // A repetitive deferrable arms its first period on start
            state.next_fire = state.period.map(|p| Instant::now() + p);
        }
        let shared = self.shared.clone();
        let name = self.name.clone();
        info!(deferrable = %name, "starting deferrable");
        *worker = Some(tokio::spawn(Self::executor(shared, name)));
    }

    /// Request an execution after `delay` (`Duration::ZERO` for now).
    ///
    /// Requests issued before the next wakeup are coalesced: the earliest
    /// requested fire time wins and later requests are dropped.
    pub fn schedule(&self, delay: Duration) {
        let mut state = self.shared.state.lock();
        if state.done {
            return;
        }

        if delay.is_zero() {
            debug!(deferrable = %self.name, "immediate scheduling required");
            state.fire_now = true;
        } else {
            let requested = Instant::now() + delay;
            match state.next_fire {
                Some(pending) if pending <= requested => {
                    debug!(
                        deferrable = %self.name,
                        delay_ms = delay.as_millis() as u64,
                        "nearer schedule already pending"
                    );
                    return;
                }
                _ => {
                    debug!(
                        deferrable = %self.name,
                        delay_ms = delay.as_millis() as u64,
                        "updating nearest schedule"
                    );
                    state.next_fire = Some(requested);
                }
            }
        }
        drop(state);
        self.shared.notify.notify_one();
    }

    /// Switch to (or update the) repetitive mode.
    pub fn set_periodic(&self, period: Duration) {
        let mut state = self.shared.state.lock();
        info!(
            deferrable = %self.name,
            period_ms = period.as_millis() as u64,
            "set repetitive mode"
        );
        state.period = Some(period);
        let periodic_fire = Instant::now() + period;
        if state.next_fire.map_or(true, |pending| periodic_fire < pending) {
            state.next_fire = Some(periodic_fire);
        }
        drop(state);
        self.shared.notify.notify_one();
    }

    /// Switch to on-demand mode; a pending one-shot request stays armed.
    pub fn set_on_demand(&self) {
        let mut state = self.shared.state.lock();
        info!(deferrable = %self.name, "set on-demand mode");
        state.period = None;
        drop(state);
        self.shared.notify.notify_one();
    }

    /// Stop the worker and wait for it to exit. Idempotent; an in-flight
    /// execution completes first, and no execution happens after the call
    /// returns.
    pub async fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.done {
                return;
            }
            debug!(deferrable = %self.name, "stopping deferrable");
            state.done = true;
        }
        self.shared.notify.notify_one();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn executor(shared: Arc<Shared>, name: String) {
        info!(deferrable = %name, "deferrable worker started");

        loop {
            enum Wakeup {
                Stop,
                Immediate,
                At(Instant),
                Idle,
            }

            let pending = {
                let state = shared.state.lock();
                if state.done {
                    Wakeup::Stop
                } else if state.fire_now {
                    Wakeup::Immediate
                } else {
                    match state.next_fire {
                        Some(at) => Wakeup::At(at),
                        None => Wakeup::Idle,
                    }
                }
            };

            match pending {
                Wakeup::Stop => break,
                Wakeup::Immediate => Self::execute(&shared, &name).await,
                Wakeup::At(at) => {
                    tokio::select! {
                        _ = time::sleep_until(at) => Self::execute(&shared, &name).await,
                        // A re-schedule or stop: loop around and re-evaluate
                        _ = shared.notify.notified() => {}
                    }
                }
                Wakeup::Idle => shared.notify.notified().await,
            }
        }

        info!(deferrable = %name, "deferrable worker ended");
    }

    async fn execute(shared: &Arc<Shared>, name: &str) {
        {
            let mut state = shared.state.lock();
            state.fire_now = false;
            state.next_fire = None;
        }

        debug!(deferrable = %name, "execution start");
        (shared.task)().await;
        debug!(deferrable = %name, "execution done");

        let mut state = shared.state.lock();
        if state.next_fire.is_none() {
            // Requests issued during the execution pre-empt the period
            state.next_fire = state.period.map(|p| Instant::now() + p);
        }
    }
}
