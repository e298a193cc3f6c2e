// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! Graceful shutdown across the daemon's components: a clonable
//! cancellation token workers select on, plus a coordinator that initiates
//! shutdown and enforces a grace period before the process gives up on
//! stragglers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Default grace period for graceful shutdown
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Clonable cancellation token for signaling shutdown to async tasks.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Trip the token, waking every waiter
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether the token has been tripped
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the token is tripped; returns immediately if it already
    /// is.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                break;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Coordinates graceful shutdown with a bounded grace period.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    grace_period: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator with the given grace period
    pub fn new(grace_period: Duration) -> Self {
        ShutdownCoordinator {
            token: CancellationToken::new(),
            grace_period,
        }
    }

    /// Token for worker tasks to select on
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether shutdown has been initiated
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Initiate shutdown: trip the token so workers wind down
    pub fn initiate_shutdown(&self) {
        info!("initiating graceful shutdown");
        self.token.cancel();
    }

    /// Run `drain` with the grace period as a deadline.
    pub async fn wait_for<F>(&self, drain: F)
    where
        F: std::future::Future<Output = ()>,
    {
        if tokio::time::timeout(self.grace_period, drain).await.is_err() {
            warn!(
                grace_period_ms = self.grace_period.as_millis() as u64,
                "grace period elapsed, abandoning stragglers"
            );
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}
