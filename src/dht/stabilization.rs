//! Background schedulers that keep the ring healing.
//!
//! Three independent periodic jobs drive a node's self-maintenance:
//! stabilization, finger fixing and the predecessor liveness probe.
//! Each runs single-flight (a cycle finishes before its next tick is
//! armed), they share one cancellation token, and a failed cycle is
//! logged and retried on the next tick; the protocol has no other
//! retry mechanism by design.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::chord::RingNode;
use crate::error::Result;

/// Periodic driver of one [RingNode]'s maintenance jobs.
pub struct Stabilization {
    chord: Arc<RingNode>,
}

impl Stabilization {
    pub fn new(chord: Arc<RingNode>) -> Self {
        Self { chord }
    }

    /// Spawn the three schedulers. They stop when the node's shutdown
    /// token is cancelled.
    pub fn spawn(self) {
        let config = self.chord.config().clone();
        let token = self.chord.shutdown_token();

        let chord = self.chord.clone();
        tokio::spawn(run_periodic(
            "stabilize",
            config.stabilize_interval(),
            token.clone(),
            move || {
                let chord = chord.clone();
                async move { chord.stabilize().await }
            },
        ));

        let chord = self.chord.clone();
        tokio::spawn(run_periodic(
            "fix_finger",
            config.fix_finger_interval(),
            token.clone(),
            move || {
                let chord = chord.clone();
                async move { chord.fix_finger().await }
            },
        ));

        let chord = self.chord;
        tokio::spawn(run_periodic(
            "check_predecessor",
            config.check_predecessor_interval(),
            token,
            move || {
                let chord = chord.clone();
                async move { chord.check_predecessor().await }
            },
        ));
    }
}

/// Single-flight ticker: the job runs to completion before the next
/// tick is armed, so slow cycles delay instead of piling up.
async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    shutdown: CancellationToken,
    job: F,
) where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(job = name, "scheduler stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = job().await {
                    tracing::warn!(job = name, error = %e, "background cycle failed, retrying next tick");
                }
            }
        }
    }
}
