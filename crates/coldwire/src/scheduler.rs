//! Background ticks driving job processing and dispatch.
//!
//! Each tick is a short-lived, bounded run. Ticks that overlap (a slow
//! run meeting the next trigger) are tolerated by the engine's per-row
//! claims; nothing here needs a lock.

use std::sync::Arc;
use std::time::Duration;

use coldwire_core::{Dispatcher, JobProcessor};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Spawn the dispatch and job-processing loops.
pub fn spawn(
    dispatcher: Arc<Dispatcher>,
    processor: Arc<JobProcessor>,
    dispatch_interval: Duration,
    jobs_interval: Duration,
    job_batch: u32,
) {
    tokio::spawn(dispatch_loop(dispatcher, dispatch_interval));
    tokio::spawn(jobs_loop(processor, jobs_interval, job_batch));
}

async fn dispatch_loop(dispatcher: Arc<Dispatcher>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match dispatcher.dispatch_batch(None).await {
            Ok(report) if report.sent > 0 || report.failed > 0 => {
                info!(
                    sent = report.sent,
                    failed = report.failed,
                    "Scheduled dispatch tick"
                );
            }
            Ok(report) => {
                debug!(reason = ?report.reason, "Scheduled dispatch tick idle");
            }
            Err(e) => {
                error!(error = %e, "Scheduled dispatch tick failed");
            }
        }
    }
}

async fn jobs_loop(processor: Arc<JobProcessor>, every: Duration, batch: u32) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match processor.run_pending(batch).await {
            Ok(report) if report.fetched > 0 => {
                debug!(
                    processed = report.processed,
                    failed = report.failed,
                    "Scheduled job tick"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "Scheduled job tick failed");
            }
        }
    }
}
