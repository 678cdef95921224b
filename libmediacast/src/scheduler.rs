//! Publish scheduling
//!
//! A single worker task owns every publish cycle. The interval timer
//! and manual triggers both feed it, so the timer-driven and the
//! admin-driven publish path can never race on the same queue head.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::db::Database;
use crate::error::{MediacastError, Result};
use crate::publisher::{PublishOutcome, Publisher};

/// Probe cadence while no interval is configured.
const IDLE_PROBE: Duration = Duration::from_secs(60);

enum Command {
    PublishNow {
        reply: oneshot::Sender<Result<PublishOutcome>>,
    },
}

/// Handle for submitting work into the scheduler worker.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
}

impl SchedulerHandle {
    /// Run one publish cycle on the worker and wait for its outcome.
    ///
    /// The cycle is serialized with the timer, and the timer re-arms
    /// afterwards, so the next automatic publish is at least one full
    /// interval away.
    pub async fn publish_now(&self) -> Result<PublishOutcome> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::PublishNow { reply })
            .await
            .map_err(|_| MediacastError::SchedulerStopped)?;
        response.await.map_err(|_| MediacastError::SchedulerStopped)?
    }
}

/// The scheduling worker. States: idle (no interval configured),
/// waiting (timer armed), stopped (shutdown observed).
pub struct Scheduler {
    db: Database,
    publisher: Publisher,
    commands: mpsc::Receiver<Command>,
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    /// Build the worker and the handle that feeds it.
    pub fn new(
        db: Database,
        publisher: Publisher,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                db,
                publisher,
                commands: rx,
                shutdown,
            },
            SchedulerHandle { commands: tx },
        )
    }

    /// Run until shutdown. No single cycle's failure stops the loop.
    ///
    /// Settings are re-read before every arming decision, so interval
    /// changes take effect on the next arming, never retroactively on
    /// an already-armed timer.
    pub async fn run(self) {
        let Scheduler {
            db,
            publisher,
            mut commands,
            mut shutdown,
        } = self;

        info!("scheduler starting");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let interval = current_interval(&db).await;
            let wait = match interval {
                Some(minutes) => Duration::from_secs(minutes as u64 * 60),
                None => IDLE_PROBE,
            };

            tokio::select! {
                _ = sleep(wait) => {
                    if interval.is_some() {
                        tick(&publisher).await;
                    } else {
                        debug!("no interval configured, staying idle");
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::PublishNow { reply }) => {
                            let outcome = publisher.publish_next().await;
                            let _ = reply.send(outcome);
                        }
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        info!("scheduler stopped");
    }
}

/// One timer-driven publish cycle. Errors are logged, never fatal; the
/// failed post stays at the head and the next cycle retries it.
async fn tick(publisher: &Publisher) {
    match publisher.publish_next().await {
        Ok(PublishOutcome::Published(post)) => {
            info!(post_id = post.id, "auto-published queue head");
        }
        Ok(PublishOutcome::QueueEmpty) => {
            debug!("queue empty, nothing to publish");
        }
        Err(e) => {
            error!("publish cycle failed: {}", e);
        }
    }
}

async fn current_interval(db: &Database) -> Option<i64> {
    match db.settings().await {
        Ok(Some(settings)) if settings.interval_minutes > 0 => Some(settings.interval_minutes),
        Ok(_) => None,
        Err(e) => {
            error!("failed to read settings: {}", e);
            None
        }
    }
}
