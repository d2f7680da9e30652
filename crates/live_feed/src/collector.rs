use std::any::Any;
use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Continuation {
    ContinueAfter(Duration),
    Continue,
    Exit,
}

#[derive(Debug, Clone)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

#[async_trait]
pub trait Collector: Send {
    type Error: Debug + Send;

    /// Name used in log messages.
    fn name(&self) -> &str;

    /// This method is regularly called and supposed to gather data.
    async fn run(&mut self) -> Result<Continuation, Self::Error>;

    /// Specifies how long to wait between calls to the `run` method.
    fn tick(&self) -> Option<Duration> {
        Some(Duration::from_secs(10))
    }

    /// Defines a backoff function, used to progressively increase the waiting
    /// time when consecutive failures happen.
    fn backoff(&self, last_backoff: Duration) -> Duration {
        last_backoff + self.tick().unwrap_or(Duration::from_secs(10))
    }

    /// Specifies the behavior if the collector returns an error.
    fn on_error(&self, _error: Self::Error) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }

    /// Specifies the behavior if the collector panics.
    fn on_panic(&self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

/// Sleeps for `duration`, returning `false` if cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = time::sleep(duration) => true,
    }
}

/// Spawns a collector created by `factory` and calls it once per tick until
/// it exits, is stopped by its supervision strategy or `cancel` fires.
/// Panics are caught and handled like errors.
pub fn run<C, F>(factory: F, cancel: CancellationToken) -> JoinHandle<()>
where
    C: Collector + 'static,
    F: 'static + Send + Fn() -> C,
{
    let mut collector = factory();

    tokio::spawn(async move {
        let mut interval = collector.tick().map(|tick| {
            let mut interval = time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        // the first tick completes immediately
        if let Some(interval) = &mut interval {
            interval.tick().await;
        }
        let mut backoff = collector.tick().unwrap_or(Duration::from_secs(10));

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let result = AssertUnwindSafe(collector.run()).catch_unwind().await;
            let strategy = match result {
                Ok(Ok(continuation)) => {
                    backoff = collector.tick().unwrap_or(Duration::from_secs(10));
                    match continuation {
                        Continuation::ContinueAfter(duration) => {
                            if !pause(duration, &cancel).await {
                                break;
                            }
                        }
                        Continuation::Continue => {
                            if let Some(interval) = &mut interval {
                                tokio::select! {
                                    _ = cancel.cancelled() => break,
                                    _ = interval.tick() => {}
                                }
                            }
                        }
                        Continuation::Exit => break,
                    }
                    continue;
                }
                Ok(Err(why)) => {
                    log::error!("collector '{}' failed: {:?}", collector.name(), why);
                    collector.on_error(why)
                }
                Err(why) => {
                    log::error!("collector '{}' panicked: {:?}", collector.name(), why);
                    collector.on_panic(why)
                }
            };

            match strategy {
                SupervisionStrategy::Restart => collector = factory(),
                SupervisionStrategy::Resume => {}
                SupervisionStrategy::Stop => break,
            }
            backoff = collector.backoff(backoff);
            if !pause(backoff, &cancel).await {
                break;
            }
        }
        log::debug!("collector '{}' stopped", collector.name());
    })
}
