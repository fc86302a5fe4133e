use std::future::Future;

use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// A group of scheduled tasks that share one cancellation token.
///
/// Every task spawned through a scope stops at its next await point once the
/// scope is cancelled or dropped, so nothing outlives the owner that armed it.
#[derive(Debug)]
pub struct TaskScope {
    token: CancellationToken,
}

impl Default for TaskScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScope {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A handle that cancels a single task without touching its siblings.
    pub fn child(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Runs `task` once after `delay` unless the scope is cancelled first.
    pub fn spawn_after<F>(&self, delay: Duration, task: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.child();
        let guard = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {}
                _ = time::sleep(delay) => {
                    if !guard.is_cancelled() {
                        task.await;
                    }
                }
            }
        });
        token
    }

    /// Calls `task` every `period`, first firing one period from now.
    pub fn spawn_every<F, Fut>(&self, period: Duration, mut task: F) -> CancellationToken
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.child();
        let guard = token.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    _ = ticker.tick() => {
                        if guard.is_cancelled() {
                            break;
                        }
                        task().await;
                    }
                }
            }
        });
        token
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
