use std::future::Future;
use std::pin::Pin;

/// The deferred work that dispatches one batch window. It first waits until a
/// task awaiting one of the window's loads has suspended, then takes the
/// window's keys; everything registered before then is included.
pub type Flush = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Decides when a batch window closes. A [`BatchLoader`](crate::BatchLoader)
/// calls [`schedule`](Scheduler::schedule) exactly once per window, when the
/// first key lands in an empty window. The scheduler must eventually poll the
/// [`Flush`] to completion; the flush itself holds the window open until its
/// first waiter has suspended, so a scheduler only adds extra delay on top.
pub trait Scheduler: Send + Sync + 'static {
    fn schedule(&self, flush: Flush);
}

/// Closes the window as soon as a task waiting on it has suspended. The flush
/// is spawned onto the Tokio runtime and adds no delay of its own, so futures
/// that are being polled together (e.g. with `tokio::join!`) all land in the
/// same batch, whichever worker thread picks up the flush.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldScheduler;

impl Scheduler for YieldScheduler {
    fn schedule(&self, flush: Flush) {
        tokio::spawn(flush);
    }
}

/// Closes the window after a fixed delay. Useful when loads for one request
/// are spread over several tasks that don't run back to back.
#[derive(Debug, Clone, Copy)]
pub struct DelayScheduler {
    delay: tokio::time::Duration,
}

impl DelayScheduler {
    pub fn new(delay: tokio::time::Duration) -> Self {
        DelayScheduler { delay }
    }
}

impl Scheduler for DelayScheduler {
    fn schedule(&self, flush: Flush) {
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flush.await;
        });
    }
}
