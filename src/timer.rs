/// file: src/timer.rs
/// description: cancellable timer handles; a slot holds at most one live timer task
use std::{future::Future, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Owns at most one running timer task. Installing a new task always
/// aborts the previous one first, and dropping the slot aborts whatever is
/// still running.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    pub fn replace(&mut self, handle: JoinHandle<()>) {
        if self.cancel() {
            debug!(timer = self.name, "Replaced running timer");
        }
        self.handle = Some(handle);
    }

    /// Aborts the running task. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawns a task that calls `tick` every `period`, first one full period
/// after spawning. Ticks run to completion before the next is awaited.
pub fn spawn_repeating<F, Fut>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tick().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counting(period: Duration, hits: &Arc<AtomicUsize>) -> JoinHandle<()> {
        let hits = hits.clone();
        spawn_repeating(period, move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new("test");
        slot.replace(counting(Duration::from_secs(30), &hits));

        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_never_stacks_timers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new("test");
        for _ in 0..4 {
            slot.replace(counting(Duration::from_secs(10), &hits));
        }
        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_safe_when_idle() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = TimerSlot::new("test");
        assert!(!slot.cancel());

        slot.replace(counting(Duration::from_secs(10), &hits));
        assert!(slot.is_running());
        assert!(slot.cancel());
        assert!(!slot.is_running());

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
