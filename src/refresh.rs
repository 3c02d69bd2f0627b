/// file: src/refresh.rs
/// description: periodic section reloads gated on the active section and page visibility
use crate::{
    monitoring::REFRESH_TICK_COUNTER,
    router::{Section, SectionLoader},
    timer::{TimerSlot, spawn_repeating},
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

struct RefreshState {
    timer: TimerSlot,
    interval: Option<Duration>,
    paused: bool,
}

/// Re-runs a section's load on a fixed period. With a `target` the tick
/// only reloads while that section is active; without one every tick
/// reloads.
pub struct RefreshController {
    name: &'static str,
    target: Option<Section>,
    fallback: Section,
    active: watch::Receiver<Section>,
    loader: Arc<dyn SectionLoader>,
    state: Mutex<RefreshState>,
}

impl RefreshController {
    /// `fallback` is the section loaded by untargeted ticks.
    pub fn new(
        name: &'static str,
        target: Option<Section>,
        fallback: Section,
        active: watch::Receiver<Section>,
        loader: Arc<dyn SectionLoader>,
    ) -> Self {
        Self {
            name,
            target,
            fallback,
            active,
            loader,
            state: Mutex::new(RefreshState {
                timer: TimerSlot::new(name),
                interval: None,
                paused: false,
            }),
        }
    }

    /// Starts ticking every `interval`, replacing any running timer.
    pub fn start(&self, interval: Duration) {
        let mut state = self.state.lock();
        state.interval = Some(interval);
        state.paused = false;
        state.timer.replace(self.spawn_ticker(interval));
        info!(refresh = self.name, ?interval, "Refresh started");
    }

    pub fn stop(&self) {
        let mut state = self.state.lock();
        if state.timer.cancel() {
            info!(refresh = self.name, "Refresh stopped");
        }
        state.paused = false;
    }

    /// Stops ticking but keeps the interval for `resume`.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        state.timer.cancel();
        state.paused = true;
        debug!(refresh = self.name, "Refresh paused");
    }

    /// Restarts with the interval of the last `start`. Without a prior
    /// `start` there is nothing to resume.
    pub fn resume(&self) {
        let interval = self.state.lock().interval;
        match interval {
            Some(interval) => self.start(interval),
            None => debug!(refresh = self.name, "resume() before start(), ignored"),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().timer.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn spawn_ticker(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let name = self.name;
        let target = self.target;
        let fallback = self.fallback;
        let active = self.active.clone();
        let loader = self.loader.clone();

        spawn_repeating(interval, move || {
            let current = *active.borrow();
            let loader = loader.clone();
            async move {
                REFRESH_TICK_COUNTER.increment(1);
                let section = match target {
                    Some(target) if target != current => {
                        trace!(refresh = name, %current, "Tick skipped, target not active");
                        return;
                    }
                    Some(target) => target,
                    None => fallback,
                };
                if let Err(e) = loader.load(section).await {
                    error!(refresh = name, %section, "Error refreshing data: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::testing::{Journal, RecordingLoader};
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_secs(30);
    const EPSILON: Duration = Duration::from_millis(10);

    fn controller(
        target: Option<Section>,
        initial: Section,
        fail: bool,
    ) -> (RefreshController, watch::Sender<Section>, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let (active_tx, active_rx) = watch::channel(initial);
        let loader = Arc::new(RecordingLoader {
            journal: journal.clone(),
            fail,
        });
        let controller = RefreshController::new(
            "test",
            target,
            Section::News,
            active_rx,
            loader,
        );
        (controller, active_tx, journal)
    }

    async fn tick_past(periods: u32) {
        sleep(PERIOD * periods + EPSILON).await;
    }

    #[tokio::test(start_paused = true)]
    async fn reloads_target_once_per_period() {
        let (refresh, _active, journal) = controller(Some(Section::Dashboard), Section::Dashboard, false);
        refresh.start(PERIOD);

        sleep(PERIOD - EPSILON).await;
        assert!(journal.take().is_empty());
        sleep(EPSILON * 2).await;
        assert_eq!(journal.take(), vec!["load dashboard"]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume() {
        let (refresh, _active, journal) = controller(Some(Section::Dashboard), Section::Dashboard, false);
        refresh.start(PERIOD);
        refresh.pause();
        assert!(refresh.is_paused());

        tick_past(3).await;
        assert!(journal.take().is_empty());

        refresh.resume();
        tick_past(1).await;
        assert_eq!(journal.take(), vec!["load dashboard"]);
        assert!(refresh.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_target_ticks_do_nothing_but_keep_schedule() {
        let (refresh, active, journal) = controller(Some(Section::Dashboard), Section::Wallet, false);
        refresh.start(PERIOD);

        tick_past(2).await;
        assert!(journal.take().is_empty());

        active.send_replace(Section::Dashboard);
        sleep(PERIOD).await;
        assert_eq!(journal.take(), vec!["load dashboard"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_reload_keeps_timer_alive() {
        let (refresh, _active, journal) = controller(Some(Section::Dashboard), Section::Dashboard, true);
        refresh.start(PERIOD);

        tick_past(3).await;
        assert_eq!(journal.take().len(), 3);
        assert!(refresh.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_never_stacks_timers() {
        let (refresh, _active, journal) = controller(Some(Section::Dashboard), Section::Dashboard, false);
        refresh.start(PERIOD);
        refresh.start(PERIOD);
        refresh.resume();

        tick_past(1).await;
        assert_eq!(journal.take(), vec!["load dashboard"]);
    }

    #[tokio::test(start_paused = true)]
    async fn untargeted_refresh_ignores_active_section() {
        let (refresh, _active, journal) = controller(None, Section::Charts, false);
        refresh.start(PERIOD);

        tick_past(2).await;
        assert_eq!(journal.take(), vec!["load news", "load news"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_resume_without_start_are_safe() {
        let (refresh, _active, journal) = controller(Some(Section::Dashboard), Section::Dashboard, false);
        refresh.stop();
        refresh.resume();
        assert!(!refresh.is_running());

        tick_past(2).await;
        assert!(journal.take().is_empty());
    }
}
