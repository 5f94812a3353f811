//! Countdown to order expiry.
//!
//! A [`CountdownTimer`] is `Stopped` until [`CountdownTimer::start`] spawns a
//! once-per-second task on the current tokio runtime. Each run compares the
//! wall clock against the creation instant and either reports the remaining
//! time through `on_tick` or, once nothing is left, stops itself and calls
//! `on_timeout` exactly once.
//!
//! Callbacks are invoked with no lock held, so they may call back into the
//! timer (typically through a [`StopHandle`]).

use std::panic;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{CountdownError, Result};
use crate::expression::parse_timeout_express;
use crate::format::format_remaining;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

type TickCallback = Box<dyn Fn(&str) + Send + Sync>;
type TimeoutCallback = Box<dyn Fn() + Send + Sync>;

/// What a single evaluation of the countdown did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// `on_tick` was called with this display string
    Tick(String),
    /// The timer stopped itself and `on_timeout` was called
    Expired,
}

pub struct CountdownTimer<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for CountdownTimer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Weak handle that can stop a timer without keeping it alive
pub struct StopHandle<C: Clock = SystemClock> {
    inner: Weak<Inner<C>>,
}

impl<C: Clock> Clone for StopHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

struct Inner<C> {
    clock: C,
    created_at: i64,
    total_seconds: Option<u64>,
    on_tick: TickCallback,
    on_timeout: TimeoutCallback,
    state: Mutex<ScheduleState>,
}

#[derive(Default)]
struct ScheduleState {
    active: Option<Schedule>,
    generation: u64,
}

struct Schedule {
    generation: u64,
    task: JoinHandle<()>,
}

impl ScheduleState {
    fn is_current(&self, generation: u64) -> bool {
        matches!(&self.active, Some(schedule) if schedule.generation == generation)
    }

    fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(schedule) => {
                schedule.task.abort();
                true
            }
            None => false,
        }
    }
}

impl CountdownTimer<SystemClock> {
    /// Countdown against the system clock.
    ///
    /// `created_at` is the order creation time in Unix milliseconds.
    pub fn new(
        created_at: i64,
        timeout_express: &str,
        on_tick: impl Fn(&str) + Send + Sync + 'static,
        on_timeout: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self::with_clock(SystemClock, created_at, timeout_express, on_tick, on_timeout)
    }
}

impl<C: Clock + 'static> CountdownTimer<C> {
    /// Unparseable expressions are accepted; such a timer expires on its
    /// first tick.
    pub fn with_clock(
        clock: C,
        created_at: i64,
        timeout_express: &str,
        on_tick: impl Fn(&str) + Send + Sync + 'static,
        on_timeout: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let total_seconds = parse_timeout_express(timeout_express);
        if total_seconds.is_none() {
            warn!(
                "Unparseable timeout expression {:?}, countdown will expire immediately",
                timeout_express
            );
        }
        Self::with_total_seconds(clock, created_at, total_seconds, on_tick, on_timeout)
    }

    /// Build from an already-resolved total, e.g. a `1c` expression.
    /// `None` behaves like an unparseable expression.
    pub fn with_total_seconds(
        clock: C,
        created_at: i64,
        total_seconds: Option<u64>,
        on_tick: impl Fn(&str) + Send + Sync + 'static,
        on_timeout: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                created_at,
                total_seconds,
                on_tick: Box::new(on_tick),
                on_timeout: Box::new(on_timeout),
                state: Mutex::new(ScheduleState::default()),
            }),
        }
    }

    /// Begin ticking once per second, replacing any schedule already running.
    ///
    /// Must be called from within a tokio runtime that has its time driver
    /// enabled.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| CountdownError::NoRuntime)?;

        // tokio panics on timer creation when the time driver is disabled
        let first_run = Instant::now() + TICK_INTERVAL;
        let mut interval = panic::catch_unwind(|| time::interval_at(first_run, TICK_INTERVAL))
            .map_err(|_| CountdownError::NoTimeDriver)?;
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = self.inner.lock_state();
        if state.cancel() {
            debug!("Restarting countdown, previous schedule cancelled");
        }
        state.generation += 1;
        let generation = state.generation;

        let task = runtime.spawn(run_schedule(Arc::downgrade(&self.inner), generation, interval));
        state.active = Some(Schedule { generation, task });

        debug!(
            "Countdown started (generation {}, total {:?}s)",
            generation, self.inner.total_seconds
        );
        Ok(())
    }

    /// Cancel the schedule. No-op when already stopped.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Evaluate the countdown right now, as a scheduled run would.
    ///
    /// Returns `None` without calling anything when the timer is stopped.
    pub fn poll(&self) -> Option<TickOutcome> {
        let generation = {
            let state = self.inner.lock_state();
            state.active.as_ref()?.generation
        };
        self.inner.fire(generation)
    }

    /// Remaining whole seconds at the clock's current time. Zero or negative
    /// means expired.
    pub fn remaining_seconds(&self) -> i64 {
        self.inner.remaining_seconds()
    }

    pub fn total_seconds(&self) -> Option<u64> {
        self.inner.total_seconds
    }

    pub fn created_at(&self) -> i64 {
        self.inner.created_at
    }

    pub fn stop_handle(&self) -> StopHandle<C> {
        StopHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<C: Clock> StopHandle<C> {
    /// Stop the timer if it still exists
    pub fn stop(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.is_running())
    }
}

impl<C: Clock> Inner<C> {
    fn lock_state(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self) {
        if self.lock_state().cancel() {
            debug!("Countdown stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.lock_state().active.is_some()
    }

    fn remaining_seconds(&self) -> i64 {
        // An unparsed total counts as already used up
        let Some(total) = self.total_seconds else {
            return 0;
        };
        let elapsed_ms = self.clock.now_millis().saturating_sub(self.created_at);
        let elapsed = elapsed_ms.div_euclid(1000);
        i64::try_from(total)
            .unwrap_or(i64::MAX)
            .saturating_sub(elapsed)
    }

    /// One evaluation for schedule `generation`. `None` if that schedule is
    /// no longer the active one.
    fn fire(&self, generation: u64) -> Option<TickOutcome> {
        let remaining = {
            let mut state = self.lock_state();
            if !state.is_current(generation) {
                return None;
            }
            let remaining = self.remaining_seconds();
            if remaining <= 0 {
                // Cancel before notifying so expiry fires once
                state.cancel();
            }
            remaining
        };

        if remaining <= 0 {
            info!("Countdown expired");
            (self.on_timeout)();
            Some(TickOutcome::Expired)
        } else {
            let formatted = format_remaining(remaining as u64);
            trace!(remaining = %formatted, "Countdown tick");
            (self.on_tick)(&formatted);
            Some(TickOutcome::Tick(formatted))
        }
    }
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(schedule) = state.active.take() {
            schedule.task.abort();
        }
    }
}

async fn run_schedule<C: Clock + 'static>(inner: Weak<Inner<C>>, generation: u64, mut interval: Interval) {
    loop {
        interval.tick().await;

        let Some(inner) = inner.upgrade() else {
            debug!("Countdown dropped while running");
            break;
        };
        match inner.fire(generation) {
            Some(TickOutcome::Tick(_)) => {}
            Some(TickOutcome::Expired) | None => break,
        }
    }
}
