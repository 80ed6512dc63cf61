//! Power-state coordinator - the wake → work → drain → sleep cycle.
//!
//! Every wake runs the same sequence:
//!
//! - **Waking**: read the wake cause, restore retained state, re-anchor
//!   the wall clock from the RTC, notify on-wake callbacks.
//! - **DispatchInitial**: turn the wake cause into the first event (timer
//!   or alarm → `AlarmTimer`, button → that button's `ButtonDown`), or on
//!   a cold boot initialise the board and fully render the home screen.
//! - **DrainLoop**: drain the queue, and keep draining for as long as any
//!   background task is registered.
//! - **SleepDecision**: compute and arm the wake sources, persist the
//!   retained state.
//! - **Sleeping**: hibernate the panel and enter deep sleep. Never returns.
//!
//! nRF52840 power modes used here:
//! - System ON: the whole cycle above (~1-4 mA depending on radio use)
//! - System OFF: deep sleep, RAM retained, wake on GPIO sense (~2 µA)

use embassy_time::Instant;
use heapless::Vec;

use crate::clock::Rtc;
use crate::config::ON_WAKE_CAPACITY;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::power_logic;
use crate::retained::Retained;
use crate::screen::{Refresh, ScreenTable};
use crate::wake::{SleepPlan, WakeCause};

/// Coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    Waking,
    DispatchInitial,
    DrainLoop,
    SleepDecision,
    Sleeping,
}

/// Called once per wake, before the first event is dispatched.
pub type OnWake = fn(WakeCause);

/// Hardware hooks the coordinator drives.
#[allow(async_fn_in_trait)]
pub trait Board {
    fn wake_cause(&mut self) -> WakeCause;

    /// The image saved before the last sleep, if the retention region
    /// holds a valid one.
    fn load_retained(&mut self) -> Option<Retained>;

    fn store_retained(&mut self, state: &Retained);

    /// One-time peripheral setup after power-on (RTC defaults, sensors).
    async fn cold_boot(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Arm the board-level wake sources (button pins, RTC interrupt pin,
    /// internal timer) described by `plan`.
    fn arm(&mut self, plan: &SleepPlan) -> Result<(), Error>;

    fn hibernate_display(&mut self);

    fn deep_sleep(&mut self) -> !;
}

/// What one wake did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub cause: WakeCause,
    /// Whether retained state came from a valid image.
    pub restored: bool,
    pub drain_passes: u32,
    pub handled: usize,
    pub plan: SleepPlan,
}

pub struct Coordinator<'a, B, R, T> {
    board: B,
    dispatcher: Dispatcher<'a, R, T>,
    on_wake: Vec<OnWake, ON_WAKE_CAPACITY>,
    state: PowerState,
}

impl<'a, B, R, T> Coordinator<'a, B, R, T>
where
    B: Board,
    R: Rtc,
    T: ScreenTable,
{
    pub fn new(board: B, dispatcher: Dispatcher<'a, R, T>) -> Self {
        Self {
            board,
            dispatcher,
            on_wake: Vec::new(),
            state: PowerState::Waking,
        }
    }

    /// Register a callback run on every wake.
    pub fn add_on_wake(&mut self, callback: OnWake) -> Result<(), Error> {
        self.on_wake.push(callback).map_err(|_| Error::RegistryFull)
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn board(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher<'a, R, T> {
        &mut self.dispatcher
    }

    /// Run everything up to, but not including, the sleep itself.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let sys = self.dispatcher.system();
        let started = Instant::now();

        // Waking
        self.enter(PowerState::Waking);
        let cause = self.board.wake_cause();
        let (mut retained, restored) =
            power_logic::restore_or_default(cause, self.board.load_retained());
        retained.wake_count = retained.wake_count.wrapping_add(1);
        let wake_count = retained.wake_count;
        sys.retained.replace(retained);
        info!(
            "Power: woke by {:?} (wake #{}, restored={})",
            cause, wake_count, restored
        );

        if let Err(e) = sys.clock.load_from_rtc().await {
            error!("Power: RTC read failed: {:?}", e);
            sys.errors.set(Some(e));
        }
        for callback in &self.on_wake {
            callback(cause);
        }

        // DispatchInitial
        self.enter(PowerState::DispatchInitial);
        match power_logic::initial_event(cause) {
            Some(kind) => sys.post(kind),
            None => {
                if let Err(e) = self.board.cold_boot().await {
                    error!("Power: cold boot init failed: {:?}", e);
                    sys.errors.set(Some(e));
                }
                self.dispatcher.repaint(Refresh::Full);
            }
        }

        // DrainLoop
        self.enter(PowerState::DrainLoop);
        let mut drain_passes = 0;
        let mut handled = 0;
        loop {
            drain_passes += 1;
            handled += self.dispatcher.handle_all().await;
            if power_logic::drain_finished(sys.tasks.running(), sys.queue.is_empty()) {
                break;
            }
            debug!(
                "Power: {} task(s) registered, {} event(s) queued, draining again",
                sys.tasks.len(),
                sys.queue.len()
            );
        }

        // SleepDecision
        self.enter(PowerState::SleepDecision);
        let plan = sys.retained.with(|r| r.wake.plan());
        if let Err(e) = sys.clock.configure_wakeup(plan.periodic).await {
            error!("Power: RTC wakeup not armed: {:?}", e);
            sys.errors.set(Some(e));
        }
        if let Err(e) = self.board.arm(&plan) {
            error!("Power: wake sources not armed: {:?}", e);
            sys.errors.set(Some(e));
        }
        self.board.store_retained(&sys.retained.snapshot());

        info!(
            "Power: {} pass(es), {} event(s), awake {} ms",
            drain_passes,
            handled,
            started.elapsed().as_millis()
        );

        CycleReport {
            cause,
            restored,
            drain_passes,
            handled,
            plan,
        }
    }

    /// Hibernate the panel and enter deep sleep.
    pub fn sleep(mut self) -> ! {
        self.enter(PowerState::Sleeping);
        self.board.hibernate_display();
        self.board.deep_sleep()
    }

    /// One full wake, ending in deep sleep.
    pub async fn run(mut self) -> ! {
        self.run_cycle().await;
        self.sleep()
    }

    fn enter(&mut self, next: PowerState) {
        if next != self.state {
            debug!("Power: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}
