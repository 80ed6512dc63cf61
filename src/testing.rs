//! Host-side fakes shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::vec::Vec;

use crate::clock::{DateTime, Rtc};
use crate::error::Error;
use crate::power::Board;
use crate::radio::RadioLink;
use crate::retained::Retained;
use crate::screen::{Nav, Refresh, Screen, ScreenId, ScreenTable};
use crate::wake::{Periodic, SleepPlan, WakeCause};

// ════════════════════════════════════════════════════════════════════════
// RTC
// ════════════════════════════════════════════════════════════════════════

pub struct FakeRtc {
    pub time: DateTime,
    pub writes: u32,
    pub wakeup: Option<Periodic>,
    pub fail_writes: bool,
}

impl FakeRtc {
    pub fn at(secs: u64) -> Self {
        Self {
            time: DateTime::from_unix(secs),
            writes: 0,
            wakeup: None,
            fail_writes: false,
        }
    }
}

impl Rtc for FakeRtc {
    async fn read(&mut self) -> Result<DateTime, Error> {
        Ok(self.time)
    }

    async fn write(&mut self, time: &DateTime) -> Result<(), Error> {
        if self.fail_writes {
            return Err(Error::Hardware);
        }
        self.time = *time;
        self.writes += 1;
        Ok(())
    }

    async fn configure_wakeup(&mut self, periodic: Periodic) -> Result<(), Error> {
        self.wakeup = Some(periodic);
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════
// Radio
// ════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct LinkStats {
    pub connects: Arc<AtomicU32>,
    pub disconnects: Arc<AtomicU32>,
}

impl LinkStats {
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }
}

pub struct FakeLink {
    pub fail: bool,
    pub stats: LinkStats,
}

impl FakeLink {
    pub fn new() -> (Self, LinkStats) {
        let stats = LinkStats::default();
        (
            Self {
                fail: false,
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl RadioLink for FakeLink {
    async fn connect(&mut self) -> Result<(), Error> {
        if self.fail {
            return Err(Error::Timeout);
        }
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

// ════════════════════════════════════════════════════════════════════════
// Screens
// ════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Show(ScreenId, Refresh),
    Menu(ScreenId),
    Back(ScreenId),
    Up(ScreenId),
    Down(ScreenId),
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub struct RecordingScreen {
    pub id: ScreenId,
    pub log: CallLog,
    pub on_menu: Nav,
    pub on_back: Nav,
}

impl Screen for RecordingScreen {
    fn show(&mut self, refresh: Refresh) {
        self.log.borrow_mut().push(Call::Show(self.id, refresh));
    }

    fn menu(&mut self) -> Nav {
        self.log.borrow_mut().push(Call::Menu(self.id));
        self.on_menu
    }

    fn back(&mut self) -> Nav {
        self.log.borrow_mut().push(Call::Back(self.id));
        self.on_back
    }

    fn up(&mut self) -> Nav {
        self.log.borrow_mut().push(Call::Up(self.id));
        Nav::Redraw
    }

    fn down(&mut self) -> Nav {
        self.log.borrow_mut().push(Call::Down(self.id));
        Nav::Stay
    }
}

/// Two screens: 0 opens 1 on MENU, 1 returns to 0 on BACK.
pub struct RecordingTable {
    pub screens: [RecordingScreen; 2],
    pub log: CallLog,
}

impl RecordingTable {
    pub fn new() -> Self {
        let log: CallLog = Rc::default();
        Self {
            screens: [
                RecordingScreen {
                    id: ScreenId(0),
                    log: log.clone(),
                    on_menu: Nav::Open(ScreenId(1)),
                    on_back: Nav::Stay,
                },
                RecordingScreen {
                    id: ScreenId(1),
                    log: log.clone(),
                    on_menu: Nav::Stay,
                    on_back: Nav::Open(ScreenId(0)),
                },
            ],
            log,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }
}

impl ScreenTable for RecordingTable {
    fn screen(&mut self, id: ScreenId) -> Option<&mut dyn Screen> {
        self.screens
            .get_mut(id.0 as usize)
            .map(|s| s as &mut dyn Screen)
    }
}

// ════════════════════════════════════════════════════════════════════════
// Board
// ════════════════════════════════════════════════════════════════════════

pub struct FakeBoard {
    pub cause: WakeCause,
    pub image: Option<Retained>,
    pub armed: Option<SleepPlan>,
    pub cold_boots: u32,
    pub hibernated: bool,
}

impl FakeBoard {
    pub fn waking(cause: WakeCause) -> Self {
        Self {
            cause,
            image: None,
            armed: None,
            cold_boots: 0,
            hibernated: false,
        }
    }
}

impl Board for FakeBoard {
    fn wake_cause(&mut self) -> WakeCause {
        self.cause
    }

    fn load_retained(&mut self) -> Option<Retained> {
        self.image.clone()
    }

    fn store_retained(&mut self, state: &Retained) {
        self.image = Some(state.clone());
    }

    async fn cold_boot(&mut self) -> Result<(), Error> {
        self.cold_boots += 1;
        Ok(())
    }

    fn arm(&mut self, plan: &SleepPlan) -> Result<(), Error> {
        self.armed = Some(*plan);
        Ok(())
    }

    fn hibernate_display(&mut self) {
        self.hibernated = true;
    }

    fn deep_sleep(&mut self) -> ! {
        panic!("deep sleep entered");
    }
}
