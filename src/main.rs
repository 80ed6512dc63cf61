//! inkwatch firmware entry point (nRF52840 + S140).
//!
//! Every boot is one wake: bring up the SoftDevice and peripherals, run
//! one coordinator cycle, then System OFF. Nothing here loops; the next
//! wake starts again from reset.

#![no_std]
#![no_main]

mod ble;
mod board;
mod rtc;
mod ui;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::Pin;
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::peripherals::{TWISPI0, TWISPI1};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals};
use inkwatch::dispatch::Dispatcher;
use inkwatch::{Button, Coordinator, System};
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::config_server::BleContext;
use crate::board::NrfBoard;
use crate::rtc::Pcf8563;
use crate::ui::{buttons, display, screens};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1 => twim::InterruptHandler<peripherals::TWISPI1>;
});

pub type WatchRtc = Pcf8563<Twim<'static, TWISPI0>>;
pub type Sys = System<WatchRtc>;

static SYSTEM: StaticCell<Sys> = StaticCell::new();
static SERVER: StaticCell<ble::Server> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(Priority::P3);
    interrupt::SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1.set_priority(Priority::P3);

    let sd = Softdevice::enable(&ble::softdevice_config());
    let server: &'static ble::Server = SERVER.init(unwrap!(ble::Server::new(sd)));
    unwrap!(spawner.spawn(ble::softdevice_task(sd)));

    let board = NrfBoard::capture();

    let mut rtc = Pcf8563::new(Twim::new(
        p.TWISPI0,
        Irqs,
        p.P0_26,
        p.P0_27,
        twim::Config::default(),
    ));
    if board.is_cold() {
        if let Err(e) = rtc.start().await {
            warn!("RTC: start failed: {}", e);
        }
    }

    let panel_bus: Twim<'static, TWISPI1> =
        Twim::new(p.TWISPI1, Irqs, p.P0_30, p.P0_31, twim::Config::default());
    display::install(display::init(panel_bus));

    let sys: &'static Sys = SYSTEM.init(System::new(rtc));

    let pins = [
        p.P0_11.degrade(),
        p.P0_12.degrade(),
        p.P0_24.degrade(),
        p.P0_25.degrade(),
    ];
    for (pin, button) in pins.into_iter().zip(Button::ALL) {
        unwrap!(spawner.spawn(buttons::button_task(pin, button, &sys.queue)));
    }

    let ctx = BleContext {
        spawner,
        sd,
        server,
        sys,
    };
    let dispatcher = Dispatcher::new(sys, screens::Screens::new(ctx));
    let coordinator = Coordinator::new(board, dispatcher);

    info!("inkwatch up");
    coordinator.run().await
}
