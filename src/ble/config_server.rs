//! Configuration server background task.
//!
//! Launched from the Bluetooth screen, killed when the user backs out of
//! it. One run advertises until a central connects (or
//! `BLE_ADVERTISE_TIMEOUT_SECS` pass), serves GATT writes until the
//! central disconnects, and then ends. While it runs it is registered,
//! so the watch stays awake.

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::{with_timeout, Duration};
use inkwatch::ble::payload;
use inkwatch::config::{BLE_ADVERTISE_TIMEOUT_SECS, BLE_DEVICE_NAME};
use inkwatch::task::{BackgroundTask, Launch};
use inkwatch::{Error, EventKind};
use nrf_softdevice::ble::advertisement_builder::{
    Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
};
use nrf_softdevice::ble::{gatt_server, peripheral};
use nrf_softdevice::Softdevice;

use super::{ConfigServiceEvent, Server, ServerEvent};
use crate::Sys;

pub static CONFIG_SERVER: BackgroundTask = BackgroundTask::new("bleConfig");

static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .full_name(BLE_DEVICE_NAME)
    .build();

static SCAN_DATA: [u8; 0] = [];

/// What the task needs from `main`.
#[derive(Clone, Copy)]
pub struct BleContext {
    pub spawner: Spawner,
    pub sd: &'static Softdevice,
    pub server: &'static Server,
    pub sys: &'static Sys,
}

/// Start the server unless it is already running.
pub fn start(ctx: &BleContext) -> Result<(), Error> {
    // Registered here, before the task is first polled.
    let launch = CONFIG_SERVER.begin(&ctx.sys.tasks)?;
    ctx.spawner
        .spawn(config_server_task(launch, *ctx))
        .map_err(|_| {
            warn!("BLE: no executor slot for the config server");
            Error::NotReady
        })
}

pub fn stop() {
    CONFIG_SERVER.kill();
}

pub fn is_running() -> bool {
    CONFIG_SERVER.is_active()
}

#[embassy_executor::task]
async fn config_server_task(launch: Launch<'static>, ctx: BleContext) {
    let exit = launch.run(serve(&ctx)).await;
    info!("BLE: config server done ({})", exit);
}

async fn serve(ctx: &BleContext) {
    let sys = ctx.sys;
    let config = peripheral::Config::default();
    let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
        adv_data: &ADV_DATA,
        scan_data: &SCAN_DATA,
    };

    info!("BLE: advertising as {}", BLE_DEVICE_NAME);
    let timeout = Duration::from_secs(BLE_ADVERTISE_TIMEOUT_SECS);
    let conn = match with_timeout(timeout, peripheral::advertise_connectable(ctx.sd, adv, &config)).await
    {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            warn!("BLE: advertising failed: {}", e);
            sys.errors.set(Some(Error::RadioFailed));
            sys.post(EventKind::UpdateScreen);
            return;
        }
        Err(_) => {
            info!("BLE: nobody connected");
            sys.post(EventKind::UpdateScreen);
            return;
        }
    };

    info!("BLE: central connected");
    let reason = gatt_server::run(&conn, ctx.server, |event| match event {
        ServerEvent::Config(ConfigServiceEvent::TimeWrite(raw)) => {
            match payload::decode_time(&raw) {
                Ok(time) => sys.post(EventKind::TimeSync(time)),
                Err(e) => {
                    warn!("BLE: bad time write ({} bytes)", raw.len());
                    sys.errors.set(Some(e));
                }
            }
        }
        ServerEvent::Config(ConfigServiceEvent::LocationWrite(raw)) => {
            match payload::decode_location(&raw) {
                Ok(location) => sys.post(EventKind::LocationUpdate(location)),
                Err(e) => {
                    warn!("BLE: bad location write ({} bytes)", raw.len());
                    sys.errors.set(Some(e));
                }
            }
        }
    })
    .await;

    info!("BLE: central gone: {}", reason);
    // Still registered here, so this repaint is drained before sleep.
    sys.post(EventKind::UpdateScreen);
}
