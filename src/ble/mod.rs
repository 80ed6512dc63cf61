//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role.
//! The only BLE feature is the configuration server: a phone connects,
//! writes the current time and/or location, and disconnects. Writes are
//! turned into `TimeSync` / `LocationUpdate` events; the dispatcher
//! applies them like any other event.
//!
//! Byte layouts of the characteristics are documented in
//! [`inkwatch::ble::payload`].

pub mod config_server;

use core::mem;

use nrf_softdevice::{raw, Softdevice};

use inkwatch::config::BLE_DEVICE_NAME;

/// Watch configuration service.
#[nrf_softdevice::gatt_service(uuid = "6e6b0001-8a3c-4b3e-9e4f-696e6b776174")]
pub struct ConfigService {
    /// Unix time, see `payload::decode_time`.
    #[characteristic(uuid = "6e6b0002-8a3c-4b3e-9e4f-696e6b776174", write)]
    pub time: heapless::Vec<u8, 12>,

    /// Coordinates, zone and city, see `payload::decode_location`.
    #[characteristic(uuid = "6e6b0003-8a3c-4b3e-9e4f-696e6b776174", write)]
    pub location: heapless::Vec<u8, 96>,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub config: ConfigService,
}

/// SoftDevice configuration: one peripheral link, LF clock from the RC
/// oscillator (the dev board has no 32 kHz crystal).
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_DEVICE_NAME.as_ptr() as _,
            current_len: BLE_DEVICE_NAME.len() as u16,
            max_len: BLE_DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Run the SoftDevice event loop - must be spawned as a dedicated Embassy task.
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}
