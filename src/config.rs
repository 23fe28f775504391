//! Application-wide constants and compile-time configuration.
//!
//! Timing parameters, advertising identity and the set of compiled-in
//! services live here so they can be tuned in one place. The registry
//! builder consults the `SERVICE_*_ENABLED` flags instead of scattering
//! `#[cfg]` over the core.

use crate::sensors::SensorKind;

// Power

/// Inactivity timeout before the device enters EM4 while advertising on a
/// low-power supply (ms).
pub const SHUTDOWN_TIMEOUT_MS: u32 = 60_000;

/// Arm the shutdown timer once at power-on, before the stack reports boot.
/// A device whose stack never completes boot still powers down.
pub const ARM_SHUTDOWN_BEFORE_BOOT: bool = true;

// Advertising

/// Prefix of the advertised complete local name; the unit number follows.
pub const ADVERTISED_NAME_PREFIX: &str = "Thunderboard #";

/// Bluetooth SIG company identifier carried in the manufacturer data
/// (Silicon Laboratories).
pub const COMPANY_ID: u16 = 0x0047;

/// Advertising interval (in 0.625 ms units). 160 = 100 ms.
pub const ADV_INTERVAL: u32 = 160;

// Main loop

/// Period of the main-loop tick that steps time-sliced sensors (ms).
pub const ACTION_TICK_MS: u64 = 100;

/// Period at which characteristic values are refreshed while connected (ms).
pub const GATT_REFRESH_MS: u64 = 1_000;

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

// Services compiled into the registry

pub const SERVICE_BATTERY_ENABLED: bool = cfg!(feature = "service-battery");
pub const SERVICE_HALL_ENABLED: bool = cfg!(feature = "service-hall");
pub const SERVICE_LIGHT_ENABLED: bool = cfg!(feature = "service-light");
pub const SERVICE_LUX_ENABLED: bool = cfg!(feature = "service-lux");
pub const SERVICE_RHT_ENABLED: bool = cfg!(feature = "service-rht");
pub const SERVICE_IMU_ENABLED: bool = cfg!(feature = "service-imu");
pub const SERVICE_PRESSURE_ENABLED: bool = cfg!(feature = "service-pressure");
pub const SERVICE_SOUND_ENABLED: bool = cfg!(feature = "service-sound");
pub const SERVICE_AIO_ENABLED: bool = cfg!(feature = "service-aio");

/// Number of RGB LEDs populated on the board. The RGB service is only
/// exported when this is non-zero.
#[cfg(feature = "service-rgb")]
pub const BOARD_RGBLED_COUNT: u8 = 4;
#[cfg(not(feature = "service-rgb"))]
pub const BOARD_RGBLED_COUNT: u8 = 0;

pub const SERVICE_RGB_ENABLED: bool = BOARD_RGBLED_COUNT > 0;

/// Whether the sensor behind `kind` participates in the registry.
pub const fn sensor_enabled(kind: SensorKind) -> bool {
    match kind {
        SensorKind::Hall => SERVICE_HALL_ENABLED,
        SensorKind::Light => SERVICE_LIGHT_ENABLED,
        SensorKind::Lux => SERVICE_LUX_ENABLED,
        SensorKind::Rht => SERVICE_RHT_ENABLED,
        SensorKind::Imu => SERVICE_IMU_ENABLED,
        SensorKind::Pressure => SERVICE_PRESSURE_ENABLED,
        SensorKind::Sound => SERVICE_SOUND_ENABLED,
        SensorKind::Aio => SERVICE_AIO_ENABLED,
    }
}
