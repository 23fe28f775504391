//! Sensor driver capabilities and the registry that owns them.
//!
//! Drivers are external collaborators: each one exposes `init`, `deinit` and
//! a typed `read`. The bus protocol behind them is the driver's concern.
//! The registry ([`registry::Registry`]) gives the rest of the firmware a
//! uniform view over the heterogeneous set compiled into the board.

pub mod registry;

use crate::error::DriverError;

pub use registry::{Reading, Registry, RegistryBuilder, SensorState};

/// Kinds of sensor the firmware knows how to serve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    /// Hall effect magnetometer.
    Hall,
    /// Ambient light + UV index.
    Light,
    /// Ambient light only.
    Lux,
    /// Relative humidity and temperature.
    Rht,
    /// 6-DoF inertial measurement unit.
    Imu,
    /// Barometric pressure.
    Pressure,
    /// Microphone sound level.
    Sound,
    /// Automation I/O digital inputs (board buttons).
    Aio,
}

impl SensorKind {
    /// Sensor-identifying name used in log messages.
    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Hall => "Hall effect sensor",
            SensorKind::Light => "Ambient light and UV index sensor",
            SensorKind::Lux => "Ambient light sensor",
            SensorKind::Rht => "Relative Humidity and Temperature sensor",
            SensorKind::Imu => "IMU",
            SensorKind::Pressure => "Air pressure sensor",
            SensorKind::Sound => "Sound level sensor",
            SensorKind::Aio => "Automation IO",
        }
    }
}

/// Common driver capability.
///
/// `init` may fail; `deinit` is infallible and idempotent. `step` is the
/// bounded periodic work some drivers need between reads (e.g. RMS
/// accumulation); most drivers keep the no-op default.
pub trait Sensor {
    type Reading: Copy;

    fn init(&mut self) -> Result<(), DriverError>;

    fn deinit(&mut self);

    fn read(&mut self) -> Result<Self::Reading, DriverError>;

    fn step(&mut self) {}
}

/// Inertial measurement unit with a motion-processing engine.
pub trait Imu: Sensor<Reading = ImuSample> {
    /// Turns the calibration / motion-processing engine on or off.
    fn enable(&mut self, enable: bool) -> Result<(), DriverError>;

    fn calibrate(&mut self) -> Result<(), DriverError>;
}

/// Digital input group fed by the board buttons.
pub trait DigitalInputs: Sensor<Reading = u8> {
    /// Called on every button edge so the driver can latch the new state.
    fn on_button_change(&mut self);
}

/// On-board RGB LED bank.
pub trait RgbLeds {
    /// Number of populated LEDs; bit `n` of the mask addresses LED `n`.
    fn led_count(&self) -> u8;

    fn set(&mut self, command: RgbCommand);
}

/// Ambient light sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightReading {
    pub lux: f32,
    pub uv_index: f32,
}

/// Humidity/temperature sample in milli-units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RhtReading {
    /// Relative humidity, milli-%RH.
    pub humidity: u32,
    /// Temperature, milli-°C.
    pub temperature: i32,
}

/// Raw IMU sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    pub orientation: [i16; 3],
    pub acceleration: [i16; 3],
}

/// RGB LED write request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RgbCommand {
    pub mask: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbCommand {
    pub const OFF: RgbCommand = RgbCommand {
        mask: 0,
        red: 0,
        green: 0,
        blue: 0,
    };
}
