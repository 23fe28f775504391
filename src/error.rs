//! Error types shared by the core.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Every type is `Copy` so statuses can be handed back to the attribute
//! server without ownership concerns.

use core::fmt;

/// Driver-specific failure (bus error, sensor protocol error, ...).
///
/// The code is opaque to the core and is passed through to the attribute
/// server unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverError {
    pub code: u32,
}

impl DriverError {
    pub const fn new(code: u32) -> Self {
        Self { code }
    }
}

/// Status of a sensor operation, as surfaced by the hooks.
///
/// `Ok(_)` plays the role of the `OK` status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The sensor is not compiled in, was never initialised in this
    /// connection, or its latest `init` failed.
    NotInitialized,
    /// The driver reported a failure.
    Driver(DriverError),
}

impl From<DriverError> for SensorError {
    fn from(e: DriverError) -> Self {
        SensorError::Driver(e)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NotInitialized => f.write_str("not initialized"),
            SensorError::Driver(e) => write!(f, "driver error {}", e.code),
        }
    }
}

/// A call into the radio stack failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StackError {
    pub code: u32,
}

/// The one-shot timer facility rejected a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// No timer slot could be allocated.
    NoResources,
    /// The platform returned a raw error code.
    Raw(u32),
}

/// Failure while dispatching an attribute-server request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattError {
    /// The hook returned a sensor status other than OK.
    Sensor(SensorError),
    /// The written value does not have the characteristic's wire size.
    InvalidLength,
    /// The characteristic has no read operation.
    NotReadable,
    /// The characteristic has no write operation.
    NotWritable,
}

impl GattError {
    /// ATT error code reported to the peer.
    ///
    /// Sensor statuses use the application error range (0x80..=0x9F).
    pub fn att_code(&self) -> u8 {
        match self {
            GattError::Sensor(SensorError::NotInitialized) => 0x80,
            GattError::Sensor(SensorError::Driver(_)) => 0x81,
            GattError::InvalidLength => 0x0D,
            GattError::NotReadable => 0x02,
            GattError::NotWritable => 0x03,
        }
    }
}

impl From<SensorError> for GattError {
    fn from(e: SensorError) -> Self {
        GattError::Sensor(e)
    }
}
