//! Attribute-server side of the firmware.
//!
//! The attribute server owns the GATT database but not the data: for every
//! characteristic it calls a named hook in an [`AttributeHooks`] table that
//! the application installs at start-up ([`adapter::SensorAdapter`]).
//! This module also owns the wire representation of each characteristic, so
//! a concrete server only has to move bytes.
//!
//! | Characteristic      | Wire                          |
//! |---------------------|-------------------------------|
//! | Battery level       | u8 percent                    |
//! | Battery type        | u8 enum                       |
//! | Hall field          | f32 mT                        |
//! | Ambient light       | f32 lux                       |
//! | UV index            | u32                           |
//! | Humidity            | u32 milli-%RH                 |
//! | Temperature         | i32 milli-°C                  |
//! | Pressure            | f32 mbar                      |
//! | Sound level         | f32 dBA                       |
//! | IMU orientation     | 3 × i16                       |
//! | IMU acceleration    | 3 × i16                       |
//! | RGB LEDs (write)    | mask, r, g, b                 |
//! | RGB mask (read)     | u8                            |
//! | Digital inputs      | u8                            |
//! | IMU enable (write)  | u8 (0 = off)                  |
//! | IMU calibrate (write) | any                         |
//!
//! All multi-byte values are little-endian.

pub mod adapter;
pub mod format;

use heapless::Vec;

use crate::error::{GattError, SensorError};
use crate::power::BatteryType;
use crate::sensors::RgbCommand;

pub use adapter::SensorAdapter;

/// Largest characteristic value on the wire.
pub const MAX_VALUE_LEN: usize = 6;

/// Encoded characteristic value.
pub type Value = Vec<u8, MAX_VALUE_LEN>;

/// Hook table called by the attribute server, one entry per characteristic.
///
/// Reads return the value in its wire unit; any status other than OK is
/// passed to the server unchanged.
pub trait AttributeHooks {
    fn battery_level(&mut self) -> Result<u8, SensorError>;

    fn battery_type(&mut self) -> Result<BatteryType, SensorError>;

    /// Magnetic flux density, mT.
    fn hall_field_strength(&mut self) -> Result<f32, SensorError>;

    /// Illuminance, lux.
    fn ambient_light(&mut self) -> Result<f32, SensorError>;

    /// UV index, reported as an unsigned integer.
    fn uv_index(&mut self) -> Result<u32, SensorError>;

    /// Relative humidity, milli-%RH.
    fn humidity(&mut self) -> Result<u32, SensorError>;

    /// Temperature, milli-°C.
    fn temperature(&mut self) -> Result<i32, SensorError>;

    /// Air pressure, mbar.
    fn pressure(&mut self) -> Result<f32, SensorError>;

    /// Sound level, dBA.
    fn sound_level(&mut self) -> Result<f32, SensorError>;

    fn imu_orientation(&mut self) -> Result<[i16; 3], SensorError>;

    fn imu_acceleration(&mut self) -> Result<[i16; 3], SensorError>;

    /// Best effort; never fails towards the server.
    fn imu_enable(&mut self, enable: bool) -> Result<(), SensorError>;

    fn imu_calibrate(&mut self) -> Result<(), SensorError>;

    fn rgb_leds_write(&mut self, command: RgbCommand) -> Result<(), SensorError>;

    fn rgb_mask(&mut self) -> Result<u8, SensorError>;

    fn digital_inputs(&mut self) -> Result<u8, SensorError>;

    /// Board button edge. Returns the new input bitmask for notification.
    fn aio_button_changed(&mut self) -> Result<u8, SensorError>;
}

/// Characteristics served by the firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Characteristic {
    BatteryLevel,
    BatteryType,
    HallFieldStrength,
    AmbientLight,
    UvIndex,
    Humidity,
    Temperature,
    Pressure,
    SoundLevel,
    ImuOrientation,
    ImuAcceleration,
    ImuEnable,
    ImuCalibrate,
    RgbLeds,
    RgbMask,
    DigitalInputs,
}

impl Characteristic {
    pub fn is_readable(self) -> bool {
        !matches!(
            self,
            Characteristic::ImuEnable | Characteristic::ImuCalibrate | Characteristic::RgbLeds
        )
    }

    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Characteristic::ImuEnable | Characteristic::ImuCalibrate | Characteristic::RgbLeds
        )
    }
}

fn encode(bytes: &[u8]) -> Value {
    // Every wire value is at most MAX_VALUE_LEN bytes.
    Vec::from_slice(bytes).unwrap_or_default()
}

fn encode_triplet(v: [i16; 3]) -> Value {
    let mut out = Value::new();
    for axis in v {
        let _ = out.extend_from_slice(&axis.to_le_bytes());
    }
    out
}

/// Serves a read request: calls the characteristic's hook and encodes the
/// result.
pub fn read_characteristic(
    hooks: &mut dyn AttributeHooks,
    characteristic: Characteristic,
) -> Result<Value, GattError> {
    let value = match characteristic {
        Characteristic::BatteryLevel => encode(&[hooks.battery_level()?]),
        Characteristic::BatteryType => encode(&[hooks.battery_type()? as u8]),
        Characteristic::HallFieldStrength => encode(&hooks.hall_field_strength()?.to_le_bytes()),
        Characteristic::AmbientLight => encode(&hooks.ambient_light()?.to_le_bytes()),
        Characteristic::UvIndex => encode(&hooks.uv_index()?.to_le_bytes()),
        Characteristic::Humidity => encode(&hooks.humidity()?.to_le_bytes()),
        Characteristic::Temperature => encode(&hooks.temperature()?.to_le_bytes()),
        Characteristic::Pressure => encode(&hooks.pressure()?.to_le_bytes()),
        Characteristic::SoundLevel => encode(&hooks.sound_level()?.to_le_bytes()),
        Characteristic::ImuOrientation => encode_triplet(hooks.imu_orientation()?),
        Characteristic::ImuAcceleration => encode_triplet(hooks.imu_acceleration()?),
        Characteristic::RgbMask => encode(&[hooks.rgb_mask()?]),
        Characteristic::DigitalInputs => encode(&[hooks.digital_inputs()?]),
        Characteristic::ImuEnable | Characteristic::ImuCalibrate | Characteristic::RgbLeds => {
            return Err(GattError::NotReadable)
        }
    };
    Ok(value)
}

/// Serves a write request: decodes `data` and calls the characteristic's
/// hook.
pub fn write_characteristic(
    hooks: &mut dyn AttributeHooks,
    characteristic: Characteristic,
    data: &[u8],
) -> Result<(), GattError> {
    match characteristic {
        Characteristic::RgbLeds => {
            let [mask, red, green, blue] = data else {
                return Err(GattError::InvalidLength);
            };
            hooks.rgb_leds_write(RgbCommand {
                mask: *mask,
                red: *red,
                green: *green,
                blue: *blue,
            })?;
        }
        Characteristic::ImuEnable => {
            let [enable] = data else {
                return Err(GattError::InvalidLength);
            };
            hooks.imu_enable(*enable != 0)?;
        }
        Characteristic::ImuCalibrate => hooks.imu_calibrate()?,
        _ => return Err(GattError::NotWritable),
    }
    Ok(())
}
