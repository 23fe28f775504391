//! Hook table backed by the sensor registry.
//!
//! Every hook reads one sensor, logs the value in the unit of its
//! characteristic and hands the status back to the attribute server
//! unchanged. Not-initialised sensors are logged at INFO, driver failures at
//! ERROR.

use super::format::{Fixed3, Milli};
use super::AttributeHooks;
use crate::config;
use crate::error::SensorError;
use crate::power::{BatteryType, PowerSupply};
use crate::sensors::{ImuSample, Reading, Registry, RgbCommand, RhtReading, SensorKind};

/// [`AttributeHooks`] over a borrowed registry and supply probe.
///
/// Lives for one attribute-server request; the lifecycle controller hands
/// one out through [`crate::lifecycle::Controller::hooks`].
pub struct SensorAdapter<'a, 'd, P: PowerSupply> {
    registry: &'a mut Registry<'d>,
    supply: &'a mut P,
}

impl<'a, 'd, P: PowerSupply> SensorAdapter<'a, 'd, P> {
    pub fn new(registry: &'a mut Registry<'d>, supply: &'a mut P) -> Self {
        Self { registry, supply }
    }

    fn read(&mut self, kind: SensorKind) -> Result<Reading, SensorError> {
        self.registry.read(kind).map_err(|e| report(kind, e))
    }

    fn read_light(&mut self) -> Result<Reading, SensorError> {
        if self.registry.contains(SensorKind::Light) {
            self.read(SensorKind::Light)
        } else {
            self.read(SensorKind::Lux)
        }
    }

    fn read_imu(&mut self) -> Result<ImuSample, SensorError> {
        match self.read(SensorKind::Imu)? {
            Reading::Imu(sample) => Ok(sample),
            _ => Err(SensorError::NotInitialized),
        }
    }

    fn read_rht(&mut self) -> Result<RhtReading, SensorError> {
        match self.read(SensorKind::Rht)? {
            Reading::Rht(rht) => Ok(rht),
            _ => Err(SensorError::NotInitialized),
        }
    }

    fn read_scalar(&mut self, kind: SensorKind) -> Result<f32, SensorError> {
        match self.read(kind)? {
            Reading::Hall(v) | Reading::Lux(v) | Reading::Pressure(v) | Reading::Sound(v) => Ok(v),
            _ => Err(SensorError::NotInitialized),
        }
    }
}

fn report(kind: SensorKind, e: SensorError) -> SensorError {
    match e {
        SensorError::NotInitialized => info!("{} is not initialized", kind.name()),
        SensorError::Driver(d) => error!("{} read failed: {}", kind.name(), d.code),
    }
    e
}

impl<P: PowerSupply> AttributeHooks for SensorAdapter<'_, '_, P> {
    fn battery_level(&mut self) -> Result<u8, SensorError> {
        if !config::SERVICE_BATTERY_ENABLED {
            return Err(SensorError::NotInitialized);
        }
        let level = self.supply.battery_level();
        info!("Battery level = {} %", level);
        Ok(level)
    }

    fn battery_type(&mut self) -> Result<BatteryType, SensorError> {
        if !config::SERVICE_BATTERY_ENABLED {
            return Err(SensorError::NotInitialized);
        }
        let kind = self.supply.battery_type();
        info!("Battery type = {}", kind as u8);
        Ok(kind)
    }

    fn hall_field_strength(&mut self) -> Result<f32, SensorError> {
        let mt = self.read_scalar(SensorKind::Hall)?;
        info!("Magnetic flux = {} mT", Fixed3(mt));
        Ok(mt)
    }

    fn ambient_light(&mut self) -> Result<f32, SensorError> {
        let lux = match self.read_light()? {
            Reading::Light(light) => light.lux,
            Reading::Lux(lux) => lux,
            _ => return Err(SensorError::NotInitialized),
        };
        info!("Ambient light = {} lux", lux);
        Ok(lux)
    }

    fn uv_index(&mut self) -> Result<u32, SensorError> {
        let Reading::Light(light) = self.read(SensorKind::Light)? else {
            return Err(SensorError::NotInitialized);
        };
        // Float to int casts saturate; negative readings clamp to 0.
        let uvi = light.uv_index as u32;
        info!("UV index = {}", uvi);
        Ok(uvi)
    }

    fn humidity(&mut self) -> Result<u32, SensorError> {
        let rht = self.read_rht()?;
        info!("Humidity = {} %RH", Milli(rht.humidity as i64));
        Ok(rht.humidity)
    }

    fn temperature(&mut self) -> Result<i32, SensorError> {
        let rht = self.read_rht()?;
        info!("Temperature = {} C", Milli(rht.temperature as i64));
        Ok(rht.temperature)
    }

    fn pressure(&mut self) -> Result<f32, SensorError> {
        let mbar = self.read_scalar(SensorKind::Pressure)?;
        info!("Pressure = {} mbar", Fixed3(mbar));
        Ok(mbar)
    }

    fn sound_level(&mut self) -> Result<f32, SensorError> {
        let dba = self.read_scalar(SensorKind::Sound)?;
        info!("Sound level = {} dBA", dba);
        Ok(dba)
    }

    fn imu_orientation(&mut self) -> Result<[i16; 3], SensorError> {
        let [x, y, z] = self.read_imu()?.orientation;
        info!("Orientation = {} {} {}", x, y, z);
        Ok([x, y, z])
    }

    fn imu_acceleration(&mut self) -> Result<[i16; 3], SensorError> {
        let [x, y, z] = self.read_imu()?.acceleration;
        info!("Acceleration = {} {} {}", x, y, z);
        Ok([x, y, z])
    }

    fn imu_enable(&mut self, enable: bool) -> Result<(), SensorError> {
        if enable {
            info!("IMU enable");
        } else {
            info!("IMU disable");
        }
        if let Err(e) = self.registry.imu_enable(enable) {
            let what = if enable { "enable" } else { "disable" };
            match e {
                SensorError::NotInitialized => warn!("IMU {} failed: not available", what),
                SensorError::Driver(d) => warn!("IMU {} failed: {}", what, d.code),
            }
        }
        Ok(())
    }

    fn imu_calibrate(&mut self) -> Result<(), SensorError> {
        info!("IMU calibrate");
        self.registry
            .imu_calibrate()
            .map_err(|e| report(SensorKind::Imu, e))
    }

    fn rgb_leds_write(&mut self, command: RgbCommand) -> Result<(), SensorError> {
        if !config::SERVICE_RGB_ENABLED {
            return Err(SensorError::NotInitialized);
        }
        if self.supply.is_low_power() {
            return Ok(());
        }
        info!(
            "RGB LEDs = mask {} r {} g {} b {}",
            command.mask, command.red, command.green, command.blue
        );
        self.registry.rgb_set(command);
        Ok(())
    }

    fn rgb_mask(&mut self) -> Result<u8, SensorError> {
        if !config::SERVICE_RGB_ENABLED {
            return Err(SensorError::NotInitialized);
        }
        let mask = self.registry.rgb_mask();
        info!("RGB LED mask = {}", mask);
        Ok(mask)
    }

    fn digital_inputs(&mut self) -> Result<u8, SensorError> {
        let Reading::Aio(inputs) = self.read(SensorKind::Aio)? else {
            return Err(SensorError::NotInitialized);
        };
        info!("Digital inputs = {}", inputs);
        Ok(inputs)
    }

    fn aio_button_changed(&mut self) -> Result<u8, SensorError> {
        self.registry
            .aio_button_changed()
            .map_err(|e| report(SensorKind::Aio, e))?;
        self.digital_inputs()
    }
}
