//! Sensor registry.
//!
//! A fixed-capacity table of `(kind, driver, state)` entries populated once at
//! start-up from the compiled-in service set. Membership never changes after
//! [`RegistryBuilder::build`]; only the per-entry [`SensorState`] does.
//!
//! Each entry tracks whether its latest `init` succeeded so that reads on a
//! sensor that is down return [`SensorError::NotInitialized`] instead of
//! touching the bus.

use heapless::Vec;

use super::{
    DigitalInputs, Imu, ImuSample, LightReading, RgbCommand, RgbLeds, RhtReading, Sensor,
    SensorKind,
};
use crate::config;
use crate::error::SensorError;

/// Upper bound on registered sensors (one per [`SensorKind`]).
pub const MAX_SENSORS: usize = 8;

/// Driver reference tagged with its kind.
pub enum Driver<'d> {
    Hall(&'d mut dyn Sensor<Reading = f32>),
    Light(&'d mut dyn Sensor<Reading = LightReading>),
    Lux(&'d mut dyn Sensor<Reading = f32>),
    Rht(&'d mut dyn Sensor<Reading = RhtReading>),
    Imu(&'d mut dyn Imu),
    Pressure(&'d mut dyn Sensor<Reading = f32>),
    Sound(&'d mut dyn Sensor<Reading = f32>),
    Aio(&'d mut dyn DigitalInputs),
}

macro_rules! each_driver {
    ($driver:expr, $s:ident => $body:expr) => {
        match $driver {
            Driver::Hall($s) => $body,
            Driver::Light($s) => $body,
            Driver::Lux($s) => $body,
            Driver::Rht($s) => $body,
            Driver::Imu($s) => $body,
            Driver::Pressure($s) => $body,
            Driver::Sound($s) => $body,
            Driver::Aio($s) => $body,
        }
    };
}

impl Driver<'_> {
    pub fn kind(&self) -> SensorKind {
        match self {
            Driver::Hall(_) => SensorKind::Hall,
            Driver::Light(_) => SensorKind::Light,
            Driver::Lux(_) => SensorKind::Lux,
            Driver::Rht(_) => SensorKind::Rht,
            Driver::Imu(_) => SensorKind::Imu,
            Driver::Pressure(_) => SensorKind::Pressure,
            Driver::Sound(_) => SensorKind::Sound,
            Driver::Aio(_) => SensorKind::Aio,
        }
    }

    fn init(&mut self) -> Result<(), crate::error::DriverError> {
        each_driver!(self, s => s.init())
    }

    fn deinit(&mut self) {
        each_driver!(self, s => s.deinit())
    }

    fn step(&mut self) {
        each_driver!(self, s => s.step())
    }

    fn read(&mut self) -> Result<Reading, crate::error::DriverError> {
        Ok(match self {
            Driver::Hall(s) => Reading::Hall(s.read()?),
            Driver::Light(s) => Reading::Light(s.read()?),
            Driver::Lux(s) => Reading::Lux(s.read()?),
            Driver::Rht(s) => Reading::Rht(s.read()?),
            Driver::Imu(s) => Reading::Imu(s.read()?),
            Driver::Pressure(s) => Reading::Pressure(s.read()?),
            Driver::Sound(s) => Reading::Sound(s.read()?),
            Driver::Aio(s) => Reading::Aio(s.read()?),
        })
    }
}

/// Typed result of [`Registry::read`]. The variant always matches the
/// requested [`SensorKind`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reading {
    /// Magnetic flux density, mT.
    Hall(f32),
    Light(LightReading),
    /// Illuminance, lux.
    Lux(f32),
    Rht(RhtReading),
    Imu(ImuSample),
    /// Air pressure, mbar.
    Pressure(f32),
    /// Sound level, dBA.
    Sound(f32),
    /// Bitmask of active digital inputs.
    Aio(u8),
}

/// Lifecycle of one registry entry within a connection cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// `init` not attempted since the last `deinit`.
    Down,
    /// Latest `init` succeeded.
    Ready,
    /// Latest `init` failed.
    Failed,
}

struct Entry<'d> {
    driver: Driver<'d>,
    state: SensorState,
}

/// Collects the board's drivers, keeping only those whose service is
/// compiled in.
pub struct RegistryBuilder<'d> {
    entries: Vec<Entry<'d>, MAX_SENSORS>,
    rgb: Option<&'d mut dyn RgbLeds>,
}

impl<'d> RegistryBuilder<'d> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            rgb: None,
        }
    }

    /// Adds a driver. Drivers whose service is disabled, and duplicates of
    /// an already registered kind, are dropped.
    pub fn with(mut self, driver: Driver<'d>) -> Self {
        let kind = driver.kind();
        if !config::sensor_enabled(kind) {
            debug!("{} not compiled in", kind.name());
            return self;
        }
        if self.entries.iter().any(|e| e.driver.kind() == kind) {
            warn!("{} registered twice", kind.name());
            return self;
        }
        // Capacity equals the number of kinds, so this cannot overflow.
        let _ = self.entries.push(Entry {
            driver,
            state: SensorState::Down,
        });
        self
    }

    /// Adds the LED bank, when the board populates RGB LEDs.
    pub fn with_rgb(mut self, leds: &'d mut dyn RgbLeds) -> Self {
        if config::SERVICE_RGB_ENABLED {
            self.rgb = Some(leds);
        }
        self
    }

    pub fn build(self) -> Registry<'d> {
        Registry {
            entries: self.entries,
            rgb: self.rgb,
        }
    }
}

impl Default for RegistryBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// The board's sensor set. Exclusively owns (borrows for `'d`) every driver.
pub struct Registry<'d> {
    entries: Vec<Entry<'d>, MAX_SENSORS>,
    rgb: Option<&'d mut dyn RgbLeds>,
}

impl<'d> Registry<'d> {
    pub fn builder() -> RegistryBuilder<'d> {
        RegistryBuilder::new()
    }

    /// Number of registered sensors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, kind: SensorKind) -> bool {
        self.entries.iter().any(|e| e.driver.kind() == kind)
    }

    /// State of the entry for `kind`, `None` when not registered.
    pub fn state(&self, kind: SensorKind) -> Option<SensorState> {
        self.entries
            .iter()
            .find(|e| e.driver.kind() == kind)
            .map(|e| e.state)
    }

    /// Initialises every sensor. Failures are logged and leave that sensor
    /// not initialised; they never abort the iteration.
    pub fn init_all(&mut self) {
        for entry in self.entries.iter_mut() {
            let kind = entry.driver.kind();
            entry.state = match entry.driver.init() {
                Ok(()) => {
                    debug!("{} initialized", kind.name());
                    SensorState::Ready
                }
                Err(e) => {
                    warn!("{} init failed: {}", kind.name(), e.code);
                    SensorState::Failed
                }
            };
        }
    }

    /// Deinitialises every sensor whose `init` was attempted, then turns the
    /// LEDs off. Safe after a partially failed [`Registry::init_all`] and
    /// when called twice.
    pub fn deinit_all(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.state != SensorState::Down {
                entry.driver.deinit();
                entry.state = SensorState::Down;
            }
        }
        if let Some(leds) = self.rgb.as_deref_mut() {
            leds.set(RgbCommand::OFF);
        }
    }

    /// Reads the sensor behind `kind`.
    ///
    /// Driver statuses are returned unchanged; a sensor that is not
    /// registered or not initialised yields `NotInitialized` without
    /// reaching the driver.
    pub fn read(&mut self, kind: SensorKind) -> Result<Reading, SensorError> {
        let entry = self.ready_entry(kind)?;
        Ok(entry.driver.read()?)
    }

    /// Gives every initialised sensor one `step`. Never blocks beyond what
    /// the drivers' own step does.
    pub fn step_all(&mut self) {
        for entry in self.entries.iter_mut() {
            if entry.state == SensorState::Ready {
                entry.driver.step();
            }
        }
    }

    /// Turns the IMU motion engine on or off.
    ///
    /// Enabling an IMU that is not ready runs its `init` first; a failed init
    /// leaves it not initialised and `enable` is not called. Disabling marks
    /// the IMU down.
    pub fn imu_enable(&mut self, enable: bool) -> Result<(), SensorError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.driver.kind() == SensorKind::Imu)
            .ok_or(SensorError::NotInitialized)?;
        if enable && entry.state != SensorState::Ready {
            if let Err(e) = entry.driver.init() {
                warn!("{} init failed: {}", SensorKind::Imu.name(), e.code);
                entry.state = SensorState::Failed;
                return Err(e.into());
            }
            entry.state = SensorState::Ready;
        }
        let Driver::Imu(imu) = &mut entry.driver else {
            return Err(SensorError::NotInitialized);
        };
        match imu.enable(enable) {
            Ok(()) => {
                if !enable {
                    entry.state = SensorState::Failed;
                }
                Ok(())
            }
            Err(e) => {
                entry.state = SensorState::Failed;
                Err(e.into())
            }
        }
    }

    pub fn imu_calibrate(&mut self) -> Result<(), SensorError> {
        match &mut self.ready_entry(SensorKind::Imu)?.driver {
            Driver::Imu(imu) => Ok(imu.calibrate()?),
            _ => Err(SensorError::NotInitialized),
        }
    }

    /// Button edge notification for the AIO inputs. Ignored while the AIO
    /// sensor is down.
    pub fn aio_button_changed(&mut self) -> Result<(), SensorError> {
        match &mut self.ready_entry(SensorKind::Aio)?.driver {
            Driver::Aio(aio) => {
                aio.on_button_change();
                Ok(())
            }
            _ => Err(SensorError::NotInitialized),
        }
    }

    /// Forwards an LED pattern to the LED bank, if the board has one.
    pub fn rgb_set(&mut self, command: RgbCommand) {
        if let Some(leds) = self.rgb.as_deref_mut() {
            leds.set(command);
        }
    }

    /// Bitmask of populated LED channels; 0 without an LED bank.
    pub fn rgb_mask(&self) -> u8 {
        match self.rgb.as_deref() {
            Some(leds) => led_mask(leds.led_count()),
            None => 0,
        }
    }

    fn ready_entry(&mut self, kind: SensorKind) -> Result<&mut Entry<'d>, SensorError> {
        self.entries
            .iter_mut()
            .find(|e| e.driver.kind() == kind && e.state == SensorState::Ready)
            .ok_or(SensorError::NotInitialized)
    }
}

fn led_mask(count: u8) -> u8 {
    if count >= 8 {
        0xFF
    } else {
        (1u8 << count) - 1
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
