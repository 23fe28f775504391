//! Power management - supply probe, inactivity shutdown and deep sleep.
//!
//! On a low-capacity supply (coin cell) the device must not advertise
//! forever: a one-shot timer armed whenever advertising starts drives the MCU
//! into EM4 after [`config::SHUTDOWN_TIMEOUT_MS`] without a connection.
//! Mains/USB powered boards never arm it.
//!
//! ```text
//!          maybe_arm (low-power)
//!   Idle ─────────────────────────▶ Armed
//!     ▲                               │
//!     │   disarm / expired            │
//!     └───────────────────────────────┘
//! ```

use crate::config;
use crate::error::TimerError;

/// Battery chemistry / supply type reported by the probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BatteryType {
    Unknown = 0,
    /// CR2032 coin cell.
    CoinCell = 1,
    /// 2×AAA alkaline pack.
    Aaa = 2,
    /// USB or mains supply.
    External = 3,
}

/// Power supply probe.
pub trait PowerSupply {
    /// `true` when running from a low-capacity source.
    fn is_low_power(&self) -> bool;

    /// Remaining battery capacity, percent.
    fn battery_level(&mut self) -> u8;

    fn battery_type(&self) -> BatteryType;
}

/// Platform one-shot software timer. Expiry is reported back to the
/// lifecycle controller as [`crate::lifecycle::Input::ShutdownTimeout`].
pub trait OneShotTimer {
    fn start(&mut self, timeout_ms: u32) -> Result<(), TimerError>;

    fn cancel(&mut self) -> Result<(), TimerError>;
}

/// Deepest sleep primitive.
pub trait DeepSleep {
    /// Enters EM4. Real implementations never return; test doubles record
    /// the call and return.
    fn enter_em4(&mut self);
}

/// Shutdown timer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerState {
    Idle,
    Armed,
}

/// Inactivity shutdown timer driven by the lifecycle controller.
pub struct ShutdownTimer<T: OneShotTimer> {
    timer: T,
    state: TimerState,
}

impl<T: OneShotTimer> ShutdownTimer<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            state: TimerState::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TimerState::Armed
    }

    /// Arms the timer when the supply is low-power. No-op when already armed
    /// or when externally powered.
    ///
    /// # Panics
    ///
    /// When the timer facility rejects the request (platform misconfiguration).
    pub fn maybe_arm(&mut self, supply: &impl PowerSupply) {
        if self.state == TimerState::Armed || !supply.is_low_power() {
            return;
        }
        if let Err(e) = self.timer.start(config::SHUTDOWN_TIMEOUT_MS) {
            panic!("shutdown timer start failed: {:?}", e);
        }
        info!("Shutdown timer armed ({} ms)", config::SHUTDOWN_TIMEOUT_MS);
        self.state = TimerState::Armed;
    }

    /// Cancels a pending shutdown. No-op when idle.
    ///
    /// # Panics
    ///
    /// When the timer facility rejects the request.
    pub fn disarm(&mut self) {
        if self.state == TimerState::Idle {
            return;
        }
        if let Err(e) = self.timer.cancel() {
            panic!("shutdown timer cancel failed: {:?}", e);
        }
        info!("Shutdown timer disarmed");
        self.state = TimerState::Idle;
    }

    /// Disarms a pending shutdown once the supply stops being low-power.
    pub fn recheck(&mut self, supply: &impl PowerSupply) {
        if self.state == TimerState::Armed && !supply.is_low_power() {
            info!("Supply is no longer low-power");
            self.disarm();
        }
    }

    /// Records that the one-shot fired; the facility needs no cancel.
    pub fn expired(&mut self) {
        self.state = TimerState::Idle;
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
