//! nRF52840-DK board support.
//!
//! The DK has none of the Thunderboard's environmental sensors, so the port
//! registers what the board does have:
//!   - die temperature (SoftDevice `sd_temp_get`) behind the RHT service
//!   - BUTTON1..BUTTON4 (P0.11, P0.12, P0.24, P0.25, active-low) as AIO inputs
//!   - LED1..LED4 (P0.13..P0.16, active-low) as the LED bank

use core::sync::atomic::{AtomicU8, Ordering};

use defmt::info;
use embassy_futures::select::select4;
use embassy_nrf::gpio::Input;
use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin;
use nrf_softdevice::raw;
use thunderboard::config;
use thunderboard::error::DriverError;
use thunderboard::power::{BatteryType, DeepSleep, PowerSupply};
use thunderboard::sensors::{DigitalInputs, RgbCommand, RgbLeds, RhtReading, Sensor};

/// Pressed-button bitmask, written by [`button_task`], latched by [`DkButtons`].
static BUTTON_LEVELS: AtomicU8 = AtomicU8::new(0);

// ═══════════════════════════════════════════════════════════════════════════
// Sensors
// ═══════════════════════════════════════════════════════════════════════════

/// On-die temperature sensor. The DK has no humidity sensor; humidity reads 0.
pub struct DieTemperature;

impl Sensor for DieTemperature {
    type Reading = RhtReading;

    fn init(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn deinit(&mut self) {}

    fn read(&mut self) -> Result<RhtReading, DriverError> {
        let mut quarter_degrees: i32 = 0;
        let ret = unsafe { raw::sd_temp_get(&mut quarter_degrees) };
        if ret != raw::NRF_SUCCESS {
            return Err(DriverError::new(ret));
        }
        Ok(RhtReading {
            humidity: 0,
            temperature: quarter_degrees * 250,
        })
    }
}

/// DK buttons as a digital input group.
pub struct DkButtons {
    latched: u8,
}

impl DkButtons {
    pub const fn new() -> Self {
        Self { latched: 0 }
    }
}

impl Sensor for DkButtons {
    type Reading = u8;

    fn init(&mut self) -> Result<(), DriverError> {
        self.latched = BUTTON_LEVELS.load(Ordering::Relaxed);
        Ok(())
    }

    fn deinit(&mut self) {
        self.latched = 0;
    }

    fn read(&mut self) -> Result<u8, DriverError> {
        Ok(self.latched)
    }
}

impl DigitalInputs for DkButtons {
    fn on_button_change(&mut self) {
        self.latched = BUTTON_LEVELS.load(Ordering::Relaxed);
    }
}

/// Wait for an edge on any button, debounce, publish the new levels and
/// call `on_change`.
pub async fn button_task(mut buttons: [Input<'static>; 4], mut on_change: impl FnMut()) -> ! {
    loop {
        {
            let [b1, b2, b3, b4] = &mut buttons;
            select4(
                b1.wait_for_any_edge(),
                b2.wait_for_any_edge(),
                b3.wait_for_any_edge(),
                b4.wait_for_any_edge(),
            )
            .await;
        }

        Timer::after(Duration::from_millis(config::BUTTON_DEBOUNCE_MS)).await;

        let levels = buttons
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_low())
            .fold(0u8, |mask, (i, _)| mask | (1 << i));
        if BUTTON_LEVELS.swap(levels, Ordering::Relaxed) != levels {
            info!("Buttons: {}", levels);
            on_change();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LEDs
// ═══════════════════════════════════════════════════════════════════════════

/// Four single-colour, active-low LEDs. A channel is lit when its mask bit is
/// set and any colour component is non-zero.
pub struct DkLeds<P: OutputPin> {
    pins: [P; 4],
}

impl<P: OutputPin> DkLeds<P> {
    pub fn new(pins: [P; 4]) -> Self {
        let mut leds = Self { pins };
        leds.set(RgbCommand::OFF);
        leds
    }
}

impl<P: OutputPin> RgbLeds for DkLeds<P> {
    fn led_count(&self) -> u8 {
        self.pins.len() as u8
    }

    fn set(&mut self, command: RgbCommand) {
        let lit = (command.red | command.green | command.blue) != 0;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let _ = if lit && command.mask & (1 << i) != 0 {
                pin.set_low()
            } else {
                pin.set_high()
            };
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Power
// ═══════════════════════════════════════════════════════════════════════════

/// Supply probe. The DK has no fuel gauge; the `coin-cell` feature selects
/// the supply the board is assumed to run from.
pub struct DkSupply;

impl PowerSupply for DkSupply {
    fn is_low_power(&self) -> bool {
        cfg!(feature = "coin-cell")
    }

    fn battery_level(&mut self) -> u8 {
        100
    }

    fn battery_type(&self) -> BatteryType {
        if cfg!(feature = "coin-cell") {
            BatteryType::CoinCell
        } else {
            BatteryType::External
        }
    }
}

/// System OFF, the nRF52 counterpart of EM4. Wake-up is a reset.
pub struct SystemOff;

impl DeepSleep for SystemOff {
    fn enter_em4(&mut self) {
        info!("Entering System OFF");
        unsafe {
            raw::sd_power_system_off();
        }
        loop {
            cortex_m::asm::wfe();
        }
    }
}
