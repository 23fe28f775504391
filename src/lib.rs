//! Thunderboard sensor firmware core.
//!
//! Everything in this library is hardware independent and runs on the host:
//! the sensor registry, shutdown timer, advertiser, attribute hooks and the
//! lifecycle state machine that ties them together. Platform collaborators
//! (radio stack, timer facility, deep sleep, supply probe, drivers) are
//! traits.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and wires these traits to the nRF52840 + SoftDevice S140.

#![cfg_attr(not(test), no_std)]

// Must come first so the log macros are visible in every module below.
#[macro_use]
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod gatt;
pub mod lifecycle;
pub mod power;
pub mod sensors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use ble::{AddressKind, BootInfo, IdentityAddress, RadioStack, StackEvent};
pub use error::{DriverError, GattError, SensorError, StackError, TimerError};
pub use gatt::{read_characteristic, write_characteristic, AttributeHooks, Characteristic};
pub use lifecycle::{Controller, Input, LifecycleState};
pub use power::{BatteryType, DeepSleep, OneShotTimer, PowerSupply};
pub use sensors::{Registry, SensorKind};
