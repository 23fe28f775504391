//! Bluetooth Low Energy side of the firmware.
//!
//! The radio stack itself is an external collaborator. This module defines
//! what the core consumes from it:
//!
//! 1. **Events** - the typed stream the lifecycle controller switches on.
//! 2. **Radio control** - advertising payload, start and stop.
//! 3. **Advertiser** - the device-unique payload built from the identity
//!    address, and idempotent start/stop on top of the stack.

pub mod adv_payload;
pub mod advertiser;

use core::fmt;

use crate::error::StackError;

pub use advertiser::Advertiser;

/// Kind of the identity address reported at boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    Public,
    StaticRandom,
}

impl AddressKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AddressKind::Public => "public",
            AddressKind::StaticRandom => "static random",
        }
    }
}

/// Six-byte identity address, least significant byte first (air order).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityAddress(pub [u8; 6]);

impl IdentityAddress {
    /// 24-bit unit identifier: the low-order three bytes, little-endian.
    pub fn unique_id(&self) -> u32 {
        let [b0, b1, b2, ..] = self.0;
        u32::from_le_bytes([b0, b1, b2, 0]) & 0x00FF_FFFF
    }
}

impl fmt::Display for IdentityAddress {
    /// Conventional `AA:BB:CC:DD:EE:FF` form, most significant byte first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[5], a[4], a[3], a[2], a[1], a[0]
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for IdentityAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

/// Payload of the stack's boot event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
    pub hash: u32,
    pub address: IdentityAddress,
    pub address_kind: AddressKind,
}

/// Events delivered by the radio stack, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    BootComplete(BootInfo),
    ConnectionOpened,
    ConnectionClosed,
    /// Any other event ID; ignored by the core.
    Other(u32),
}

/// Radio control surface used by the [`Advertiser`].
pub trait RadioStack {
    /// Installs the legacy advertising payload (at most 31 bytes).
    fn set_advertising_data(&mut self, data: &[u8]) -> Result<(), StackError>;

    fn start_advertising(&mut self) -> Result<(), StackError>;

    fn stop_advertising(&mut self) -> Result<(), StackError>;
}
