//! Advertiser controller.
//!
//! Configures the unit-specific payload once at boot and tracks whether the
//! radio is advertising so `start`/`stop` are idempotent. Stack errors are
//! logged; the lifecycle keeps going.

use super::adv_payload::{local_name, manufacturer_unique_id, AdvertisingPayload};
use super::RadioStack;

pub struct Advertiser<R: RadioStack> {
    radio: R,
    unique_id: Option<u32>,
    active: bool,
}

impl<R: RadioStack> Advertiser<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            unique_id: None,
            active: false,
        }
    }

    /// One-time setup: installs the payload for `unique_id` and starts
    /// advertising.
    pub fn initialize(&mut self, unique_id: u32) {
        let payload = AdvertisingPayload::for_unit(unique_id);
        let data = payload.as_bytes();
        match self.radio.set_advertising_data(data) {
            // Report what a scanner will decode from the installed payload.
            Ok(()) => match (local_name(data), manufacturer_unique_id(data)) {
                (Some(name), Some(id)) if id == unique_id => {
                    info!("Advertising as {} (unit {})", name.as_str(), id)
                }
                _ => warn!("Advertising payload does not identify unit {}", unique_id),
            },
            Err(e) => error!("Failed to set advertising data: {}", e.code),
        }
        self.unique_id = Some(unique_id);
        self.start();
    }

    pub fn start(&mut self) {
        if self.active {
            return;
        }
        match self.radio.start_advertising() {
            Ok(()) => {
                info!("Advertising started");
                self.active = true;
            }
            Err(e) => error!("Failed to start advertising: {}", e.code),
        }
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        match self.radio.stop_advertising() {
            Ok(()) => info!("Advertising stopped"),
            Err(e) => error!("Failed to stop advertising: {}", e.code),
        }
        self.active = false;
    }

    pub fn is_advertising(&self) -> bool {
        self.active
    }

    /// Identifier installed by [`Advertiser::initialize`].
    pub fn unique_id(&self) -> Option<u32> {
        self.unique_id
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }
}
