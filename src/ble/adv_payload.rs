//! Legacy advertising payload: build and parse AD structures.
//!
//! Layout (≤ 31 bytes):
//! ```text
//! [02 01 06]                         Flags: LE general discoverable, BR/EDR not supported
//! [len 09 "Thunderboard #NNNNN"]     Complete Local Name
//! [06 FF 47 00 id0 id1 id2]          Manufacturer data: company 0x0047 + 24-bit unit id (LE)
//! ```

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::{ADVERTISED_NAME_PREFIX, COMPANY_ID};

/// Maximum legacy advertising payload size.
pub const MAX_ADV_LEN: usize = 31;

const AD_FLAGS: u8 = 0x01;
const AD_SHORT_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;
const AD_MANUFACTURER_DATA: u8 = 0xFF;

const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Encoded advertising payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvertisingPayload {
    bytes: Vec<u8, MAX_ADV_LEN>,
}

impl AdvertisingPayload {
    /// Builds the payload identifying the unit with `unique_id` (24 bits).
    pub fn for_unit(unique_id: u32) -> Self {
        let name = device_name(unique_id);
        let id = (unique_id & 0x00FF_FFFF).to_le_bytes();
        let company = COMPANY_ID.to_le_bytes();

        let mut bytes = Vec::new();
        // The fixed layout is 3 + 21 + 7 = 31 bytes, so pushes cannot fail.
        let _ = push_ad(
            &mut bytes,
            AD_FLAGS,
            &[FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED],
        );
        let _ = push_ad(&mut bytes, AD_COMPLETE_NAME, name.as_bytes());
        let _ = push_ad(
            &mut bytes,
            AD_MANUFACTURER_DATA,
            &[company[0], company[1], id[0], id[1], id[2]],
        );
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Advertised name of the unit: prefix plus the low 16 bits of the id as
/// five decimal digits.
pub fn device_name(unique_id: u32) -> String<24> {
    let mut name = String::new();
    let _ = write!(name, "{}{:05}", ADVERTISED_NAME_PREFIX, unique_id & 0xFFFF);
    name
}

fn push_ad(out: &mut Vec<u8, MAX_ADV_LEN>, ad_type: u8, data: &[u8]) -> Result<(), ()> {
    out.push(data.len() as u8 + 1).map_err(|_| ())?;
    out.push(ad_type).map_err(|_| ())?;
    out.extend_from_slice(data)
}

/// Iterates `(ad_type, data)` pairs, stopping at the first malformed entry.
fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let value = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, value))
    })
}

/// Extract complete/shortened local name from advertisement data.
pub fn local_name(data: &[u8]) -> Option<String<32>> {
    let (_, name_bytes) = ad_structures(data)
        .find(|(ty, _)| *ty == AD_COMPLETE_NAME || *ty == AD_SHORT_NAME)?;
    let mut name = String::new();
    for &b in name_bytes {
        if name.push(b as char).is_err() {
            break;
        }
    }
    Some(name)
}

/// Unit identifier carried in this firmware's manufacturer data, if any.
pub fn manufacturer_unique_id(data: &[u8]) -> Option<u32> {
    let company = COMPANY_ID.to_le_bytes();
    ad_structures(data)
        .filter(|(ty, _)| *ty == AD_MANUFACTURER_DATA)
        .find_map(|(_, value)| match value {
            [c0, c1, a, b, c] if [*c0, *c1] == company => {
                Some(u32::from_le_bytes([*a, *b, *c, 0]))
            }
            _ => None,
        })
}
