//! Value rendering for log lines.
//!
//! Both logging backends accept these through `{}`: `core::fmt::Display` for
//! `log`, `defmt::Format` (via `Display2Format`) for `defmt`.

use core::fmt;

/// Milli-unit integer shown with two decimals, rounded half away from zero
/// (`42350` → `42.35`, `-1250` → `-1.25`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Milli(pub i64);

impl fmt::Display for Milli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (self.0.unsigned_abs() + 5) / 10;
        let sign = if self.0 < 0 && hundredths != 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, hundredths / 100, hundredths % 100)
    }
}

/// Float shown with three fractional digits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fixed3(pub f32);

impl fmt::Display for Fixed3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Zero-padded upper-case hex word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hex32(pub u32);

impl fmt::Display for Hex32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Hex32 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Milli {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Fixed3 {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}
