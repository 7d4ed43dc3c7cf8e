//! C-STORE status codes
//!
//! Only `0x0000` counts as stored. Warnings are reported as failures like any
//! other non-zero status.

use std::fmt;

/// Status `(0000,0900)` of a C-STORE-RSP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0x0000);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human readable category, following the storage service class tables
    pub fn description(self) -> &'static str {
        match self.0 {
            0x0000 => "Success",
            0xB000 => "Warning: Coercion of data elements",
            0xB006 => "Warning: Elements discarded",
            0xB007 => "Warning: Data set does not match SOP class",
            0xA700..=0xA7FF => "Refused: Out of resources",
            0xA900..=0xA9FF => "Error: Data set does not match SOP class",
            0xC000..=0xCFFF => "Error: Cannot understand",
            0x0111 => "Failure: Duplicate SOP instance",
            0x0117 => "Failure: Invalid SOP instance",
            0x0122 => "Refused: SOP class not supported",
            0x0124 => "Refused: Not authorized",
            0x0210 => "Failure: Duplicate invocation",
            0x0211 => "Failure: Unrecognized operation",
            0x0212 => "Failure: Mistyped argument",
            0x0213 => "Failure: Resource limitation",
            0xFE00 => "Cancel",
            0xFF00 | 0xFF01 => "Pending",
            _ => "Unknown status",
        }
    }
}

/// Always `0x` plus four uppercase hex digits
impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}
