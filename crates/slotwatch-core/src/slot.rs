//! Canonical slot record shared by both upstream query modes.

use std::fmt;

use serde::Serialize;

/// Age bracket a slot is announced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bracket {
    Age18,
    Age45,
}

impl Bracket {
    /// Map an upstream minimum age onto a bracket. Only exact matches count.
    pub fn from_min_age(age: u32) -> Option<Self> {
        match age {
            18 => Some(Self::Age18),
            45 => Some(Self::Age45),
            _ => None,
        }
    }

    pub fn min_age(self) -> u32 {
        match self {
            Self::Age18 => 18,
            Self::Age45 => 45,
        }
    }
}

impl fmt::Display for Bracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+", self.min_age())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fee {
    Free,
    /// Amount exactly as listed upstream (usually rupees, as a string).
    Amount(String),
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("Free"),
            Self::Amount(amount) => f.write_str(amount),
        }
    }
}

/// One bookable session, normalised from either payload shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSlot {
    pub name: String,
    pub block_name: String,
    pub vaccine_type: String,
    /// Always set in area mode; postal payloads may omit fee data.
    pub fee: Option<Fee>,
    /// Upstream date string, `dd-mm-yyyy`.
    pub date: String,
    pub available_capacity: i64,
    pub available_capacity_dose1: Option<i64>,
    pub available_capacity_dose2: Option<i64>,
    pub age_limit: Option<u32>,
}
