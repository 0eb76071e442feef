//! Upstream query modes and request URL construction.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::seen::SESSION_DATE_FORMAT;

pub const DEFAULT_API_ROOT: &str = "https://cdn-api.co-vin.in/api/v2/appointment/sessions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// `calendarByDistrict`, keyed by district id.
    #[default]
    ByArea,
    /// `findByPin`, keyed by postal code.
    ByPostalCode,
}

impl QueryMode {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::ByArea => "calendarByDistrict",
            Self::ByPostalCode => "findByPin",
        }
    }

    pub fn area_param(self) -> &'static str {
        match self {
            Self::ByArea => "district_id",
            Self::ByPostalCode => "pincode",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ByArea => "by_area",
            Self::ByPostalCode => "by_postal_code",
        })
    }
}

/// One upstream request: which endpoint, which area, which day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotQuery {
    pub mode: QueryMode,
    pub area_code: String,
    pub date: NaiveDate,
}

impl SlotQuery {
    pub fn new(mode: QueryMode, area_code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            mode,
            area_code: area_code.into(),
            date,
        }
    }

    /// Build the request URL under `api_root` (trailing slashes tolerated).
    ///
    /// The upstream wants the day as `dd-mm-yyyy`.
    pub fn url(&self, api_root: &str) -> String {
        format!(
            "{}/{}?{}={}&date={}",
            api_root.trim_end_matches('/'),
            self.mode.endpoint(),
            self.mode.area_param(),
            self.area_code,
            self.date.format(SESSION_DATE_FORMAT),
        )
    }
}
