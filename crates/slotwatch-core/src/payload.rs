//! Raw upstream payloads as returned by the appointment API.
//!
//! Only the fields slotwatch reads are modelled; serde ignores the rest.

use serde::{Deserialize, Deserializer};

/// `calendarByDistrict` response: centers, each with a week of sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaPayload {
    pub centers: Vec<RawCenter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCenter {
    pub name: String,
    pub block_name: String,
    /// `"Free"` or `"Paid"`.
    pub fee_type: String,
    #[serde(default)]
    pub vaccine_fees: Vec<RawVaccineFee>,
    pub sessions: Vec<RawAreaSession>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVaccineFee {
    pub vaccine: String,
    #[serde(deserialize_with = "amount_as_string")]
    pub fee: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAreaSession {
    pub session_id: String,
    pub date: String,
    pub available_capacity: i64,
    #[serde(default)]
    pub available_capacity_dose1: Option<i64>,
    #[serde(default)]
    pub available_capacity_dose2: Option<i64>,
    #[serde(default)]
    pub min_age_limit: Option<u32>,
    pub vaccine: String,
}

/// `findByPin` response: a flat list of sessions with no identifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct PostalPayload {
    pub sessions: Vec<RawPostalSession>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPostalSession {
    pub name: String,
    pub block_name: String,
    pub min_age_limit: u32,
    pub vaccine: String,
    pub date: String,
    pub available_capacity: i64,
    #[serde(default)]
    pub fee_type: Option<String>,
    #[serde(default, deserialize_with = "optional_amount_as_string")]
    pub fee: Option<String>,
}

/// Fees show up as `"780"` in some responses and `780` in others.
#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        match amount {
            Amount::Text(s) => s,
            Amount::Integer(n) => n.to_string(),
            Amount::Decimal(n) => n.to_string(),
        }
    }
}

fn amount_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Amount::deserialize(deserializer).map(String::from)
}

fn optional_amount_as_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Amount>::deserialize(deserializer)?.map(String::from))
}
