//! Response normalisation for the two upstream payload shapes.
//!
//! Area payloads are deduplicated against a [`SeenSessionStore`] and split
//! into the 18+ and 45+ brackets. Postal payloads carry no session ids, so
//! they are filtered against an age allow-list and returned as one list.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::Config;
use crate::payload::{AreaPayload, PostalPayload, RawCenter, RawPostalSession};
use crate::query::QueryMode;
use crate::seen::SeenSessionStore;
use crate::slot::{Bracket, Fee, NormalizedSlot};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed {mode} payload: {source}")]
    Payload {
        mode: QueryMode,
        #[source]
        source: serde_json::Error,
    },
    #[error("paid center {center} lists no fee for {vaccine}")]
    MissingFee { center: String, vaccine: String },
}

/// Who a batch of slots is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Bracket(Bracket),
    /// Postal-mode results, already filtered by the configured age list.
    AllowListed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Bracketed {
        age_18: Vec<NormalizedSlot>,
        age_45: Vec<NormalizedSlot>,
    },
    Flat(Vec<NormalizedSlot>),
}

impl Normalized {
    pub fn len(&self) -> usize {
        match self {
            Self::Bracketed { age_18, age_45 } => age_18.len() + age_45.len(),
            Self::Flat(slots) => slots.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into per-audience batches, 18+ before 45+.
    pub fn into_batches(self) -> Vec<(Audience, Vec<NormalizedSlot>)> {
        match self {
            Self::Bracketed { age_18, age_45 } => vec![
                (Audience::Bracket(Bracket::Age18), age_18),
                (Audience::Bracket(Bracket::Age45), age_45),
            ],
            Self::Flat(slots) => vec![(Audience::AllowListed, slots)],
        }
    }
}

pub trait ResponseParser: Send + Sync {
    fn mode(&self) -> QueryMode;

    /// Turn one raw response body into candidate slots.
    ///
    /// Implementations that deduplicate record accepted sessions in `seen`
    /// in the same step that accepts them. On `Err`, `seen` is left untouched.
    fn normalize(&self, raw: &str, seen: &mut SeenSessionStore)
    -> Result<Normalized, NormalizeError>;
}

/// Pick the parser for the configured query mode.
pub fn parser_for(config: &Config) -> Box<dyn ResponseParser> {
    match config.query.mode {
        QueryMode::ByArea => Box::new(AreaParser),
        QueryMode::ByPostalCode => Box::new(PostalCodeParser::new(config.age_limits.clone())),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AreaParser;

impl AreaParser {
    fn fee_for(center: &RawCenter, vaccine: &str) -> Result<Fee, NormalizeError> {
        if center.fee_type == "Free" {
            return Ok(Fee::Free);
        }
        center
            .vaccine_fees
            .iter()
            .find(|f| f.vaccine.eq_ignore_ascii_case(vaccine))
            .map(|f| Fee::Amount(f.fee.clone()))
            .ok_or_else(|| NormalizeError::MissingFee {
                center: center.name.clone(),
                vaccine: vaccine.to_string(),
            })
    }
}

impl ResponseParser for AreaParser {
    fn mode(&self) -> QueryMode {
        QueryMode::ByArea
    }

    fn normalize(
        &self,
        raw: &str,
        seen: &mut SeenSessionStore,
    ) -> Result<Normalized, NormalizeError> {
        let payload: AreaPayload =
            serde_json::from_str(raw).map_err(|source| NormalizeError::Payload {
                mode: QueryMode::ByArea,
                source,
            })?;

        let mut age_18 = Vec::new();
        let mut age_45 = Vec::new();
        // Recorded only once the whole payload has normalized.
        let mut accepted: HashSet<(&str, &str)> = HashSet::new();

        for center in &payload.centers {
            for session in &center.sessions {
                if session.available_capacity <= 0 {
                    continue;
                }
                let Some(bracket) = session.min_age_limit.and_then(Bracket::from_min_age) else {
                    trace!(session_id = %session.session_id, age = ?session.min_age_limit, "no bracket");
                    continue;
                };
                let key = (session.date.as_str(), session.session_id.as_str());
                if seen.contains(key.0, key.1) || accepted.contains(&key) {
                    continue;
                }

                let fee = Self::fee_for(center, &session.vaccine)?;
                debug!(
                    session_id = %session.session_id,
                    center = %center.name,
                    %bracket,
                    "new session"
                );

                let slot = NormalizedSlot {
                    name: center.name.clone(),
                    block_name: center.block_name.clone(),
                    vaccine_type: session.vaccine.clone(),
                    fee: Some(fee),
                    date: session.date.clone(),
                    available_capacity: session.available_capacity,
                    available_capacity_dose1: session.available_capacity_dose1,
                    available_capacity_dose2: session.available_capacity_dose2,
                    age_limit: Some(bracket.min_age()),
                };
                match bracket {
                    Bracket::Age18 => age_18.push(slot),
                    Bracket::Age45 => age_45.push(slot),
                }
                accepted.insert(key);
            }
        }

        for (date, session_id) in accepted {
            seen.record(date, session_id);
        }
        Ok(Normalized::Bracketed { age_18, age_45 })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostalCodeParser {
    allowed_ages: Vec<u32>,
}

impl PostalCodeParser {
    pub fn new(allowed_ages: Vec<u32>) -> Self {
        Self { allowed_ages }
    }

    fn fee_of(session: &RawPostalSession) -> Option<Fee> {
        match (session.fee_type.as_deref(), &session.fee) {
            (Some("Free"), _) => Some(Fee::Free),
            (_, Some(amount)) => Some(Fee::Amount(amount.clone())),
            _ => None,
        }
    }
}

impl ResponseParser for PostalCodeParser {
    fn mode(&self) -> QueryMode {
        QueryMode::ByPostalCode
    }

    fn normalize(
        &self,
        raw: &str,
        _seen: &mut SeenSessionStore,
    ) -> Result<Normalized, NormalizeError> {
        let payload: PostalPayload =
            serde_json::from_str(raw).map_err(|source| NormalizeError::Payload {
                mode: QueryMode::ByPostalCode,
                source,
            })?;

        let slots = payload
            .sessions
            .into_iter()
            .filter(|s| self.allowed_ages.contains(&s.min_age_limit))
            .map(|s| NormalizedSlot {
                fee: Self::fee_of(&s),
                name: s.name,
                block_name: s.block_name,
                vaccine_type: s.vaccine,
                date: s.date,
                available_capacity: s.available_capacity,
                available_capacity_dose1: None,
                available_capacity_dose2: None,
                age_limit: Some(s.min_age_limit),
            })
            .collect();

        Ok(Normalized::Flat(slots))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_json(sessions: &str, fee_type: &str) -> String {
        format!(
            r#"{{"centers": [{{
                "name": "CHC Anekal",
                "block_name": "Anekal",
                "fee_type": "{fee_type}",
                "vaccine_fees": [{{"vaccine": "COVISHIELD", "fee": "780"}}],
                "sessions": [{sessions}]
            }}]}}"#
        )
    }

    fn session(id: &str, capacity: i64, age: u32) -> String {
        format!(
            r#"{{"session_id": "{id}", "date": "18-10-2026", "available_capacity": {capacity},
                "available_capacity_dose1": {capacity}, "available_capacity_dose2": 0,
                "min_age_limit": {age}, "vaccine": "COVISHIELD"}}"#
        )
    }

    fn brackets(n: Normalized) -> (Vec<NormalizedSlot>, Vec<NormalizedSlot>) {
        match n {
            Normalized::Bracketed { age_18, age_45 } => (age_18, age_45),
            Normalized::Flat(_) => panic!("expected bracketed output"),
        }
    }

    #[test]
    fn splits_by_bracket_and_records() {
        let raw = area_json(&[session("a", 5, 18), session("b", 3, 45)].join(","), "Free");
        let mut seen = SeenSessionStore::default();
        let (age_18, age_45) = brackets(AreaParser.normalize(&raw, &mut seen).unwrap());

        assert_eq!(age_18.len(), 1);
        assert_eq!(age_45.len(), 1);
        assert_eq!(age_18[0].age_limit, Some(18));
        assert_eq!(age_18[0].available_capacity_dose1, Some(5));
        assert!(seen.contains("18-10-2026", "a"));
        assert!(seen.contains("18-10-2026", "b"));
    }

    #[test]
    fn unrecognised_age_is_dropped_and_not_recorded() {
        let raw = area_json(&session("x", 5, 40), "Free");
        let mut seen = SeenSessionStore::default();
        let out = AreaParser.normalize(&raw, &mut seen).unwrap();
        assert!(out.is_empty());
        assert!(seen.is_empty());
    }

    #[test]
    fn duplicate_id_in_one_payload_emitted_once() {
        let raw = area_json(&[session("a", 5, 18), session("a", 5, 18)].join(","), "Free");
        let mut seen = SeenSessionStore::default();
        let (age_18, _) = brackets(AreaParser.normalize(&raw, &mut seen).unwrap());
        assert_eq!(age_18.len(), 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn free_center_ignores_listed_amount() {
        let raw = area_json(&session("a", 5, 18), "Free");
        let (age_18, _) = brackets(
            AreaParser
                .normalize(&raw, &mut SeenSessionStore::default())
                .unwrap(),
        );
        assert_eq!(age_18[0].fee, Some(Fee::Free));
    }

    #[test]
    fn paid_center_uses_listed_amount() {
        let raw = area_json(&session("a", 5, 18), "Paid");
        let (age_18, _) = brackets(
            AreaParser
                .normalize(&raw, &mut SeenSessionStore::default())
                .unwrap(),
        );
        assert_eq!(age_18[0].fee, Some(Fee::Amount("780".into())));
    }

    #[test]
    fn paid_center_without_matching_fee_is_an_error() {
        let raw = r#"{"centers": [{
            "name": "Apollo", "block_name": "Central", "fee_type": "Paid",
            "vaccine_fees": [{"vaccine": "COVAXIN", "fee": "1410"}],
            "sessions": [{"session_id": "a", "date": "18-10-2026", "available_capacity": 2,
                          "min_age_limit": 18, "vaccine": "SPUTNIK V"}]
        }]}"#;
        let err = AreaParser
            .normalize(raw, &mut SeenSessionStore::default())
            .unwrap_err();
        assert!(matches!(err, NormalizeError::MissingFee { .. }));
    }

    #[test]
    fn failed_payload_records_nothing() {
        let raw = r#"{"centers": [
            {"name": "CHC Anekal", "block_name": "Anekal", "fee_type": "Free",
             "sessions": [{"session_id": "good", "date": "18-10-2026", "available_capacity": 4,
                           "min_age_limit": 18, "vaccine": "COVISHIELD"}]},
            {"name": "Apollo", "block_name": "Central", "fee_type": "Paid", "vaccine_fees": [],
             "sessions": [{"session_id": "bad", "date": "18-10-2026", "available_capacity": 2,
                           "min_age_limit": 45, "vaccine": "COVAXIN"}]}
        ]}"#;
        let mut seen = SeenSessionStore::default();
        let err = AreaParser.normalize(raw, &mut seen).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingFee { .. }));
        assert!(seen.is_empty());

        // Once the upstream drops the unpriced center, the good session still surfaces.
        let fixed = area_json(&session("good", 4, 18), "Free");
        let (age_18, _) = brackets(AreaParser.normalize(&fixed, &mut seen).unwrap());
        assert_eq!(age_18.len(), 1);
        assert!(seen.contains("18-10-2026", "good"));
    }

    #[test]
    fn malformed_area_payload() {
        let err = AreaParser
            .normalize(r#"{"sessions": []}"#, &mut SeenSessionStore::default())
            .unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Payload {
                mode: QueryMode::ByArea,
                ..
            }
        ));
    }

    fn postal_session(age: u32, capacity: i64) -> String {
        format!(
            r#"{{"name": "PHC Rampur", "block_name": "Rampur", "min_age_limit": {age},
                "vaccine": "COVAXIN", "date": "18-10-2026", "available_capacity": {capacity}}}"#
        )
    }

    #[test]
    fn postal_filters_by_allow_list_and_keeps_zero_capacity() {
        let raw = format!(
            r#"{{"sessions": [{}, {}, {}]}}"#,
            postal_session(18, 0),
            postal_session(40, 10),
            postal_session(45, 3)
        );
        let parser = PostalCodeParser::new(vec![18, 45]);
        let mut seen = SeenSessionStore::default();
        let Normalized::Flat(slots) = parser.normalize(&raw, &mut seen).unwrap() else {
            panic!("expected flat output");
        };
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].available_capacity, 0);
        assert_eq!(slots[1].age_limit, Some(45));
        assert_eq!(slots[0].fee, None);
        assert!(seen.is_empty());
    }

    #[test]
    fn postal_allow_list_is_configurable() {
        let raw = format!(r#"{{"sessions": [{}]}}"#, postal_session(40, 1));
        let parser = PostalCodeParser::new(vec![40]);
        let out = parser
            .normalize(&raw, &mut SeenSessionStore::default())
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn into_batches_orders_18_before_45() {
        let batches = Normalized::Bracketed {
            age_18: vec![],
            age_45: vec![],
        }
        .into_batches();
        assert_eq!(batches[0].0, Audience::Bracket(Bracket::Age18));
        assert_eq!(batches[1].0, Audience::Bracket(Bracket::Age45));
    }
}
