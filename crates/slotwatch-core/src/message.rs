//! Plain-text notification bodies.

use std::fmt::Write;

use crate::slot::NormalizedSlot;

pub const SCHEDULE_URL: &str = "https://selfregistration.cowin.gov.in";

const SEPARATOR: &str = "-----------------------------------------------------";

/// Render one message covering every slot, in order.
///
/// Returns `None` for an empty batch so callers never send blank messages.
pub fn format_message(slots: &[NormalizedSlot]) -> Option<String> {
    if slots.is_empty() {
        return None;
    }

    let mut out = String::new();
    for slot in slots {
        // Writing into a String cannot fail.
        let _ = write_section(&mut out, slot);
    }
    Some(out)
}

fn write_section(out: &mut String, slot: &NormalizedSlot) -> std::fmt::Result {
    writeln!(out, "{} ({})", slot.name, slot.date)?;
    writeln!(out, "Block: {}", slot.block_name)?;
    writeln!(
        out,
        "Available vaccine: {} ({})",
        slot.available_capacity, slot.vaccine_type
    )?;
    writeln!(
        out,
        "(Dose 1: {}, Dose 2: {})",
        or_unknown(slot.available_capacity_dose1),
        or_unknown(slot.available_capacity_dose2)
    )?;
    writeln!(out, "{} ({})", slot.vaccine_type, or_unknown(slot.fee.as_ref()))?;
    if let Some(age) = slot.age_limit {
        writeln!(out, "Age: {age}+")?;
    }
    writeln!(out, "Schedule: {SCHEDULE_URL}")?;
    writeln!(out, "{SEPARATOR}")
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
