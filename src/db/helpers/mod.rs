use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::SecurityEventKind;

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} out of range: {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_kind(value: &str) -> Result<SecurityEventKind> {
    match value {
        "Unlocked" => Ok(SecurityEventKind::Unlocked),
        "AttemptFailed" => Ok(SecurityEventKind::AttemptFailed),
        "Lockout" => Ok(SecurityEventKind::Lockout),
        "Reconfigured" => Ok(SecurityEventKind::Reconfigured),
        other => Err(anyhow!("unknown security event kind {other}")),
    }
}
