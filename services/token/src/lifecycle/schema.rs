//! Record layout of token sets.
//!
//! Field names and set names are shared with every other reader of the
//! store and must not change. Instants are stored as epoch seconds.

use chrono::{DateTime, Utc};
use rust_common::PlatformError;

use crate::error::TokenError;
use crate::model::{DynamicToken, ServiceUser, StaticToken};
use crate::storage::{Bin, Record};

pub const SUBJECT: &str = "subject";
pub const ROLE: &str = "role";
pub const NAME: &str = "name";
pub const TOKEN: &str = "token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const PREVIOUS_TOKEN: &str = "tokenp";
pub const PREVIOUS_REFRESH_TOKEN: &str = "refresh_tokenp";
pub const ISSUED_AT: &str = "issued_at";
pub const EXPIRES_AT: &str = "expires_at";
pub const ENABLED: &str = "enabled";

/// Fields read before disabling a token.
pub const DISABLE_FIELDS: [&str; 2] = [TOKEN, SUBJECT];
/// Fields read before expiring a token.
pub const EXPIRE_FIELDS: [&str; 3] = [TOKEN, SUBJECT, EXPIRES_AT];

pub fn dynamic_set(app: &str) -> String {
    format!("{app}_tokens")
}

pub fn static_set(app: &str) -> String {
    format!("{app}_static_tokens")
}

/// Full dynamic record. Written with a replacing put, so no previous
/// generation survives.
pub fn dynamic_bins(
    user: &ServiceUser,
    token: String,
    refresh_token: String,
    issued_at: i64,
    expires_at: i64,
) -> Vec<Bin> {
    vec![
        Bin::new(SUBJECT, user.id.as_str()),
        Bin::new(ROLE, user.role.as_str()),
        Bin::new(NAME, user.name.as_str()),
        Bin::new(TOKEN, token),
        Bin::new(REFRESH_TOKEN, refresh_token),
        Bin::new(ISSUED_AT, issued_at),
        Bin::new(EXPIRES_AT, expires_at),
        Bin::new(ENABLED, true),
    ]
}

/// Rotation fields: the new generation plus the one it replaces.
pub fn refresh_bins(
    current: &DynamicToken,
    token: String,
    refresh_token: String,
    issued_at: i64,
    expires_at: i64,
) -> Vec<Bin> {
    vec![
        Bin::new(TOKEN, token),
        Bin::new(PREVIOUS_TOKEN, current.token.as_str()),
        Bin::new(REFRESH_TOKEN, refresh_token),
        Bin::new(PREVIOUS_REFRESH_TOKEN, current.refresh_token.as_str()),
        Bin::new(ISSUED_AT, issued_at),
        Bin::new(EXPIRES_AT, expires_at),
    ]
}

pub fn static_bins(subject: &str, role: &str, token: String, issued_at: i64, expires_at: i64) -> Vec<Bin> {
    vec![
        Bin::new(SUBJECT, subject),
        Bin::new(ROLE, role),
        Bin::new(TOKEN, token),
        Bin::new(ISSUED_AT, issued_at),
        Bin::new(EXPIRES_AT, expires_at),
        Bin::new(ENABLED, true),
    ]
}

pub fn disable_bins() -> Vec<Bin> {
    vec![Bin::new(ENABLED, false)]
}

pub fn expire_bins(expiry: i64) -> Vec<Bin> {
    vec![Bin::new(EXPIRES_AT, expiry)]
}

fn malformed(id: &str, field: &str) -> TokenError {
    TokenError::Store(PlatformError::serialization(format!(
        "record {id} has a missing or malformed field {field}"
    )))
}

pub fn required_str(record: &Record, id: &str, field: &str) -> Result<String, TokenError> {
    record
        .get_str(field)
        .map(str::to_string)
        .ok_or_else(|| malformed(id, field))
}

pub fn required_instant(record: &Record, id: &str, field: &str) -> Result<DateTime<Utc>, TokenError> {
    record
        .get_i64(field)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| malformed(id, field))
}

pub fn dynamic_token(id: &str, record: &Record) -> Result<DynamicToken, TokenError> {
    Ok(DynamicToken {
        id: id.to_string(),
        subject: required_str(record, id, SUBJECT)?,
        role: required_str(record, id, ROLE)?,
        name: required_str(record, id, NAME)?,
        token: required_str(record, id, TOKEN)?,
        refresh_token: required_str(record, id, REFRESH_TOKEN)?,
        previous_token: record.get_str(PREVIOUS_TOKEN).map(str::to_string),
        previous_refresh_token: record.get_str(PREVIOUS_REFRESH_TOKEN).map(str::to_string),
        issued_at: required_instant(record, id, ISSUED_AT)?,
        expires_at: required_instant(record, id, EXPIRES_AT)?,
        enabled: record.get_bool(ENABLED).unwrap_or(true),
    })
}

pub fn static_token(id: &str, record: &Record) -> Result<StaticToken, TokenError> {
    Ok(StaticToken {
        id: id.to_string(),
        subject: required_str(record, id, SUBJECT)?,
        role: required_str(record, id, ROLE)?,
        token: required_str(record, id, TOKEN)?,
        issued_at: required_instant(record, id, ISSUED_AT)?,
        expires_at: required_instant(record, id, EXPIRES_AT)?,
        enabled: record.get_bool(ENABLED).unwrap_or(true),
    })
}
