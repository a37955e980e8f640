//! In-memory representation of a token grant.
//!
//! A [`Token`] is created from a successful code exchange or refresh and is
//! never mutated field by field afterwards: a refresh produces a whole new
//! value that replaces the old one.

use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, Utc};
use serde_json::Value;

use crate::{error::AuthError, types::CredentialRecord, utils};

/// Format of `last_refreshed` in the persisted record, in local time.
pub const LAST_REFRESHED_FORMAT: &str = "%Y%m%d_%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    /// Empty when the grant cannot be renewed silently.
    pub refresh_token: String,
    pub token_type: String,
    /// Granted scopes in the order the provider listed them, without duplicates.
    pub scopes: Vec<String>,
    /// Validity in seconds, counted from `issued_at`.
    pub expires_in: u64,
    /// Whole-second timestamp of the exchange or refresh that produced the token.
    pub issued_at: DateTime<Utc>,
}

impl Token {
    /// Builds a token from the JSON body of a token endpoint response.
    ///
    /// `access_token`, `token_type` and a non-negative integer `expires_in` are
    /// required. `scope` and `refresh_token` default to empty when the
    /// provider leaves them out.
    pub fn from_exchange_response(
        payload: &Value,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let access_token = required_str(payload, "access_token")?;
        let token_type = required_str(payload, "token_type")?;
        let expires_in = payload
            .get("expires_in")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                AuthError::MalformedTokenResponse(
                    "missing or invalid field `expires_in`".to_string(),
                )
            })?;

        let refresh_token = payload
            .get("refresh_token")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let scopes = payload
            .get("scope")
            .and_then(Value::as_str)
            .map(utils::parse_scopes)
            .unwrap_or_default();

        Ok(Self {
            access_token,
            refresh_token,
            token_type,
            scopes,
            expires_in,
            issued_at: issued_at.trunc_subsecs(0),
        })
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Expiry is inclusive: a token with `expires_in = 3600` is expired
    /// exactly 3600 seconds after `issued_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let elapsed_ms = (now - self.issued_at).num_milliseconds();
        let elapsed_secs = (elapsed_ms as f64 / 1000.0).round();
        elapsed_secs >= self.expires_in as f64
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired_at(now)
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Returns true if every requested scope was granted.
    ///
    /// Items may themselves be space separated lists. Matching is exact and
    /// case-sensitive; empty entries are ignored.
    pub fn has_scopes<I, S>(&self, requested: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.missing_scopes(requested).is_empty()
    }

    /// Requested scopes that are not part of the grant, in request order.
    pub fn missing_scopes<I, S>(&self, requested: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut missing: Vec<String> = Vec::new();
        for item in requested {
            for scope in item.as_ref().split_whitespace() {
                if !self.scopes.iter().any(|granted| granted == scope)
                    && !missing.iter().any(|m| m == scope)
                {
                    missing.push(scope.to_string());
                }
            }
        }
        missing
    }

    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self) -> u64 {
        let elapsed = (Utc::now() - self.issued_at).num_seconds().max(0) as u64;
        self.expires_in.saturating_sub(elapsed)
    }

    pub fn to_record(&self) -> CredentialRecord {
        CredentialRecord {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            token_type: self.token_type.clone(),
            scope: self.scope_string(),
            expires_in: self.expires_in,
            last_refreshed: self
                .issued_at
                .with_timezone(&Local)
                .format(LAST_REFRESHED_FORMAT)
                .to_string(),
        }
    }

    /// The record carries no zone: `last_refreshed` is read as local time.
    pub fn from_record(record: CredentialRecord) -> Result<Self, AuthError> {
        let corrupt = |reason: String| {
            AuthError::CorruptCredentials(format!(
                "invalid last_refreshed `{}`: {}",
                record.last_refreshed, reason
            ))
        };
        let issued_at =
            NaiveDateTime::parse_from_str(&record.last_refreshed, LAST_REFRESHED_FORMAT)
                .map_err(|e| corrupt(e.to_string()))?
                .and_local_timezone(Local)
                // a time skipped by a DST change does not exist locally
                .earliest()
                .ok_or_else(|| corrupt("not a valid local time".to_string()))?
                .with_timezone(&Utc);

        Ok(Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            token_type: record.token_type,
            scopes: utils::parse_scopes(&record.scope),
            expires_in: record.expires_in,
            issued_at,
        })
    }
}

fn required_str(payload: &Value, field: &str) -> Result<String, AuthError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AuthError::MalformedTokenResponse(format!("missing field `{}`", field)))
}
