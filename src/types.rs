//! Shared domain types: country codes, continents, the remote document
//! mirror, and the store's lifecycle/status enums.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::CodeParseError;

// ============================================================================
// CountryCode
// ============================================================================

/// An uppercase 2–3 letter country identifier (ISO-style).
///
/// Construction always normalizes: input is trimmed and upper-cased, so
/// `"ro"`, `" ro "` and `"RO"` all produce the same code. Anything that is
/// not 2–3 ASCII letters is rejected with [`CodeParseError`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse and normalize a code.
    pub fn parse(input: &str) -> Result<Self, CodeParseError> {
        let trimmed = input.trim();
        if (2..=3).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(CodeParseError {
                input: input.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CodeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CountryCode {
    type Error = CodeParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

// ============================================================================
// Continent / Country
// ============================================================================

/// The fixed continent enumeration used by the catalog and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continent {
    Africa,
    Asia,
    Europe,
    NorthAmerica,
    SouthAmerica,
    Oceania,
}

impl Continent {
    /// All continents, in the product's display order.
    pub const ALL: [Continent; 6] = [
        Continent::Africa,
        Continent::Europe,
        Continent::Asia,
        Continent::NorthAmerica,
        Continent::SouthAmerica,
        Continent::Oceania,
    ];

    /// Product-facing display name ("North America", not "NorthAmerica").
    pub fn name(self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Oceania => "Oceania",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One catalog entry. Immutable, sourced from the static catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub code: CountryCode,
    pub name: String,
    pub continent: Continent,
}

// ============================================================================
// VisitedDoc — the remote per-user document
// ============================================================================

/// Wire field names of the per-user visited document (camelCase — this is
/// the deployed schema shared with the other clients).
pub mod field {
    pub const VISITED: &str = "visited";
    pub const VISITED_DATES: &str = "visitedDates";
    pub const MIGRATED_FROM_LOCAL: &str = "migratedFromLocal";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// In-memory image of the remote per-user document.
///
/// `visited_dates` is sparse: a code may be in `visited` with no date yet
/// (the backfill sweep closes that gap). Readers tolerate the reverse
/// direction too and never assume the invariant holds at rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitedDoc {
    pub visited: BTreeSet<CountryCode>,
    pub visited_dates: BTreeMap<CountryCode, DateTime<Utc>>,
    pub migrated_from_local: bool,
    /// Backend-assigned write timestamp. Advisory only (last write wins).
    pub updated_at: Option<DateTime<Utc>>,
}

impl VisitedDoc {
    /// Defensive parse of a raw document value.
    ///
    /// Never fails: a non-array `visited` yields an empty set, entries that
    /// are not 2–3 letter strings are dropped, unparseable dates are dropped.
    /// Matches the tolerant `normalizeVisited` behavior of the other clients.
    pub fn from_value(value: &Value) -> Self {
        let mut doc = Self::default();

        if let Some(items) = value.get(field::VISITED).and_then(Value::as_array) {
            doc.visited = items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| CountryCode::parse(s).ok())
                .collect();
        }

        if let Some(map) = value.get(field::VISITED_DATES).and_then(Value::as_object) {
            for (key, raw) in map {
                let Ok(code) = CountryCode::parse(key) else {
                    continue;
                };
                if let Some(ts) = raw.as_str().and_then(parse_rfc3339) {
                    doc.visited_dates.insert(code, ts);
                }
            }
        }

        doc.migrated_from_local = value
            .get(field::MIGRATED_FROM_LOCAL)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        doc.updated_at = value
            .get(field::UPDATED_AT)
            .and_then(Value::as_str)
            .and_then(parse_rfc3339);

        doc
    }

    /// Serialize the client-owned fields for a merge write.
    ///
    /// `updatedAt` is intentionally absent — the backend stamps it on write.
    pub fn to_fields(&self) -> Value {
        let mut fields = Map::new();
        fields.insert(field::VISITED.to_string(), visited_array(&self.visited));
        fields.insert(
            field::VISITED_DATES.to_string(),
            dates_map(&self.visited_dates),
        );
        if self.migrated_from_local {
            fields.insert(field::MIGRATED_FROM_LOCAL.to_string(), json!(true));
        }
        Value::Object(fields)
    }
}

/// Serialize a visited set as a sorted JSON array (the other clients sort
/// before writing; `BTreeSet` iteration gives that for free).
pub fn visited_array(visited: &BTreeSet<CountryCode>) -> Value {
    Value::Array(
        visited
            .iter()
            .map(|c| Value::String(c.as_str().to_string()))
            .collect(),
    )
}

/// Serialize a dates map as a JSON object of RFC 3339 strings.
pub fn dates_map(dates: &BTreeMap<CountryCode, DateTime<Utc>>) -> Value {
    let mut map = Map::new();
    for (code, ts) in dates {
        map.insert(code.as_str().to_string(), Value::String(ts.to_rfc3339()));
    }
    Value::Object(map)
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// UserId
// ============================================================================

/// Opaque user identity handed out by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Store lifecycle / status
// ============================================================================

/// Lifecycle state of the visited store, per user session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Unstarted,
    Hydrating,
    Ready,
    Stopped,
}

/// Advisory sync indicator for optional UI display — never blocks anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Loading,
    Saving,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Loading => "loading",
            SyncStatus::Saving => "saving",
            SyncStatus::Error => "error",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
