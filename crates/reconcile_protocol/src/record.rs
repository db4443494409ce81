//! Record model shared by the resolver and the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Names of the well-known record fields.
pub mod fields {
    /// Client-maintained "last modified" instant. Highest timestamp precedence.
    pub const MODIFIED_AT: &str = "modifiedAt";
    /// Alternate "last modified" instant used by older record types.
    pub const UPDATED_AT: &str = "updatedAt";
    /// Creation instant. Lowest timestamp precedence.
    pub const CREATED_AT: &str = "createdAt";
}

/// A logical partition of records (a sync zone).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    /// Name of the zone used when none is given.
    pub const DEFAULT: &'static str = "default";

    /// Creates a zone id.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the zone name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a record, unique within its zone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Zone the record lives in.
    #[serde(default)]
    pub zone: ZoneId,
    /// Record name, unique within the zone.
    pub name: String,
}

impl RecordId {
    /// Creates a record id in the given zone.
    pub fn new(zone: ZoneId, name: impl Into<String>) -> Self {
        Self {
            zone,
            name: name.into(),
        }
    }

    /// Creates a record id in the default zone.
    pub fn in_default_zone(name: impl Into<String>) -> Self {
        Self::new(ZoneId::default(), name)
    }

    /// Generates a fresh random id in the given zone.
    #[must_use]
    pub fn generate(zone: ZoneId) -> Self {
        Self::new(zone, Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.zone, self.name)
    }
}

/// Opaque change tag assigned by the remote store.
///
/// The engine never interprets a token; it only copies it so that a retried
/// save carries the token the store currently expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wraps a store-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A field value stored on a record.
///
/// Serialized untagged, so RFC 3339 strings read from JSON become
/// [`FieldValue::Timestamp`] and every other string stays [`FieldValue::Text`].
/// Nested objects are carried as [`FieldValue::Map`] and pass through merges
/// and copies unchanged.
///
/// The JSON round trip is not byte-exact: a `Text` value that parses as
/// RFC 3339 comes back as a `Timestamp`, and timestamps with an offset are
/// written back in UTC (`Z`). The instant is always preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// UTF-8 text.
    Text(String),
    /// Ordered list of values.
    List(Vec<FieldValue>),
    /// Nested object, keyed by name.
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the instant if this is a timestamp value.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Returns the entries if this is a nested object.
    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// A record persisted by the remote store.
///
/// Fields are an open map; the well-known names in [`fields`] get typed
/// accessors, everything else is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    record_type: String,
    id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_token: Option<VersionToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    store_modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty, never-saved record.
    pub fn new(record_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            record_type: record_type.into(),
            id,
            version_token: None,
            store_modified_at: None,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field (builder form).
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Sets the version token (builder form).
    #[must_use]
    pub fn with_version_token(mut self, token: VersionToken) -> Self {
        self.version_token = Some(token);
        self
    }

    /// Sets the store-assigned modification time (builder form).
    #[must_use]
    pub fn with_store_modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.store_modified_at = Some(at);
        self
    }

    /// Returns the type discriminator.
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Returns the record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns the version token, if the record was ever saved.
    pub fn version_token(&self) -> Option<&VersionToken> {
        self.version_token.as_ref()
    }

    /// Replaces the version token.
    pub fn set_version_token(&mut self, token: Option<VersionToken>) {
        self.version_token = token;
    }

    /// Returns the modification time assigned by the store.
    pub fn store_modified_at(&self) -> Option<DateTime<Utc>> {
        self.store_modified_at
    }

    /// Replaces the store-assigned modification time.
    pub fn set_store_modified_at(&mut self, at: Option<DateTime<Utc>>) {
        self.store_modified_at = at;
    }

    /// Returns all fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Sets a field, returning the previous value.
    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Returns a text field.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    /// Returns a timestamp field.
    pub fn timestamp_field(&self, name: &str) -> Option<DateTime<Utc>> {
        self.field(name).and_then(FieldValue::as_timestamp)
    }

    /// Returns the `modifiedAt` field.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(fields::MODIFIED_AT)
    }

    /// Returns the `updatedAt` field.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(fields::UPDATED_AT)
    }

    /// Returns the `createdAt` field.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_field(fields::CREATED_AT)
    }

    /// The instant used to order conflicting versions of this record.
    ///
    /// Precedence: `modifiedAt`, `updatedAt`, the store modification time,
    /// then `createdAt`. Candidates that are not timestamps are skipped.
    pub fn logical_timestamp(&self) -> Option<DateTime<Utc>> {
        self.modified_at()
            .or_else(|| self.updated_at())
            .or(self.store_modified_at)
            .or_else(|| self.created_at())
    }

    /// Copies every field of `other` onto this record, overwriting on clash.
    pub fn overwrite_fields_from(&mut self, other: &Record) {
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Creates an unsaved record of the same type under a new id, carrying
    /// every field of this one.
    #[must_use]
    pub fn duplicate_as(&self, id: RecordId) -> Record {
        Record {
            record_type: self.record_type.clone(),
            id,
            version_token: None,
            store_modified_at: None,
            fields: self.fields.clone(),
        }
    }
}
