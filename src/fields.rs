//! The field bag and its reserved keys.
//!
//! Log entries carry an open-ended [`Fields`] map. A handful of keys have a
//! fixed meaning and are never forwarded as plain metadata:
//!
//! | key | meaning |
//! |---|---|
//! | [`ERROR_KEY`] (`"error"`) | the error being logged, see [`crate::classify`] |
//! | [`BLOB_KEY`] (`"blob"`) | bulk payloads that must not be sent to the notifier |
//! | [`USER_ID_KEY`] (`"@user.id"`) | [`Identity::id`] |
//! | [`USER_NAME_KEY`] (`"@user.name"`) | [`Identity::name`] |
//! | [`USER_EMAIL_KEY`] (`"@user.email"`) | [`Identity::email`] |
//!
//! Both [`extract_identity`] and [`to_metadata`] are pure: they read the
//! caller's map and return new values, so other consumers of the same entry
//! still see every field.
//!
//! # Examples
//!
//! ```
//! use faultline::{
//!     Level, LogEntry,
//!     fields::{FIELDS_SECTION, extract_identity, to_metadata},
//! };
//!
//! let entry = LogEntry::new(Level::Warn, "slow checkout")
//!     .with_field("@user.name", "Max")
//!     .with_field("note", "x");
//!
//! let (identity, residual) = extract_identity(&entry.fields);
//! assert_eq!(identity.name.as_deref(), Some("Max"));
//!
//! let metadata = to_metadata(&residual);
//! let section = metadata.section(FIELDS_SECTION).unwrap();
//! assert_eq!(section.len(), 1);
//! assert!(section.contains_key("note"));
//! ```

use core::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::error::LoggedError;

/// Key under which an entry's error is stored.
pub const ERROR_KEY: &str = "error";
/// Key for bulk payloads that are never forwarded.
pub const BLOB_KEY: &str = "blob";
/// Key holding the user id.
pub const USER_ID_KEY: &str = "@user.id";
/// Key holding the user name.
pub const USER_NAME_KEY: &str = "@user.name";
/// Key holding the user email.
pub const USER_EMAIL_KEY: &str = "@user.email";

/// The identity keys, in extraction order.
pub const IDENTITY_KEYS: [&str; 3] = [USER_ID_KEY, USER_NAME_KEY, USER_EMAIL_KEY];

/// Every key excluded from forwarded metadata.
pub const RESERVED_KEYS: [&str; 5] = [BLOB_KEY, ERROR_KEY, USER_ID_KEY, USER_NAME_KEY, USER_EMAIL_KEY];

/// Name of the metadata section holding the residual fields.
pub const FIELDS_SECTION: &str = "Fields";

/// An insertion-ordered map of field names to values.
pub type Fields = IndexMap<String, FieldValue, FxBuildHasher>;

/// A single field value.
#[derive(Clone, Debug)]
pub enum FieldValue {
    /// Text, including values that were formatted with `Display` or `Debug`.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A floating point number.
    F64(f64),
    /// An error value.
    Error(LoggedError),
}

impl FieldValue {
    /// The text, if this is a [`FieldValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The error, if this is a [`FieldValue::Error`].
    pub fn as_error(&self) -> Option<&LoggedError> {
        match self {
            FieldValue::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Str(a), FieldValue::Str(b)) => a == b,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::I64(a), FieldValue::I64(b)) => a == b,
            (FieldValue::U64(a), FieldValue::U64(b)) => a == b,
            (FieldValue::F64(a), FieldValue::F64(b)) => a == b,
            (FieldValue::Error(a), FieldValue::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::I64(n) => write!(f, "{n}"),
            FieldValue::U64(n) => write!(f, "{n}"),
            FieldValue::F64(n) => write!(f, "{n}"),
            FieldValue::Error(error) => write!(f, "{error}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::I64(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::I64(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::U64(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::U64(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::F64(value)
    }
}

impl From<LoggedError> for FieldValue {
    fn from(value: LoggedError) -> Self {
        FieldValue::Error(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FieldValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::I64(n) => serializer.serialize_i64(*n),
            FieldValue::U64(n) => serializer.serialize_u64(*n),
            FieldValue::F64(n) => serializer.serialize_f64(*n),
            FieldValue::Error(error) => serializer.collect_str(error),
        }
    }
}

/// The user an entry was logged on behalf of.
///
/// Each part is independently optional; absent parts stay `None` rather than
/// being filled with empty placeholders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Identity {
    /// The user id, from [`USER_ID_KEY`].
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub id: Option<String>,
    /// The user name, from [`USER_NAME_KEY`].
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    /// The user email, from [`USER_EMAIL_KEY`].
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub email: Option<String>,
}

impl Identity {
    /// Returns true if no part of the identity is known.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.email.is_none()
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            USER_ID_KEY => Some(&mut self.id),
            USER_NAME_KEY => Some(&mut self.name),
            USER_EMAIL_KEY => Some(&mut self.email),
            _ => None,
        }
    }
}

/// Named sections of metadata forwarded alongside a report.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct MetaData {
    sections: IndexMap<String, Fields, FxBuildHasher>,
}

impl MetaData {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a section.
    pub fn insert_section(&mut self, name: impl Into<String>, fields: Fields) {
        self.sections.insert(name.into(), fields);
    }

    /// Looks up a section by name.
    pub fn section(&self, name: &str) -> Option<&Fields> {
        self.sections.get(name)
    }

    /// Returns true if there are no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Iterates over the sections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fields)> {
        self.sections.iter().map(|(name, fields)| (name.as_str(), fields))
    }
}

fn is_identity_key(key: &str) -> bool {
    IDENTITY_KEYS.contains(&key)
}

/// Splits the identity fields out of a field bag.
///
/// Identity keys holding text are moved into the returned [`Identity`] and are
/// absent from the returned residual fields. Identity keys holding any other
/// kind of value are left in the residual fields untouched. All other fields
/// are copied over in their original order.
pub fn extract_identity(fields: &Fields) -> (Identity, Fields) {
    let mut identity = Identity::default();
    let mut residual = Fields::with_capacity_and_hasher(fields.len(), FxBuildHasher);

    for (key, value) in fields {
        if let (Some(slot), Some(text)) = (identity.slot_mut(key), value.as_str()) {
            *slot = Some(text.to_string());
            continue;
        }
        residual.insert(key.clone(), value.clone());
    }

    (identity, residual)
}

/// Wraps the non-reserved fields into a single [`FIELDS_SECTION`] section.
///
/// `"blob"` and `"error"` are always dropped. Identity keys are dropped when
/// they hold text, so calling this on a bag that has not been through
/// [`extract_identity`] still never forwards identity. An empty bag gives empty
/// metadata.
pub fn to_metadata(fields: &Fields) -> MetaData {
    let mut metadata = MetaData::new();
    if fields.is_empty() {
        return metadata;
    }

    let section: Fields = fields
        .iter()
        .filter(|(key, value)| match key.as_str() {
            BLOB_KEY | ERROR_KEY => false,
            key if is_identity_key(key) => value.as_str().is_none(),
            _ => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    metadata.insert_section(FIELDS_SECTION, section);
    metadata
}
