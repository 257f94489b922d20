//! The untyped stdin document and the key resolver.
//!
//! Fields may be spelled with a canonical key or a short alias. Resolution
//! tries the canonical key first, then the alias, and reports absence as a
//! value rather than an error; callers decide whether a field is mandatory.

use crate::error::{BatonError, Result};
use crate::schema::DocumentSchema;
use serde_json::{Map, Value};
use std::io::Read;
use tracing::{debug, trace};

pub type JsonObject = Map<String, Value>;

/// Canonical key plus optional short alias for one logical field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldKey {
    pub canonical: &'static str,
    pub short: Option<&'static str>,
}

impl FieldKey {
    pub const fn new(canonical: &'static str, short: &'static str) -> Self {
        Self {
            canonical,
            short: Some(short),
        }
    }

    pub const fn canonical_only(canonical: &'static str) -> Self {
        Self {
            canonical,
            short: None,
        }
    }
}

pub mod keys {
    use super::FieldKey;

    pub const COLLECTION: FieldKey = FieldKey::new("collection", "coll");
    pub const DATA_OBJECT: FieldKey = FieldKey::new("data_object", "obj");
    pub const DIRECTORY: FieldKey = FieldKey::new("directory", "dir");
    pub const FILE: FieldKey = FieldKey::canonical_only("file");

    pub const AVUS: FieldKey = FieldKey::canonical_only("avus");
    pub const ATTRIBUTE: FieldKey = FieldKey::new("attribute", "a");
    pub const VALUE: FieldKey = FieldKey::new("value", "v");
    pub const UNITS: FieldKey = FieldKey::new("units", "u");
    pub const OPERATOR: FieldKey = FieldKey::new("operator", "o");

    pub const ACCESS: FieldKey = FieldKey::canonical_only("access");
    pub const OWNER: FieldKey = FieldKey::canonical_only("owner");
    pub const LEVEL: FieldKey = FieldKey::canonical_only("level");
    pub const ZONE: FieldKey = FieldKey::canonical_only("zone");
}

/// Outcome of resolving one field: the key that matched (or the canonical
/// key when nothing matched) and the decoded value, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedField<T> {
    pub key: &'static str,
    pub value: Option<T>,
}

impl<T> ResolvedField<T> {
    pub fn found(&self) -> bool {
        self.value.is_some()
    }

    /// Convert absence into `MissingKey` for fields the caller needs.
    pub fn require(self) -> Result<T> {
        self.value.ok_or_else(|| BatonError::missing_key(self.key))
    }

    pub fn optional(self) -> Option<T> {
        self.value
    }
}

/// Target shape a JSON value is decoded into.
pub trait FieldShape: Sized {
    /// `Ok(None)` means the value is present but counts as absent (null or
    /// an empty string).
    fn decode(key: &str, value: &Value) -> Result<Option<Self>>;
}

impl FieldShape for String {
    fn decode(key: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) if text.is_empty() => Ok(None),
            Value::String(text) => Ok(Some(text.clone())),
            Value::Number(number) => Ok(Some(number.to_string())),
            Value::Bool(flag) => Ok(Some(flag.to_string())),
            Value::Array(_) | Value::Object(_) => Err(BatonError::invalid(format!(
                "{key} must be a string, found {}",
                json_type_name(value)
            ))),
        }
    }
}

impl FieldShape for Vec<JsonObject> {
    fn decode(key: &str, value: &Value) -> Result<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| BatonError::invalid(format!("{key} must be an array of objects: {err}")))
    }
}

impl FieldShape for JsonObject {
    fn decode(key: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(object) => Ok(Some(object.clone())),
            other => Err(BatonError::invalid(format!(
                "{key} must be an object, found {}",
                json_type_name(other)
            ))),
        }
    }
}

/// Resolve `field` inside `object`, canonical key first, then the alias.
pub fn resolve<T: FieldShape>(object: &JsonObject, field: FieldKey) -> Result<ResolvedField<T>> {
    if let Some(value) = lookup(object, field.canonical)? {
        trace!(key = field.canonical, "resolved canonical key");
        return Ok(ResolvedField {
            key: field.canonical,
            value: Some(value),
        });
    }

    if let Some(short) = field.short.filter(|short| !short.is_empty()) {
        debug!(key = field.canonical, short_key = short, "no key, looking for short key");
        if let Some(value) = lookup(object, short)? {
            return Ok(ResolvedField {
                key: short,
                value: Some(value),
            });
        }
    }

    Ok(ResolvedField {
        key: field.canonical,
        value: None,
    })
}

/// Shorthand for resolving a textual field.
pub fn resolve_text(object: &JsonObject, field: FieldKey) -> Result<ResolvedField<String>> {
    resolve(object, field)
}

fn lookup<T: FieldShape>(object: &JsonObject, key: &str) -> Result<Option<T>> {
    match object.get(key) {
        Some(value) => T::decode(key, value),
        None => Ok(None),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The single JSON object read from stdin for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDocument {
    fields: JsonObject,
}

impl RawDocument {
    pub fn read_from(mut reader: impl Read) -> Result<Self> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        Self::parse(&input)
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BatonError::invalid("no input provided on stdin"));
        }
        let value: Value = serde_json::from_str(trimmed)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_object() {
            DocumentSchema::compile()?.check(&value)?;
        }
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(BatonError::invalid(format!(
                "input must be a JSON object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }

    pub fn resolve<T: FieldShape>(&self, field: FieldKey) -> Result<ResolvedField<T>> {
        resolve(&self.fields, field)
    }

    pub fn text(&self, field: FieldKey) -> Result<ResolvedField<String>> {
        resolve_text(&self.fields, field)
    }
}
