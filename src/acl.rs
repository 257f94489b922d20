//! Access-control entries read from the `access` array.

use crate::document::{JsonObject, RawDocument, keys, resolve_text};
use crate::error::{BatonError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessLevel {
    Null,
    Read,
    Write,
    Own,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Null => "null",
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Own => "own",
        }
    }
}

impl FromStr for AccessLevel {
    type Err = BatonError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "null" => Ok(AccessLevel::Null),
            "read" | "read_object" => Ok(AccessLevel::Read),
            "write" | "modify_object" => Ok(AccessLevel::Write),
            "own" => Ok(AccessLevel::Own),
            _ => Err(BatonError::invalid(format!(
                "unknown access level '{raw}'; expected null, read, write or own"
            ))),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclEntry {
    pub owner: String,
    /// `None` means the account's home zone.
    pub zone: Option<String>,
    pub level: AccessLevel,
}

impl AclEntry {
    pub fn from_object(object: &JsonObject) -> Result<Self> {
        let owner = resolve_text(object, keys::OWNER)?.require()?;
        let level = resolve_text(object, keys::LEVEL)?.require()?.parse()?;
        let zone = resolve_text(object, keys::ZONE)?.optional();
        Ok(Self { owner, zone, level })
    }

    pub fn zone_or<'a>(&'a self, home_zone: &'a str) -> &'a str {
        self.zone.as_deref().unwrap_or(home_zone)
    }
}

/// Read every entry of the `access` array; the first malformed entry fails
/// the whole list.
pub fn compile_acl_entries(document: &RawDocument) -> Result<Vec<AclEntry>> {
    let items: Vec<JsonObject> = document.resolve(keys::ACCESS)?.require()?;
    items.iter().map(AclEntry::from_object).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RawDocument {
        RawDocument::from_value(value).unwrap()
    }

    #[test]
    fn compiles_entries_with_optional_zone() {
        let entries = compile_acl_entries(&doc(json!({
            "access": [
                {"owner": "alice", "level": "read"},
                {"owner": "bob", "level": "OWN", "zone": "otherzone"}
            ]
        })))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, AccessLevel::Read);
        assert_eq!(entries[0].zone_or("home"), "home");
        assert_eq!(entries[1].level, AccessLevel::Own);
        assert_eq!(entries[1].zone_or("home"), "otherzone");
    }

    #[test]
    fn missing_access_array_is_missing_key() {
        let err = compile_acl_entries(&doc(json!({"coll": "/z"}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKey);
    }

    #[test]
    fn entry_without_owner_or_level_is_missing_key() {
        let no_owner = compile_acl_entries(&doc(json!({"access": [{"level": "read"}]})));
        assert_eq!(no_owner.unwrap_err().kind(), ErrorKind::MissingKey);
        let no_level = compile_acl_entries(&doc(json!({"access": [{"owner": "alice"}]})));
        assert_eq!(no_level.unwrap_err().kind(), ErrorKind::MissingKey);
    }

    #[test]
    fn unknown_level_is_invalid() {
        let err = compile_acl_entries(&doc(json!({
            "access": [{"owner": "alice", "level": "admin"}]
        })))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn modern_level_names_map_to_legacy_vocabulary() {
        assert_eq!("modify_object".parse::<AccessLevel>().unwrap(), AccessLevel::Write);
        assert_eq!("read_object".parse::<AccessLevel>().unwrap(), AccessLevel::Read);
    }
}
