//! Structural validation of the stdin document.
//!
//! The embedded JSON Schema only constrains shapes (path fragments are
//! scalars, `avus` and `access` are arrays of objects); key aliasing and
//! requiredness stay with the resolvers because they depend on the operation.

use crate::error::{BatonError, Result};
use jsonschema::JSONSchema;
use serde_json::Value;

const DOCUMENT_SCHEMA: &str = include_str!("../schemas/document.json");

pub struct DocumentSchema {
    compiled: JSONSchema,
}

impl DocumentSchema {
    pub fn compile() -> Result<Self> {
        let schema: Value = serde_json::from_str(DOCUMENT_SCHEMA)?;
        let compiled = JSONSchema::compile(&schema)
            .map_err(|err| BatonError::invalid(format!("compiling document schema: {err}")))?;
        Ok(Self { compiled })
    }

    /// Validate `document`, collecting every violation into one error.
    pub fn check(&self, document: &Value) -> Result<()> {
        if let Err(errors) = self.compiled.validate(document) {
            let details = errors
                .map(|err| format!("{} at '{}'", err, err.instance_path))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BatonError::invalid(format!(
                "input document failed validation: {details}"
            )));
        }
        Ok(())
    }
}
