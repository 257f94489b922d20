//! Applies a batch of AVU additions or removals to one catalog path.
//!
//! Items are applied in order and the first failure stops the batch. Items
//! applied before the failure stay applied: the catalog has no multi-AVU
//! transaction, so the error reports how far the batch got instead.

use crate::avu::AvuDescriptor;
use crate::client::CatalogClient;
use crate::error::{BatonError, Result};
use crate::paths::CatalogPath;
use clap::ValueEnum;
use std::fmt;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetaOperation {
    Add,
    Rem,
}

impl MetaOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaOperation::Add => "add",
            MetaOperation::Rem => "rem",
        }
    }
}

impl fmt::Display for MetaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MutationReport {
    pub applied: usize,
}

/// Apply `operation` for every descriptor in `avus` against `path`.
///
/// Addition requires a value per item; removal deletes by attribute name and
/// ignores any value. Requirements are checked item by item, immediately
/// before that item is sent.
pub fn apply_mutations<C: CatalogClient + ?Sized>(
    client: &mut C,
    operation: MetaOperation,
    path: &CatalogPath,
    avus: &[AvuDescriptor],
) -> Result<MutationReport> {
    let mut last_applied: Option<&str> = None;

    for (applied, avu) in avus.iter().enumerate() {
        if let Err(err) = apply_one(client, operation, path, avu) {
            if applied == 0 {
                return Err(err);
            }
            return Err(BatonError::PartialMutation {
                path: path.path.clone(),
                applied,
                total: avus.len(),
                last_applied: last_applied.map(str::to_string),
                source: Box::new(err),
            });
        }
        last_applied = Some(&avu.attribute);
    }

    Ok(MutationReport {
        applied: avus.len(),
    })
}

fn apply_one<C: CatalogClient + ?Sized>(
    client: &mut C,
    operation: MetaOperation,
    path: &CatalogPath,
    avu: &AvuDescriptor,
) -> Result<()> {
    match operation {
        MetaOperation::Add => {
            let value = avu
                .value
                .as_deref()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| BatonError::missing_key("value"))?;
            client.add_metadata(path, &avu.attribute, value, avu.units.as_deref())?;
            debug!(
                attribute = %avu.attribute,
                value,
                units = avu.units.as_deref().unwrap_or(""),
                path = %path,
                "added metadata"
            );
        }
        MetaOperation::Rem => {
            client.delete_metadata(path, &avu.attribute)?;
            debug!(attribute = %avu.attribute, path = %path, "removed metadata");
        }
    }
    Ok(())
}
