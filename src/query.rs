//! Compiles AVU filters into catalog metadata queries.
//!
//! Each descriptor contributes exactly two conditions: an equality on the
//! attribute-name column and an operator-qualified comparison on the
//! attribute-value column. Conditions are conjoined; there is no OR form.
//! Requests are built per target class and never merged.

use crate::avu::{AvuDescriptor, Operator};
use crate::error::{BatonError, Result};
use crate::paths::CatalogPath;
use clap::ValueEnum;
use serde_json::{Map, Value};
use std::fmt;

/// Kind of catalog entry a metadata query runs against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetClass {
    Collection,
    DataObject,
}

impl TargetClass {
    pub fn label(&self) -> &'static str {
        match self {
            TargetClass::Collection => "collections",
            TargetClass::DataObject => "data objects",
        }
    }

    pub fn columns(&self) -> ClassColumns {
        match self {
            TargetClass::Collection => ClassColumns {
                attribute: Column::MetaCollAttrName,
                value: Column::MetaCollAttrValue,
                units: Column::MetaCollAttrUnits,
                select: &[Column::CollName],
            },
            TargetClass::DataObject => ClassColumns {
                attribute: Column::MetaDataAttrName,
                value: Column::MetaDataAttrValue,
                units: Column::MetaDataAttrUnits,
                select: &[Column::CollName, Column::DataName],
            },
        }
    }
}

/// Catalog columns this compiler selects or filters on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    CollName,
    DataName,
    MetaDataAttrName,
    MetaDataAttrValue,
    MetaDataAttrUnits,
    MetaCollAttrName,
    MetaCollAttrValue,
    MetaCollAttrUnits,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::CollName => "COLL_NAME",
            Column::DataName => "DATA_NAME",
            Column::MetaDataAttrName => "META_DATA_ATTR_NAME",
            Column::MetaDataAttrValue => "META_DATA_ATTR_VALUE",
            Column::MetaDataAttrUnits => "META_DATA_ATTR_UNITS",
            Column::MetaCollAttrName => "META_COLL_ATTR_NAME",
            Column::MetaCollAttrValue => "META_COLL_ATTR_VALUE",
            Column::MetaCollAttrUnits => "META_COLL_ATTR_UNITS",
        }
    }

    /// Numeric ICAT column id.
    pub fn icat_id(&self) -> u32 {
        match self {
            Column::CollName => 501,
            Column::DataName => 403,
            Column::MetaDataAttrName => 600,
            Column::MetaDataAttrValue => 601,
            Column::MetaDataAttrUnits => 602,
            Column::MetaCollAttrName => 610,
            Column::MetaCollAttrValue => 611,
            Column::MetaCollAttrUnits => 612,
        }
    }

    /// Key used for this column in metaquery output objects.
    pub fn json_key(&self) -> &'static str {
        match self {
            Column::CollName => "collection",
            Column::DataName => "data_object",
            Column::MetaDataAttrName | Column::MetaCollAttrName => "attribute",
            Column::MetaDataAttrValue | Column::MetaCollAttrValue => "value",
            Column::MetaDataAttrUnits | Column::MetaCollAttrUnits => "units",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column set used for one target class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassColumns {
    pub attribute: Column,
    pub value: Column,
    pub units: Column,
    pub select: &'static [Column],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub column: Column,
    pub predicate: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaQueryRequest {
    pub target: TargetClass,
    /// Query scope; sent alongside the query rather than as a condition.
    pub zone: String,
    pub select: Vec<Column>,
    pub conditions: Vec<Condition>,
}

impl MetaQueryRequest {
    /// Render as GenQuery text, e.g.
    /// `SELECT COLL_NAME WHERE META_COLL_ATTR_NAME = 'a' AND META_COLL_ATTR_VALUE = 'b'`.
    pub fn to_genquery(&self) -> String {
        let select = self
            .select
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join(", ");
        if self.conditions.is_empty() {
            return format!("SELECT {select}");
        }
        let conditions = self
            .conditions
            .iter()
            .map(|condition| format!("{} {}", condition.column, condition.predicate))
            .collect::<Vec<_>>()
            .join(" AND ");
        format!("SELECT {select} WHERE {conditions}")
    }

    /// Decode raw result rows into output objects keyed by column.
    pub fn rows_to_json(&self, rows: &[Vec<String>]) -> Result<Vec<Value>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.select.len() {
                    return Err(BatonError::invalid(format!(
                        "query row has {} columns, expected {}",
                        row.len(),
                        self.select.len()
                    )));
                }
                let object: Map<String, Value> = self
                    .select
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| {
                        (column.json_key().to_string(), Value::from(cell.as_str()))
                    })
                    .collect();
                Ok(Value::Object(object))
            })
            .collect()
    }
}

/// What to do with a metaquery that carries no AVU filters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum EmptyFilterPolicy {
    /// Run the query without metadata conditions (every entry of the class).
    #[default]
    MatchAll,
    Reject,
}

impl EmptyFilterPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyFilterPolicy::MatchAll => "match-all",
            EmptyFilterPolicy::Reject => "reject",
        }
    }
}

/// Build the metadata query for one target class.
pub fn compile_query(
    avus: &[AvuDescriptor],
    target: TargetClass,
    zone: &str,
    policy: EmptyFilterPolicy,
) -> Result<MetaQueryRequest> {
    if avus.is_empty() && policy == EmptyFilterPolicy::Reject {
        return Err(BatonError::invalid(
            "metaquery requires at least one AVU filter",
        ));
    }

    let columns = target.columns();
    let mut conditions = Vec::with_capacity(avus.len() * 2);
    for avu in avus {
        let attribute = quoted(&avu.attribute, "AVU attribute")?;
        let value_predicate = match (&avu.value, avu.operator) {
            (Some(value), operator) => format!(
                "{} {}",
                operator.unwrap_or_default(),
                quoted(value, "AVU value")?
            ),
            (None, None) => format!("{} '%'", Operator::Like),
            (None, Some(operator)) => {
                return Err(BatonError::invalid(format!(
                    "AVU filter on '{}' has operator '{operator}' but no value",
                    avu.attribute
                )));
            }
        };
        conditions.push(Condition {
            column: columns.attribute,
            predicate: format!("{} {attribute}", Operator::Equal),
        });
        conditions.push(Condition {
            column: columns.value,
            predicate: value_predicate,
        });
    }

    Ok(MetaQueryRequest {
        target,
        zone: zone.to_string(),
        select: columns.select.to_vec(),
        conditions,
    })
}

/// Query listing the exact value and units of every AVU named `attribute`
/// on `path`. The attribute is compared with `=`, never as a pattern.
pub fn metadata_listing(path: &CatalogPath, attribute: &str) -> Result<MetaQueryRequest> {
    let target = if path.is_collection() {
        TargetClass::Collection
    } else {
        TargetClass::DataObject
    };
    let columns = target.columns();

    let mut conditions = Vec::with_capacity(3);
    match target {
        TargetClass::Collection => conditions.push(Condition {
            column: Column::CollName,
            predicate: format!("= {}", quoted(&path.path, "catalog path")?),
        }),
        TargetClass::DataObject => {
            let (parent, name) = match path.path.rsplit_once('/') {
                Some(("", name)) => ("/", name),
                Some((parent, name)) => (parent, name),
                None => (".", path.path.as_str()),
            };
            conditions.push(Condition {
                column: Column::CollName,
                predicate: format!("= {}", quoted(parent, "catalog path")?),
            });
            conditions.push(Condition {
                column: Column::DataName,
                predicate: format!("= {}", quoted(name, "catalog path")?),
            });
        }
    }
    conditions.push(Condition {
        column: columns.attribute,
        predicate: format!("= {}", quoted(attribute, "AVU attribute")?),
    });

    Ok(MetaQueryRequest {
        target,
        zone: path_zone(&path.path).to_string(),
        select: vec![columns.value, columns.units],
        conditions,
    })
}

/// First segment of an absolute catalog path, or "" for relative paths.
fn path_zone(path: &str) -> &str {
    path.strip_prefix('/')
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("")
}

fn quoted(text: &str, what: &str) -> Result<String> {
    if text.contains('\'') {
        return Err(BatonError::invalid(format!(
            "{what} '{text}' contains a single quote, which cannot be used in a query"
        )));
    }
    Ok(format!("'{text}'"))
}
