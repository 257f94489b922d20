//! Attribute-value-unit descriptors read from the `avus` array.

use crate::document::{JsonObject, RawDocument, keys, resolve_text};
use crate::error::{BatonError, Result};
use std::fmt;
use std::str::FromStr;

/// Value comparison accepted in a metadata query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operator {
    #[default]
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }
}

impl FromStr for Operator {
    type Err = BatonError;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_ascii_lowercase().as_str() {
            "=" => Ok(Operator::Equal),
            "<>" => Ok(Operator::NotEqual),
            "<" => Ok(Operator::Less),
            "<=" => Ok(Operator::LessOrEqual),
            ">" => Ok(Operator::Greater),
            ">=" => Ok(Operator::GreaterOrEqual),
            "like" => Ok(Operator::Like),
            "not like" => Ok(Operator::NotLike),
            _ => Err(BatonError::invalid(format!(
                "unsupported AVU operator '{raw}'; expected one of =, <>, <, <=, >, >=, like, not like"
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvuDescriptor {
    pub attribute: String,
    pub value: Option<String>,
    pub units: Option<String>,
    /// `None` when the document gave no operator; queries treat that as `=`.
    pub operator: Option<Operator>,
}

impl AvuDescriptor {
    pub fn new(attribute: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.map(str::to_string),
            units: None,
            operator: None,
        }
    }

    /// Decode one element of the `avus` array. Only the attribute is
    /// mandatory here; operation-specific rules are applied by callers.
    pub fn from_object(object: &JsonObject) -> Result<Self> {
        let attribute = resolve_text(object, keys::ATTRIBUTE)?.require()?;
        let value = resolve_text(object, keys::VALUE)?.optional();
        let units = resolve_text(object, keys::UNITS)?.optional();
        let operator = resolve_text(object, keys::OPERATOR)?
            .optional()
            .map(|raw| raw.parse::<Operator>())
            .transpose()?;
        Ok(Self {
            attribute,
            value,
            units,
            operator,
        })
    }

    pub fn effective_operator(&self) -> Operator {
        self.operator.unwrap_or_default()
    }
}

impl fmt::Display for AvuDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.attribute)?;
        if let Some(value) = &self.value {
            write!(f, " {} {value}", self.effective_operator())?;
        }
        if let Some(units) = &self.units {
            write!(f, " [{units}]")?;
        }
        f.write_str("}")
    }
}

/// Read the `avus` array. A missing array is `MissingKey`; an empty one is
/// returned as-is.
pub fn parse_avus(document: &RawDocument) -> Result<Vec<AvuDescriptor>> {
    let items: Vec<JsonObject> = document.resolve(keys::AVUS)?.require()?;
    items.iter().map(AvuDescriptor::from_object).collect()
}
