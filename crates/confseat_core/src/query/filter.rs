//! Conference filter compiler.
//!
//! # Responsibility
//! - Map external field/operator names onto a fixed whitelist.
//! - Coerce numeric filter values.
//! - Produce a [`QueryPlan`] whose ordering satisfies the store rule that a
//!   range-filtered property must be the first sort key.
//!
//! # Invariants
//! - At most one distinct field carries a non-equality operator.
//! - Predicates keep caller order.
//! - Plans always end their ordering with `name`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One caller-supplied filter in external vocabulary, e.g.
/// `{ field: "CITY", operator: "EQ", value: "London" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl FilterSpec {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Filterable conference attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConferenceField {
    City,
    Topics,
    Month,
    MaxAttendees,
}

impl ConferenceField {
    /// Resolves an external field name (`CITY`, `TOPIC`, `MONTH`, `MAX_ATTENDEES`).
    pub fn from_external(name: &str) -> Option<Self> {
        match name {
            "CITY" => Some(Self::City),
            "TOPIC" => Some(Self::Topics),
            "MONTH" => Some(Self::Month),
            "MAX_ATTENDEES" => Some(Self::MaxAttendees),
            _ => None,
        }
    }

    /// Attribute name on the conference entity.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Topics => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees)
    }
}

impl Display for ConferenceField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Comparison operators accepted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
}

impl Operator {
    /// Resolves an external operator name (`EQ`, `GT`, `GTEQ`, `LT`, `LTEQ`, `NE`).
    pub fn from_external(name: &str) -> Option<Self> {
        match name {
            "EQ" => Some(Self::Eq),
            "GT" => Some(Self::Gt),
            "GTEQ" => Some(Self::Gte),
            "LT" => Some(Self::Lt),
            "LTEQ" => Some(Self::Lte),
            "NE" => Some(Self::Ne),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Ne => "!=",
        }
    }

    /// Every operator except `=` is an inequality for planning purposes.
    pub fn is_inequality(self) -> bool {
        self != Self::Eq
    }
}

/// Typed filter operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// One validated comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: ConferenceField,
    pub operator: Operator,
    pub value: FilterValue,
}

/// Sort key in plan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Field(ConferenceField),
    Name,
}

/// Validated, ordered query plan against conferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// The single field compared with a non-equality operator, if any.
    pub inequality_field: Option<ConferenceField>,
    pub order_by: Vec<SortKey>,
    pub predicates: Vec<Predicate>,
}

/// Filter compilation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    UnknownField(String),
    UnknownOperator(String),
    InvalidNumber { field: ConferenceField, value: String },
    /// Two different fields were used with non-equality operators.
    AmbiguousInequality {
        first: ConferenceField,
        second: ConferenceField,
    },
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "unknown filter field `{name}`"),
            Self::UnknownOperator(name) => write!(f, "unknown filter operator `{name}`"),
            Self::InvalidNumber { field, value } => {
                write!(f, "filter on `{field}` expects an integer, got `{value}`")
            }
            Self::AmbiguousInequality { first, second } => write!(
                f,
                "inequality filter is allowed on only one field; got `{first}` and `{second}`"
            ),
        }
    }
}

impl Error for FilterError {}

/// Compiles filters into a plan.
///
/// Names and the inequality rule are checked across the whole list before
/// any value is coerced.
///
/// # Errors
/// - `UnknownField` / `UnknownOperator` for names outside the whitelist.
/// - `AmbiguousInequality` when a second distinct field uses a non-`=` operator.
/// - `InvalidNumber` for non-integer values on numeric fields.
pub fn compile_filters(filters: &[FilterSpec]) -> Result<QueryPlan, FilterError> {
    let mut inequality_field: Option<ConferenceField> = None;
    let mut resolved = Vec::with_capacity(filters.len());

    for spec in filters {
        let field = ConferenceField::from_external(spec.field.as_str())
            .ok_or_else(|| FilterError::UnknownField(spec.field.clone()))?;
        let operator = Operator::from_external(spec.operator.as_str())
            .ok_or_else(|| FilterError::UnknownOperator(spec.operator.clone()))?;

        if operator.is_inequality() {
            match inequality_field {
                Some(first) if first != field => {
                    return Err(FilterError::AmbiguousInequality {
                        first,
                        second: field,
                    });
                }
                _ => inequality_field = Some(field),
            }
        }
        resolved.push((field, operator, spec.value.as_str()));
    }

    let predicates = resolved
        .into_iter()
        .map(|(field, operator, raw)| {
            Ok(Predicate {
                field,
                operator,
                value: coerce_value(field, raw)?,
            })
        })
        .collect::<Result<Vec<_>, FilterError>>()?;

    let order_by = match inequality_field {
        Some(field) => vec![SortKey::Field(field), SortKey::Name],
        None => vec![SortKey::Name],
    };

    Ok(QueryPlan {
        inequality_field,
        order_by,
        predicates,
    })
}

fn coerce_value(field: ConferenceField, raw: &str) -> Result<FilterValue, FilterError> {
    if !field.is_numeric() {
        return Ok(FilterValue::Text(raw.to_string()));
    }
    raw.trim()
        .parse::<i64>()
        .map(FilterValue::Integer)
        .map_err(|_| FilterError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
