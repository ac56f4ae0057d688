//! Query model: lookups, filters, ordering and limits accumulated before a
//! Select URL is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EwizError;

/// Limit that stands for "no limit"; the protocol always requires one.
pub const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// One remote record: field name to raw string value.
pub type Ticket = BTreeMap<String, String>;

/// Field/value pairs handed to insert and update, in caller order.
/// `None` is an explicitly empty value.
pub type Record = Vec<(String, Option<String>)>;

/// The closed set of filter lookups the protocol can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    Exact,
    IExact,
    Contains,
    IContains,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    In,
    Range,
    Year,
    IsNull,
}

impl Lookup {
    pub const ALL: [Lookup; 16] = [
        Lookup::Exact,
        Lookup::IExact,
        Lookup::Contains,
        Lookup::IContains,
        Lookup::Gt,
        Lookup::Gte,
        Lookup::Lt,
        Lookup::Lte,
        Lookup::StartsWith,
        Lookup::IStartsWith,
        Lookup::EndsWith,
        Lookup::IEndsWith,
        Lookup::In,
        Lookup::Range,
        Lookup::Year,
        Lookup::IsNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::StartsWith => "startswith",
            Lookup::IStartsWith => "istartswith",
            Lookup::EndsWith => "endswith",
            Lookup::IEndsWith => "iendswith",
            Lookup::In => "in",
            Lookup::Range => "range",
            Lookup::Year => "year",
            Lookup::IsNull => "isnull",
        }
    }

    /// Resolve a lookup name; the error records whether it was negated.
    pub fn resolve(name: &str, negated: bool) -> Result<Self, EwizError> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == name)
            .ok_or_else(|| EwizError::lookup(name, negated))
    }

    /// Lookups whose value is a list rather than a single literal.
    pub fn is_multi(&self) -> bool {
        matches!(self, Lookup::In | Lookup::Range | Lookup::Year)
    }
}

impl FromStr for Lookup {
    type Err = EwizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s, false)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// No value (`isnull`).
    Empty,
    Single(String),
    List(Vec<String>),
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Single(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Single(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Single(v.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Single(v.to_string())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::List(v)
    }
}

impl From<&[&str]> for FilterValue {
    fn from(v: &[&str]) -> Self {
        FilterValue::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FilterValue {
    fn from(v: [&str; N]) -> Self {
        FilterValue::List(v.iter().map(|s| s.to_string()).collect())
    }
}

/// A rendered WHERE term: `column operator literal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: &'static str,
    pub literal: Option<String>,
}

impl Filter {
    /// Match-all term used when a query has no filters.
    pub fn wildcard(column: &str) -> Self {
        Self {
            column: column.to_string(),
            operator: "LIKE",
            literal: Some("'%'".to_string()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub order: SortOrder,
}

/// Ordering requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ordering {
    /// `true` is the default ascending order by primary key.
    Default(bool),
    /// Field name and ascending flag pairs.
    Fields(Vec<(String, bool)>),
}

/// Offset and limit of a Select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: UNBOUNDED_LIMIT,
        }
    }
}

impl Limits {
    /// Window for a `[low, high)` slice. An empty or inverted range selects nothing.
    pub fn window(low: u64, high: Option<u64>) -> Self {
        match high {
            None => Self {
                offset: low,
                limit: UNBOUNDED_LIMIT,
            },
            Some(high) if high > low => Self {
                offset: low,
                limit: high - low,
            },
            Some(_) => Self { offset: 0, limit: 0 },
        }
    }
}

/// What the primary-key filters of a query pin down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Target {
    /// No primary-key filter.
    #[default]
    Unresolved,
    /// Exactly one equality constraint (repeated with the same value is fine).
    Id(String),
    /// Conflicting, negated or non-equality primary-key filters.
    Ambiguous,
}

/// Everything one Select needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub table: String,
    pub pk_column: String,
    pub filters: Vec<Filter>,
    pub ordering: Vec<OrderTerm>,
    pub limits: Limits,
    /// Ticket selected by primary-key filters, the target of an update.
    pub target: Target,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>, pk_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            pk_column: pk_column.into(),
            filters: Vec::new(),
            ordering: Vec::new(),
            limits: Limits::default(),
            target: Target::default(),
        }
    }

    /// Filters to render; the wildcard stands in when none were added.
    pub fn effective_filters(&self) -> Vec<Filter> {
        if self.filters.is_empty() {
            vec![Filter::wildcard(&self.pk_column)]
        } else {
            self.filters.clone()
        }
    }
}

/// First phase of a multi-record fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectResponse {
    pub count: u64,
    pub ids: Vec<String>,
}
