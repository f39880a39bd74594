use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::{Document, NativeQuery};

/// One chained predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    NotNull(String),
    /// Matches when any inner filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(column.to_string(), value.into())
    }

    pub fn is_null(column: &str) -> Self {
        Filter::IsNull(column.to_string())
    }

    pub fn to_native(&self) -> Result<NativeQuery> {
        Ok(match self {
            Filter::Eq(c, v) => NativeQuery::Equal(c.clone(), vec![v.clone()]),
            Filter::Neq(c, v) => NativeQuery::NotEqual(c.clone(), vec![v.clone()]),
            Filter::Gt(c, v) => NativeQuery::GreaterThan(c.clone(), v.clone()),
            Filter::Gte(c, v) => NativeQuery::GreaterThanEqual(c.clone(), v.clone()),
            Filter::Lt(c, v) => NativeQuery::LessThan(c.clone(), v.clone()),
            Filter::Lte(c, v) => NativeQuery::LessThanEqual(c.clone(), v.clone()),
            Filter::In(c, values) => {
                if values.is_empty() {
                    return Err(Error::InvalidQuery(format!("in({}) needs at least one value", c)));
                }
                NativeQuery::Equal(c.clone(), values.clone())
            }
            Filter::IsNull(c) => NativeQuery::IsNull(c.clone()),
            Filter::NotNull(c) => NativeQuery::IsNotNull(c.clone()),
            Filter::Or(inner) => {
                if inner.is_empty() {
                    return Err(Error::InvalidQuery("or() needs at least one filter".into()));
                }
                NativeQuery::Or(inner.iter().map(|f| f.to_native()).collect::<Result<_>>()?)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Many,
    Single,
    MaybeSingle,
}

/// Immutable query specification. Every builder call consumes the spec and
/// returns the extended one; nothing touches the network until the spec is
/// handed to `Adapter::select`.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    columns: Option<Vec<String>>,
    filters: Vec<Filter>,
    orders: Vec<(String, Direction)>,
    limit: Option<u64>,
    offset: Option<u64>,
    cardinality: Cardinality,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Query {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            cardinality: Cardinality::Many,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// A list read with no caller limit; the adapter pages through these.
    pub fn is_unbounded(&self) -> bool {
        self.cardinality == Cardinality::Many && self.limit.is_none()
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    /// Comma-separated column list; `*` (or empty) selects everything.
    pub fn select(mut self, columns: &str) -> Self {
        let cols: Vec<String> = columns
            .split(',')
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && *c != "*")
            .map(|c| c.to_string())
            .collect();
        self.columns = if cols.is_empty() { None } else { Some(cols) };
        self
    }

    pub fn filter(mut self, f: Filter) -> Self {
        self.filters.push(f);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column.to_string(), value.into()))
    }

    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Neq(column.to_string(), value.into()))
    }

    pub fn gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gt(column.to_string(), value.into()))
    }

    pub fn gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Gte(column.to_string(), value.into()))
    }

    pub fn lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lt(column.to_string(), value.into()))
    }

    pub fn lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Lte(column.to_string(), value.into()))
    }

    pub fn in_<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(Filter::In(column.to_string(), values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(Filter::IsNull(column.to_string()))
    }

    pub fn not_null(self, column: &str) -> Self {
        self.filter(Filter::NotNull(column.to_string()))
    }

    pub fn or_any(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    /// Ascending order on `column`.
    pub fn order(self, column: &str) -> Self {
        self.order_by(column, Direction::Asc)
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.orders.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Inclusive row range, `range(0, 9)` is the first ten rows.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.offset = Some(from);
        self.limit = Some(to.saturating_sub(from) + 1);
        self
    }

    pub fn single(mut self) -> Self {
        self.cardinality = Cardinality::Single;
        self
    }

    pub fn maybe_single(mut self) -> Self {
        self.cardinality = Cardinality::MaybeSingle;
        self
    }

    /// The native query list: one predicate per chained filter, in call
    /// order, then the column selection, orderings, offset and limit.
    pub fn translate(&self) -> Result<Vec<NativeQuery>> {
        let mut out = Vec::with_capacity(self.filters.len() + self.orders.len() + 3);
        for f in &self.filters {
            out.push(f.to_native()?);
        }
        if let Some(cols) = &self.columns {
            out.push(NativeQuery::Select(cols.clone()));
        }
        for (col, dir) in &self.orders {
            out.push(match dir {
                Direction::Asc => NativeQuery::OrderAsc(col.clone()),
                Direction::Desc => NativeQuery::OrderDesc(col.clone()),
            });
        }
        if let Some(n) = self.offset {
            out.push(NativeQuery::Offset(n));
        }
        if let Some(n) = self.limit {
            out.push(NativeQuery::Limit(n));
        }
        Ok(out)
    }
}

/// Result of executing a query: a list, or at most one document for
/// `single`/`maybe_single`.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    Many(Vec<Document>),
    One(Option<Document>),
}

impl Rows {
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Rows::Many(v) => v,
            Rows::One(d) => d.into_iter().collect(),
        }
    }

    pub fn into_first(self) -> Option<Document> {
        match self {
            Rows::Many(v) => v.into_iter().next(),
            Rows::One(d) => d,
        }
    }
}
