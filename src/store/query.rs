//! Row filters shared by every [`RemoteStore`](super::RemoteStore) backend.
//!
//! A [`Query`] is the chainable `.eq() / .in_() / .order() / .limit()` shape
//! of the hosted store's client. The PostgREST backend encodes it as URL
//! parameters; the memory backend evaluates it directly against JSON rows.

use serde_json::Value;
use std::cmp::Ordering;

use crate::domain::SortOrder;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    NotNull(String),
}

impl Filter {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _) | Self::In(c, _) | Self::IsNull(c) | Self::NotNull(c) => c,
        }
    }

    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, expected) => values_equal(field, expected),
            Self::In(_, candidates) => candidates.iter().any(|c| values_equal(field, c)),
            Self::IsNull(_) => field.is_null(),
            Self::NotNull(_) => !field.is_null(),
        }
    }

    /// PostgREST operator syntax, e.g. `eq.603` or `in.(1,2)`.
    #[must_use]
    pub fn to_param(&self) -> (String, String) {
        let value = match self {
            Self::Eq(_, v) => format!("eq.{}", encode_scalar(v)),
            Self::In(_, vs) => {
                let items: Vec<String> = vs.iter().map(encode_list_item).collect();
                format!("in.({})", items.join(","))
            }
            Self::IsNull(_) => "is.null".to_string(),
            Self::NotNull(_) => "not.is.null".to_string(),
        };
        (self.column().to_string(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    columns: Option<Vec<String>>,
    filters: Vec<Filter>,
    order: Vec<OrderBy>,
    limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn in_<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::IsNull(column.to_string()));
        self
    }

    #[must_use]
    pub fn not_null(mut self, column: &str) -> Self {
        self.filters.push(Filter::NotNull(column.to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            order,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub const fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    #[must_use]
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Orders, limits and projects rows that already passed [`Query::matches`].
    #[must_use]
    pub fn shape(&self, mut rows: Vec<Value>) -> Vec<Value> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                for key in &self.order {
                    let left = a.get(&key.column).unwrap_or(&Value::Null);
                    let right = b.get(&key.column).unwrap_or(&Value::Null);
                    let ord = compare_values(left, right);
                    let ord = if key.order.is_ascending() {
                        ord
                    } else {
                        ord.reverse()
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        if let Some(columns) = &self.columns {
            rows = rows
                .into_iter()
                .map(|row| {
                    let projected: serde_json::Map<String, Value> = columns
                        .iter()
                        .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                        .collect();
                    Value::Object(projected)
                })
                .collect();
        }

        rows
    }

    /// URL parameters in PostgREST syntax, in a stable order.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);

        let select = self
            .columns
            .as_ref()
            .map_or_else(|| "*".to_string(), |c| c.join(","));
        params.push(("select".to_string(), select));

        params.extend(self.filters.iter().map(Filter::to_param));

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| {
                    let dir = if o.order.is_ascending() { "asc" } else { "desc" };
                    format!("{}.{dir}", o.column)
                })
                .collect();
            params.push(("order".to_string(), order.join(",")));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Filter-only parameters, for writes where `select`/`order` do not apply.
    #[must_use]
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters.iter().map(Filter::to_param).collect()
    }
}

fn values_equal(field: &Value, expected: &Value) -> bool {
    match (field, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::Number(b)) | (Value::Number(b), Value::String(a)) => {
            a == &b.to_string()
        }
        (a, b) => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn encode_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn encode_list_item(value: &Value) -> String {
    let raw = encode_scalar(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_postgrest_params() {
        let query = Query::new()
            .eq("user_id", "abc")
            .eq("movie_id", 603)
            .in_("season_number", [1, 2])
            .is_null("episode_number")
            .order("created_at", SortOrder::Descending)
            .limit(1);

        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("user_id".to_string(), "eq.abc".to_string()),
                ("movie_id".to_string(), "eq.603".to_string()),
                ("season_number".to_string(), "in.(1,2)".to_string()),
                ("episode_number".to_string(), "is.null".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn quotes_reserved_characters_in_lists() {
        let query = Query::new().in_("movie_title", ["Alien", "Crouching Tiger, Hidden Dragon"]);
        let (_, value) = &query.filter_params()[0];
        assert_eq!(value, "in.(Alien,\"Crouching Tiger, Hidden Dragon\")");
    }

    #[test]
    fn not_null_filter() {
        let query = Query::new().not_null("rating");
        assert!(query.matches(&json!({ "rating": 4 })));
        assert!(!query.matches(&json!({ "rating": null })));
        assert!(!query.matches(&json!({})));
        assert_eq!(query.filter_params()[0].1, "not.is.null");
    }

    #[test]
    fn matches_numbers_across_representations() {
        let query = Query::new().eq("movie_id", 603_i64);
        assert!(query.matches(&json!({ "movie_id": 603 })));
        assert!(query.matches(&json!({ "movie_id": 603.0 })));
        assert!(!query.matches(&json!({ "movie_id": 604 })));
    }

    #[test]
    fn shape_orders_limits_and_projects() {
        let rows = vec![
            json!({ "id": 1, "created_at": "2024-01-01T00:00:00Z", "rating": 3 }),
            json!({ "id": 2, "created_at": "2024-03-01T00:00:00Z", "rating": 7 }),
            json!({ "id": 3, "created_at": "2024-02-01T00:00:00Z", "rating": 5 }),
        ];

        let shaped = Query::new()
            .columns(&["id"])
            .order("created_at", SortOrder::Descending)
            .limit(2)
            .shape(rows);

        assert_eq!(shaped, vec![json!({ "id": 2 }), json!({ "id": 3 })]);
    }
}
