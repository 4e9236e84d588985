//! Generic `find_all` query builder shared by every repository.
//!
//! # Responsibility
//! - Express filters (equality, set membership, conjunction), ordering and
//!   limit over an entity's declared columns.
//! - Render them into one parameterized SQL statement.
//!
//! # Invariants
//! - Column names come from a closed enum; user input only reaches SQL as
//!   bound parameters.
//! - An empty `In` set matches no rows; an empty `And` matches every row.
//! - Filter, order and limit are applied in that order by SQLite.

use super::{RepoError, RepoResult};
use crate::model::{FollowColumn, TagColumn, TweetColumn, TweetTagColumn, UserColumn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::ops::ControlFlow;

/// Maps a schema column declaration to its SQL name.
pub trait Column: Copy {
    fn sql_name(self) -> &'static str;
}

impl Column for UserColumn {
    fn sql_name(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
        }
    }
}

impl Column for TweetColumn {
    fn sql_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Content => "content",
            Self::Timestamp => "timestamp",
            Self::Author => "author",
        }
    }
}

impl Column for TagColumn {
    fn sql_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Content => "content",
        }
    }
}

impl Column for TweetTagColumn {
    fn sql_name(self) -> &'static str {
        match self {
            Self::TweetId => "tweet_id",
            Self::TagId => "tag_id",
        }
    }
}

impl Column for FollowColumn {
    fn sql_name(self) -> &'static str {
        match self {
            Self::Follower => "follower",
            Self::Followee => "followee",
        }
    }
}

/// Scalar bound into a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<FilterValue> for Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Text(text) => Value::Text(text),
            FilterValue::Integer(number) => Value::Integer(number),
        }
    }
}

/// Row predicate over the columns `C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<C> {
    Eq(C, FilterValue),
    In(C, Vec<FilterValue>),
    And(Vec<Filter<C>>),
}

impl<C: Column> Filter<C> {
    pub fn eq(column: C, value: impl Into<FilterValue>) -> Self {
        Self::Eq(column, value.into())
    }

    /// Each value binds one parameter, so very large sets hit SQLite's
    /// variable limit; prefer a dedicated join query for unbounded sets.
    pub fn is_in<V: Into<FilterValue>>(column: C, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(column, values.into_iter().map(Into::into).collect())
    }

    /// Conjoins two predicates, flattening nested `And`s.
    pub fn and(self, other: Filter<C>) -> Self {
        let mut parts = match self {
            Self::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Self::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Self::And(parts)
    }

    fn render(&self, sql: &mut String, binds: &mut Vec<Value>) {
        match self {
            Self::Eq(column, value) => {
                sql.push_str(column.sql_name());
                sql.push_str(" = ?");
                binds.push(value.clone().into());
            }
            Self::In(_, values) if values.is_empty() => sql.push_str("0 = 1"),
            Self::In(column, values) => {
                sql.push_str(column.sql_name());
                sql.push_str(" IN (");
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(", ");
                    }
                    sql.push('?');
                    binds.push(value.clone().into());
                }
                sql.push(')');
            }
            Self::And(parts) if parts.is_empty() => sql.push_str("1 = 1"),
            Self::And(parts) => {
                sql.push('(');
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        sql.push_str(" AND ");
                    }
                    part.render(sql, binds);
                }
                sql.push(')');
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filter + ordering + limit over one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindAll<C> {
    pub filter: Option<Filter<C>>,
    pub order_by: Vec<(C, SortDirection)>,
    pub limit: Option<u32>,
}

impl<C> Default for FindAll<C> {
    fn default() -> Self {
        Self {
            filter: None,
            order_by: Vec::new(),
            limit: None,
        }
    }
}

impl<C: Column> FindAll<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate; repeated calls are conjoined.
    pub fn filter(mut self, filter: Filter<C>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Appends one sort key; earlier keys take precedence.
    pub fn order_by(mut self, column: C, direction: SortDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders `select` followed by WHERE / ORDER BY / LIMIT clauses.
    pub(crate) fn to_sql(&self, select: &str) -> (String, Vec<Value>) {
        let mut sql = String::from(select);
        let mut binds = Vec::new();

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            filter.render(&mut sql, &mut binds);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            let keys = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column.sql_name(), direction.sql()))
                .collect::<Vec<_>>();
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
        }

        (sql, binds)
    }
}

/// Largest id list bound into one `IN (...)` statement by batched lookups.
///
/// SQLite caps the number of variables per statement.
pub(crate) const MAX_BOUND_IDS: usize = 500;

/// Streams rows of `query` through `visit` one at a time.
///
/// Stops reading as soon as `visit` breaks; the statement is finalized either way.
pub(crate) fn visit_all<C: Column, T>(
    conn: &Connection,
    select: &str,
    query: &FindAll<C>,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
    visit: &mut dyn FnMut(T) -> ControlFlow<()>,
) -> RepoResult<()> {
    let (sql, binds) = query.to_sql(select);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    while let Some(row) = rows.next()? {
        if visit(parse(row)?).is_break() {
            break;
        }
    }
    Ok(())
}

/// Runs `query` against `select` and converts every row with `parse`.
pub(crate) fn fetch_all<C: Column, T>(
    conn: &Connection,
    select: &str,
    query: &FindAll<C>,
    parse: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut items = Vec::new();
    visit_all(conn, select, query, parse, &mut |item| {
        items.push(item);
        ControlFlow::Continue(())
    })?;
    Ok(items)
}

/// `SELECT COUNT(*)` over one table.
pub(crate) fn count_rows(conn: &Connection, table: &'static str) -> RepoResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count in {table}")))
}

#[cfg(test)]
mod tests {
    use super::{Filter, FilterValue, FindAll, SortDirection};
    use crate::model::TweetColumn;
    use rusqlite::types::Value;

    const SELECT: &str = "SELECT id FROM tweets";

    #[test]
    fn empty_query_renders_bare_select() {
        let (sql, binds) = FindAll::<TweetColumn>::new().to_sql(SELECT);
        assert_eq!(sql, SELECT);
        assert!(binds.is_empty());
    }

    #[test]
    fn filter_order_and_limit_render_in_sql_order() {
        let query = FindAll::new()
            .filter(Filter::is_in(TweetColumn::Author, ["alice", "bob"]))
            .order_by(TweetColumn::Timestamp, SortDirection::Desc)
            .order_by(TweetColumn::Id, SortDirection::Desc)
            .limit(5);
        let (sql, binds) = query.to_sql(SELECT);
        assert_eq!(
            sql,
            "SELECT id FROM tweets WHERE author IN (?, ?) ORDER BY timestamp DESC, id DESC LIMIT ?"
        );
        assert_eq!(
            binds,
            vec![
                Value::Text("alice".to_string()),
                Value::Text("bob".to_string()),
                Value::Integer(5),
            ]
        );
    }

    #[test]
    fn repeated_filters_are_conjoined_and_flattened() {
        let query = FindAll::new()
            .filter(Filter::eq(TweetColumn::Author, "bob"))
            .filter(Filter::eq(TweetColumn::Id, 3_i64))
            .filter(Filter::eq(TweetColumn::Content, "hi"));
        match &query.filter {
            Some(Filter::And(parts)) => assert_eq!(parts.len(), 3),
            other => panic!("unexpected filter: {other:?}"),
        }
        let (sql, _) = query.to_sql(SELECT);
        assert!(sql.ends_with("WHERE (author = ? AND id = ? AND content = ?)"));
    }

    #[test]
    fn empty_set_membership_matches_nothing() {
        let filter = Filter::<TweetColumn>::In(TweetColumn::Id, Vec::<FilterValue>::new());
        let (sql, binds) = FindAll::new().filter(filter).to_sql(SELECT);
        assert!(sql.ends_with("WHERE 0 = 1"));
        assert!(binds.is_empty());
    }
}
