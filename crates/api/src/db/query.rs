//! Generic list/search/paginate query builder.
//!
//! Maps the common query string (`page`, `limit`, `search`, `sort`) plus
//! entity-specific equality filters onto a `SELECT` with `ILIKE` search,
//! a whitelisted `ORDER BY`, and `LIMIT/OFFSET`. The `COUNT(*)` query shares
//! the same `WHERE` clause and runs concurrently with the page query.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use emporium_core::{AppPicKind, CommentStatus, OrderStatus, Pagination};

use super::RepositoryError;

/// Common list query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(alias = "searchTerm")]
    pub search: Option<String>,
    /// Column to sort by; a leading `-` sorts descending.
    pub sort: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    /// The trimmed search term, if any.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Transform the items while keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    /// Fallible [`Page::map`].
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        })
    }
}

/// A bound equality filter value.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Int(i32),
    Bool(bool),
    OrderStatus(OrderStatus),
    CommentStatus(CommentStatus),
    AppPicKind(AppPicKind),
}

/// Builder for a filtered, searchable, paginated list query.
#[derive(Debug, Clone)]
pub struct ListQuery<'a> {
    columns: &'static str,
    from: &'static str,
    soft_delete_column: &'static str,
    search_columns: &'static [&'static str],
    sortable: &'static [(&'static str, &'static str)],
    default_order: &'static str,
    filters: Vec<(&'static str, FilterValue)>,
    params: &'a ListParams,
}

impl<'a> ListQuery<'a> {
    /// Start a query selecting `columns` from `from` (which may contain joins).
    #[must_use]
    pub const fn new(columns: &'static str, from: &'static str, params: &'a ListParams) -> Self {
        Self {
            columns,
            from,
            soft_delete_column: "deleted_at",
            search_columns: &[],
            sortable: &[],
            default_order: "id DESC",
            filters: Vec::new(),
            params,
        }
    }

    /// Column holding the soft-delete timestamp (qualified when joining).
    #[must_use]
    pub const fn soft_delete(mut self, column: &'static str) -> Self {
        self.soft_delete_column = column;
        self
    }

    /// Columns matched by `search` with `ILIKE`.
    #[must_use]
    pub const fn search(mut self, columns: &'static [&'static str]) -> Self {
        self.search_columns = columns;
        self
    }

    /// Allowed `sort` names and the SQL expressions they map to.
    #[must_use]
    pub const fn sortable(mut self, columns: &'static [(&'static str, &'static str)]) -> Self {
        self.sortable = columns;
        self
    }

    /// Ordering used when `sort` is absent or not allowed.
    #[must_use]
    pub const fn default_order(mut self, order: &'static str) -> Self {
        self.default_order = order;
        self
    }

    /// Add `column = value` when `value` is present.
    #[must_use]
    pub fn filter(mut self, column: &'static str, value: Option<FilterValue>) -> Self {
        if let Some(value) = value {
            self.filters.push((column, value));
        }
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE AND ")
            .push(self.soft_delete_column)
            .push(" IS NULL");

        for (column, value) in &self.filters {
            qb.push(" AND ").push(*column).push(" = ");
            match value {
                FilterValue::Int(v) => qb.push_bind(*v),
                FilterValue::Bool(v) => qb.push_bind(*v),
                FilterValue::OrderStatus(v) => qb.push_bind(*v),
                FilterValue::CommentStatus(v) => qb.push_bind(*v),
                FilterValue::AppPicKind(v) => qb.push_bind(*v),
            };
        }

        if let Some(term) = self.params.search_term()
            && !self.search_columns.is_empty()
        {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (");
            for (i, column) in self.search_columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }

    /// The `ORDER BY` expression for the requested sort.
    fn order_by(&self) -> String {
        let Some(sort) = self.params.sort.as_deref().map(str::trim) else {
            return self.default_order.to_string();
        };

        let (name, direction) = sort
            .strip_prefix('-')
            .map_or((sort, "ASC"), |name| (name, "DESC"));

        self.sortable
            .iter()
            .find(|(public, _)| *public == name)
            .map_or_else(
                || self.default_order.to_string(),
                |(_, column)| format!("{column} {direction}"),
            )
    }

    fn count_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
        qb.push(self.from);
        self.push_where(&mut qb);
        qb
    }

    fn page_builder(&self, pagination: Pagination) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.columns).push(" FROM ").push(self.from);
        self.push_where(&mut qb);
        qb.push(" ORDER BY ").push(self.order_by());
        qb.push(" LIMIT ")
            .push_bind(i64::from(pagination.limit()))
            .push(" OFFSET ")
            .push_bind(pagination.offset());
        qb
    }

    /// Run the count and page queries concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn fetch<T>(self, pool: &PgPool) -> Result<Page<T>, RepositoryError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let pagination = self.params.pagination();
        let mut count_qb = self.count_builder();
        let mut page_qb = self.page_builder(pagination);

        let (total, items) = tokio::try_join!(
            count_qb.build_query_scalar::<i64>().fetch_one(pool),
            page_qb.build_query_as::<T>().fetch_all(pool),
        )?;

        Ok(Page {
            items,
            page: pagination.page(),
            limit: pagination.limit(),
            total,
            total_pages: pagination.total_pages(total),
        })
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[(&str, &str)] = &[("name", "name"), ("created", "created_at")];

    fn params(search: Option<&str>, sort: Option<&str>) -> ListParams {
        ListParams {
            page: Some(2),
            limit: Some(10),
            search: search.map(String::from),
            sort: sort.map(String::from),
        }
    }

    fn brand_query(params: &ListParams) -> ListQuery<'_> {
        ListQuery::new("id, name, code", "shop.brand", params)
            .search(&["name", "code"])
            .sortable(SORTABLE)
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_search_term_is_trimmed() {
        assert_eq!(params(Some("  shoe "), None).search_term(), Some("shoe"));
        assert_eq!(params(Some("   "), None).search_term(), None);
    }

    #[test]
    fn test_search_term_alias() {
        let parsed: ListParams =
            serde_json::from_str(r#"{"searchTerm": "nike"}"#).unwrap_or_default();
        assert_eq!(parsed.search_term(), Some("nike"));
    }

    #[test]
    fn test_sort_whitelist() {
        let p = params(None, Some("-created"));
        assert_eq!(brand_query(&p).order_by(), "created_at DESC");

        let p = params(None, Some("name"));
        assert_eq!(brand_query(&p).order_by(), "name ASC");

        let p = params(None, Some("password_hash; DROP TABLE x"));
        assert_eq!(brand_query(&p).order_by(), "id DESC");
    }

    #[test]
    fn test_page_sql_applies_filters_before_pagination() {
        let p = params(Some("air"), Some("name"));
        let query = brand_query(&p).filter("is_active", Some(FilterValue::Bool(true)));
        let qb = query.page_builder(p.pagination());
        assert_eq!(
            qb.sql(),
            "SELECT id, name, code FROM shop.brand WHERE TRUE AND deleted_at IS NULL \
             AND is_active = $1 AND (name ILIKE $2 OR code ILIKE $3) \
             ORDER BY name ASC LIMIT $4 OFFSET $5"
        );
    }

    #[test]
    fn test_count_sql_shares_where_clause() {
        let p = params(Some("air"), None);
        let query = brand_query(&p).filter("category_id", Some(FilterValue::Int(3)));
        let qb = query.count_builder();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM shop.brand WHERE TRUE AND deleted_at IS NULL \
             AND category_id = $1 AND (name ILIKE $2 OR code ILIKE $3)"
        );
    }

    #[test]
    fn test_absent_filters_are_skipped() {
        let p = ListParams::default();
        let query = ListQuery::new("p.id", "shop.product p", &p)
            .soft_delete("p.deleted_at")
            .filter("p.brand_id", None);
        assert_eq!(
            query.count_builder().sql(),
            "SELECT COUNT(*) FROM shop.product p WHERE TRUE AND p.deleted_at IS NULL"
        );
    }

    #[test]
    fn test_page_map_keeps_metadata() {
        let page = Page {
            items: vec![1, 2],
            page: 3,
            limit: 2,
            total: 6,
            total_pages: 3,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total_pages, 3);
    }
}
