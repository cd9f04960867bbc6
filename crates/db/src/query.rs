//! Filter, sort and paging inputs for task listings.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition, Order, QueryOrder, Select,
    sea_query::{Expr, ExprTrait, Func, LikeExpr},
};
use serde::Serialize;

use crate::{entities::task, validation::parse_due_date};

/// Which side of the soft-delete marker a lookup may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    Active,
    Trashed,
    All,
}

impl TaskScope {
    pub fn condition(self) -> Condition {
        match self {
            TaskScope::Active => Condition::all().add(task::Column::DeletedAt.is_null()),
            TaskScope::Trashed => Condition::all().add(task::Column::DeletedAt.is_not_null()),
            TaskScope::All => Condition::all(),
        }
    }
}

/// Largest row count or offset the database drivers accept.
const MAX_ROWS: u64 = i64::MAX as u64;

/// Raw query-string parameters of `GET /tasks` and `GET /tasks/trash`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date_from: Option<String>,
    pub due_date_to: Option<String>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Status,
    /// Trash listing order; not selectable from the query string.
    DeletedAt,
}

impl TaskListParams {
    /// Collects decoded query pairs. A repeated key keeps its last value and
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "status" => &mut params.status,
                "priority" => &mut params.priority,
                "due_date_from" => &mut params.due_date_from,
                "due_date_to" => &mut params.due_date_to,
                "search" => &mut params.search,
                "tag" => &mut params.tag,
                "sort" => &mut params.sort,
                "order" => &mut params.order,
                "page" => &mut params.page,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }
}

impl SortField {
    /// Anything outside the allow-list falls back to `created_at`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("due_date") => SortField::DueDate,
            Some("priority") => SortField::Priority,
            Some("status") => SortField::Status,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(self) -> task::Column {
        match self {
            SortField::CreatedAt => task::Column::CreatedAt,
            SortField::DueDate => task::Column::DueDate,
            SortField::Priority => task::Column::Priority,
            SortField::Status => task::Column::Status,
            SortField::DeletedAt => task::Column::DeletedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl TaskFilter {
    /// Predicates on the `tasks` table. The tag match needs a join and is
    /// applied by the caller.
    ///
    /// `search` compares `LOWER(title)` with the lowercased term. SQLite's
    /// `LOWER` folds ASCII only: a title holding a non-ASCII capital such as
    /// `É` is not found there by that word, while PostgreSQL folds it.
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(status) = &self.status {
            cond = cond.add(task::Column::Status.eq(status.as_str()));
        }
        if let Some(priority) = &self.priority {
            cond = cond.add(task::Column::Priority.eq(priority.as_str()));
        }
        match (self.due_date_from, self.due_date_to) {
            (Some(from), Some(to)) => cond = cond.add(task::Column::DueDate.between(from, to)),
            (Some(from), None) => cond = cond.add(task::Column::DueDate.gte(from)),
            (None, Some(to)) => cond = cond.add(task::Column::DueDate.lte(to)),
            (None, None) => {}
        }
        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            cond = cond.add(
                Func::lower(Expr::col((task::Entity, task::Column::Title)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
        cond
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: u64,
}

impl TaskQuery {
    /// Most recently deleted first.
    pub fn trash(page: u64) -> Self {
        Self {
            sort: SortField::DeletedAt,
            order: SortOrder::Desc,
            page,
            ..Default::default()
        }
    }

    pub fn apply_order(&self, select: Select<task::Entity>) -> Select<task::Entity> {
        let order = self.order.order();
        select
            .order_by(self.sort.column(), order.clone())
            .order_by(task::Column::Id, order)
    }
}

impl From<TaskListParams> for TaskQuery {
    fn from(params: TaskListParams) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let due_date_from = date_param("due_date_from", params.due_date_from.as_deref());
        let due_date_to = date_param("due_date_to", params.due_date_to.as_deref());

        Self {
            filter: TaskFilter {
                status: non_empty(params.status),
                priority: non_empty(params.priority),
                due_date_from,
                due_date_to,
                search: non_empty(params.search),
                tag: non_empty(params.tag),
            },
            sort: SortField::parse(params.sort.as_deref()),
            order: SortOrder::parse(params.order.as_deref()),
            page: parse_page(params.page.as_deref()),
        }
    }
}

fn date_param(name: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw.filter(|v| !v.is_empty())?;
    let parsed = parse_due_date(raw);
    if parsed.is_none() {
        tracing::warn!(param = name, value = raw, "Ignoring invalid date filter");
    }
    parsed
}

/// Leading integer of `raw`; anything unparsable or negative is page 0.
/// Values past `i64::MAX` saturate there.
pub fn parse_page(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim) else {
        return 0;
    };
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative || end == 0 {
        return 0;
    }
    digits[..end]
        .parse::<u64>()
        .map_or(MAX_ROWS, |page| Ord::min(page, MAX_ROWS))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// One page of results plus the counters the list envelope reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn offset(page: u64, page_size: u64) -> u64 {
        Ord::min(page.saturating_mul(page_size), MAX_ROWS)
    }

    pub fn limit(page_size: u64) -> u64 {
        Ord::min(page_size, MAX_ROWS)
    }
}
