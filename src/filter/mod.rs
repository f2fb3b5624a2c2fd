//! List filter and pagination state
//!
//! Two-way mapping between a list's search/group/sort/page state and its URL
//! query string. Parsing never fails: a value that does not validate is
//! replaced by that field's default. Fields at their default are left out of
//! the encoded query, so `group=All` never appears.

mod columns;

pub use columns::{IngredientSort, MealSort, MeasurementSort};

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use url::form_urlencoded;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Largest offset SQLite accepts as a non-negative OFFSET
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Group sentinel meaning "no group filter"
pub const ALL_GROUPS: &str = "All";

const KEY_SEARCH: &str = "search";
const KEY_GROUP: &str = "group";
const KEY_ORDER: &str = "order";
const KEY_ORDER_BY: &str = "orderBy";
const KEY_LIMIT: &str = "limit";
const KEY_OFFSET: &str = "offset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order: {0}")]
pub struct UnknownSortOrder(pub String);

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(UnknownSortOrder(s.to_string())),
        }
    }
}

/// The fixed set of columns a list may be ordered by
pub trait SortColumn: Copy + PartialEq + fmt::Debug + 'static {
    const DEFAULT: Self;

    fn all() -> &'static [Self];

    /// Name used in the query string
    fn as_str(&self) -> &'static str;

    /// Column expression used in ORDER BY
    fn sql(&self) -> &'static str;

    fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort column: {0}")]
pub struct UnknownColumn(pub String);

/// One UI event against a list
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Search(String),
    Group(String),
    Sort(String),
    Page(u64),
    Limit(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterState<C: SortColumn> {
    pub search: String,
    pub group: String,
    pub order: SortOrder,
    pub order_by: C,
    pub limit: u32,
    pub offset: u64,
}

impl<C: SortColumn> Default for FilterState<C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            group: ALL_GROUPS.to_string(),
            order: SortOrder::default(),
            order_by: C::DEFAULT,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl<C: SortColumn> FilterState<C> {
    /// Decode a query string; a leading `?` is accepted
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut state = Self::default();
        let mut seen: Vec<String> = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            // First occurrence wins, like URLSearchParams::get
            if seen.iter().any(|k| *k == key) {
                continue;
            }
            seen.push(key.to_string());

            match key.as_ref() {
                KEY_SEARCH => state.search = value.into_owned(),
                KEY_GROUP => {
                    if !value.trim().is_empty() {
                        state.group = value.into_owned();
                    }
                }
                KEY_ORDER => {
                    if let Ok(order) = value.parse::<SortOrder>() {
                        state.order = order;
                    }
                }
                KEY_ORDER_BY => {
                    if let Some(column) = C::parse(&value) {
                        state.order_by = column;
                    }
                }
                KEY_LIMIT => {
                    if let Some(limit) = parse_limit(&value) {
                        state.limit = limit;
                    }
                }
                KEY_OFFSET => {
                    if let Some(offset) = parse_offset(&value) {
                        state.offset = offset;
                    }
                }
                _ => {}
            }
        }

        state
    }

    /// Encode without the leading `?`; default-valued fields are omitted
    pub fn to_query_string(&self) -> String {
        let defaults = Self::default();
        let mut out = form_urlencoded::Serializer::new(String::new());

        if self.search != defaults.search {
            out.append_pair(KEY_SEARCH, &self.search);
        }
        if self.group != defaults.group {
            out.append_pair(KEY_GROUP, &self.group);
        }
        if self.order != defaults.order {
            out.append_pair(KEY_ORDER, self.order.as_str());
        }
        if self.order_by != defaults.order_by {
            out.append_pair(KEY_ORDER_BY, self.order_by.as_str());
        }
        if self.limit != defaults.limit {
            out.append_pair(KEY_LIMIT, &self.limit.to_string());
        }
        if self.offset != defaults.offset {
            out.append_pair(KEY_OFFSET, &self.offset.to_string());
        }

        out.finish()
    }

    pub fn on_search_change(&self, search: &str) -> Self {
        Self {
            search: search.to_string(),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn on_group_change(&self, group: &str) -> Self {
        let group = if group.trim().is_empty() { ALL_GROUPS } else { group };
        Self {
            group: group.to_string(),
            offset: 0,
            ..self.clone()
        }
    }

    pub fn on_sort_change(&self, column: C) -> Self {
        let order = if column == self.order_by {
            self.order.toggled()
        } else {
            SortOrder::Asc
        };
        Self {
            order_by: column,
            order,
            ..self.clone()
        }
    }

    /// Offset saturates at `MAX_OFFSET`
    pub fn on_page_change(&self, page_index: u64) -> Self {
        Self {
            offset: page_index
                .saturating_mul(u64::from(self.limit))
                .min(MAX_OFFSET),
            ..self.clone()
        }
    }

    /// Offset is kept as-is, so a smaller page size deep in a list can land
    /// past the last row.
    pub fn on_limit_change(&self, limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            ..self.clone()
        }
    }

    pub fn apply(&self, change: FilterChange) -> Result<Self, UnknownColumn> {
        Ok(match change {
            FilterChange::Search(s) => self.on_search_change(&s),
            FilterChange::Group(g) => self.on_group_change(&g),
            FilterChange::Sort(column) => {
                let parsed = C::parse(&column).ok_or(UnknownColumn(column))?;
                self.on_sort_change(parsed)
            }
            FilterChange::Page(page) => self.on_page_change(page),
            FilterChange::Limit(limit) => self.on_limit_change(limit),
        })
    }

    /// Group to filter by, `None` for the "All" sentinel
    pub fn group_filter(&self) -> Option<&str> {
        if self.group == ALL_GROUPS {
            None
        } else {
            Some(self.group.as_str())
        }
    }

    /// LIKE pattern for the search text, `None` when there is nothing to match
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }

    pub fn page_index(&self) -> u64 {
        self.offset / u64::from(self.limit)
    }

    /// `ORDER BY` clause body, without a tie breaker
    pub fn order_clause(&self) -> String {
        format!("{} {}", self.order_by.sql(), self.order.sql())
    }
}

fn parse_limit(value: &str) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_LIMIT).contains(n))
}

fn parse_offset(value: &str) -> Option<u64> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n <= MAX_OFFSET)
}
