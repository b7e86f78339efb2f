use crate::pagination::{self, PageListener, PaginationOptions, PaginationView};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

/// A displayable cell. Rows expose raw field values as cells and column
/// render functions produce cells too.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// NaN sorts after every other number.
fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact, without rounding `i` through `f64`.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63 as f64; everything at or above it is past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_floats(0.0, f - whole),
        other => other,
    }
}

impl CellValue {
    /// Rank used only when two values are of different kinds.
    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Bool(_) => 0,
            CellValue::Int(_) | CellValue::Float(_) => 1,
            CellValue::Text(_) => 2,
            CellValue::Null => 3,
        }
    }

    /// Natural ordering: numeric for two numbers, lexicographic for two
    /// strings. Mixed kinds order bool < number < text < null.
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (CellValue::Float(a), CellValue::Float(b)) => cmp_floats(*a, *b),
            (CellValue::Int(a), CellValue::Float(b)) => cmp_int_float(*a, *b),
            (CellValue::Float(a), CellValue::Int(b)) => cmp_int_float(*b, *a).reverse(),
            (a, b) => a.kind_rank().cmp(&b.kind_rank()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
        }
    }
}

impl From<&serde_json::Value> for CellValue {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => n.as_f64().map(CellValue::Float).unwrap_or(CellValue::Null),
            },
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

/// A record that can be shown in a table. Missing fields read as `Null`.
pub trait Row {
    fn cell(&self, key: &str) -> CellValue;
}

impl Row for serde_json::Value {
    fn cell(&self, key: &str) -> CellValue {
        self.get(key).map(CellValue::from).unwrap_or(CellValue::Null)
    }
}

impl Row for serde_json::Map<String, serde_json::Value> {
    fn cell(&self, key: &str) -> CellValue {
        self.get(key).map(CellValue::from).unwrap_or(CellValue::Null)
    }
}

/// Maps a row and its index within the sorted row set to a display value.
pub type RenderFn<R> = Box<dyn Fn(&R, usize) -> CellValue>;

pub struct Column<R> {
    key: String,
    label: String,
    sortable: bool,
    sort_field: Option<String>,
    render: Option<RenderFn<R>>,
}

impl<R: Row> Column<R> {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: true,
            sort_field: None,
            render: None,
        }
    }

    pub fn with_render<F>(mut self, render: F) -> Self
    where
        F: Fn(&R, usize) -> CellValue + 'static,
    {
        self.render = Some(Box::new(render));
        self
    }

    /// Header clicks on this column are ignored (action columns).
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Sort by another raw field, for synthetic columns such as a full name.
    pub fn sort_on(mut self, field: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self
    }

    fn sort_field(&self) -> &str {
        self.sort_field.as_deref().unwrap_or(&self.key)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self, row: &R, index: usize) -> CellValue {
        match &self.render {
            Some(render) => render(row, index),
            None => row.cell(&self.key),
        }
    }
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("sort_field", &self.sort_field)
            .field("render", &self.render.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub key: Option<String>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("a table needs at least one column")]
    NoColumns,
    #[error("column key must not be empty (label {label:?})")]
    EmptyKey { label: String },
    #[error("duplicate column key {0:?}")]
    DuplicateKey(String),
    #[error("initial sort key {0:?} is not a column")]
    UnknownSortKey(String),
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub sorted: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTable {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<CellValue>>,
    /// Position of each displayed row in the caller's data.
    pub source_indexes: Vec<usize>,
    pub sort: SortState,
    pub total_items: usize,
    pub pagination: PaginationView,
}

/// Sort and page state for one table instance. The row set is always
/// supplied by the caller and only ever read.
#[derive(Debug)]
pub struct Table<R> {
    columns: Vec<Column<R>>,
    sort: SortState,
    current_page: usize,
    page_size: usize,
    options: PaginationOptions,
}

impl<R: Row> Table<R> {
    pub fn new(
        columns: Vec<Column<R>>,
        initial_sort: Option<SortState>,
        page_size: usize,
    ) -> Result<Self, TableError> {
        if columns.is_empty() {
            return Err(TableError::NoColumns);
        }
        let mut seen = HashSet::new();
        for c in &columns {
            if c.key.is_empty() {
                return Err(TableError::EmptyKey {
                    label: c.label.clone(),
                });
            }
            if !seen.insert(c.key.as_str()) {
                return Err(TableError::DuplicateKey(c.key.clone()));
            }
        }
        if page_size == 0 {
            return Err(TableError::ZeroPageSize);
        }

        let sort = initial_sort.unwrap_or_default();
        if let Some(key) = &sort.key {
            if !seen.contains(key.as_str()) {
                return Err(TableError::UnknownSortKey(key.clone()));
            }
        }

        Ok(Self {
            columns,
            sort,
            current_page: 1,
            page_size,
            options: PaginationOptions::default(),
        })
    }

    pub fn with_pagination_options(mut self, options: PaginationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Header click. Returns false when the key is unknown or not sortable.
    pub fn sort_on_click(&mut self, key: &str) -> bool {
        let Some(col) = self.columns.iter().find(|c| c.key == key) else {
            return false;
        };
        if !col.sortable {
            return false;
        }
        if self.sort.key.as_deref() == Some(key) {
            self.sort.direction = self.sort.direction.toggled();
        } else {
            self.sort = SortState::by(key, SortDirection::Asc);
        }
        true
    }

    pub fn change_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Changing the page size always returns to page 1.
    pub fn change_page_size(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        self.page_size = size;
        self.current_page = 1;
    }

    /// Pulls the current page back into range after the row set changed.
    pub fn clamp_to(&mut self, total_items: usize) {
        let last = pagination::total_pages(total_items, self.page_size).max(1);
        self.current_page = self.current_page.clamp(1, last);
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        pagination::total_pages(total_items, self.page_size)
    }

    /// Indexes into `data` in display order. `data` itself is never reordered.
    pub fn sorted_indexes(&self, data: &[R]) -> Vec<usize> {
        let Some(field) = self
            .sort
            .key
            .as_deref()
            .and_then(|key| self.columns.iter().find(|c| c.key == key))
            .map(Column::sort_field)
        else {
            return (0..data.len()).collect();
        };
        let mut keyed: Vec<(CellValue, usize)> = data
            .iter()
            .enumerate()
            .map(|(i, row)| (row.cell(field), i))
            .collect();
        // Stable: equal values keep their caller order.
        keyed.sort_by(|a, b| a.0.compare(&b.0));
        let mut order: Vec<usize> = keyed.into_iter().map(|(_, i)| i).collect();
        // Descending is the exact mirror of ascending, ties included.
        if self.sort.direction == SortDirection::Desc {
            order.reverse();
        }
        order
    }

    fn effective_page(&self, total_items: usize) -> usize {
        let last = self.total_pages(total_items).max(1);
        self.current_page.clamp(1, last)
    }

    /// The displayed slice, as source indexes, for the current page.
    pub fn page_indexes(&self, data: &[R]) -> Vec<usize> {
        let order = self.sorted_indexes(data);
        let page = self.effective_page(data.len());
        let start = (page - 1) * self.page_size;
        order
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn headers(&self) -> Vec<HeaderCell> {
        self.columns
            .iter()
            .map(|c| HeaderCell {
                key: c.key.clone(),
                label: c.label.clone(),
                sortable: c.sortable,
                sorted: (self.sort.key.as_deref() == Some(c.key.as_str()))
                    .then_some(self.sort.direction),
            })
            .collect()
    }

    pub fn render(&self, data: &[R]) -> RenderedTable {
        let total_items = data.len();
        let page = self.effective_page(total_items);
        let start = (page - 1) * self.page_size;
        let source_indexes = self.page_indexes(data);

        let rows = source_indexes
            .iter()
            .enumerate()
            .map(|(offset, &src)| {
                let row = &data[src];
                self.columns
                    .iter()
                    .map(|c| c.value(row, start + offset))
                    .collect()
            })
            .collect();

        RenderedTable {
            headers: self.headers(),
            rows,
            source_indexes,
            sort: self.sort.clone(),
            total_items,
            pagination: pagination::render(
                page,
                self.total_pages(total_items),
                self.page_size,
                total_items,
                &self.options,
            ),
        }
    }

    /// Every row in display order, rendered through the columns.
    pub fn render_all(&self, data: &[R]) -> Vec<Vec<CellValue>> {
        self.sorted_indexes(data)
            .into_iter()
            .enumerate()
            .map(|(pos, src)| {
                self.columns
                    .iter()
                    .map(|c| c.value(&data[src], pos))
                    .collect()
            })
            .collect()
    }
}

impl<R: Row> PageListener for Table<R> {
    fn on_page_change(&mut self, page: usize) {
        self.change_page(page);
    }

    fn on_page_size_change(&mut self, size: usize) {
        self.change_page_size(size);
    }
}
