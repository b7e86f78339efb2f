use crate::db;
use crate::export;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    param_opt, param_str, param_usize, require_db, require_permission, require_session,
};
use crate::ipc::types::{AppState, OpenTable, Request};
use crate::pagination::{self, PageAction, PaginationOptions};
use crate::records::{self, EntityKind};
use crate::table::{CellValue, Column, Row, SortState, Table};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum ColumnFormat {
    #[default]
    Text,
    Number,
    Currency,
    Date,
    Boolean,
    Index,
    FullName,
}

impl ColumnFormat {
    fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(Value::String(raw.to_string())).ok()
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnSpec {
    key: String,
    label: String,
    #[serde(default)]
    format: ColumnFormat,
    #[serde(default = "default_true")]
    sortable: bool,
    #[serde(default)]
    sort_on: Option<String>,
}

fn default_specs(kind: EntityKind) -> Vec<ColumnSpec> {
    kind.default_columns()
        .iter()
        .map(|(key, label, format)| ColumnSpec {
            key: key.to_string(),
            label: label.to_string(),
            format: ColumnFormat::parse(format).unwrap_or_default(),
            sortable: true,
            sort_on: None,
        })
        .collect()
}

/// `1234.5` -> `1,234.50`
fn format_amount(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

fn build_column(spec: ColumnSpec) -> Column<Value> {
    let field = spec.key.clone();
    let mut col = Column::new(spec.key, spec.label);
    col = match spec.format {
        ColumnFormat::Text | ColumnFormat::Number => col,
        ColumnFormat::Currency => col.with_render(move |r: &Value, _| match r.cell(&field) {
            CellValue::Int(v) => CellValue::Text(format_amount(v as f64)),
            CellValue::Float(v) => CellValue::Text(format_amount(v)),
            other => other,
        }),
        ColumnFormat::Date => col.with_render(move |r: &Value, _| match r.cell(&field) {
            CellValue::Text(s) => match parse_date(&s) {
                Some(d) => CellValue::Text(d.format("%d %b %Y").to_string()),
                None => CellValue::Text(s),
            },
            other => other,
        }),
        ColumnFormat::Boolean => col.with_render(move |r: &Value, _| match r.cell(&field) {
            CellValue::Bool(b) => CellValue::from(if b { "Yes" } else { "No" }),
            other => other,
        }),
        ColumnFormat::Index => col
            .with_render(|_: &Value, i| CellValue::Int(i as i64 + 1))
            .unsortable(),
        ColumnFormat::FullName => col
            .with_render(|r: &Value, _| CellValue::Text(records::full_name(r)))
            .sort_on("lastName"),
    };
    if let Some(field) = spec.sort_on {
        col = col.sort_on(field);
    }
    if !spec.sortable {
        col = col.unsortable();
    }
    col
}

fn setting_value(state: &AppState, key: &str) -> Option<Value> {
    let conn = state.db.as_ref()?;
    match db::settings_get_json(conn, key) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read setting");
            None
        }
    }
}

fn default_page_size(state: &AppState) -> usize {
    setting_value(state, "ui.pageSize")
        .and_then(|v| v.as_u64())
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(state.config.page_size)
}

fn default_options(state: &AppState) -> PaginationOptions {
    let page_size_options = setting_value(state, "ui.pageSizeOptions")
        .and_then(|v| serde_json::from_value::<Vec<usize>>(v).ok())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.config.page_size_options.clone());
    PaginationOptions {
        page_size_options,
        ..PaginationOptions::default()
    }
}

fn load_entity_rows(state: &AppState, kind: EntityKind) -> Result<Vec<Value>, HandlerErr> {
    require_permission(state, &kind.view_permission())?;
    let conn = require_db(state)?;
    db::records_list(conn, kind).map_err(|e| HandlerErr::db("db_query_failed", e))
}

/// Looks up an open table and re-checks the current session against it.
fn open_table<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(String, &'a mut OpenTable), HandlerErr> {
    let id = param_str(req, "tableId")?.to_string();
    let entity = match state.tables.get(&id) {
        Some(t) => t.entity,
        None => {
            return Err(HandlerErr::new("not_found", "table not open")
                .with_details(json!({ "tableId": id })))
        }
    };
    match entity {
        Some(kind) => require_permission(state, &kind.view_permission())?,
        None => require_session(state)?,
    };
    match state.tables.get_mut(&id) {
        Some(t) => Ok((id, t)),
        None => Err(HandlerErr::new("not_found", "table not open")
            .with_details(json!({ "tableId": id }))),
    }
}

fn view(id: &str, t: &OpenTable) -> Value {
    json!({ "tableId": id, "view": t.table.render(&t.rows) })
}

fn handle_table_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let entity = match req.params.get("entity").and_then(|v| v.as_str()) {
        Some(raw) => Some(records::parse_entity(Some(raw))?),
        None => None,
    };
    let rows = match entity {
        Some(kind) => load_entity_rows(state, kind)?,
        None => {
            require_session(state)?;
            param_opt::<Vec<Value>>(req, "rows")?
                .ok_or_else(|| HandlerErr::bad_params("missing rows or entity"))?
        }
    };
    let specs = match (param_opt::<Vec<ColumnSpec>>(req, "columns")?, entity) {
        (Some(specs), _) => specs,
        (None, Some(kind)) => default_specs(kind),
        (None, None) => return Err(HandlerErr::bad_params("missing columns")),
    };
    let initial_sort: Option<SortState> = param_opt(req, "initialSort")?;
    let page_size =
        param_opt::<usize>(req, "pageSize")?.unwrap_or_else(|| default_page_size(state));
    let options =
        param_opt::<PaginationOptions>(req, "options")?.unwrap_or_else(|| default_options(state));

    let columns = specs.into_iter().map(build_column).collect();
    let table = Table::new(columns, initial_sort, page_size)?.with_pagination_options(options);

    let id = Uuid::new_v4().to_string();
    let open = OpenTable {
        table,
        rows,
        entity,
    };
    let out = view(&id, &open);
    tracing::info!(
        table_id = %id,
        entity = ?entity.map(EntityKind::as_str),
        rows = open.rows.len(),
        "table opened"
    );
    state.tables.insert(id, open);
    Ok(out)
}

fn handle_table_render(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let (id, t) = open_table(state, req)?;
    Ok(view(&id, t))
}

fn handle_table_sort(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let key = param_str(req, "key")?.to_string();
    let (id, t) = open_table(state, req)?;
    if !t.table.sort_on_click(&key) {
        return Err(HandlerErr::bad_params(format!("column {key} is not sortable"))
            .with_details(json!({ "key": key })));
    }
    let sort = t.table.sort();
    tracing::debug!(table_id = %id, key = ?sort.key, direction = ?sort.direction, "table sorted");
    Ok(view(&id, t))
}

fn handle_table_page(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let page = param_usize(req, "page")?;
    let (id, t) = open_table(state, req)?;
    t.table.change_page(page);
    t.table.clamp_to(t.rows.len());
    tracing::debug!(table_id = %id, page = t.table.current_page(), "table page changed");
    Ok(view(&id, t))
}

fn handle_table_page_size(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let size = param_usize(req, "pageSize")?;
    if size == 0 {
        return Err(HandlerErr::bad_params("pageSize must be at least 1"));
    }
    let (id, t) = open_table(state, req)?;
    t.table.change_page_size(size);
    tracing::debug!(table_id = %id, page_size = t.table.page_size(), "table page size changed");
    Ok(view(&id, t))
}

/// A click on the rendered pagination bar; actions the bar did not offer are ignored.
fn handle_table_action(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let action: PageAction =
        param_opt(req, "action")?.ok_or_else(|| HandlerErr::bad_params("missing action"))?;
    let (id, t) = open_table(state, req)?;
    let bar = t.table.render(&t.rows).pagination;
    let applied = bar.activate(action, &mut t.table);
    let mut out = view(&id, t);
    out["applied"] = json!(applied);
    Ok(out)
}

fn handle_table_set_data(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let entity = open_table(state, req)?.1.entity;
    let rows = match (param_opt::<Vec<Value>>(req, "rows")?, entity) {
        (Some(rows), _) => rows,
        (None, Some(kind)) => load_entity_rows(state, kind)?,
        (None, None) => return Err(HandlerErr::bad_params("missing rows")),
    };
    let (id, t) = open_table(state, req)?;
    t.rows = rows;
    t.table.clamp_to(t.rows.len());
    tracing::debug!(table_id = %id, rows = t.rows.len(), "table data replaced");
    Ok(view(&id, t))
}

fn handle_table_close(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = param_str(req, "tableId")?;
    let closed = state.tables.remove(id).is_some();
    Ok(json!({ "tableId": id, "closed": closed }))
}

fn handle_table_export_csv(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let out_path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);
    let (id, t) = open_table(state, req)?;
    let csv = export::table_csv(&t.table, &t.rows);
    let row_count = t.rows.len();

    match out_path {
        Some(path) => {
            export::write_text_file(&path, &csv).map_err(|e| HandlerErr::db("io_failed", e))?;
            tracing::info!(
                table_id = %id,
                path = %path.to_string_lossy(),
                row_count,
                "table exported"
            );
            Ok(json!({ "tableId": id, "path": path.to_string_lossy(), "rowCount": row_count }))
        }
        None => Ok(json!({ "tableId": id, "csv": csv, "rowCount": row_count })),
    }
}

fn handle_pagination_render(_state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let current_page = param_usize(req, "currentPage")?;
    let page_size = param_usize(req, "pageSize")?;
    let total_items = param_usize(req, "totalItems")?;
    let total_pages = param_opt::<usize>(req, "totalPages")?
        .unwrap_or_else(|| pagination::total_pages(total_items, page_size));
    let options: PaginationOptions = param_opt(req, "options")?.unwrap_or_default();
    let current_page = current_page.clamp(1, total_pages.max(1));
    let view = pagination::render(current_page, total_pages, page_size, total_items, &options);
    Ok(json!({ "pagination": view }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "table.open" => handle_table_open(state, req),
        "table.render" => handle_table_render(state, req),
        "table.sort" => handle_table_sort(state, req),
        "table.page" => handle_table_page(state, req),
        "table.pageSize" => handle_table_page_size(state, req),
        "table.action" => handle_table_action(state, req),
        "table.setData" => handle_table_set_data(state, req),
        "table.close" => handle_table_close(state, req),
        "table.exportCsv" => handle_table_export_csv(state, req),
        "pagination.render" => handle_pagination_render(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(-1234567.891), "-1,234,567.89");
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 7).expect("date");
        assert_eq!(parse_date("2026-03-07"), Some(d));
        assert_eq!(parse_date("2026-03-07T10:00:00Z"), Some(d));
        assert_eq!(parse_date("next week"), None);
    }

    #[test]
    fn formats_render_through_columns() {
        let row = json!({ "amount": 1500, "paidOn": "2026-09-01", "active": true });
        let currency = build_column(ColumnSpec {
            key: "amount".into(),
            label: "Amount".into(),
            format: ColumnFormat::Currency,
            sortable: true,
            sort_on: None,
        });
        assert_eq!(currency.value(&row, 0), CellValue::from("1,500.00"));

        let date = build_column(ColumnSpec {
            key: "paidOn".into(),
            label: "Paid".into(),
            format: ColumnFormat::Date,
            sortable: true,
            sort_on: None,
        });
        assert_eq!(date.value(&row, 0), CellValue::from("01 Sep 2026"));

        let flag = build_column(ColumnSpec {
            key: "active".into(),
            label: "Active".into(),
            format: ColumnFormat::Boolean,
            sortable: true,
            sort_on: None,
        });
        assert_eq!(flag.value(&row, 0), CellValue::from("Yes"));
    }

    #[test]
    fn every_default_column_format_parses() {
        for kind in EntityKind::ALL {
            for (_, _, format) in kind.default_columns() {
                assert!(ColumnFormat::parse(format).is_some(), "{format}");
            }
        }
    }
}
