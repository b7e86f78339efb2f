use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{param_str, require_db};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Settings keys the UI may read and write.
const SETTINGS_KEYS: [&str; 4] = [
    "ui.pageSize",
    "ui.pageSizeOptions",
    "ui.allowNoDataErrors",
    "school.profile",
];

fn handle_health(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "session": state.session.as_ref().map(|s| s.user_name.clone()),
        "openTables": state.tables.len(),
    }))
}

pub fn open_workspace(state: &mut AppState, path: PathBuf) -> anyhow::Result<()> {
    let conn = db::open_db(&path)?;
    // Tables opened against the previous workspace hold stale rows.
    state.tables.clear();
    state.db = Some(conn);
    state.workspace = Some(path);
    tracing::info!(workspace = ?state.workspace, "workspace opened");
    Ok(())
}

fn handle_workspace_select(
    state: &mut AppState,
    req: &Request,
) -> Result<Value, HandlerErr> {
    let path = PathBuf::from(param_str(req, "path")?);
    open_workspace(state, path.clone()).map_err(|e| HandlerErr::db("db_open_failed", e))?;
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

fn settings_key(req: &Request) -> Result<&str, HandlerErr> {
    let key = param_str(req, "key")?;
    if !SETTINGS_KEYS.contains(&key) {
        return Err(HandlerErr::bad_params(format!("unknown settings key {key}"))
            .with_details(json!({ "allowed": SETTINGS_KEYS })));
    }
    Ok(key)
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let key = settings_key(req)?;
    let conn = require_db(state)?;
    let value = db::settings_get_json(conn, key).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "key": key, "value": value }))
}

fn validate_setting(key: &str, value: &Value) -> Result<(), HandlerErr> {
    let valid = match key {
        "ui.pageSize" => value.as_u64().is_some_and(|n| n > 0),
        "ui.pageSizeOptions" => value
            .as_array()
            .is_some_and(|a| !a.is_empty() && a.iter().all(|v| v.as_u64().is_some_and(|n| n > 0))),
        "ui.allowNoDataErrors" => value.is_boolean(),
        _ => value.is_object(),
    };
    if !valid {
        return Err(HandlerErr::bad_params(format!("invalid value for {key}"))
            .with_details(json!({ "value": value })));
    }
    Ok(())
}

fn handle_settings_set(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let key = settings_key(req)?;
    let value = req
        .params
        .get("value")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing value"))?;
    validate_setting(key, &value)?;
    let conn = require_db(state)?;
    db::settings_set_json(conn, key, &value).map_err(|e| HandlerErr::db("db_update_failed", e))?;
    tracing::info!(key, "setting updated");
    Ok(json!({ "key": key, "value": value }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "settings.get" => handle_settings_get(state, req),
        "settings.set" => handle_settings_set(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
