use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{param_str, require_db, require_permission};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, EntityKind};
use serde_json::{json, Value};

fn entity(req: &Request) -> Result<EntityKind, HandlerErr> {
    Ok(records::parse_entity(
        req.params.get("entity").and_then(|v| v.as_str()),
    )?)
}

fn handle_records_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = entity(req)?;
    require_permission(state, &kind.view_permission())?;
    let conn = require_db(state)?;
    let rows = db::records_list(conn, kind).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok(json!({ "entity": kind.as_str(), "records": rows }))
}

fn handle_records_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = entity(req)?;
    let id = param_str(req, "id")?;
    require_permission(state, &kind.view_permission())?;
    let conn = require_db(state)?;
    let record = db::records_get(conn, kind, id)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", format!("{} not found", kind.as_str()))
                .with_details(json!({ "id": id }))
        })?;
    Ok(json!({ "record": record }))
}

fn handle_records_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = entity(req)?;
    require_permission(state, &kind.manage_permission())?;
    let data = req
        .params
        .get("data")
        .ok_or_else(|| HandlerErr::bad_params("missing data"))?;
    let data = records::as_object(data)?;
    records::validate_new(kind, data)?;
    let conn = require_db(state)?;

    let record = db::records_insert(conn, kind, data).map_err(|e| {
        HandlerErr::db("db_insert_failed", e).with_details(json!({ "entity": kind.as_str() }))
    })?;
    tracing::info!(entity = kind.as_str(), id = ?record.get("id"), "record created");
    Ok(json!({ "record": record }))
}

fn handle_records_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = entity(req)?;
    let id = param_str(req, "id")?;
    require_permission(state, &kind.manage_permission())?;
    let patch = req
        .params
        .get("patch")
        .ok_or_else(|| HandlerErr::bad_params("missing patch"))?;
    let patch = records::as_object(patch)?;
    records::validate_patch(kind, patch)?;
    let conn = require_db(state)?;

    let record = db::records_update(conn, kind, id, patch)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?
        .ok_or_else(|| {
            HandlerErr::new("not_found", format!("{} not found", kind.as_str()))
                .with_details(json!({ "id": id }))
        })?;
    tracing::info!(entity = kind.as_str(), id, "record updated");
    Ok(json!({ "record": record }))
}

fn handle_records_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = entity(req)?;
    let id = param_str(req, "id")?;
    require_permission(state, &kind.manage_permission())?;
    let conn = require_db(state)?;

    let deleted =
        db::records_delete(conn, kind, id).map_err(|e| HandlerErr::db("db_delete_failed", e))?;
    if !deleted {
        return Err(HandlerErr::new("not_found", format!("{} not found", kind.as_str()))
            .with_details(json!({ "id": id })));
    }
    tracing::info!(entity = kind.as_str(), id, "record deleted");
    Ok(json!({ "deleted": true, "id": id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "records.list" => handle_records_list(state, req),
        "records.get" => handle_records_get(state, req),
        "records.create" => handle_records_create(state, req),
        "records.update" => handle_records_update(state, req),
        "records.delete" => handle_records_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
