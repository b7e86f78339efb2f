use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::param_opt;
use crate::ipc::types::{AppState, Request};
use crate::notify::{Confirmation, PushOutcome, ToastRequest};
use chrono::Utc;
use serde_json::{json, Value};

fn param_id(req: &Request) -> Result<u64, HandlerErr> {
    req.params
        .get("id")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params("missing id"))
}

/// Workspace-wide opt-in, used when a request does not say either way.
fn workspace_allows_no_data(state: &AppState) -> bool {
    state
        .db
        .as_ref()
        .and_then(|conn| db::settings_get_json(conn, "ui.allowNoDataErrors").ok().flatten())
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn handle_notify_push(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let mut toast: ToastRequest = serde_json::from_value(req.params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid toast: {e}")))?;
    if req.params.get("allowNoDataErrors").is_none() {
        toast.allow_no_data_errors = workspace_allows_no_data(state);
    }

    match state.notifier.push(toast, Utc::now())? {
        PushOutcome::Shown(t) => Ok(json!({ "shown": true, "toast": t })),
        PushOutcome::Suppressed => Ok(json!({ "shown": false })),
    }
}

fn handle_notify_list(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let toasts = state.notifier.active(Utc::now()).to_vec();
    let pending: Vec<Confirmation> = state.notifier.pending().cloned().collect();
    Ok(json!({ "toasts": toasts, "confirmations": pending }))
}

fn handle_notify_dismiss(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = param_id(req)?;
    Ok(json!({ "id": id, "dismissed": state.notifier.dismiss(id) }))
}

fn handle_notify_confirm(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let mut confirmation: Confirmation = serde_json::from_value(req.params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid confirmation: {e}")))?;
    if confirmation.title.trim().is_empty() {
        return Err(HandlerErr::bad_params("title must not be empty"));
    }
    confirmation.id = 0;
    let pending = state.notifier.confirm(confirmation);
    Ok(json!({ "confirmation": pending }))
}

fn handle_notify_resolve(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let id = param_id(req)?;
    let confirmed: bool =
        param_opt(req, "confirmed")?.ok_or_else(|| HandlerErr::bad_params("missing confirmed"))?;
    let (confirmation, confirmed) = state.notifier.resolve(id, confirmed)?;
    tracing::debug!(id, confirmed, title = %confirmation.title, "confirmation resolved");
    Ok(json!({ "confirmation": confirmation, "confirmed": confirmed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "notify.push" => handle_notify_push(state, req),
        "notify.list" => handle_notify_list(state, req),
        "notify.dismiss" => handle_notify_dismiss(state, req),
        "notify.confirm" => handle_notify_confirm(state, req),
        "notify.resolve" => handle_notify_resolve(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
