use crate::access::{self, Capabilities, Role};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{param_opt, param_str, require_session};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn handle_session_set(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let user_name = param_str(req, "userName")?.to_string();
    let role: Role =
        param_opt(req, "role")?.ok_or_else(|| HandlerErr::bad_params("missing role"))?;
    let permissions: Vec<String> = param_opt(req, "permissions")?.unwrap_or_default();

    let caps = Capabilities::new(user_name, role, permissions);
    tracing::info!(
        user = %caps.user_name,
        role = ?caps.role,
        permissions = caps.permissions.len(),
        "session set"
    );
    let out = json!({ "session": &caps, "sidebar": access::sidebar(&caps) });
    state.session = Some(caps);
    // Open tables were loaded under the previous session's permissions.
    state.tables.clear();
    Ok(out)
}

fn handle_session_get(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    Ok(json!({ "session": state.session }))
}

fn handle_session_clear(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let had = state.session.take().is_some();
    state.tables.clear();
    Ok(json!({ "cleared": had }))
}

fn handle_nav_sidebar(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let caps = require_session(state)?;
    Ok(json!({ "sections": access::sidebar(caps) }))
}

fn handle_nav_can_access(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let route = param_str(req, "route")?;
    let caps = require_session(state)?;
    Ok(json!({ "route": route, "allowed": access::can_access(caps, route) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "session.set" => handle_session_set(state, req),
        "session.get" => handle_session_get(state, req),
        "session.clear" => handle_session_clear(state, req),
        "nav.sidebar" => handle_nav_sidebar(state, req),
        "nav.canAccess" => handle_nav_can_access(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
