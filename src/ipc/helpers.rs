use serde::de::DeserializeOwned;

use crate::access::Capabilities;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

pub fn param_usize(req: &Request, key: &str) -> Result<usize, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or invalid {key}")))
}

/// Deserializes an optional param; absent or null gives `None`.
pub fn param_opt<T: DeserializeOwned>(req: &Request, key: &str) -> Result<Option<T>, HandlerErr> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| HandlerErr::bad_params(format!("invalid {key}: {e}"))),
    }
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn require_session(state: &AppState) -> Result<&Capabilities, HandlerErr> {
    state
        .session
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_session", "no user session; call session.set first"))
}

pub fn require_permission<'a>(
    state: &'a AppState,
    permission: &str,
) -> Result<&'a Capabilities, HandlerErr> {
    let caps = require_session(state)?;
    if !caps.has(permission) {
        return Err(HandlerErr::new("forbidden", format!("missing permission {permission}"))
            .with_details(serde_json::json!({ "permission": permission })));
    }
    Ok(caps)
}
