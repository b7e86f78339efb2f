use crate::db;
use crate::export::{self, IdCard};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{param_opt, param_str, require_db, require_permission};
use crate::ipc::types::{AppState, Request};
use crate::records;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

const IDCARD_PERMISSION: &str = "idcard.generate";

fn handle_idcards_generate(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind = records::parse_entity(Some(param_str(req, "entity")?))?;
    if !kind.has_id_card() {
        return Err(HandlerErr::bad_params(format!("{} records have no ID card", kind.as_str())));
    }
    let ids: Option<Vec<String>> = param_opt(req, "ids")?;
    let issued_on = match param_opt::<String>(req, "issuedOn")? {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| HandlerErr::bad_params("issuedOn must be YYYY-MM-DD"))?,
        None => Utc::now().date_naive(),
    };

    require_permission(state, IDCARD_PERMISSION)?;
    require_permission(state, &kind.view_permission())?;
    let conn = require_db(state)?;

    let people = match &ids {
        Some(ids) => {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                let record = db::records_get(conn, kind, id)
                    .map_err(|e| HandlerErr::db("db_query_failed", e))?
                    .ok_or_else(|| {
                        HandlerErr::new("not_found", format!("{} not found", kind.as_str()))
                            .with_details(json!({ "id": id }))
                    })?;
                out.push(record);
            }
            out
        }
        None => db::records_list(conn, kind).map_err(|e| HandlerErr::db("db_query_failed", e))?,
    };

    let cards: Vec<IdCard> = people
        .iter()
        .filter_map(|r| export::id_card(kind, r, issued_on))
        .collect();
    tracing::info!(entity = kind.as_str(), count = cards.len(), "id cards generated");
    Ok(json!({ "entity": kind.as_str(), "cards": cards }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "idcards.generate" => handle_idcards_generate(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
