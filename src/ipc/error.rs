use serde_json::json;

use crate::notify::NotifyError;
use crate::records::RecordError;
use crate::table::TableError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    /// Store failures keep the underlying error text.
    pub fn db(code: &'static str, e: anyhow::Error) -> Self {
        Self::new(code, format!("{e:#}"))
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => {
            tracing::debug!(code = e.code, message = %e.message, "request failed");
            e.response(id)
        }
    }
}

impl From<RecordError> for HandlerErr {
    fn from(e: RecordError) -> Self {
        let details = match &e {
            RecordError::MissingFields { fields, .. } => Some(json!({ "fields": fields })),
            _ => None,
        };
        HandlerErr {
            code: "bad_params",
            message: e.to_string(),
            details,
        }
    }
}

impl From<TableError> for HandlerErr {
    fn from(e: TableError) -> Self {
        HandlerErr::bad_params(e.to_string())
    }
}

impl From<NotifyError> for HandlerErr {
    fn from(e: NotifyError) -> Self {
        match e {
            NotifyError::UnknownConfirmation(_) => HandlerErr::new("not_found", e.to_string()),
            NotifyError::EmptyMessage | NotifyError::DurationOutOfRange(_) => {
                HandlerErr::bad_params(e.to_string())
            }
        }
    }
}
