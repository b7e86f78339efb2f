use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured code the backend attaches to "nothing found" failures.
pub const NO_DATA_CODE: &str = "no_data";

/// Longest a toast may stay up: one day.
pub const MAX_DURATION_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    fn default_duration(self) -> Duration {
        match self {
            ToastKind::Success => Duration::seconds(3),
            ToastKind::Info => Duration::seconds(4),
            ToastKind::Warning => Duration::seconds(5),
            ToastKind::Error => Duration::seconds(6),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastRequest {
    pub kind: ToastKind,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub allow_no_data_errors: bool,
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Shown(Toast),
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub message: String,
    #[serde(default = "default_confirm_label")]
    pub confirm_label: String,
    #[serde(default = "default_cancel_label")]
    pub cancel_label: String,
}

fn default_confirm_label() -> String {
    "Confirm".to_string()
}

fn default_cancel_label() -> String {
    "Cancel".to_string()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("confirmation {0} is not pending")]
    UnknownConfirmation(u64),
    #[error("toast message must not be empty")]
    EmptyMessage,
    #[error("toast duration must be at most one day, got {0} ms")]
    DurationOutOfRange(i64),
}

/// Toast queue plus pending confirmation dialogs.
#[derive(Debug, Default)]
pub struct Notifier {
    next_id: u64,
    toasts: Vec<Toast>,
    pending: BTreeMap<u64, Confirmation>,
}

fn is_no_data(req: &ToastRequest) -> bool {
    req.kind == ToastKind::Error && req.code.as_deref() == Some(NO_DATA_CODE)
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// No-data errors are dropped unless the caller opted into seeing them.
    pub fn push(
        &mut self,
        req: ToastRequest,
        now: DateTime<Utc>,
    ) -> Result<PushOutcome, NotifyError> {
        if req.message.trim().is_empty() {
            return Err(NotifyError::EmptyMessage);
        }
        if is_no_data(&req) && !req.allow_no_data_errors {
            tracing::debug!(message = %req.message, "suppressed no-data error toast");
            return Ok(PushOutcome::Suppressed);
        }

        let duration = match req.duration_ms.filter(|ms| *ms > 0) {
            Some(ms) if ms > MAX_DURATION_MS => return Err(NotifyError::DurationOutOfRange(ms)),
            Some(ms) => Duration::milliseconds(ms),
            None => req.kind.default_duration(),
        };
        let expires_at = now
            .checked_add_signed(duration)
            .ok_or(NotifyError::DurationOutOfRange(duration.num_milliseconds()))?;
        let toast = Toast {
            id: self.take_id(),
            kind: req.kind,
            message: req.message,
            code: req.code,
            created_at: now,
            expires_at,
        };
        self.toasts.push(toast.clone());
        Ok(PushOutcome::Shown(toast))
    }

    /// Drops expired toasts and returns the rest, oldest first.
    pub fn active(&mut self, now: DateTime<Utc>) -> &[Toast] {
        self.toasts.retain(|t| t.expires_at > now);
        &self.toasts
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    pub fn confirm(&mut self, mut confirmation: Confirmation) -> Confirmation {
        confirmation.id = self.take_id();
        self.pending.insert(confirmation.id, confirmation.clone());
        confirmation
    }

    pub fn pending(&self) -> impl Iterator<Item = &Confirmation> {
        self.pending.values()
    }

    /// Each confirmation resolves exactly once.
    pub fn resolve(
        &mut self,
        id: u64,
        confirmed: bool,
    ) -> Result<(Confirmation, bool), NotifyError> {
        self.pending
            .remove(&id)
            .map(|c| (c, confirmed))
            .ok_or(NotifyError::UnknownConfirmation(id))
    }
}
