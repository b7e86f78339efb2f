use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Teacher,
    Staff,
    Parent,
    FeeStructure,
    FeePayment,
    Timetable,
    Exam,
    Result,
    GradeCriteria,
    Announcement,
}

/// Keys the store manages itself; client data may not set them.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Student,
        EntityKind::Teacher,
        EntityKind::Staff,
        EntityKind::Parent,
        EntityKind::FeeStructure,
        EntityKind::FeePayment,
        EntityKind::Timetable,
        EntityKind::Exam,
        EntityKind::Result,
        EntityKind::GradeCriteria,
        EntityKind::Announcement,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Teacher => "teacher",
            EntityKind::Staff => "staff",
            EntityKind::Parent => "parent",
            EntityKind::FeeStructure => "feeStructure",
            EntityKind::FeePayment => "feePayment",
            EntityKind::Timetable => "timetable",
            EntityKind::Exam => "exam",
            EntityKind::Result => "result",
            EntityKind::GradeCriteria => "gradeCriteria",
            EntityKind::Announcement => "announcement",
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Student => &["firstName", "lastName", "admissionNo", "className"],
            EntityKind::Teacher => &["firstName", "lastName", "employeeNo", "subject"],
            EntityKind::Staff => &["firstName", "lastName", "employeeNo", "designation"],
            EntityKind::Parent => &["firstName", "lastName", "phone"],
            EntityKind::FeeStructure => &["className", "feeType", "amount"],
            EntityKind::FeePayment => &["studentId", "amount", "paidOn"],
            EntityKind::Timetable => &["className", "day", "period", "subject"],
            EntityKind::Exam => &["name", "className", "startDate"],
            EntityKind::Result => &["examId", "studentId", "subject", "marks"],
            EntityKind::GradeCriteria => &["grade", "minPercent", "maxPercent"],
            EntityKind::Announcement => &["title", "body"],
        }
    }

    pub fn view_permission(self) -> String {
        format!("{}.view", self.as_str())
    }

    pub fn manage_permission(self) -> String {
        format!("{}.manage", self.as_str())
    }

    /// Columns a list screen shows when the UI does not send its own:
    /// `(key, label, format)`.
    pub fn default_columns(self) -> &'static [(&'static str, &'static str, &'static str)] {
        match self {
            EntityKind::Student => &[
                ("no", "#", "index"),
                ("admissionNo", "Admission No", "text"),
                ("name", "Name", "fullName"),
                ("className", "Class", "text"),
                ("section", "Section", "text"),
            ],
            EntityKind::Teacher => &[
                ("no", "#", "index"),
                ("employeeNo", "Employee No", "text"),
                ("name", "Name", "fullName"),
                ("subject", "Subject", "text"),
            ],
            EntityKind::Staff => &[
                ("no", "#", "index"),
                ("employeeNo", "Employee No", "text"),
                ("name", "Name", "fullName"),
                ("designation", "Designation", "text"),
            ],
            EntityKind::Parent => &[
                ("no", "#", "index"),
                ("name", "Name", "fullName"),
                ("phone", "Phone", "text"),
                ("email", "Email", "text"),
            ],
            EntityKind::FeeStructure => &[
                ("className", "Class", "text"),
                ("feeType", "Fee Type", "text"),
                ("amount", "Amount", "currency"),
                ("dueDate", "Due Date", "date"),
            ],
            EntityKind::FeePayment => &[
                ("studentId", "Student", "text"),
                ("amount", "Amount", "currency"),
                ("paidOn", "Paid On", "date"),
                ("method", "Method", "text"),
            ],
            EntityKind::Timetable => &[
                ("className", "Class", "text"),
                ("day", "Day", "text"),
                ("period", "Period", "number"),
                ("subject", "Subject", "text"),
                ("teacher", "Teacher", "text"),
            ],
            EntityKind::Exam => &[
                ("name", "Exam", "text"),
                ("className", "Class", "text"),
                ("startDate", "Starts", "date"),
                ("endDate", "Ends", "date"),
            ],
            EntityKind::Result => &[
                ("studentId", "Student", "text"),
                ("subject", "Subject", "text"),
                ("marks", "Marks", "number"),
                ("grade", "Grade", "text"),
            ],
            EntityKind::GradeCriteria => &[
                ("grade", "Grade", "text"),
                ("minPercent", "Min %", "number"),
                ("maxPercent", "Max %", "number"),
                ("remark", "Remark", "text"),
            ],
            EntityKind::Announcement => &[
                ("title", "Title", "text"),
                ("audience", "Audience", "text"),
                ("publishedOn", "Published", "date"),
            ],
        }
    }

    /// People records that can be printed on an ID card.
    pub fn has_id_card(self) -> bool {
        matches!(
            self,
            EntityKind::Student | EntityKind::Teacher | EntityKind::Staff
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(String),
    #[error("record data must be a JSON object")]
    NotAnObject,
    #[error("{entity} is missing required fields: {}", .fields.join(", "))]
    MissingFields {
        entity: &'static str,
        fields: Vec<String>,
    },
    #[error("field {0:?} is managed by the store")]
    ReservedField(String),
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn parse_entity(raw: Option<&str>) -> Result<EntityKind, RecordError> {
    let raw = raw.unwrap_or_default();
    EntityKind::parse(raw).ok_or_else(|| RecordError::UnknownEntity(raw.to_string()))
}

pub fn as_object(data: &Value) -> Result<&Map<String, Value>, RecordError> {
    data.as_object().ok_or(RecordError::NotAnObject)
}

fn reject_reserved(data: &Map<String, Value>) -> Result<(), RecordError> {
    match RESERVED_FIELDS.iter().find(|f| data.contains_key(**f)) {
        Some(f) => Err(RecordError::ReservedField(f.to_string())),
        None => Ok(()),
    }
}

/// Checks a complete record body for a create.
pub fn validate_new(kind: EntityKind, data: &Map<String, Value>) -> Result<(), RecordError> {
    reject_reserved(data)?;
    let missing: Vec<String> = kind
        .required_fields()
        .iter()
        .filter(|f| is_blank(data.get(**f)))
        .map(|f| f.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RecordError::MissingFields {
            entity: kind.as_str(),
            fields: missing,
        });
    }
    Ok(())
}

/// Checks a shallow patch: required fields may change but not be blanked.
pub fn validate_patch(kind: EntityKind, patch: &Map<String, Value>) -> Result<(), RecordError> {
    reject_reserved(patch)?;
    let blanked: Vec<String> = kind
        .required_fields()
        .iter()
        .filter(|f| patch.contains_key(**f) && is_blank(patch.get(**f)))
        .map(|f| f.to_string())
        .collect();
    if !blanked.is_empty() {
        return Err(RecordError::MissingFields {
            entity: kind.as_str(),
            fields: blanked,
        });
    }
    Ok(())
}

/// "First Last", skipping blank parts.
pub fn full_name(record: &Value) -> String {
    ["firstName", "middleName", "lastName"]
        .iter()
        .filter_map(|k| record.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
