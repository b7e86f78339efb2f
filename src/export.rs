use crate::records::{full_name, EntityKind};
use crate::table::{CellValue, Row, Table};
use anyhow::Context;
use chrono::{Months, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(csv_quote).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Header of column labels, then the whole sorted row set (not one page).
pub fn table_csv<R: Row>(table: &Table<R>, data: &[R]) -> String {
    let mut csv = csv_line(table.columns().iter().map(|c| c.label()));
    for row in table.render_all(data) {
        let cells: Vec<String> = row.iter().map(CellValue::display).collect();
        csv.push_str(&csv_line(cells.iter().map(String::as_str)));
    }
    csv
}

pub fn write_text_file(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCard {
    pub record_id: String,
    pub card_no: String,
    pub full_name: String,
    pub role: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub issued_on: NaiveDate,
    pub valid_until: NaiveDate,
}

fn text(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

/// Card for a people record; `None` for entities without cards.
pub fn id_card(kind: EntityKind, record: &Value, issued_on: NaiveDate) -> Option<IdCard> {
    let (prefix, role, number_key, detail) = match kind {
        EntityKind::Student => {
            let class = text(record, "className").unwrap_or_default();
            let detail = match text(record, "section") {
                Some(section) => format!("Class {class}-{section}"),
                None => format!("Class {class}"),
            };
            ("STU", "Student", "admissionNo", detail)
        }
        EntityKind::Teacher => (
            "TCH",
            "Teacher",
            "employeeNo",
            text(record, "subject").unwrap_or_default(),
        ),
        EntityKind::Staff => (
            "STF",
            "Staff",
            "employeeNo",
            text(record, "designation").unwrap_or_default(),
        ),
        _ => return None,
    };

    let record_id = text(record, "id").unwrap_or_default();
    let number = text(record, number_key)
        .unwrap_or_else(|| record_id.chars().take(8).collect::<String>().to_uppercase());

    Some(IdCard {
        card_no: format!("{prefix}-{number}"),
        full_name: full_name(record),
        role: role.to_string(),
        detail,
        photo_url: text(record, "photoUrl"),
        issued_on,
        valid_until: issued_on
            .checked_add_months(Months::new(12))
            .unwrap_or(issued_on),
        record_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, SortDirection, SortState};
    use serde_json::json;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_holds_every_sorted_row() {
        let data: Vec<Value> = vec![
            json!({ "name": "Zed, Z", "marks": 40 }),
            json!({ "name": "Amy", "marks": 90 }),
            json!({ "name": "Bo", "marks": 75 }),
        ];
        let table = Table::new(
            vec![Column::new("name", "Name"), Column::new("marks", "Marks")],
            Some(SortState::by("marks", SortDirection::Desc)),
            1,
        )
        .expect("table");
        let csv = table_csv(&table, &data);
        assert_eq!(csv, "Name,Marks\nAmy,90\nBo,75\n\"Zed, Z\",40\n");
    }

    #[test]
    fn student_card_uses_admission_number() {
        let issued = NaiveDate::from_ymd_opt(2026, 9, 1).expect("date");
        let card = id_card(
            EntityKind::Student,
            &json!({
                "id": "0f8d2c3a-aaaa",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "admissionNo": "A-102",
                "className": "7",
                "section": "B"
            }),
            issued,
        )
        .expect("card");
        assert_eq!(card.card_no, "STU-A-102");
        assert_eq!(card.full_name, "Ada Lovelace");
        assert_eq!(card.detail, "Class 7-B");
        assert_eq!(card.valid_until, NaiveDate::from_ymd_opt(2027, 9, 1).expect("date"));
    }

    #[test]
    fn staff_card_falls_back_to_record_id() {
        let issued = NaiveDate::from_ymd_opt(2026, 1, 15).expect("date");
        let card = id_card(
            EntityKind::Staff,
            &json!({
                "id": "abcdef123456",
                "firstName": "Sam",
                "lastName": "Lee",
                "designation": "Librarian"
            }),
            issued,
        )
        .expect("card");
        assert_eq!(card.card_no, "STF-ABCDEF12");
        assert_eq!(card.detail, "Librarian");
        assert!(id_card(EntityKind::Exam, &json!({}), issued).is_none());
    }
}
