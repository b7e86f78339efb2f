use crate::records::EntityKind;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE: &str = "schoold.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            entity TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(entity, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_entity_created ON records(entity, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Stored body plus the store-managed keys, as the UI sees a record.
fn assemble(
    id: String,
    data: &str,
    created_at: String,
    updated_at: String,
) -> anyhow::Result<Value> {
    let mut obj: Map<String, Value> = serde_json::from_str(data)?;
    obj.insert("id".into(), Value::String(id));
    obj.insert("createdAt".into(), Value::String(created_at));
    obj.insert("updatedAt".into(), Value::String(updated_at));
    Ok(Value::Object(obj))
}

pub fn records_list(conn: &Connection, entity: EntityKind) -> anyhow::Result<Vec<Value>> {
    let mut stmt = conn.prepare(
        "SELECT id, data, created_at, updated_at
         FROM records
         WHERE entity = ?
         ORDER BY created_at, rowid",
    )?;
    let rows = stmt
        .query_map([entity.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, data, created, updated)| assemble(id, &data, created, updated))
        .collect()
}

pub fn records_get(
    conn: &Connection,
    entity: EntityKind,
    id: &str,
) -> anyhow::Result<Option<Value>> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT data, created_at, updated_at FROM records WHERE entity = ? AND id = ?",
            (entity.as_str(), id),
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    row.map(|(data, created, updated)| assemble(id.to_string(), &data, created, updated))
        .transpose()
}

pub fn records_insert(
    conn: &Connection,
    entity: EntityKind,
    data: &Map<String, Value>,
) -> anyhow::Result<Value> {
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO records(entity, id, data, created_at, updated_at) VALUES(?, ?, ?, ?, ?)",
        (
            entity.as_str(),
            &id,
            serde_json::to_string(data)?,
            &now,
            &now,
        ),
    )?;
    assemble(id, &serde_json::to_string(data)?, now.clone(), now)
}

/// Shallow merge of `patch` into the stored body; `null` removes a key.
pub fn records_update(
    conn: &Connection,
    entity: EntityKind,
    id: &str,
    patch: &Map<String, Value>,
) -> anyhow::Result<Option<Value>> {
    let current: Option<String> = conn
        .query_row(
            "SELECT data FROM records WHERE entity = ? AND id = ?",
            (entity.as_str(), id),
            |r| r.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Ok(None);
    };

    let mut body: Map<String, Value> = serde_json::from_str(&current)?;
    for (k, v) in patch {
        if v.is_null() {
            body.remove(k);
        } else {
            body.insert(k.clone(), v.clone());
        }
    }

    conn.execute(
        "UPDATE records SET data = ?, updated_at = ? WHERE entity = ? AND id = ?",
        (serde_json::to_string(&body)?, now_rfc3339(), entity.as_str(), id),
    )?;
    records_get(conn, entity, id)
}

pub fn records_delete(conn: &Connection, entity: EntityKind, id: &str) -> anyhow::Result<bool> {
    let n = conn.execute(
        "DELETE FROM records WHERE entity = ? AND id = ?",
        (entity.as_str(), id),
    )?;
    Ok(n > 0)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    raw.map(|s| serde_json::from_str(&s).map_err(anyhow::Error::from))
        .transpose()
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_conn() -> Connection {
        let dir = std::env::temp_dir().join(format!("schoold-db-{}", Uuid::new_v4()));
        open_db(&dir).expect("open db")
    }

    #[test]
    fn insert_update_delete_cycle() {
        let conn = temp_conn();
        let body = json!({ "title": "Sports day", "body": "Friday", "audience": "all" });
        let body = body.as_object().expect("obj");
        let created = records_insert(&conn, EntityKind::Announcement, body).expect("insert");
        let id = created["id"].as_str().expect("id").to_string();
        assert_eq!(created["title"], "Sports day");

        let patch = json!({ "body": "Saturday", "audience": null });
        let patch = patch.as_object().expect("obj");
        let updated = records_update(&conn, EntityKind::Announcement, &id, patch)
            .expect("update")
            .expect("present");
        assert_eq!(updated["body"], "Saturday");
        assert!(updated.get("audience").is_none());
        assert_eq!(updated["createdAt"], created["createdAt"]);

        // Entity scopes the id.
        assert!(records_get(&conn, EntityKind::Exam, &id).expect("get").is_none());
        assert_eq!(records_list(&conn, EntityKind::Announcement).expect("list").len(), 1);

        assert!(records_delete(&conn, EntityKind::Announcement, &id).expect("delete"));
        assert!(!records_delete(&conn, EntityKind::Announcement, &id).expect("delete"));
        assert!(records_list(&conn, EntityKind::Announcement).expect("list").is_empty());
    }

    #[test]
    fn settings_round_trip() {
        let conn = temp_conn();
        assert!(settings_get_json(&conn, "ui.pageSize").expect("get").is_none());
        settings_set_json(&conn, "ui.pageSize", &json!(25)).expect("set");
        settings_set_json(&conn, "ui.pageSize", &json!(50)).expect("set");
        assert_eq!(settings_get_json(&conn, "ui.pageSize").expect("get"), Some(json!(50)));
    }
}
