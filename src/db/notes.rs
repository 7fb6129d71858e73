//! 메모 테이블 쿼리

use rusqlite::{params, Connection};

use crate::error::RegistryError;
use crate::models::Note;

pub fn insert(
    conn: &Connection,
    contract_id: i64,
    body: &str,
    created_at: &str,
    created_by: &str,
) -> Result<i64, RegistryError> {
    conn.execute(
        "INSERT INTO contract_notes (contract_id, note_text, created_at, created_by)
         VALUES (?1, ?2, ?3, ?4)",
        params![contract_id, body, created_at, created_by],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 최신순
pub fn list(conn: &Connection, contract_id: i64) -> Result<Vec<Note>, RegistryError> {
    let mut stmt = conn.prepare(
        "SELECT id, contract_id, note_text, created_at, created_by
         FROM contract_notes WHERE contract_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let iter = stmt.query_map([contract_id], |row| {
        Ok(Note {
            id: row.get(0)?,
            contract_id: row.get(1)?,
            body: row.get(2)?,
            created_at: row.get(3)?,
            created_by: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    })?;
    let mut out = Vec::new();
    for note in iter {
        out.push(note?);
    }
    Ok(out)
}

pub fn delete_all(conn: &Connection, contract_id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute("DELETE FROM contract_notes WHERE contract_id = ?1", [contract_id])?)
}
