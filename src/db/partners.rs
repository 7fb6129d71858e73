//! 상대방/연락처 테이블 쿼리

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{integrity_or_db, RegistryError};
use crate::models::{Contact, ContactKind, Partner};

pub fn list(conn: &Connection) -> Result<Vec<Partner>, RegistryError> {
    let mut stmt = conn.prepare("SELECT id, name FROM partners ORDER BY name, id")?;
    let iter = stmt.query_map([], |row| {
        Ok(Partner {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    })?;
    let mut out = Vec::new();
    for partner in iter {
        out.push(partner?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Partner>, RegistryError> {
    Ok(conn
        .query_row("SELECT id, name FROM partners WHERE id = ?1", [id], |row| {
            Ok(Partner {
                id: row.get(0)?,
                name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })
        .optional()?)
}

pub fn insert(conn: &Connection, name: &str) -> Result<i64, RegistryError> {
    conn.execute("INSERT INTO partners (name) VALUES (?1)", [name])
        .map_err(|e| integrity_or_db(e, "Partner"))?;
    Ok(conn.last_insert_rowid())
}

pub fn rename(conn: &Connection, id: i64, name: &str) -> Result<usize, RegistryError> {
    conn.execute("UPDATE partners SET name = ?1 WHERE id = ?2", params![name, id])
        .map_err(|e| integrity_or_db(e, "Partner"))
}

pub fn delete(conn: &Connection, id: i64) -> Result<usize, RegistryError> {
    conn.execute("DELETE FROM partner_contacts WHERE partner_id = ?1", [id])?;
    Ok(conn.execute("DELETE FROM partners WHERE id = ?1", [id])?)
}

pub fn contract_count(conn: &Connection, id: i64) -> Result<i64, RegistryError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM contracts WHERE partner_id = ?1",
        [id],
        |row| row.get(0),
    )?)
}

pub fn contacts(conn: &Connection, partner_id: i64) -> Result<Vec<Contact>, RegistryError> {
    let mut stmt = conn.prepare(
        "SELECT id, partner_id, contact_type, label, value
         FROM partner_contacts WHERE partner_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([partner_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, partner_id, kind, label, value) = row?;
        // 알 수 없는 종류는 목록에서 제외
        let Ok(kind) = kind.parse::<ContactKind>() else {
            tracing::warn!(contact_id = id, kind = %kind, "skipping contact with unknown type");
            continue;
        };
        out.push(Contact { id, partner_id, kind, label, value });
    }
    Ok(out)
}

pub fn insert_contact(
    conn: &Connection,
    partner_id: i64,
    kind: ContactKind,
    label: Option<&str>,
    value: &str,
) -> Result<i64, RegistryError> {
    conn.execute(
        "INSERT INTO partner_contacts (partner_id, contact_type, label, value) VALUES (?1, ?2, ?3, ?4)",
        params![partner_id, kind.as_str(), label, value],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_contact(conn: &Connection, contact_id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute("DELETE FROM partner_contacts WHERE id = ?1", [contact_id])?)
}
