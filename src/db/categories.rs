//! 카테고리 테이블 쿼리

use rusqlite::{params, Connection};

use crate::error::RegistryError;
use crate::models::Category;

pub fn list(conn: &Connection) -> Result<Vec<Category>, RegistryError> {
    let mut stmt = conn.prepare("SELECT id, name, parent_id FROM categories ORDER BY name, id")?;
    let iter = stmt.query_map([], |row| {
        Ok(Category {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            parent_id: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for category in iter {
        out.push(category?);
    }
    Ok(out)
}

pub fn insert(conn: &Connection, name: &str, parent_id: Option<i64>) -> Result<i64, RegistryError> {
    conn.execute(
        "INSERT INTO categories (name, parent_id) VALUES (?1, ?2)",
        params![name, parent_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn rename(conn: &Connection, id: i64, name: &str) -> Result<usize, RegistryError> {
    Ok(conn.execute("UPDATE categories SET name = ?1 WHERE id = ?2", params![name, id])?)
}

pub fn delete(conn: &Connection, id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute("DELETE FROM categories WHERE id = ?1", [id])?)
}

/// 해당 카테고리를 직접 참조하는 계약 수
pub fn contract_count(conn: &Connection, id: i64) -> Result<i64, RegistryError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM contracts WHERE category_id = ?1",
        [id],
        |row| row.get(0),
    )?)
}

pub fn exists(conn: &Connection, id: i64) -> Result<bool, RegistryError> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM categories WHERE id = ?1", [id], |row| row.get(0))?;
    Ok(n > 0)
}
