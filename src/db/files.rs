//! 주 문서 / 미디어 파일 테이블 쿼리
//!
//! 경로는 저장소 루트 기준 상대 경로 문자열로 저장됩니다.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::RegistryError;

/// 계약의 주 문서 경로
pub fn primary(conn: &Connection, contract_id: i64) -> Result<Option<String>, RegistryError> {
    Ok(conn
        .query_row(
            "SELECT filename FROM files WHERE contract_id = ?1 ORDER BY id DESC LIMIT 1",
            [contract_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten())
}

/// 주 문서 매핑 교체 (계약당 1행 유지)
pub fn set_primary(conn: &Connection, contract_id: i64, stored: &str) -> Result<(), RegistryError> {
    conn.execute("DELETE FROM files WHERE contract_id = ?1", [contract_id])?;
    conn.execute(
        "INSERT INTO files (contract_id, filename) VALUES (?1, ?2)",
        params![contract_id, stored],
    )?;
    Ok(())
}

pub fn delete_primary(conn: &Connection, contract_id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute("DELETE FROM files WHERE contract_id = ?1", [contract_id])?)
}

pub fn media(conn: &Connection, contract_id: i64) -> Result<Vec<String>, RegistryError> {
    let mut stmt = conn.prepare(
        "SELECT stored_path FROM contract_muszaki_files WHERE contract_id = ?1 ORDER BY rowid",
    )?;
    let iter = stmt.query_map([contract_id], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for path in iter {
        out.push(path?);
    }
    Ok(out)
}

pub fn insert_media(conn: &Connection, contract_id: i64, stored: &str) -> Result<(), RegistryError> {
    conn.execute(
        "INSERT OR IGNORE INTO contract_muszaki_files (contract_id, stored_path) VALUES (?1, ?2)",
        params![contract_id, stored],
    )?;
    Ok(())
}

pub fn delete_media(conn: &Connection, contract_id: i64, stored: &str) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "DELETE FROM contract_muszaki_files WHERE contract_id = ?1 AND stored_path = ?2",
        params![contract_id, stored],
    )?)
}

pub fn delete_all_media(conn: &Connection, contract_id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "DELETE FROM contract_muszaki_files WHERE contract_id = ?1",
        [contract_id],
    )?)
}
