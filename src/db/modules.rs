//! 계약 모듈 / 모듈 데이터 테이블 쿼리

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::RegistryError;
use crate::models::ModuleName;

/// 활성 모듈 목록 (알 수 없는 이름은 무시)
pub fn enabled(conn: &Connection, contract_id: i64) -> Result<Vec<ModuleName>, RegistryError> {
    let mut stmt = conn.prepare(
        "SELECT module_name FROM contract_modules WHERE contract_id = ?1 ORDER BY module_name",
    )?;
    let iter = stmt.query_map([contract_id], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for name in iter {
        let name = name?;
        match name.parse::<ModuleName>() {
            Ok(module) if !out.contains(&module) => out.push(module),
            Ok(_) => {}
            Err(_) => tracing::warn!(contract_id, module = %name, "ignoring unknown module"),
        }
    }
    out.sort();
    Ok(out)
}

pub fn is_enabled(conn: &Connection, contract_id: i64, module: ModuleName) -> Result<bool, RegistryError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contract_modules WHERE contract_id = ?1 AND module_name = ?2",
        params![contract_id, module.as_str()],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// 새로 추가되었으면 true
pub fn enable(conn: &Connection, contract_id: i64, module: ModuleName) -> Result<bool, RegistryError> {
    let added = conn.execute(
        "INSERT OR IGNORE INTO contract_modules (contract_id, module_name) VALUES (?1, ?2)",
        params![contract_id, module.as_str()],
    )?;
    Ok(added > 0)
}

pub fn disable(conn: &Connection, contract_id: i64, module: ModuleName) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "DELETE FROM contract_modules WHERE contract_id = ?1 AND module_name = ?2",
        params![contract_id, module.as_str()],
    )?)
}

pub fn delete_all(conn: &Connection, contract_id: i64) -> Result<(), RegistryError> {
    conn.execute("DELETE FROM contract_modules WHERE contract_id = ?1", [contract_id])?;
    conn.execute("DELETE FROM contract_module_data WHERE contract_id = ?1", [contract_id])?;
    Ok(())
}

pub fn data(conn: &Connection, contract_id: i64, module: ModuleName) -> Result<Option<String>, RegistryError> {
    Ok(conn
        .query_row(
            "SELECT data_text FROM contract_module_data WHERE contract_id = ?1 AND module_name = ?2",
            params![contract_id, module.as_str()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten())
}

pub fn set_data(
    conn: &Connection,
    contract_id: i64,
    module: ModuleName,
    text: &str,
) -> Result<(), RegistryError> {
    conn.execute(
        "INSERT INTO contract_module_data (contract_id, module_name, data_text) VALUES (?1, ?2, ?3)
         ON CONFLICT(contract_id, module_name) DO UPDATE SET data_text = excluded.data_text",
        params![contract_id, module.as_str(), text],
    )?;
    Ok(())
}

pub fn delete_data(conn: &Connection, contract_id: i64, module: ModuleName) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "DELETE FROM contract_module_data WHERE contract_id = ?1 AND module_name = ?2",
        params![contract_id, module.as_str()],
    )?)
}
