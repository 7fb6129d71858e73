//! Database Module
//!
//! SQLite 데이터베이스 관리
//!
//! 작업 단위마다 연결을 열고 닫습니다 (상시 트랜잭션 없음).
//! 테이블별 쿼리는 하위 모듈의 `&Connection` 함수로 제공되어 트랜잭션 안에서도 그대로 쓰입니다.

pub mod categories;
pub mod contracts;
pub mod files;
pub mod modules;
pub mod notes;
pub mod partners;
mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::error::RegistryError;

pub use schema::{column_exists, latest_version, schema_version, table_exists};

/// 데이터베이스 파일 핸들
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 작업 단위용 새 연결
    pub fn connect(&self) -> Result<Connection, RegistryError> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// 스키마 마이그레이션 적용 후 최종 버전 반환
    pub fn initialize(&self) -> Result<i64, RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = self.connect()?;
        let version = schema::migrate(&conn, &self.path)?;
        tracing::info!(db = %self.path.display(), version, "database ready");
        Ok(version)
    }

    /// 현재 DB 를 파일로 백업
    pub fn backup(&self, out_path: &Path) -> Result<(), RegistryError> {
        let conn = self.connect()?;
        backup_to(&conn, out_path)
    }
}

/// 열린 연결의 내용을 out_path 로 복제
pub(crate) fn backup_to(conn: &Connection, out_path: &Path) -> Result<(), RegistryError> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut out_conn = Connection::open(out_path)?;
    let backup = Backup::new(conn, &mut out_conn)?;
    backup.run_to_completion(5, Duration::from_millis(10), None)?;
    Ok(())
}

/// REAL/INTEGER 금액 컬럼 읽기 (소수점 버림)
pub(crate) fn amount_from_sql(value: Option<f64>) -> Option<i64> {
    value.filter(|v| v.is_finite()).map(|v| v.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_and_backup() {
        let dir = tempdir().unwrap();
        let db = Database::new(&dir.path().join("nested").join("database.db"));
        assert_eq!(db.initialize().unwrap(), latest_version());

        let conn = db.connect().unwrap();
        conn.execute("INSERT INTO partners(name) VALUES ('Acme')", []).unwrap();

        let out = dir.path().join("backup").join("copy.db");
        db.backup(&out).unwrap();
        let copy = Connection::open(&out).unwrap();
        let n: i64 = copy.query_row("SELECT COUNT(*) FROM partners", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_amount_from_sql() {
        assert_eq!(amount_from_sql(Some(1500.7)), Some(1500));
        assert_eq!(amount_from_sql(None), None);
    }
}
