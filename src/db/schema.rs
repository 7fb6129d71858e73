//! Database Schema
//!
//! SQLite 스키마와 버전 관리 마이그레이션 목록
//!
//! `PRAGMA user_version` 을 스키마 버전으로 사용합니다. 예전 데이터베이스(버전 0)에도
//! 모든 단계가 안전하게 적용되도록, 각 단계는 테이블/컬럼 존재 여부를 먼저 확인합니다.

use std::path::Path;

use rusqlite::Connection;

use crate::error::RegistryError;

/// 기본 테이블 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 계약 상대방
CREATE TABLE IF NOT EXISTS partners (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE
);

-- 상대방 연락처 (phone / email)
CREATE TABLE IF NOT EXISTS partner_contacts (
    id INTEGER PRIMARY KEY,
    partner_id INTEGER NOT NULL,
    contact_type TEXT NOT NULL,
    label TEXT,
    value TEXT NOT NULL
);

-- 카테고리 (parent_id 로 4단계 계층)
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT,
    parent_id INTEGER
);

-- 계약 (parent_id 가 있으면 변경계약)
CREATE TABLE IF NOT EXISTS contracts (
    id INTEGER PRIMARY KEY,
    partner_id INTEGER,
    category_id INTEGER,
    contract_number TEXT,
    contract_date TEXT,
    expiry_date TEXT,
    indefinite INTEGER,
    parent_id INTEGER,
    is_mod INTEGER,
    nickname TEXT
);

-- 주 문서 (계약당 1행)
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    contract_id INTEGER,
    filename TEXT
);

-- 메모 (추가 전용)
CREATE TABLE IF NOT EXISTS contract_notes (
    id INTEGER PRIMARY KEY,
    contract_id INTEGER NOT NULL,
    note_text TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- 계약별 활성 모듈
CREATE TABLE IF NOT EXISTS contract_modules (
    contract_id INTEGER NOT NULL,
    module_name TEXT NOT NULL,
    PRIMARY KEY (contract_id, module_name)
);

-- 모듈별 자유 텍스트
CREATE TABLE IF NOT EXISTS contract_module_data (
    contract_id INTEGER NOT NULL,
    module_name TEXT NOT NULL,
    data_text TEXT,
    PRIMARY KEY (contract_id, module_name)
);

-- 미디어 모듈 파일
CREATE TABLE IF NOT EXISTS contract_muszaki_files (
    contract_id INTEGER NOT NULL,
    stored_path TEXT NOT NULL,
    PRIMARY KEY (contract_id, stored_path)
);
"#;

/// 계약 테이블에 나중에 추가된 컬럼들
const CONTRACT_COLUMNS: &[(&str, &str)] = &[
    ("parent_id", "INTEGER"),
    ("is_mod", "INTEGER"),
    ("nickname", "TEXT"),
    ("created_at", "TEXT"),
    ("updated_at", "TEXT"),
    ("requires_deposit", "INTEGER DEFAULT 0"),
    ("deposit_required", "REAL"),
    ("deposit_amount", "REAL"),
    ("monthly_fee", "REAL"),
    ("monthly_fee_indexed_year", "INTEGER"),
    ("deposit_status", "TEXT"),
    ("finance_locked", "INTEGER DEFAULT 0"),
];

const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_contracts_parent ON contracts(parent_id);
CREATE INDEX IF NOT EXISTS idx_contracts_partner ON contracts(partner_id);
CREATE INDEX IF NOT EXISTS idx_contracts_category ON contracts(category_id);
CREATE INDEX IF NOT EXISTS idx_files_contract ON files(contract_id);
CREATE INDEX IF NOT EXISTS idx_notes_contract ON contract_notes(contract_id);
CREATE INDEX IF NOT EXISTS idx_contacts_partner ON partner_contacts(partner_id);
CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);
"#;

type MigrationFn = fn(&Connection, &Path) -> Result<(), RegistryError>;

/// 마이그레이션 단계
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    apply: MigrationFn,
}

/// 순서대로 적용되는 마이그레이션 목록
pub const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "base_tables", apply: create_base_tables },
    Migration { version: 2, name: "contract_columns", apply: add_contract_columns },
    Migration { version: 3, name: "category_hierarchy", apply: restructure_categories },
    Migration { version: 4, name: "note_author", apply: add_note_author },
    Migration { version: 5, name: "legacy_values", apply: migrate_legacy_values },
    Migration { version: 6, name: "indexes", apply: create_indexes },
];

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

pub fn schema_version(conn: &Connection) -> Result<i64, RegistryError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// 아직 적용되지 않은 단계를 적용하고 최종 버전을 반환
pub fn migrate(conn: &Connection, db_path: &Path) -> Result<i64, RegistryError> {
    let start = schema_version(conn)?;
    let mut version = start;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        tracing::debug!(version = migration.version, name = migration.name, "applying migration");
        (migration.apply)(conn, db_path)?;
        conn.pragma_update(None, "user_version", migration.version)?;
        version = migration.version;
    }
    Ok(version)
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, RegistryError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

pub fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, RegistryError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn create_base_tables(conn: &Connection, _db_path: &Path) -> Result<(), RegistryError> {
    conn.execute_batch(CREATE_SCHEMA)?;
    Ok(())
}

fn add_contract_columns(conn: &Connection, _db_path: &Path) -> Result<(), RegistryError> {
    for (column, decl) in CONTRACT_COLUMNS {
        if !column_exists(conn, "contracts", column)? {
            conn.execute_batch(&format!("ALTER TABLE contracts ADD COLUMN {} {}", column, decl))?;
        }
    }
    // 예전 잠금 컬럼 값 이전
    if column_exists(conn, "contracts", "penzügyi_locked")? {
        conn.execute_batch(
            "UPDATE contracts SET finance_locked = COALESCE(\"penzügyi_locked\", 0)
             WHERE COALESCE(finance_locked, 0) = 0",
        )?;
    }
    Ok(())
}

/// 유일한 파괴적 단계: parent_id 없는 예전 categories 테이블 재구성 (UNIQUE 제거).
/// 실행 전 DB 백업을 남긴다.
fn restructure_categories(conn: &Connection, db_path: &Path) -> Result<(), RegistryError> {
    if column_exists(conn, "categories", "parent_id")? {
        return Ok(());
    }

    let backup_path = db_path.with_extension("before-categories.db");
    super::backup_to(conn, &backup_path)?;
    tracing::info!(backup = %backup_path.display(), "restructuring categories table");

    conn.execute_batch(
        "BEGIN;
         CREATE TABLE categories_new (id INTEGER PRIMARY KEY, name TEXT, parent_id INTEGER);
         INSERT INTO categories_new (id, name, parent_id) SELECT id, name, NULL FROM categories;
         DROP TABLE categories;
         ALTER TABLE categories_new RENAME TO categories;
         COMMIT;",
    )?;
    Ok(())
}

fn add_note_author(conn: &Connection, _db_path: &Path) -> Result<(), RegistryError> {
    if !column_exists(conn, "contract_notes", "created_by")? {
        conn.execute_batch("ALTER TABLE contract_notes ADD COLUMN created_by TEXT")?;
    }
    Ok(())
}

/// 예전 모듈 이름/상태 값 변환 + 재무 데이터가 있는 계약에 재무 모듈 부여
fn migrate_legacy_values(conn: &Connection, _db_path: &Path) -> Result<(), RegistryError> {
    conn.execute_batch(
        "BEGIN;
         UPDATE OR IGNORE contract_modules SET module_name = 'financial' WHERE module_name = 'penzügyi';
         UPDATE OR IGNORE contract_modules SET module_name = 'media' WHERE module_name = 'muszaki';
         DELETE FROM contract_modules WHERE module_name IN ('penzügyi', 'muszaki');
         UPDATE OR IGNORE contract_module_data SET module_name = 'financial' WHERE module_name = 'penzügyi';
         UPDATE OR IGNORE contract_module_data SET module_name = 'media' WHERE module_name = 'muszaki';
         DELETE FROM contract_module_data WHERE module_name IN ('penzügyi', 'muszaki');
         UPDATE contracts SET deposit_status = 'settled' WHERE deposit_status = 'rendezett';
         UPDATE contracts SET deposit_status = 'outstanding' WHERE deposit_status = 'hatralek';
         INSERT OR IGNORE INTO contract_modules (contract_id, module_name)
             SELECT id, 'financial' FROM contracts
             WHERE requires_deposit = 1 OR monthly_fee IS NOT NULL
                OR deposit_required IS NOT NULL OR deposit_amount IS NOT NULL;
         COMMIT;",
    )?;
    Ok(())
}

fn create_indexes(conn: &Connection, _db_path: &Path) -> Result<(), RegistryError> {
    conn.execute_batch(CREATE_INDEXES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.db");
        let conn = Connection::open(&path).unwrap();

        assert_eq!(migrate(&conn, &path).unwrap(), latest_version());
        assert!(column_exists(&conn, "contracts", "finance_locked").unwrap());
        assert!(column_exists(&conn, "contract_notes", "created_by").unwrap());
        assert!(table_exists(&conn, "contract_muszaki_files").unwrap());

        // 두 번째 실행은 아무것도 하지 않음
        assert_eq!(migrate(&conn, &path).unwrap(), latest_version());
    }

    #[test]
    fn test_partially_migrated_database_resumes_from_stored_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        assert_eq!(migrate(&conn, &path).unwrap(), latest_version());
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert!(column_exists(&conn, "contracts", "monthly_fee").unwrap());
        assert!(!path.with_extension("before-categories.db").exists());
    }

    #[test]
    fn test_legacy_database_is_upgraded_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE partners(id INTEGER PRIMARY KEY, name TEXT UNIQUE);
             CREATE TABLE categories(id INTEGER PRIMARY KEY, name TEXT UNIQUE);
             CREATE TABLE contracts(id INTEGER PRIMARY KEY, partner_id INTEGER, category_id INTEGER,
                 contract_number TEXT, contract_date TEXT, expiry_date TEXT, indefinite INTEGER,
                 monthly_fee REAL, deposit_status TEXT, \"penzügyi_locked\" INTEGER DEFAULT 0);
             CREATE TABLE contract_modules(contract_id INTEGER NOT NULL, module_name TEXT NOT NULL,
                 PRIMARY KEY(contract_id, module_name));
             INSERT INTO categories(id, name) VALUES (1, 'Transport');
             INSERT INTO contracts(id, partner_id, category_id, contract_number, contract_date,
                 indefinite, monthly_fee, deposit_status, \"penzügyi_locked\")
                 VALUES (1, 1, 1, 'SZ-1', '2020-01-01', 1, 1000, 'rendezett', 1);
             INSERT INTO contract_modules VALUES (1, 'muszaki');",
        )
        .unwrap();

        migrate(&conn, &path).unwrap();

        let parent: Option<i64> = conn
            .query_row("SELECT parent_id FROM categories WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(parent, None);
        assert!(path.with_extension("before-categories.db").exists());

        let (status, locked): (String, i64) = conn
            .query_row("SELECT deposit_status, finance_locked FROM contracts WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "settled");
        assert_eq!(locked, 1);

        let mut stmt = conn
            .prepare("SELECT module_name FROM contract_modules WHERE contract_id = 1 ORDER BY module_name")
            .unwrap();
        let modules: Vec<String> = stmt
            .query_map([], |r| r.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(modules, vec!["financial".to_string(), "media".to_string()]);
    }
}
