//! 계약 테이블 쿼리

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::amount_from_sql;
use crate::error::RegistryError;
use crate::models::{Contract, FinancialRecord, SettlementStatus, Term};

const CONTRACT_COLUMNS: &str = "c.id, c.partner_id, c.category_id, c.contract_number, c.contract_date,
    c.expiry_date, c.indefinite, c.parent_id, c.nickname, c.created_at, c.updated_at,
    c.monthly_fee, c.monthly_fee_indexed_year, c.requires_deposit, c.deposit_required,
    c.deposit_amount, c.deposit_status, c.finance_locked";

/// 저장된 날짜 텍스트 파싱 (형식이 맞지 않는 예전 값은 None)
fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

fn map_contract(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        partner_id: row.get(1)?,
        category_id: row.get(2)?,
        contract_number: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        contract_date: parse_date(row.get(4)?),
        expiry_date: parse_date(row.get(5)?),
        indefinite: row.get::<_, Option<i64>>(6)?.unwrap_or(0) != 0,
        parent_id: row.get(7)?,
        nickname: row.get::<_, Option<String>>(8)?.filter(|n| !n.trim().is_empty()),
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        financial: FinancialRecord {
            monthly_fee: amount_from_sql(row.get(11)?),
            monthly_fee_indexed_year: row.get(12)?,
            deposit_required_flag: row.get::<_, Option<i64>>(13)?.unwrap_or(0) != 0,
            deposit_required: amount_from_sql(row.get(14)?),
            deposit_paid: amount_from_sql(row.get(15)?),
            stored_status: SettlementStatus::from_db(row.get::<_, Option<String>>(16)?.as_deref()),
            locked: row.get::<_, Option<i64>>(17)?.unwrap_or(0) != 0,
        },
    })
}

/// 계약 + 상대방 이름 (상대방이 사라진 경우 빈 문자열)
fn map_with_partner(row: &Row<'_>) -> rusqlite::Result<(Contract, String)> {
    let contract = map_contract(row)?;
    let partner_name = row.get::<_, Option<String>>(18)?.unwrap_or_default();
    Ok((contract, partner_name))
}

fn collect<T>(
    iter: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, RegistryError> {
    let mut out = Vec::new();
    for item in iter {
        out.push(item?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Contract>, RegistryError> {
    let sql = format!("SELECT {} FROM contracts c WHERE c.id = ?1", CONTRACT_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_contract).optional()?)
}

/// 원계약 목록: 상대방 이름, 체결일 내림차순, id 내림차순
pub fn roots(conn: &Connection) -> Result<Vec<(Contract, String)>, RegistryError> {
    let sql = format!(
        "SELECT {}, p.name FROM contracts c
         LEFT JOIN partners p ON p.id = c.partner_id
         WHERE c.parent_id IS NULL
         ORDER BY p.name, c.contract_date DESC, c.id DESC",
        CONTRACT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let iter = stmt.query_map([], map_with_partner)?;
    collect(iter)
}

/// 원계약의 변경계약 체인: 체결일 오름차순, id 오름차순
pub fn amendments(conn: &Connection, parent_id: i64) -> Result<Vec<Contract>, RegistryError> {
    let sql = format!(
        "SELECT {} FROM contracts c WHERE c.parent_id = ?1 ORDER BY c.contract_date ASC, c.id ASC",
        CONTRACT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let iter = stmt.query_map([parent_id], map_contract)?;
    collect(iter)
}

/// 재무 모듈이 켜진 모든 계약 (원계약 + 변경계약)
pub fn with_financial_module(conn: &Connection) -> Result<Vec<(Contract, String)>, RegistryError> {
    let sql = format!(
        "SELECT {}, p.name FROM contracts c
         LEFT JOIN partners p ON p.id = c.partner_id
         WHERE EXISTS (
             SELECT 1 FROM contract_modules m
             WHERE m.contract_id = c.id AND m.module_name = 'financial'
         )
         ORDER BY p.name, c.contract_number, c.id",
        CONTRACT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let iter = stmt.query_map([], map_with_partner)?;
    collect(iter)
}

/// 새 계약 행
pub struct ContractInsert<'a> {
    pub partner_id: i64,
    pub category_id: Option<i64>,
    pub contract_number: &'a str,
    pub contract_date: NaiveDate,
    pub term: Term,
    pub parent_id: Option<i64>,
    pub nickname: Option<&'a str>,
    pub now: &'a str,
}

pub fn insert(conn: &Connection, new: &ContractInsert<'_>) -> Result<i64, RegistryError> {
    let (expiry_date, indefinite) = new.term.to_columns();
    conn.execute(
        "INSERT INTO contracts (
             partner_id, category_id, contract_number, contract_date, expiry_date, indefinite,
             parent_id, is_mod, nickname, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            new.partner_id,
            new.category_id,
            new.contract_number,
            new.contract_date,
            expiry_date,
            indefinite as i64,
            new.parent_id,
            new.parent_id.is_some() as i64,
            new.nickname,
            new.now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 기본 데이터 수정
pub struct BaseUpdate<'a> {
    pub partner_id: i64,
    pub category_id: i64,
    pub contract_number: &'a str,
    pub contract_date: NaiveDate,
    pub term: Term,
    pub nickname: Option<&'a str>,
    pub now: &'a str,
}

pub fn update_base(conn: &Connection, id: i64, update: &BaseUpdate<'_>) -> Result<usize, RegistryError> {
    let (expiry_date, indefinite) = update.term.to_columns();
    Ok(conn.execute(
        "UPDATE contracts SET partner_id = ?1, category_id = ?2, contract_number = ?3,
             contract_date = ?4, expiry_date = ?5, indefinite = ?6, nickname = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            update.partner_id,
            update.category_id,
            update.contract_number,
            update.contract_date,
            expiry_date,
            indefinite as i64,
            update.nickname,
            update.now,
            id,
        ],
    )?)
}

pub fn update_financial(
    conn: &Connection,
    id: i64,
    record: &FinancialRecord,
    now: &str,
) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "UPDATE contracts SET requires_deposit = ?1, deposit_required = ?2, deposit_amount = ?3,
             monthly_fee = ?4, monthly_fee_indexed_year = ?5, deposit_status = ?6,
             finance_locked = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            record.deposit_required_flag as i64,
            record.deposit_required,
            record.deposit_paid,
            record.monthly_fee,
            record.monthly_fee_indexed_year,
            record.stored_status.as_db(),
            record.locked as i64,
            now,
            id,
        ],
    )?)
}

pub fn set_finance_locked(conn: &Connection, id: i64, locked: bool) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "UPDATE contracts SET finance_locked = ?1 WHERE id = ?2",
        params![locked as i64, id],
    )?)
}

/// 재무 필드 전체 초기화 (잠금 해제 포함)
pub fn clear_financial(conn: &Connection, id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "UPDATE contracts SET requires_deposit = 0, deposit_required = NULL, deposit_amount = NULL,
             monthly_fee = NULL, monthly_fee_indexed_year = NULL, deposit_status = NULL,
             finance_locked = 0
         WHERE id = ?1",
        [id],
    )?)
}

pub fn touch(conn: &Connection, id: i64, now: &str) -> Result<usize, RegistryError> {
    Ok(conn.execute(
        "UPDATE contracts SET updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?)
}

pub fn delete(conn: &Connection, id: i64) -> Result<usize, RegistryError> {
    Ok(conn.execute("DELETE FROM contracts WHERE id = ?1", [id])?)
}
