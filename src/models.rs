//! Registry Data Models
//!
//! 저장소(SQLite) 행과 매핑되는 도메인 데이터 모델

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// 계약 상대방 (Partner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: i64,
    pub name: String,
}

/// 연락처 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Phone,
    Email,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactKind::Phone => "phone",
            ContactKind::Email => "email",
        }
    }
}

impl FromStr for ContactKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "phone" => Ok(ContactKind::Phone),
            "email" => Ok(ContactKind::Email),
            other => Err(RegistryError::validation(format!("Unknown contact type: {}", other))),
        }
    }
}

/// 상대방 연락처 (전화/이메일)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub partner_id: i64,
    pub kind: ContactKind,
    pub label: Option<String>,
    pub value: String,
}

/// 카테고리 노드 (최대 4단계 트리)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// 계약 기간: 만료일 또는 무기한 중 정확히 하나
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "date", rename_all = "camelCase")]
pub enum Term {
    Expires(NaiveDate),
    Indefinite,
}

impl Term {
    /// (expiry_date, indefinite) 컬럼 값
    pub fn to_columns(self) -> (Option<NaiveDate>, bool) {
        match self {
            Term::Expires(date) => (Some(date), false),
            Term::Indefinite => (None, true),
        }
    }
}

/// 정산 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettlementStatus {
    #[default]
    Unset,
    Outstanding,
    Settled,
}

impl SettlementStatus {
    pub fn as_db(&self) -> Option<&'static str> {
        match self {
            SettlementStatus::Unset => None,
            SettlementStatus::Outstanding => Some("outstanding"),
            SettlementStatus::Settled => Some("settled"),
        }
    }

    /// 예전 값(rendezett/hatralek)도 허용
    pub fn from_db(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("settled") | Some("rendezett") => SettlementStatus::Settled,
            Some("outstanding") | Some("hatralek") => SettlementStatus::Outstanding,
            _ => SettlementStatus::Unset,
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SettlementStatus::Unset => "Not set",
            SettlementStatus::Outstanding => "Outstanding",
            SettlementStatus::Settled => "Settled",
        };
        f.write_str(text)
    }
}

/// 계약에 붙일 수 있는 선택 모듈
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleName {
    Financial,
    Media,
}

impl ModuleName {
    pub const ALL: [ModuleName; 2] = [ModuleName::Financial, ModuleName::Media];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::Financial => "financial",
            ModuleName::Media => "media",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModuleName::Financial => "Financial data",
            ModuleName::Media => "Media",
        }
    }
}

impl FromStr for ModuleName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "financial" | "penzügyi" => Ok(ModuleName::Financial),
            "media" | "muszaki" => Ok(ModuleName::Media),
            other => Err(RegistryError::validation(format!("Unknown module: {}", other))),
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 재무 하위 기록 (계약 행의 컬럼으로 저장)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecord {
    pub monthly_fee: Option<i64>,
    pub monthly_fee_indexed_year: Option<i32>,
    pub deposit_required_flag: bool,
    pub deposit_required: Option<i64>,
    pub deposit_paid: Option<i64>,
    /// 저장된 원본 상태 (읽을 때 settlement::effective_status 로 정규화)
    pub stored_status: SettlementStatus,
    pub locked: bool,
}

/// 계약 (원계약 또는 변경계약)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: i64,
    pub partner_id: Option<i64>,
    pub category_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub indefinite: bool,
    /// None 이면 원계약, Some 이면 해당 계약의 변경계약
    pub parent_id: Option<i64>,
    pub nickname: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub financial: FinancialRecord,
}

impl Contract {
    pub fn is_amendment(&self) -> bool {
        self.parent_id.is_some()
    }

    /// 체인의 원계약 id
    pub fn root_id(&self) -> i64 {
        self.parent_id.unwrap_or(self.id)
    }

    pub fn term(&self) -> Option<Term> {
        if self.indefinite {
            Some(Term::Indefinite)
        } else {
            self.expiry_date.map(Term::Expires)
        }
    }
}

/// 계약 메모 (추가 전용)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub contract_id: i64,
    pub body: String,
    pub created_at: String,
    pub created_by: String,
}

impl Note {
    /// 본문이 마크업(HTML)인지 여부
    pub fn is_markup(&self) -> bool {
        self.body.trim_start().starts_with('<')
    }
}

/// 원계약 생성 입력
#[derive(Debug, Clone)]
pub struct NewRootContract {
    pub partner_id: Option<i64>,
    pub category_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: NaiveDate,
    pub term: Term,
    pub nickname: Option<String>,
    pub primary_file: PathBuf,
}

/// 변경계약 생성 입력 (상대방/카테고리는 원계약에서 상속)
#[derive(Debug, Clone)]
pub struct NewAmendment {
    pub parent_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: NaiveDate,
    pub term: Term,
    pub nickname: Option<String>,
    pub primary_file: PathBuf,
}

/// head 기본 데이터 수정 입력
#[derive(Debug, Clone)]
pub struct HeadFields {
    pub partner_id: Option<i64>,
    pub category_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: NaiveDate,
    pub term: Term,
    pub nickname: Option<String>,
}

/// 재무 필드 입력
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialInput {
    pub monthly_fee: Option<i64>,
    pub indexed_this_year: bool,
    pub deposit_flag: bool,
    pub deposit_required: Option<i64>,
    pub deposit_paid: Option<i64>,
    pub status: SettlementStatus,
}

/// 닉네임 최대 길이 (문자 수)
pub const NICKNAME_MAX_CHARS: usize = 20;

/// 공백 제거 후 빈 값이면 None
pub fn normalize_nickname(nickname: Option<&str>) -> Result<Option<String>, RegistryError> {
    let Some(value) = nickname.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > NICKNAME_MAX_CHARS {
        return Err(RegistryError::validation(format!(
            "Nickname must be at most {} characters",
            NICKNAME_MAX_CHARS
        )));
    }
    Ok(Some(value.to_string()))
}
