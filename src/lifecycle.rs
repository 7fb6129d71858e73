//! Contract Lifecycle
//!
//! 원계약-변경계약 체인의 잠금 상태와 표시 상태 계산 (순수 함수)
//!
//! 체인 규칙:
//! - 변경계약은 (contract_date, id) 오름차순으로 정렬되고, 최댓값이 최신 변경계약
//! - 편집 가능한 head 는 체인당 하나: 변경계약이 없으면 원계약, 있으면 최신 변경계약
//! - head 가 아닌 행은 첨부 열람을 제외하고 모두 읽기 전용

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{Contract, SettlementStatus};
use crate::settlement;

/// 표시 불가(이전 상태) 자리표시자
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LockReason {
    /// 원계약에 변경계약이 존재
    HasAmendments,
    /// 더 최신 변경계약이 존재
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub locked: bool,
    pub reason: Option<LockReason>,
}

impl LockState {
    pub const UNLOCKED: LockState = LockState { locked: false, reason: None };

    fn locked(reason: LockReason) -> Self {
        LockState { locked: true, reason: Some(reason) }
    }
}

fn chain_key(contract: &Contract) -> (Option<NaiveDate>, i64) {
    (contract.contract_date, contract.id)
}

/// 변경계약을 체인 순서로 정렬
pub fn sort_chain(amendments: &mut [Contract]) {
    amendments.sort_by_key(chain_key);
}

pub fn latest_amendment(amendments: &[Contract]) -> Option<&Contract> {
    amendments.iter().max_by_key(|c| chain_key(c))
}

/// 체인의 편집 가능한 head id
pub fn head_id(root: &Contract, amendments: &[Contract]) -> i64 {
    latest_amendment(amendments).map(|c| c.id).unwrap_or(root.id)
}

/// `amendments` 는 대상 계약이 속한 체인의 모든 변경계약 (parent_id == 원계약 id)
pub fn lock_state(contract: &Contract, amendments: &[Contract]) -> LockState {
    match contract.parent_id {
        None if amendments.is_empty() => LockState::UNLOCKED,
        None => LockState::locked(LockReason::HasAmendments),
        Some(_) => match latest_amendment(amendments) {
            Some(latest) if latest.id != contract.id => LockState::locked(LockReason::Superseded),
            _ => LockState::UNLOCKED,
        },
    }
}

/// 목록의 만료일 칸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ExpiryDisplay {
    Indefinite,
    Date(NaiveDate),
    Unspecified,
    Placeholder,
}

impl fmt::Display for ExpiryDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryDisplay::Indefinite => f.write_str("Indefinite"),
            ExpiryDisplay::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            ExpiryDisplay::Unspecified => f.write_str(""),
            ExpiryDisplay::Placeholder => f.write_str(PLACEHOLDER),
        }
    }
}

impl From<ExpiryDisplay> for String {
    fn from(value: ExpiryDisplay) -> Self {
        value.to_string()
    }
}

/// 목록의 정산 상태 칸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum StatusDisplay {
    Live(SettlementStatus),
    Placeholder,
}

impl fmt::Display for StatusDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusDisplay::Live(status) => write!(f, "{}", status),
            StatusDisplay::Placeholder => f.write_str(PLACEHOLDER),
        }
    }
}

impl From<StatusDisplay> for String {
    fn from(value: StatusDisplay) -> Self {
        value.to_string()
    }
}

/// 한 행의 파생 표시 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDisplay {
    pub expiry: ExpiryDisplay,
    pub status: StatusDisplay,
    /// 만료일이 올해인 경우 (강조 표시)
    pub expires_this_year: bool,
    pub lock: LockState,
    pub is_head: bool,
}

fn live_expiry(contract: &Contract) -> ExpiryDisplay {
    if contract.indefinite {
        ExpiryDisplay::Indefinite
    } else {
        contract
            .expiry_date
            .map(ExpiryDisplay::Date)
            .unwrap_or(ExpiryDisplay::Unspecified)
    }
}

/// 체인 내 행 하나의 표시 상태 계산.
/// 변경계약이 있으면 원계약과 이전 변경계약은 자리표시자로 접히고, 최신 변경계약만 실제 값을 보인다.
pub fn row_display(contract: &Contract, amendments: &[Contract], current_year: i32) -> RowDisplay {
    let lock = lock_state(contract, amendments);
    let live = !lock.locked;

    let (expiry, status) = if live {
        (
            live_expiry(contract),
            StatusDisplay::Live(settlement::effective_status(&contract.financial, current_year)),
        )
    } else {
        (ExpiryDisplay::Placeholder, StatusDisplay::Placeholder)
    };

    let expires_this_year = matches!(expiry, ExpiryDisplay::Date(d) if d.year() == current_year);

    RowDisplay {
        expiry,
        status,
        expires_this_year,
        lock,
        is_head: live,
    }
}

/// 변경계약 표시 이름: "1. amendment"
pub fn amendment_label(position: usize) -> String {
    format!("{}. amendment", position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FinancialRecord;

    fn contract(id: i64, parent_id: Option<i64>, date: (i32, u32, u32)) -> Contract {
        Contract {
            id,
            partner_id: Some(1),
            category_id: Some(1),
            contract_number: format!("SZ-{}", id),
            contract_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            expiry_date: None,
            indefinite: true,
            parent_id,
            nickname: None,
            created_at: None,
            updated_at: None,
            financial: FinancialRecord::default(),
        }
    }

    #[test]
    fn test_root_without_amendments_is_head() {
        let root = contract(1, None, (2024, 1, 1));
        assert_eq!(lock_state(&root, &[]), LockState::UNLOCKED);
        assert_eq!(head_id(&root, &[]), 1);
    }

    #[test]
    fn test_only_latest_amendment_is_editable() {
        let root = contract(1, None, (2024, 1, 1));
        let a1 = contract(2, Some(1), (2024, 3, 1));
        let a2 = contract(3, Some(1), (2024, 6, 1));
        let chain = vec![a2.clone(), a1.clone()];

        assert_eq!(
            lock_state(&root, &chain),
            LockState { locked: true, reason: Some(LockReason::HasAmendments) }
        );
        assert_eq!(
            lock_state(&a1, &chain),
            LockState { locked: true, reason: Some(LockReason::Superseded) }
        );
        assert_eq!(lock_state(&a2, &chain), LockState::UNLOCKED);
        assert_eq!(head_id(&root, &chain), 3);
    }

    #[test]
    fn test_same_date_ties_broken_by_id() {
        let a1 = contract(5, Some(1), (2024, 6, 1));
        let a2 = contract(4, Some(1), (2024, 6, 1));
        let mut chain = vec![a1.clone(), a2.clone()];
        assert_eq!(latest_amendment(&chain).map(|c| c.id), Some(5));

        sort_chain(&mut chain);
        assert_eq!(chain.iter().map(|c| c.id).collect::<Vec<_>>(), vec![4, 5]);
    }

    #[test]
    fn test_later_date_wins_over_higher_id() {
        let older_inserted_later = contract(9, Some(1), (2023, 1, 1));
        let newer = contract(2, Some(1), (2024, 1, 1));
        let chain = vec![older_inserted_later.clone(), newer];
        assert!(lock_state(&older_inserted_later, &chain).locked);
    }

    #[test]
    fn test_row_display_collapses_superseded_rows() {
        let mut root = contract(1, None, (2024, 1, 1));
        root.financial.stored_status = SettlementStatus::Outstanding;
        let mut latest = contract(2, Some(1), (2024, 6, 1));
        latest.indefinite = false;
        latest.expiry_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let chain = vec![latest.clone()];

        let root_view = row_display(&root, &chain, 2025);
        assert_eq!(root_view.expiry.to_string(), PLACEHOLDER);
        assert_eq!(root_view.status.to_string(), PLACEHOLDER);
        assert!(!root_view.is_head);

        let latest_view = row_display(&latest, &chain, 2025);
        assert_eq!(latest_view.expiry.to_string(), "2025-01-01");
        assert_eq!(latest_view.status.to_string(), "Not set");
        assert!(latest_view.expires_this_year);
        assert!(latest_view.is_head);
    }

    #[test]
    fn test_amendment_label() {
        assert_eq!(amendment_label(1), "1. amendment");
    }
}
