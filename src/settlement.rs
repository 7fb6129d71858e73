//! Settlement Rules
//!
//! 재무 하위 기록의 정산 가능 여부 판단 (순수 함수)
//!
//! - 월 사용료 조건: 사용료가 0 이하이거나, 올해 물가지수 반영이 되어 있어야 함
//! - 보증금 조건: 보증금 요구가 없거나, 요구액 > 0 이고 요구액 == 납부액
//! - 저장된 `settled` 가 조건을 만족하지 못하면 읽을 때 `Unset` 으로 정규화

use serde::Serialize;

use crate::models::{FinancialInput, FinancialRecord, SettlementStatus};

/// 물가지수 반영은 연도 단위: 저장된 연도가 올해일 때만 유효
pub fn indexed_this_year(indexed_year: Option<i32>, current_year: i32) -> bool {
    indexed_year == Some(current_year)
}

pub fn monthly_fee_condition(monthly_fee: Option<i64>, indexed_this_year: bool) -> bool {
    monthly_fee.unwrap_or(0) <= 0 || indexed_this_year
}

pub fn deposit_condition(deposit_flag: bool, required: Option<i64>, paid: Option<i64>) -> bool {
    if !deposit_flag {
        return true;
    }
    match (required, paid) {
        (Some(required), Some(paid)) => required > 0 && required == paid,
        _ => false,
    }
}

/// `Settled` 를 선택할 수 있는지
pub fn settled_allowed(record: &FinancialRecord, current_year: i32) -> bool {
    monthly_fee_condition(
        record.monthly_fee,
        indexed_this_year(record.monthly_fee_indexed_year, current_year),
    ) && deposit_condition(
        record.deposit_required_flag,
        record.deposit_required,
        record.deposit_paid,
    )
}

/// 읽기 시점 정규화된 상태
pub fn effective_status(record: &FinancialRecord, current_year: i32) -> SettlementStatus {
    match record.stored_status {
        SettlementStatus::Settled if !settled_allowed(record, current_year) => SettlementStatus::Unset,
        status => status,
    }
}

/// 입력값을 저장될 기록으로 변환 (보증금 금액은 플래그가 켜진 경우에만 보관)
pub fn record_from_input(input: &FinancialInput, current_year: i32, locked: bool) -> FinancialRecord {
    let (deposit_required, deposit_paid) = if input.deposit_flag {
        (input.deposit_required, input.deposit_paid)
    } else {
        (None, None)
    };
    FinancialRecord {
        monthly_fee: input.monthly_fee,
        monthly_fee_indexed_year: input.indexed_this_year.then_some(current_year),
        deposit_required_flag: input.deposit_flag,
        deposit_required,
        deposit_paid,
        stored_status: input.status,
        locked,
    }
}

/// 화면 표시용 재무 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialView {
    pub monthly_fee: Option<i64>,
    pub indexed_this_year: bool,
    pub indexed_year: Option<i32>,
    pub deposit_flag: bool,
    pub deposit_required: Option<i64>,
    pub deposit_paid: Option<i64>,
    pub status: SettlementStatus,
    pub settled_allowed: bool,
    /// 재무 모듈 자체의 잠금
    pub locked: bool,
    /// 체인 잠금 포함, 실제로 편집 불가한지 (전체 잠금이 항상 우선)
    pub read_only: bool,
}

impl FinancialView {
    pub fn build(record: &FinancialRecord, current_year: i32, chain_locked: bool) -> Self {
        FinancialView {
            monthly_fee: record.monthly_fee,
            indexed_this_year: indexed_this_year(record.monthly_fee_indexed_year, current_year),
            indexed_year: record.monthly_fee_indexed_year,
            deposit_flag: record.deposit_required_flag,
            deposit_required: record.deposit_required,
            deposit_paid: record.deposit_paid,
            status: effective_status(record, current_year),
            settled_allowed: settled_allowed(record, current_year),
            locked: record.locked,
            read_only: chain_locked || record.locked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2026;

    fn record(fee: Option<i64>, indexed: Option<i32>, status: SettlementStatus) -> FinancialRecord {
        FinancialRecord {
            monthly_fee: fee,
            monthly_fee_indexed_year: indexed,
            stored_status: status,
            ..Default::default()
        }
    }

    #[test]
    fn test_fee_without_indexation_cannot_be_settled() {
        let r = record(Some(50000), None, SettlementStatus::Settled);
        assert!(!settled_allowed(&r, YEAR));
        assert_eq!(effective_status(&r, YEAR), SettlementStatus::Unset);
    }

    #[test]
    fn test_zero_fee_settles_regardless_of_indexation() {
        let r = record(Some(0), None, SettlementStatus::Settled);
        assert_eq!(effective_status(&r, YEAR), SettlementStatus::Settled);
        let r = record(None, Some(YEAR - 3), SettlementStatus::Settled);
        assert_eq!(effective_status(&r, YEAR), SettlementStatus::Settled);
    }

    #[test]
    fn test_indexation_is_year_scoped() {
        let current = record(Some(50000), Some(YEAR), SettlementStatus::Settled);
        assert_eq!(effective_status(&current, YEAR), SettlementStatus::Settled);

        let last_year = record(Some(50000), Some(YEAR - 1), SettlementStatus::Settled);
        assert!(!indexed_this_year(last_year.monthly_fee_indexed_year, YEAR));
        assert_eq!(effective_status(&last_year, YEAR), SettlementStatus::Unset);
    }

    #[test]
    fn test_deposit_condition() {
        assert!(deposit_condition(false, None, None));
        assert!(deposit_condition(true, Some(10000), Some(10000)));
        assert!(!deposit_condition(true, Some(10000), Some(9999)));
        assert!(!deposit_condition(true, Some(0), Some(0)));
        assert!(!deposit_condition(true, Some(10000), None));
    }

    #[test]
    fn test_other_statuses_are_never_downgraded() {
        let r = record(Some(50000), None, SettlementStatus::Outstanding);
        assert_eq!(effective_status(&r, YEAR), SettlementStatus::Outstanding);
        let r = record(Some(50000), None, SettlementStatus::Unset);
        assert_eq!(effective_status(&r, YEAR), SettlementStatus::Unset);
    }

    #[test]
    fn test_record_from_input_drops_deposit_amounts_without_flag() {
        let input = FinancialInput {
            monthly_fee: Some(120000),
            indexed_this_year: true,
            deposit_flag: false,
            deposit_required: Some(500),
            deposit_paid: Some(500),
            status: SettlementStatus::Outstanding,
        };
        let r = record_from_input(&input, YEAR, false);
        assert_eq!(r.monthly_fee_indexed_year, Some(YEAR));
        assert_eq!(r.deposit_required, None);
        assert_eq!(r.deposit_paid, None);
        assert_eq!(r.stored_status, SettlementStatus::Outstanding);
    }

    #[test]
    fn test_view_read_only_when_chain_locked() {
        let r = record(None, None, SettlementStatus::Unset);
        assert!(!FinancialView::build(&r, YEAR, false).read_only);
        assert!(FinancialView::build(&r, YEAR, true).read_only);
    }
}
