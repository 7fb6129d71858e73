//! 재무 하위 기록 연산

use super::{ensure_head, ensure_module, load_lock_state, ContractRegistry};
use crate::db;
use crate::error::RegistryError;
use crate::models::{FinancialInput, ModuleName};
use crate::settlement::{self, FinancialView};
use crate::utils::{current_year, timestamp_now};

fn validate_amounts(input: &FinancialInput) -> Result<(), RegistryError> {
    let amounts = [
        ("Monthly fee", input.monthly_fee),
        ("Required deposit", input.deposit_required),
        ("Paid deposit", input.deposit_paid),
    ];
    for (name, value) in amounts {
        if value.is_some_and(|v| v < 0) {
            return Err(RegistryError::validation(format!("{} cannot be negative", name)));
        }
    }
    Ok(())
}

impl ContractRegistry {
    /// 재무 필드 저장. 상태는 입력 그대로 저장하고 읽을 때 정규화한다.
    pub fn set_financial_fields(&self, id: i64, input: &FinancialInput) -> Result<FinancialView, RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let contract = ensure_head(&tx, id)?;
        ensure_module(&tx, id, ModuleName::Financial)?;
        if contract.financial.locked {
            return Err(RegistryError::locked(format!("Financial data of contract {} is locked", id)));
        }
        validate_amounts(input)?;

        let year = current_year();
        let record = settlement::record_from_input(input, year, false);
        db::contracts::update_financial(&tx, id, &record, &timestamp_now())?;
        self.append_system_note(&tx, id, &self.saved_note())?;
        tx.commit()?;

        tracing::info!(contract_id = id, status = ?record.stored_status, "saved financial data");
        Ok(FinancialView::build(&record, year, false))
    }

    /// 재무 기록 잠금. `pending` 이 있으면 먼저 저장한다.
    pub fn lock_financial(&self, id: i64, pending: Option<&FinancialInput>) -> Result<(), RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let contract = ensure_head(&tx, id)?;
        ensure_module(&tx, id, ModuleName::Financial)?;
        if contract.financial.locked {
            if pending.is_some() {
                return Err(RegistryError::locked(format!("Financial data of contract {} is locked", id)));
            }
            return Ok(());
        }

        match pending {
            Some(input) => {
                validate_amounts(input)?;
                let record = settlement::record_from_input(input, current_year(), true);
                db::contracts::update_financial(&tx, id, &record, &timestamp_now())?;
            }
            None => {
                db::contracts::set_finance_locked(&tx, id, true)?;
            }
        }
        tx.commit()?;

        tracing::info!(contract_id = id, "locked financial data");
        Ok(())
    }

    pub fn unlock_financial(&self, id: i64) -> Result<(), RegistryError> {
        let conn = self.db.connect()?;
        ensure_head(&conn, id)?;
        ensure_module(&conn, id, ModuleName::Financial)?;
        db::contracts::set_finance_locked(&conn, id, false)?;

        tracing::info!(contract_id = id, "unlocked financial data");
        Ok(())
    }

    /// 읽기 전용 여부와 정산 가능 여부를 포함한 재무 화면 데이터
    pub fn financial_view(&self, id: i64) -> Result<FinancialView, RegistryError> {
        let conn = self.db.connect()?;
        let (contract, lock) = load_lock_state(&conn, id)?;
        ensure_module(&conn, id, ModuleName::Financial)?;
        Ok(FinancialView::build(&contract.financial, current_year(), lock.locked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SettlementStatus, Term};
    use crate::registry::testing::{date, Fixture};

    fn input() -> FinancialInput {
        FinancialInput {
            monthly_fee: Some(50_000),
            indexed_this_year: false,
            deposit_flag: true,
            deposit_required: Some(10_000),
            deposit_paid: Some(10_000),
            status: SettlementStatus::Settled,
        }
    }

    #[test]
    fn test_requires_financial_module() {
        let fx = Fixture::new();
        let id = fx.root("F-1", date(2024, 1, 1));
        let err = fx.registry.set_financial_fields(id, &input()).unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_unindexed_fee_normalizes_settled_on_read() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("F-2", date(2024, 1, 1));
        reg.enable_module(id, ModuleName::Financial).unwrap();

        let view = reg.set_financial_fields(id, &input()).unwrap();
        assert_eq!(view.status, SettlementStatus::Unset);
        assert!(!view.settled_allowed);

        let indexed = FinancialInput { indexed_this_year: true, ..input() };
        let view = reg.set_financial_fields(id, &indexed).unwrap();
        assert_eq!(view.status, SettlementStatus::Settled);
        assert_eq!(reg.financial_view(id).unwrap().indexed_year, Some(current_year()));

        let free = FinancialInput { monthly_fee: Some(0), ..input() };
        assert_eq!(reg.set_financial_fields(id, &free).unwrap().status, SettlementStatus::Settled);
    }

    #[test]
    fn test_lock_blocks_edits_until_unlocked() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("F-3", date(2024, 1, 1));
        reg.enable_module(id, ModuleName::Financial).unwrap();

        let pending = FinancialInput { monthly_fee: Some(1200), ..Default::default() };
        reg.lock_financial(id, Some(&pending)).unwrap();
        let view = reg.financial_view(id).unwrap();
        assert!(view.locked && view.read_only);
        assert_eq!(view.monthly_fee, Some(1200));

        let err = reg.set_financial_fields(id, &input()).unwrap_err();
        assert!(matches!(err, RegistryError::Locked(_)));

        reg.unlock_financial(id).unwrap();
        assert!(reg.set_financial_fields(id, &input()).is_ok());
    }

    #[test]
    fn test_relock_cannot_overwrite_locked_values() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("F-6", date(2024, 1, 1));
        reg.enable_module(id, ModuleName::Financial).unwrap();

        let first = FinancialInput { monthly_fee: Some(1000), ..Default::default() };
        reg.lock_financial(id, Some(&first)).unwrap();

        let rewrite = FinancialInput { monthly_fee: Some(999_999), ..Default::default() };
        assert!(matches!(reg.lock_financial(id, Some(&rewrite)), Err(RegistryError::Locked(_))));
        reg.lock_financial(id, None).unwrap();

        let view = reg.financial_view(id).unwrap();
        assert_eq!(view.monthly_fee, Some(1000));
        assert!(view.locked);
    }

    #[test]
    fn test_chain_lock_overrides_financial_lock() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let root = fx.root("F-4", date(2024, 1, 1));
        reg.enable_module(root, ModuleName::Financial).unwrap();
        fx.amendment(root, "F-4-A", date(2024, 5, 1), Term::Indefinite);

        assert!(reg.financial_view(root).unwrap().read_only);
        assert!(matches!(reg.unlock_financial(root), Err(RegistryError::Locked(_))));
        assert!(matches!(reg.lock_financial(root, None), Err(RegistryError::Locked(_))));
        assert!(matches!(
            reg.set_financial_fields(root, &input()),
            Err(RegistryError::Locked(_))
        ));
    }

    #[test]
    fn test_negative_amount_rejected_and_deposit_dropped_without_flag() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("F-5", date(2024, 1, 1));
        reg.enable_module(id, ModuleName::Financial).unwrap();

        let negative = FinancialInput { monthly_fee: Some(-1), ..Default::default() };
        assert!(matches!(reg.set_financial_fields(id, &negative), Err(RegistryError::Validation(_))));

        let no_flag = FinancialInput { deposit_flag: false, ..input() };
        let view = reg.set_financial_fields(id, &no_flag).unwrap();
        assert_eq!(view.deposit_required, None);
        assert_eq!(view.deposit_paid, None);
    }
}
