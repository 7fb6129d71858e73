//! 재무 데이터 / 리포트 명령

use serde::{Deserialize, Serialize};

use super::{parse_amount_arg, AppState, NoArgs};
use crate::commands::contracts::ContractIdArgs;
use crate::error::CommandResult;
use crate::models::{FinancialInput, SettlementStatus};
use crate::registry::report::FinancialReport;
use crate::settlement::FinancialView;

/// 화면 입력 그대로의 재무 필드 (금액은 문자열)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialFormArgs {
    #[serde(default)]
    pub monthly_fee: Option<String>,
    #[serde(default)]
    pub indexed_this_year: bool,
    #[serde(default)]
    pub deposit_flag: bool,
    #[serde(default)]
    pub deposit_required: Option<String>,
    #[serde(default)]
    pub deposit_paid: Option<String>,
    #[serde(default)]
    pub status: SettlementStatus,
}

impl FinancialFormArgs {
    fn to_input(&self) -> CommandResult<FinancialInput> {
        Ok(FinancialInput {
            monthly_fee: parse_amount_arg(self.monthly_fee.as_deref(), "Monthly fee")?,
            indexed_this_year: self.indexed_this_year,
            deposit_flag: self.deposit_flag,
            deposit_required: parse_amount_arg(self.deposit_required.as_deref(), "Required deposit")?,
            deposit_paid: parse_amount_arg(self.deposit_paid.as_deref(), "Paid deposit")?,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveFinancialArgs {
    pub contract_id: i64,
    #[serde(flatten)]
    pub form: FinancialFormArgs,
}

pub fn get_financial(args: ContractIdArgs, state: &AppState) -> CommandResult<FinancialView> {
    Ok(state.registry.financial_view(args.contract_id)?)
}

pub fn save_financial(args: SaveFinancialArgs, state: &AppState) -> CommandResult<FinancialView> {
    let input = args.form.to_input()?;
    Ok(state.registry.set_financial_fields(args.contract_id, &input)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFinancialArgs {
    pub contract_id: i64,
    /// 잠그기 전에 저장할 입력값
    #[serde(default)]
    pub pending: Option<FinancialFormArgs>,
}

pub fn lock_financial(args: LockFinancialArgs, state: &AppState) -> CommandResult<FinancialView> {
    let pending = args.pending.as_ref().map(FinancialFormArgs::to_input).transpose()?;
    state.registry.lock_financial(args.contract_id, pending.as_ref())?;
    Ok(state.registry.financial_view(args.contract_id)?)
}

pub fn unlock_financial(args: ContractIdArgs, state: &AppState) -> CommandResult<FinancialView> {
    state.registry.unlock_financial(args.contract_id)?;
    Ok(state.registry.financial_view(args.contract_id)?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReportDto {
    #[serde(flatten)]
    pub report: FinancialReport,
    /// 탭 구분 텍스트 (클립보드/파일 저장용)
    pub text: String,
}

pub fn financial_report(_args: NoArgs, state: &AppState) -> CommandResult<FinancialReportDto> {
    let report = state.registry.financial_report()?;
    let text = report.to_text();
    Ok(FinancialReportDto { report, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{dispatch, testing};
    use crate::models::{ModuleName, NewRootContract, Term};
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_save_financial_parses_amount_strings() {
        let (dir, state) = testing::state();
        let reg = &state.registry;
        let partner = reg.create_partner("Acme").unwrap().id;
        let category = reg.create_category("Transport", None).unwrap().id;
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"doc").unwrap();
        let id = reg
            .create_root(&NewRootContract {
                partner_id: Some(partner),
                category_id: Some(category),
                contract_number: "FIN-1".into(),
                contract_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                term: Term::Indefinite,
                nickname: None,
                primary_file: file,
            })
            .unwrap();
        reg.enable_module(id, ModuleName::Financial).unwrap();

        let view = dispatch(
            &state,
            "save_financial",
            json!({
                "contractId": id,
                "monthlyFee": "0",
                "depositFlag": true,
                "depositRequired": "10 000",
                "depositPaid": "10000",
                "status": "settled",
            }),
        )
        .unwrap();
        assert_eq!(view["depositRequired"], 10_000);
        assert_eq!(view["status"], "settled");
        assert_eq!(view["settledAllowed"], true);

        let err = dispatch(&state, "save_financial", json!({ "contractId": id, "monthlyFee": "ten" })).unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        let locked = dispatch(&state, "lock_financial", json!({ "contractId": id })).unwrap();
        assert_eq!(locked["readOnly"], true);

        let report = dispatch(&state, "financial_report", json!({})).unwrap();
        assert_eq!(report["rows"].as_array().unwrap().len(), 1);
        assert!(report["text"].as_str().unwrap().contains("Settled"));
    }
}
