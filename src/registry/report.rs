//! Financial Report
//!
//! 재무 모듈이 켜진 모든 계약(원계약 + 변경계약)의 금액 요약

use serde::Serialize;

use super::ContractRegistry;
use crate::categories::CategoryTree;
use crate::db;
use crate::error::RegistryError;
use crate::utils::{format_huf, format_signed_huf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub contract_id: i64,
    pub partner_name: String,
    pub nickname: Option<String>,
    pub category_path: String,
    pub contract_number: String,
    pub monthly_fee: Option<i64>,
    pub indexed_year: Option<i32>,
    /// 비어 있으면 0
    pub deposit_required: i64,
    pub deposit_paid: i64,
    /// 납부액 - 요구액
    pub difference: i64,
}

impl ReportRow {
    pub fn difference_text(&self) -> String {
        difference_text(self.difference)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub monthly_fee: i64,
    pub deposit_required: i64,
    pub deposit_paid: i64,
    pub difference: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
}

impl FinancialReport {
    /// 탭 구분 텍스트 (헤더 + 행 + 합계)
    pub fn to_text(&self) -> String {
        let mut lines = vec![[
            "Partner",
            "Nickname",
            "Category",
            "Contract number",
            "Monthly fee",
            "Indexed",
            "Deposit required",
            "Deposit paid",
            "Difference",
        ]
        .join("\t")];

        for row in &self.rows {
            lines.push(
                [
                    row.partner_name.clone(),
                    row.nickname.clone().unwrap_or_default(),
                    row.category_path.clone(),
                    row.contract_number.clone(),
                    row.monthly_fee.map(format_huf).unwrap_or_default(),
                    row.indexed_year.map(|y| y.to_string()).unwrap_or_default(),
                    format_huf(row.deposit_required),
                    format_huf(row.deposit_paid),
                    row.difference_text(),
                ]
                .join("\t"),
            );
        }

        let t = &self.totals;
        lines.push(
            [
                "Total".to_string(),
                String::new(),
                String::new(),
                String::new(),
                format_huf(t.monthly_fee),
                String::new(),
                format_huf(t.deposit_required),
                format_huf(t.deposit_paid),
                difference_text(t.difference),
            ]
            .join("\t"),
        );
        lines.join("\n")
    }
}

/// 0 이면 "Settled", 그 외 부호 포함 금액
pub fn difference_text(difference: i64) -> String {
    if difference == 0 {
        "Settled".to_string()
    } else {
        format_signed_huf(difference)
    }
}

/// 금액 합산. 범위를 넘으면 ValidationError
fn add_amount(total: i64, value: i64, what: &str) -> Result<i64, RegistryError> {
    total
        .checked_add(value)
        .ok_or_else(|| RegistryError::validation(format!("{} is out of range", what)))
}

impl ContractRegistry {
    /// 상대방, 계약 번호, id 순
    pub fn financial_report(&self) -> Result<FinancialReport, RegistryError> {
        let conn = self.db.connect()?;
        let tree = CategoryTree::new(db::categories::list(&conn)?);

        let mut report = FinancialReport::default();
        for (contract, partner_name) in db::contracts::with_financial_module(&conn)? {
            let f = &contract.financial;
            let required = f.deposit_required.unwrap_or(0);
            let paid = f.deposit_paid.unwrap_or(0);
            let difference = paid.checked_sub(required).ok_or_else(|| {
                RegistryError::validation(format!("Deposit difference of contract {} is out of range", contract.id))
            })?;
            let row = ReportRow {
                contract_id: contract.id,
                partner_name,
                nickname: contract.nickname.clone(),
                category_path: tree.path(contract.category_id),
                contract_number: contract.contract_number.clone(),
                monthly_fee: f.monthly_fee,
                indexed_year: f.monthly_fee_indexed_year,
                deposit_required: required,
                deposit_paid: paid,
                difference,
            };

            let t = &mut report.totals;
            t.monthly_fee = add_amount(t.monthly_fee, row.monthly_fee.unwrap_or(0), "Total monthly fee")?;
            t.deposit_required = add_amount(t.deposit_required, row.deposit_required, "Total required deposit")?;
            t.deposit_paid = add_amount(t.deposit_paid, row.deposit_paid, "Total paid deposit")?;
            t.difference = add_amount(t.difference, row.difference, "Total difference")?;
            report.rows.push(row);
        }
        Ok(report)
    }
}
