//! 계약 명령

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{parse_date_arg, parse_optional_date_arg, AppState, NoArgs};
use crate::error::{CommandError, CommandResult};
use crate::lifecycle::LockState;
use crate::models::{HeadFields, NewAmendment, NewRootContract};
use crate::registry::contracts::{term_from_input, ContractChain, ContractDetail, RootChoice};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContractsArgs {
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub query: Option<String>,
}

pub fn list_contracts(args: ListContractsArgs, state: &AppState) -> CommandResult<Vec<ContractChain>> {
    let chains = match args.query.as_deref() {
        Some(q) if !q.trim().is_empty() => state.registry.search(q, args.category_id)?,
        _ => state.registry.list_roots(args.category_id)?,
    };
    Ok(chains)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractIdArgs {
    pub contract_id: i64,
}

pub fn get_contract(args: ContractIdArgs, state: &AppState) -> CommandResult<ContractDetail> {
    Ok(state.registry.contract_detail(args.contract_id)?)
}

pub fn get_lock_state(args: ContractIdArgs, state: &AppState) -> CommandResult<LockState> {
    Ok(state.registry.compute_lock_state(args.contract_id)?)
}

pub fn list_root_choices(_args: NoArgs, state: &AppState) -> CommandResult<Vec<RootChoice>> {
    Ok(state.registry.root_choices()?)
}

/// 계약 기본 데이터 입력 (날짜는 "YYYY-MM-DD")
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFormArgs {
    #[serde(default)]
    pub partner_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub indefinite: bool,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractArgs {
    #[serde(flatten)]
    pub form: ContractFormArgs,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDto {
    pub contract_id: i64,
}

pub fn create_contract(args: CreateContractArgs, state: &AppState) -> CommandResult<CreatedDto> {
    let form = args.form;
    let input = NewRootContract {
        partner_id: form.partner_id,
        category_id: form.category_id,
        contract_number: form.contract_number,
        contract_date: parse_date_arg(&form.contract_date, "Contract date")?,
        term: term_from_input(
            parse_optional_date_arg(form.expiry_date.as_deref(), "Expiry date")?,
            form.indefinite,
        )?,
        nickname: form.nickname,
        primary_file: PathBuf::from(args.file_path),
    };
    let contract_id = state.registry.create_root(&input)?;
    Ok(CreatedDto { contract_id })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmendmentArgs {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub contract_number: String,
    pub contract_date: String,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub indefinite: bool,
    #[serde(default)]
    pub nickname: Option<String>,
    pub file_path: String,
}

pub fn create_amendment(args: CreateAmendmentArgs, state: &AppState) -> CommandResult<CreatedDto> {
    let input = NewAmendment {
        parent_id: args.parent_id,
        contract_number: args.contract_number,
        contract_date: parse_date_arg(&args.contract_date, "Contract date")?,
        term: term_from_input(
            parse_optional_date_arg(args.expiry_date.as_deref(), "Expiry date")?,
            args.indefinite,
        )?,
        nickname: args.nickname,
        primary_file: PathBuf::from(args.file_path),
    };
    let contract_id = state.registry.create_amendment(&input)?;
    Ok(CreatedDto { contract_id })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContractArgs {
    pub contract_id: i64,
    #[serde(flatten)]
    pub form: ContractFormArgs,
}

pub fn save_contract(args: SaveContractArgs, state: &AppState) -> CommandResult<ContractDetail> {
    let form = args.form;
    let fields = HeadFields {
        partner_id: form.partner_id,
        category_id: form.category_id,
        contract_number: form.contract_number,
        contract_date: parse_date_arg(&form.contract_date, "Contract date")?,
        term: term_from_input(
            parse_optional_date_arg(form.expiry_date.as_deref(), "Expiry date")?,
            form.indefinite,
        )?,
        nickname: form.nickname,
    };
    state.registry.edit_head_fields(args.contract_id, &fields)?;
    Ok(state.registry.contract_detail(args.contract_id)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteContractArgs {
    pub contract_id: i64,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedDto {
    pub removed_ids: Vec<i64>,
}

pub fn delete_contract(args: DeleteContractArgs, state: &AppState) -> CommandResult<DeletedDto> {
    let token = state.deletion_gate.authorize(&args.password).map_err(CommandError::from)?;
    let removed_ids = state.registry.delete_contract(args.contract_id, &token)?;
    Ok(DeletedDto { removed_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{dispatch, testing};
    use serde_json::json;

    #[test]
    fn test_create_list_and_delete_through_commands() {
        let (dir, state) = testing::state();
        let partner = dispatch(&state, "create_partner", json!({ "name": "Acme" })).unwrap();
        let category = dispatch(&state, "create_category", json!({ "name": "Transport" })).unwrap();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"doc").unwrap();

        let created = dispatch(
            &state,
            "create_contract",
            json!({
                "partnerId": partner["id"],
                "categoryId": category["id"],
                "contractNumber": "SZ-001",
                "contractDate": "2024-01-01",
                "indefinite": true,
                "filePath": file.to_string_lossy(),
            }),
        )
        .unwrap();
        let id = created["contractId"].as_i64().unwrap();

        let listed = dispatch(&state, "list_contracts", json!({})).unwrap();
        assert_eq!(listed[0]["root"]["expiry"], "Indefinite");
        assert_eq!(listed[0]["root"]["status"], "Not set");

        let err = dispatch(
            &state,
            "delete_contract",
            json!({ "contractId": id, "password": "wrong" }),
        )
        .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        let deleted = dispatch(&state, "delete_contract", json!({ "contractId": id, "password": "pw" })).unwrap();
        assert_eq!(deleted["removedIds"], json!([id]));
    }

    #[test]
    fn test_missing_expiry_is_validation_error() {
        let (dir, state) = testing::state();
        let file = dir.path().join("doc.pdf");
        std::fs::write(&file, b"doc").unwrap();
        let err = dispatch(
            &state,
            "create_contract",
            json!({
                "partnerId": 1,
                "categoryId": 1,
                "contractNumber": "SZ-002",
                "contractDate": "2024-01-01",
                "filePath": file.to_string_lossy(),
            }),
        )
        .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
    }
}
