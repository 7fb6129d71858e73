//! 모듈 명령

use serde::{Deserialize, Serialize};

use super::{parse_module_arg, AppState};
use crate::commands::contracts::ContractIdArgs;
use crate::error::CommandResult;
use crate::models::ModuleName;
use crate::registry::modules::ModuleChange;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDto {
    pub name: ModuleName,
    pub label: &'static str,
    pub enabled: bool,
}

/// 전체 모듈 목록과 활성 여부
pub fn list_modules(args: ContractIdArgs, state: &AppState) -> CommandResult<Vec<ModuleDto>> {
    let enabled = state.registry.enabled_modules(args.contract_id)?;
    Ok(ModuleName::ALL
        .iter()
        .map(|m| ModuleDto {
            name: *m,
            label: m.label(),
            enabled: enabled.contains(m),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleArgs {
    pub contract_id: i64,
    pub module: String,
}

pub fn enable_module(args: ModuleArgs, state: &AppState) -> CommandResult<ModuleChange> {
    let module = parse_module_arg(&args.module)?;
    Ok(state.registry.enable_module(args.contract_id, module)?)
}

pub fn disable_module(args: ModuleArgs, state: &AppState) -> CommandResult<()> {
    let module = parse_module_arg(&args.module)?;
    Ok(state.registry.disable_module(args.contract_id, module)?)
}

pub fn get_module_data(args: ModuleArgs, state: &AppState) -> CommandResult<Option<String>> {
    let module = parse_module_arg(&args.module)?;
    Ok(state.registry.module_data(args.contract_id, module)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveModuleDataArgs {
    pub contract_id: i64,
    pub module: String,
    pub text: String,
}

pub fn save_module_data(args: SaveModuleDataArgs, state: &AppState) -> CommandResult<()> {
    let module = parse_module_arg(&args.module)?;
    Ok(state.registry.set_module_data(args.contract_id, module, &args.text)?)
}
