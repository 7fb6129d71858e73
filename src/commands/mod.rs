//! Commands Module
//!
//! 화면 계층에서 호출하는 명령 정의
//!
//! 각 명령은 camelCase JSON 인자를 받아 `CommandResult<DTO>` 를 반환합니다.
//! `dispatch` 가 명령 이름으로 라우팅합니다 (stdin JSON 셸에서 사용).

pub mod attachments;
pub mod contracts;
pub mod directory;
pub mod financial;
pub mod modules;
pub mod notes;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CommandError, CommandResult, RegistryError};
use crate::models::ModuleName;
use crate::registry::{ContractRegistry, DeletionGate};
use crate::utils::parse_amount;

/// 명령 처리에 필요한 앱 상태
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: ContractRegistry,
    pub deletion_gate: DeletionGate,
}

/// 인자가 없는 명령용
#[derive(Debug, Default, Deserialize)]
pub struct NoArgs {}

pub(crate) fn validation_error(message: impl Into<String>) -> CommandError {
    CommandError::from(RegistryError::validation(message))
}

/// "YYYY-MM-DD" 날짜 인자
pub(crate) fn parse_date_arg(value: &str, field: &str) -> CommandResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| validation_error(format!("{} must be a date in YYYY-MM-DD format", field)))
}

pub(crate) fn parse_optional_date_arg(value: Option<&str>, field: &str) -> CommandResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date_arg(v, field).map(Some),
        None => Ok(None),
    }
}

/// 금액 입력 문자열: 비어 있으면 None, 숫자가 아니면 ValidationError
pub(crate) fn parse_amount_arg(value: Option<&str>, field: &str) -> CommandResult<Option<i64>> {
    let Some(text) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    parse_amount(text)
        .map(Some)
        .ok_or_else(|| validation_error(format!("{} must be a whole number", field)))
}

pub(crate) fn parse_module_arg(value: &str) -> CommandResult<ModuleName> {
    value.parse::<ModuleName>().map_err(CommandError::from)
}

fn parse_args<T: DeserializeOwned>(args: Value) -> CommandResult<T> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args).map_err(|e| CommandError {
        code: "INVALID_ARGS".to_string(),
        message: format!("Invalid arguments: {}", e),
        details: None,
    })
}

fn respond<T: Serialize>(result: CommandResult<T>) -> CommandResult<Value> {
    let value = result?;
    serde_json::to_value(value).map_err(|e| CommandError::from(RegistryError::from(e)))
}

/// 명령 이름으로 라우팅
pub fn dispatch(state: &AppState, cmd: &str, args: Value) -> CommandResult<Value> {
    tracing::debug!(cmd, "dispatching command");
    match cmd {
        // contracts
        "list_contracts" => respond(contracts::list_contracts(parse_args(args)?, state)),
        "get_contract" => respond(contracts::get_contract(parse_args(args)?, state)),
        "create_contract" => respond(contracts::create_contract(parse_args(args)?, state)),
        "create_amendment" => respond(contracts::create_amendment(parse_args(args)?, state)),
        "save_contract" => respond(contracts::save_contract(parse_args(args)?, state)),
        "delete_contract" => respond(contracts::delete_contract(parse_args(args)?, state)),
        "get_lock_state" => respond(contracts::get_lock_state(parse_args(args)?, state)),
        "list_root_choices" => respond(contracts::list_root_choices(parse_args(args)?, state)),

        // financial
        "get_financial" => respond(financial::get_financial(parse_args(args)?, state)),
        "save_financial" => respond(financial::save_financial(parse_args(args)?, state)),
        "lock_financial" => respond(financial::lock_financial(parse_args(args)?, state)),
        "unlock_financial" => respond(financial::unlock_financial(parse_args(args)?, state)),
        "financial_report" => respond(financial::financial_report(parse_args(args)?, state)),

        // modules
        "list_modules" => respond(modules::list_modules(parse_args(args)?, state)),
        "enable_module" => respond(modules::enable_module(parse_args(args)?, state)),
        "disable_module" => respond(modules::disable_module(parse_args(args)?, state)),
        "get_module_data" => respond(modules::get_module_data(parse_args(args)?, state)),
        "save_module_data" => respond(modules::save_module_data(parse_args(args)?, state)),

        // attachments
        "attach_primary" => respond(attachments::attach_primary(parse_args(args)?, state)),
        "resolve_primary" => respond(attachments::resolve_primary(parse_args(args)?, state)),
        "open_primary" => respond(attachments::open_primary(parse_args(args)?, state)),
        "export_primary" => respond(attachments::export_primary(parse_args(args)?, state)),
        "add_media" => respond(attachments::add_media(parse_args(args)?, state)),
        "list_media" => respond(attachments::list_media(parse_args(args)?, state)),
        "remove_media" => respond(attachments::remove_media(parse_args(args)?, state)),
        "remove_all_media" => respond(attachments::remove_all_media(parse_args(args)?, state)),
        "open_media" => respond(attachments::open_media(parse_args(args)?, state)),
        "export_media" => respond(attachments::export_media(parse_args(args)?, state)),

        // partners / categories
        "list_partners" => respond(directory::list_partners(parse_args(args)?, state)),
        "create_partner" => respond(directory::create_partner(parse_args(args)?, state)),
        "rename_partner" => respond(directory::rename_partner(parse_args(args)?, state)),
        "delete_partner" => respond(directory::delete_partner(parse_args(args)?, state)),
        "list_contacts" => respond(directory::list_contacts(parse_args(args)?, state)),
        "add_contact" => respond(directory::add_contact(parse_args(args)?, state)),
        "remove_contact" => respond(directory::remove_contact(parse_args(args)?, state)),
        "list_categories" => respond(directory::list_categories(parse_args(args)?, state)),
        "create_category" => respond(directory::create_category(parse_args(args)?, state)),
        "rename_category" => respond(directory::rename_category(parse_args(args)?, state)),
        "delete_category" => respond(directory::delete_category(parse_args(args)?, state)),

        // notes
        "list_notes" => respond(notes::list_notes(parse_args(args)?, state)),
        "add_note" => respond(notes::add_note(parse_args(args)?, state)),

        other => Err(CommandError {
            code: "UNKNOWN_COMMAND".to_string(),
            message: format!("Unknown command: {}", other),
            details: None,
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::attachments::AttachmentStore;
    use crate::db::Database;
    use tempfile::TempDir;

    pub fn state() -> (TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("database.db"));
        db.initialize().unwrap();
        let store = AttachmentStore::new(dir.path().join("files"));
        store.ensure_root().unwrap();
        let state = AppState {
            registry: ContractRegistry::new(db, store).with_actor("shell"),
            deletion_gate: DeletionGate::new("pw"),
        };
        (dir, state)
    }
}
