//! 계약 모듈 켜기/끄기와 모듈 데이터

use std::collections::BTreeSet;

use serde::Serialize;

use super::{ensure_head, ensure_module, load_contract, ContractRegistry};
use crate::attachments;
use crate::db;
use crate::error::RegistryError;
use crate::models::ModuleName;
use crate::utils::contract_folder_name;

/// `enable_module` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModuleChange {
    Added,
    AlreadyPresent,
}

impl ContractRegistry {
    pub fn enable_module(&self, id: i64, module: ModuleName) -> Result<ModuleChange, RegistryError> {
        let conn = self.db.connect()?;
        ensure_head(&conn, id)?;
        if db::modules::enable(&conn, id, module)? {
            tracing::info!(contract_id = id, %module, "enabled module");
            Ok(ModuleChange::Added)
        } else {
            Ok(ModuleChange::AlreadyPresent)
        }
    }

    /// 모듈 제거 (되돌릴 수 없음)
    /// - financial: 재무 필드 전체 초기화 + 잠금 해제
    /// - media: 미디어 파일(디스크 + 기록)과 media 폴더 삭제
    pub fn disable_module(&self, id: i64, module: ModuleName) -> Result<(), RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let contract = ensure_head(&tx, id)?;

        let mut media = Vec::new();
        match module {
            ModuleName::Financial => {
                db::contracts::clear_financial(&tx, id)?;
            }
            ModuleName::Media => {
                media = db::files::media(&tx, id)?;
                db::files::delete_all_media(&tx, id)?;
            }
        }
        db::modules::delete_data(&tx, id, module)?;
        db::modules::disable(&tx, id, module)?;
        tx.commit()?;

        if module == ModuleName::Media {
            let mut folders = BTreeSet::new();
            folders.insert(contract_folder_name(&contract.contract_number, id));
            for stored in &media {
                if let Some(folder) = attachments::folder_of(stored) {
                    folders.insert(folder.to_string());
                }
                self.store.remove_stored(stored);
            }
            for folder in &folders {
                self.store.remove_dir(&self.store.media_dir(folder));
            }
        }

        tracing::info!(contract_id = id, %module, "disabled module");
        Ok(())
    }

    pub fn enabled_modules(&self, id: i64) -> Result<Vec<ModuleName>, RegistryError> {
        let conn = self.db.connect()?;
        load_contract(&conn, id)?;
        db::modules::enabled(&conn, id)
    }

    pub fn module_data(&self, id: i64, module: ModuleName) -> Result<Option<String>, RegistryError> {
        let conn = self.db.connect()?;
        load_contract(&conn, id)?;
        db::modules::data(&conn, id, module)
    }

    pub fn set_module_data(&self, id: i64, module: ModuleName, text: &str) -> Result<(), RegistryError> {
        let conn = self.db.connect()?;
        ensure_head(&conn, id)?;
        ensure_module(&conn, id, module)?;
        db::modules::set_data(&conn, id, module, text)
    }
}
