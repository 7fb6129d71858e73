//! Contract Registry
//!
//! 계약 대장 도메인 서비스
//!
//! DB(`db`), 첨부 저장소(`attachments`), 순수 규칙(`lifecycle`, `settlement`, `categories`)을
//! 묶어 화면 계층이 호출하는 연산을 제공합니다. 모든 쓰기는 체인의 head 에서만 허용됩니다.

pub mod attachments;
pub mod contracts;
pub mod directory;
pub mod financial;
pub mod modules;
pub mod notes;
pub mod report;

use rusqlite::Connection;

use crate::attachments::AttachmentStore;
use crate::db::{self, Database};
use crate::error::RegistryError;
use crate::lifecycle::{self, LockReason, LockState};
use crate::models::{Contract, ModuleName};
use crate::utils::{current_username, timestamp_now};

/// 계약 대장 서비스 핸들
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    db: Database,
    store: AttachmentStore,
    /// 시스템 메모에 남길 사용자 이름
    actor: String,
}

impl ContractRegistry {
    pub fn new(db: Database, store: AttachmentStore) -> Self {
        Self {
            db,
            store,
            actor: current_username(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &AttachmentStore {
        &self.store
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// "Saved. Modified by: <actor>", 사용자 이름이 없으면 "Saved."
    fn saved_note(&self) -> String {
        self.system_note("Saved.", "Modified by")
    }

    fn created_note(&self) -> String {
        self.system_note("Created.", "Created by")
    }

    fn system_note(&self, event: &str, label: &str) -> String {
        if self.actor.trim().is_empty() {
            event.to_string()
        } else {
            format!("{} {}: {}", event, label, self.actor)
        }
    }

    fn append_system_note(&self, conn: &Connection, contract_id: i64, body: &str) -> Result<(), RegistryError> {
        db::notes::insert(conn, contract_id, body, &timestamp_now(), &self.actor)?;
        Ok(())
    }
}

/// 계약 로드 (없으면 NotFound)
pub(crate) fn load_contract(conn: &Connection, id: i64) -> Result<Contract, RegistryError> {
    db::contracts::get(conn, id)?.ok_or_else(|| RegistryError::not_found(format!("Contract {}", id)))
}

/// 계약이 속한 체인의 변경계약 목록 (정렬됨)
pub(crate) fn chain_amendments(conn: &Connection, contract: &Contract) -> Result<Vec<Contract>, RegistryError> {
    let mut amendments = db::contracts::amendments(conn, contract.root_id())?;
    lifecycle::sort_chain(&mut amendments);
    Ok(amendments)
}

pub(crate) fn load_lock_state(conn: &Connection, id: i64) -> Result<(Contract, LockState), RegistryError> {
    let contract = load_contract(conn, id)?;
    let amendments = chain_amendments(conn, &contract)?;
    let lock = lifecycle::lock_state(&contract, &amendments);
    Ok((contract, lock))
}

/// 쓰기 대상이 체인의 head 인지 확인
pub(crate) fn ensure_head(conn: &Connection, id: i64) -> Result<Contract, RegistryError> {
    let (contract, lock) = load_lock_state(conn, id)?;
    if lock.locked {
        let why = match lock.reason {
            Some(LockReason::HasAmendments) => "it has amendments",
            Some(LockReason::Superseded) => "a newer amendment exists",
            None => "the chain is locked",
        };
        return Err(RegistryError::locked(format!("Contract {} is read-only: {}", id, why)));
    }
    Ok(contract)
}

pub(crate) fn ensure_module(conn: &Connection, id: i64, module: ModuleName) -> Result<(), RegistryError> {
    if !db::modules::is_enabled(conn, id, module)? {
        return Err(RegistryError::validation(format!(
            "The {} module is not enabled for contract {}",
            module, id
        )));
    }
    Ok(())
}

/// 삭제 권한 토큰. `DeletionGate::authorize` 로만 만들 수 있다.
#[derive(Debug)]
pub struct DeletionToken {
    _private: (),
}

/// 계약 삭제 확인용 비밀번호 검사 (보안 경계가 아닌 실수 방지용)
#[derive(Debug, Clone)]
pub struct DeletionGate {
    secret: String,
}

impl DeletionGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn authorize(&self, attempt: &str) -> Result<DeletionToken, RegistryError> {
        if self.secret.is_empty() || attempt != self.secret {
            tracing::warn!("rejected contract deletion: wrong password");
            return Err(RegistryError::validation("Incorrect password"));
        }
        Ok(DeletionToken { _private: () })
    }
}
