//! Contract & Amendment Operations
//!
//! 원계약/변경계약 생성, head 수정, 삭제, 목록/검색/상세 조회

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use super::{chain_amendments, ensure_head, load_contract, load_lock_state, ContractRegistry, DeletionToken};
use crate::attachments;
use crate::categories::CategoryTree;
use crate::db::{self, contracts::{BaseUpdate, ContractInsert}};
use crate::error::RegistryError;
use crate::lifecycle::{self, ExpiryDisplay, LockReason, LockState, StatusDisplay};
use crate::models::{
    normalize_nickname, Contact, Contract, HeadFields, ModuleName, NewAmendment, NewRootContract, Note, Term,
};
use crate::settlement::FinancialView;
use crate::utils::{contract_folder_name, current_year, timestamp_now, validate_source_file};

/// 목록의 한 행 (원계약 또는 변경계약)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRow {
    pub id: i64,
    pub parent_id: Option<i64>,
    /// 변경계약이면 "1. amendment" 같은 표시 이름
    pub label: Option<String>,
    pub partner_name: String,
    pub category_path: String,
    pub contract_number: String,
    pub nickname: Option<String>,
    pub contract_date: Option<NaiveDate>,
    pub expiry: ExpiryDisplay,
    pub status: StatusDisplay,
    pub expires_this_year: bool,
    pub locked: bool,
    pub lock_reason: Option<LockReason>,
    pub is_head: bool,
}

impl ContractRow {
    fn matches(&self, needle: &str) -> bool {
        let date = self
            .contract_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let expiry = self.expiry.to_string();
        let status = self.status.to_string();
        let fields: [&str; 8] = [
            self.label.as_deref().unwrap_or(""),
            &self.partner_name,
            &self.category_path,
            &self.contract_number,
            self.nickname.as_deref().unwrap_or(""),
            &date,
            &expiry,
            &status,
        ];
        fields.iter().any(|f| f.to_lowercase().contains(needle))
    }
}

/// 원계약 + 정렬된 변경계약 체인
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractChain {
    pub root: ContractRow,
    pub amendments: Vec<ContractRow>,
}

impl ContractChain {
    pub fn head(&self) -> &ContractRow {
        self.amendments.last().unwrap_or(&self.root)
    }

    fn matches(&self, needle: &str) -> bool {
        self.root.matches(needle) || self.amendments.iter().any(|row| row.matches(needle))
    }
}

/// 변경계약 생성 시 "원계약 선택" 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootChoice {
    pub id: i64,
    pub label: String,
}

/// 계약 상세 화면 데이터
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDetail {
    pub contract: Contract,
    pub label: Option<String>,
    pub partner_name: String,
    pub category_path: String,
    pub contacts: Vec<Contact>,
    pub lock: LockState,
    pub modules: Vec<ModuleName>,
    /// 재무 모듈이 켜진 경우에만
    pub financial: Option<FinancialView>,
    pub primary_file: Option<String>,
    pub notes: Vec<Note>,
}

fn required_number(number: &str) -> Result<&str, RegistryError> {
    let number = number.trim();
    if number.is_empty() {
        return Err(RegistryError::validation("Contract number is required"));
    }
    Ok(number)
}

fn ensure_partner(conn: &Connection, partner_id: Option<i64>) -> Result<i64, RegistryError> {
    let id = partner_id.ok_or_else(|| RegistryError::validation("Partner is required"))?;
    if db::partners::get(conn, id)?.is_none() {
        return Err(RegistryError::not_found(format!("Partner {}", id)));
    }
    Ok(id)
}

fn ensure_category(conn: &Connection, category_id: Option<i64>) -> Result<i64, RegistryError> {
    let id = category_id.ok_or_else(|| RegistryError::validation("Category is required"))?;
    if !db::categories::exists(conn, id)? {
        return Err(RegistryError::not_found(format!("Category {}", id)));
    }
    Ok(id)
}

fn build_row(
    contract: &Contract,
    amendments: &[Contract],
    label: Option<String>,
    partner_name: &str,
    tree: &CategoryTree,
    year: i32,
) -> ContractRow {
    let display = lifecycle::row_display(contract, amendments, year);
    ContractRow {
        id: contract.id,
        parent_id: contract.parent_id,
        label,
        partner_name: partner_name.to_string(),
        category_path: tree.path(contract.category_id),
        contract_number: contract.contract_number.clone(),
        nickname: contract.nickname.clone(),
        contract_date: contract.contract_date,
        expiry: display.expiry,
        status: display.status,
        expires_this_year: display.expires_this_year,
        locked: display.lock.locked,
        lock_reason: display.lock.reason,
        is_head: display.is_head,
    }
}

impl ContractRegistry {
    /// 새 원계약 등록. 행 추가와 주 문서 복사는 하나의 트랜잭션으로 처리된다.
    pub fn create_root(&self, input: &NewRootContract) -> Result<i64, RegistryError> {
        let number = required_number(&input.contract_number)?;
        let nickname = normalize_nickname(input.nickname.as_deref())?;
        if input.partner_id.is_none() {
            return Err(RegistryError::validation("Partner is required"));
        }
        if input.category_id.is_none() {
            return Err(RegistryError::validation("Category is required"));
        }
        let source = validate_source_file(&input.primary_file)?;

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let partner_id = ensure_partner(&tx, input.partner_id)?;
        let category_id = ensure_category(&tx, input.category_id)?;

        let now = timestamp_now();
        let id = db::contracts::insert(
            &tx,
            &ContractInsert {
                partner_id,
                category_id: Some(category_id),
                contract_number: number,
                contract_date: input.contract_date,
                term: input.term,
                parent_id: None,
                nickname: nickname.as_deref(),
                now: &now,
            },
        )?;

        self.finish_new_contract(tx, id, number, &source)?;

        tracing::info!(contract_id = id, number, "created contract");
        Ok(id)
    }

    /// 변경계약 등록: 상대방/카테고리는 원계약에서 상속
    pub fn create_amendment(&self, input: &NewAmendment) -> Result<i64, RegistryError> {
        let parent_id = input
            .parent_id
            .ok_or_else(|| RegistryError::validation("Select the contract to amend"))?;
        let number = required_number(&input.contract_number)?;
        let nickname = normalize_nickname(input.nickname.as_deref())?;
        let source = validate_source_file(&input.primary_file)?;

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let parent = db::contracts::get(&tx, parent_id)?
            .ok_or_else(|| RegistryError::validation(format!("Parent contract {} does not exist", parent_id)))?;
        if parent.is_amendment() {
            return Err(RegistryError::validation("An amendment can only be attached to a root contract"));
        }
        let partner_id = parent
            .partner_id
            .ok_or_else(|| RegistryError::validation("Parent contract has no partner"))?;

        let now = timestamp_now();
        let id = db::contracts::insert(
            &tx,
            &ContractInsert {
                partner_id,
                category_id: parent.category_id,
                contract_number: number,
                contract_date: input.contract_date,
                term: input.term,
                parent_id: Some(parent.id),
                nickname: nickname.as_deref(),
                now: &now,
            },
        )?;

        self.finish_new_contract(tx, id, number, &source)?;

        tracing::info!(contract_id = id, parent_id = parent.id, number, "created amendment");
        Ok(id)
    }

    /// 새 계약 폴더에 주 문서를 복사하고 생성 메모와 함께 커밋.
    /// 복사 이후 어느 단계든 실패하면 트랜잭션은 롤백되고 폴더도 지운다.
    fn finish_new_contract(
        &self,
        tx: rusqlite::Transaction<'_>,
        id: i64,
        number: &str,
        source: &Path,
    ) -> Result<(), RegistryError> {
        let folder = contract_folder_name(number, id);
        let stored = self.store.store_copy(&folder, None, source).map_err(|e| {
            tracing::warn!(contract_id = id, error = %e, "primary document copy failed");
            RegistryError::from(e)
        });

        let result = stored.and_then(|stored| {
            db::files::set_primary(&tx, id, &stored)?;
            self.append_system_note(&tx, id, &self.created_note())?;
            tx.commit()?;
            Ok(())
        });
        if result.is_err() {
            self.store.remove_dir(&self.store.contract_dir(&folder));
        }
        result
    }

    /// head 기본 데이터 저장
    pub fn edit_head_fields(&self, id: i64, fields: &HeadFields) -> Result<(), RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        ensure_head(&tx, id)?;

        let number = required_number(&fields.contract_number)?;
        let nickname = normalize_nickname(fields.nickname.as_deref())?;
        if fields.partner_id.is_none() {
            return Err(RegistryError::validation("Partner is required"));
        }
        if fields.category_id.is_none() {
            return Err(RegistryError::validation("Category is required"));
        }
        let partner_id = ensure_partner(&tx, fields.partner_id)?;
        let category_id = ensure_category(&tx, fields.category_id)?;

        let now = timestamp_now();
        db::contracts::update_base(
            &tx,
            id,
            &BaseUpdate {
                partner_id,
                category_id,
                contract_number: number,
                contract_date: fields.contract_date,
                term: fields.term,
                nickname: nickname.as_deref(),
                now: &now,
            },
        )?;
        self.append_system_note(&tx, id, &self.saved_note())?;
        tx.commit()?;

        tracing::info!(contract_id = id, "saved contract fields");
        Ok(())
    }

    pub fn compute_lock_state(&self, id: i64) -> Result<LockState, RegistryError> {
        let conn = self.db.connect()?;
        Ok(load_lock_state(&conn, id)?.1)
    }

    /// 계약 삭제. 원계약을 지우면 체인의 모든 변경계약도 함께 지운다.
    /// 반환값은 삭제된 계약 id 목록.
    pub fn delete_contract(&self, id: i64, _token: &DeletionToken) -> Result<Vec<i64>, RegistryError> {
        let mut conn = self.db.connect()?;
        let contract = load_contract(&conn, id)?;

        let mut doomed = vec![contract.clone()];
        if !contract.is_amendment() {
            doomed.extend(chain_amendments(&conn, &contract)?);
        }

        // DB 에서 지우기 전에 폴더 이름 수집
        let mut folders = BTreeSet::new();
        for c in &doomed {
            folders.insert(contract_folder_name(&c.contract_number, c.id));
            if let Some(stored) = db::files::primary(&conn, c.id)? {
                if let Some(folder) = attachments::folder_of(&stored) {
                    folders.insert(folder.to_string());
                }
            }
            for stored in db::files::media(&conn, c.id)? {
                if let Some(folder) = attachments::folder_of(&stored) {
                    folders.insert(folder.to_string());
                }
            }
            folders.extend(self.store.find_folders_by_id(c.id)?);
        }

        let tx = conn.transaction()?;
        for c in &doomed {
            db::notes::delete_all(&tx, c.id)?;
            db::modules::delete_all(&tx, c.id)?;
            db::files::delete_all_media(&tx, c.id)?;
            db::files::delete_primary(&tx, c.id)?;
            db::contracts::delete(&tx, c.id)?;
        }
        tx.commit()?;

        for folder in &folders {
            self.store.remove_dir(&self.store.contract_dir(folder));
        }

        let ids: Vec<i64> = doomed.iter().map(|c| c.id).collect();
        tracing::info!(contract_id = id, removed = ids.len(), "deleted contract");
        Ok(ids)
    }

    /// 원계약 목록 (카테고리 필터는 하위 카테고리 포함)
    pub fn list_roots(&self, category_filter: Option<i64>) -> Result<Vec<ContractChain>, RegistryError> {
        let conn = self.db.connect()?;
        let tree = CategoryTree::new(db::categories::list(&conn)?);

        let allowed: Option<HashSet<i64>> = match category_filter {
            Some(cat) if !tree.contains(cat) => {
                return Err(RegistryError::not_found(format!("Category {}", cat)));
            }
            Some(cat) => Some(tree.descendant_ids(cat).into_iter().collect()),
            None => None,
        };

        let partners: HashMap<i64, String> = db::partners::list(&conn)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let year = current_year();

        let mut chains = Vec::new();
        for (root, partner_name) in db::contracts::roots(&conn)? {
            if let Some(allowed) = &allowed {
                if !root.category_id.is_some_and(|c| allowed.contains(&c)) {
                    continue;
                }
            }
            let amendments = chain_amendments(&conn, &root)?;
            let root_row = build_row(&root, &amendments, None, &partner_name, &tree, year);
            let amendment_rows = amendments
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    let name = a
                        .partner_id
                        .and_then(|p| partners.get(&p))
                        .map(String::as_str)
                        .unwrap_or(partner_name.as_str());
                    build_row(a, &amendments, Some(lifecycle::amendment_label(i + 1)), name, &tree, year)
                })
                .collect();
            chains.push(ContractChain {
                root: root_row,
                amendments: amendment_rows,
            });
        }
        Ok(chains)
    }

    /// 표시되는 모든 칸에 대한 대소문자 무시 부분 검색. 한 행이라도 맞으면 체인 전체 유지.
    pub fn search(&self, query: &str, category_filter: Option<i64>) -> Result<Vec<ContractChain>, RegistryError> {
        let needle = query.trim().to_lowercase();
        let mut chains = self.list_roots(category_filter)?;
        if !needle.is_empty() {
            chains.retain(|chain| chain.matches(&needle));
        }
        Ok(chains)
    }

    pub fn contract_detail(&self, id: i64) -> Result<ContractDetail, RegistryError> {
        let conn = self.db.connect()?;
        let contract = load_contract(&conn, id)?;
        let amendments = chain_amendments(&conn, &contract)?;
        let lock = lifecycle::lock_state(&contract, &amendments);

        let label = amendments
            .iter()
            .position(|a| a.id == contract.id)
            .map(|i| lifecycle::amendment_label(i + 1));

        let (partner_name, contacts) = match contract.partner_id {
            Some(pid) => (
                db::partners::get(&conn, pid)?.map(|p| p.name).unwrap_or_default(),
                db::partners::contacts(&conn, pid)?,
            ),
            None => (String::new(), Vec::new()),
        };
        let tree = CategoryTree::new(db::categories::list(&conn)?);
        let modules = db::modules::enabled(&conn, id)?;
        let financial = modules
            .contains(&ModuleName::Financial)
            .then(|| FinancialView::build(&contract.financial, current_year(), lock.locked));

        Ok(ContractDetail {
            label,
            partner_name,
            category_path: tree.path(contract.category_id),
            contacts,
            lock,
            modules,
            financial,
            primary_file: db::files::primary(&conn, id)?,
            notes: db::notes::list(&conn, id)?,
            contract,
        })
    }

    /// "<상대방> – <번호>" 형식의 원계약 선택 목록
    pub fn root_choices(&self) -> Result<Vec<RootChoice>, RegistryError> {
        let conn = self.db.connect()?;
        Ok(db::contracts::roots(&conn)?
            .into_iter()
            .map(|(root, partner)| RootChoice {
                id: root.id,
                label: format!("{} – {}", partner, root.contract_number),
            })
            .collect())
    }
}

/// 입력된 만료일/무기한 조합을 계약 기간으로 변환
pub fn term_from_input(expiry_date: Option<NaiveDate>, indefinite: bool) -> Result<Term, RegistryError> {
    match (expiry_date, indefinite) {
        (_, true) => Ok(Term::Indefinite),
        (Some(date), false) => Ok(Term::Expires(date)),
        (None, false) => Err(RegistryError::validation("Either an expiry date or indefinite is required")),
    }
}
