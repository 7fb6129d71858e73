//! 주 문서 / 미디어 첨부 연산
//!
//! 복사 -> DB 매핑 갱신 -> 이전 파일 삭제 순서로 처리합니다.
//! 복사가 실패하면 매핑은 그대로 남습니다.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ensure_head, ensure_module, load_contract, ContractRegistry};
use crate::attachments::{display_name, MEDIA_DIR};
use crate::db;
use crate::error::RegistryError;
use crate::models::ModuleName;
use crate::utils::{contract_folder_name, timestamp_now, validate_source_file};

/// `resolve_primary` 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryLookup {
    pub path: Option<PathBuf>,
    pub found: bool,
}

impl PrimaryLookup {
    fn missing() -> Self {
        Self { path: None, found: false }
    }
}

/// 미디어 파일 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub stored_path: String,
    pub display_name: String,
}

impl ContractRegistry {
    /// 주 문서 첨부 (기존 문서가 있으면 교체)
    pub fn attach_primary(&self, id: i64, source: &Path) -> Result<String, RegistryError> {
        let source = validate_source_file(source)?;
        let conn = self.db.connect()?;
        let contract = ensure_head(&conn, id)?;
        let previous = db::files::primary(&conn, id)?;

        let folder = contract_folder_name(&contract.contract_number, id);
        let stored = self.store.store_copy(&folder, None, &source).map_err(|e| {
            tracing::warn!(contract_id = id, error = %e, "primary document copy failed");
            RegistryError::from(e)
        })?;

        if let Err(e) = db::files::set_primary(&conn, id, &stored) {
            self.store.remove_stored(&stored);
            return Err(e);
        }
        db::contracts::touch(&conn, id, &timestamp_now())?;

        if let Some(old) = previous.filter(|old| *old != stored) {
            self.store.remove_stored(&old);
        }

        tracing::info!(contract_id = id, stored = %stored, "attached primary document");
        Ok(stored)
    }

    pub fn replace_primary(&self, id: i64, source: &Path) -> Result<String, RegistryError> {
        self.attach_primary(id, source)
    }

    /// 주 문서 실제 경로. 기록된 경로가 없거나 사라졌으면 `_<id>` 폴더의 최신 파일로 복구한다.
    pub fn resolve_primary(&self, id: i64) -> Result<PrimaryLookup, RegistryError> {
        let conn = self.db.connect()?;
        load_contract(&conn, id)?;

        let recorded = db::files::primary(&conn, id)?;
        if let Some(stored) = &recorded {
            if self.store.exists(stored) {
                return Ok(PrimaryLookup {
                    path: Some(self.store.absolute(stored)),
                    found: true,
                });
            }
        }

        let folders = self.store.find_folders_by_id(id)?;
        let Some(repaired) = self.store.newest_file_in(&folders)? else {
            return Ok(PrimaryLookup::missing());
        };

        db::files::set_primary(&conn, id, &repaired)?;
        tracing::warn!(
            contract_id = id,
            recorded = recorded.as_deref().unwrap_or(""),
            repaired = %repaired,
            "primary document path was stale; relinked to newest file in contract folder"
        );
        Ok(PrimaryLookup {
            path: Some(self.store.absolute(&repaired)),
            found: true,
        })
    }

    /// 주 문서를 dest 로 복사 (잠금과 무관)
    pub fn export_primary(&self, id: i64, dest: &Path) -> Result<u64, RegistryError> {
        let missing = || RegistryError::not_found(format!("Primary document of contract {}", id));
        if !self.resolve_primary(id)?.found {
            return Err(missing());
        }
        let conn = self.db.connect()?;
        let stored = db::files::primary(&conn, id)?.ok_or_else(missing)?;
        Ok(self.store.export(&stored, dest)?)
    }

    /// 미디어 파일 추가: media 모듈과 계약 번호가 필요
    pub fn add_media(&self, id: i64, source: &Path) -> Result<String, RegistryError> {
        let source = validate_source_file(source)?;
        let conn = self.db.connect()?;
        let contract = ensure_head(&conn, id)?;
        ensure_module(&conn, id, ModuleName::Media)?;
        if contract.contract_number.trim().is_empty() {
            return Err(RegistryError::validation("A contract number is required before adding media"));
        }

        let folder = contract_folder_name(&contract.contract_number, id);
        let stored = self.store.store_copy(&folder, Some(MEDIA_DIR), &source)?;
        if let Err(e) = db::files::insert_media(&conn, id, &stored) {
            self.store.remove_stored(&stored);
            return Err(e);
        }

        tracing::info!(contract_id = id, stored = %stored, "added media file");
        Ok(stored)
    }

    pub fn list_media(&self, id: i64) -> Result<Vec<MediaFile>, RegistryError> {
        let conn = self.db.connect()?;
        load_contract(&conn, id)?;
        Ok(db::files::media(&conn, id)?
            .into_iter()
            .map(|stored_path| MediaFile {
                display_name: display_name(&stored_path),
                stored_path,
            })
            .collect())
    }

    pub fn remove_media(&self, id: i64, stored: &str) -> Result<(), RegistryError> {
        let conn = self.db.connect()?;
        ensure_head(&conn, id)?;
        if db::files::delete_media(&conn, id, stored)? == 0 {
            return Err(RegistryError::not_found(format!("Media file {}", stored)));
        }
        self.store.remove_stored(stored);
        tracing::info!(contract_id = id, stored, "removed media file");
        Ok(())
    }

    /// 모든 미디어 파일 삭제, 삭제된 개수 반환
    pub fn remove_all_media(&self, id: i64) -> Result<usize, RegistryError> {
        let conn = self.db.connect()?;
        let contract = ensure_head(&conn, id)?;
        let media = db::files::media(&conn, id)?;
        db::files::delete_all_media(&conn, id)?;

        for stored in &media {
            self.store.remove_stored(stored);
        }
        let folder = contract_folder_name(&contract.contract_number, id);
        self.store.remove_dir(&self.store.media_dir(&folder));

        tracing::info!(contract_id = id, removed = media.len(), "removed all media files");
        Ok(media.len())
    }

    /// 기록된 미디어 파일의 실제 경로
    pub fn media_path(&self, id: i64, stored: &str) -> Result<PathBuf, RegistryError> {
        let conn = self.db.connect()?;
        if !db::files::media(&conn, id)?.iter().any(|s| s == stored) {
            return Err(RegistryError::not_found(format!("Media file {}", stored)));
        }
        let path = self.store.absolute(stored);
        if !path.is_file() {
            return Err(RegistryError::not_found(format!("Media file {} is missing on disk", stored)));
        }
        Ok(path)
    }

    pub fn export_media(&self, id: i64, stored: &str, dest: &Path) -> Result<u64, RegistryError> {
        self.media_path(id, stored)?;
        Ok(self.store.export(stored, dest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HeadFields, Term};
    use crate::registry::testing::{date, Fixture};

    #[test]
    fn test_attach_then_resolve_round_trip() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-1", date(2024, 1, 1));

        let src = fx.source("scan.pdf", b"signed contract bytes");
        let stored = reg.attach_primary(id, &src).unwrap();

        let lookup = reg.resolve_primary(id).unwrap();
        assert!(lookup.found);
        let path = lookup.path.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"signed contract bytes");
        assert_eq!(display_name(&stored), "scan.pdf");
    }

    #[test]
    fn test_replace_removes_previous_file() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-2", date(2024, 1, 1));
        let first = reg.resolve_primary(id).unwrap().path.unwrap();

        reg.replace_primary(id, &fx.source("v2.pdf", b"v2")).unwrap();
        assert!(!first.exists());
        let current = reg.resolve_primary(id).unwrap().path.unwrap();
        assert_eq!(std::fs::read(current).unwrap(), b"v2");
    }

    #[test]
    fn test_stale_path_recovered_from_renamed_folder() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-3", date(2024, 1, 1));
        let original = reg.resolve_primary(id).unwrap().path.unwrap();

        // 폴더가 바깥에서 이름이 바뀐 경우
        let old_dir = original.parent().unwrap().to_path_buf();
        let new_dir = reg.store().root().join(format!("renamed_{}", id));
        std::fs::rename(&old_dir, &new_dir).unwrap();

        let lookup = reg.resolve_primary(id).unwrap();
        assert!(lookup.found);
        let path = lookup.path.unwrap();
        assert!(path.starts_with(&new_dir));

        let conn = reg.database().connect().unwrap();
        let recorded = db::files::primary(&conn, id).unwrap().unwrap();
        assert!(recorded.starts_with(&format!("renamed_{}/", id)));
    }

    #[test]
    fn test_missing_folder_reports_not_found() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-4", date(2024, 1, 1));
        let path = reg.resolve_primary(id).unwrap().path.unwrap();
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();

        assert_eq!(reg.resolve_primary(id).unwrap(), PrimaryLookup::missing());
        let dest = fx.dir.path().join("out.pdf");
        assert!(matches!(reg.export_primary(id, &dest), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_number_rename_moves_folder_on_next_attach() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-5", date(2024, 1, 1));
        reg.edit_head_fields(
            id,
            &HeadFields {
                partner_id: Some(fx.partner_id),
                category_id: Some(fx.category_id),
                contract_number: "A-5/new".into(),
                contract_date: date(2024, 1, 1),
                term: Term::Indefinite,
                nickname: None,
            },
        )
        .unwrap();
        let before = reg.resolve_primary(id).unwrap().path.unwrap();
        assert!(before.starts_with(reg.store().root().join(format!("A-5_{}", id))));

        reg.attach_primary(id, &fx.source("new.pdf", b"n")).unwrap();
        let after = reg.resolve_primary(id).unwrap().path.unwrap();
        assert!(after.starts_with(reg.store().root().join(format!("A-5_new_{}", id))));
    }

    #[test]
    fn test_stale_path_prefers_live_folder_over_leftover_media_folder() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-8", date(2024, 1, 1));
        reg.enable_module(id, ModuleName::Media).unwrap();
        reg.add_media(id, &fx.source("photo.jpg", b"p")).unwrap();
        reg.edit_head_fields(
            id,
            &HeadFields {
                partner_id: Some(fx.partner_id),
                category_id: Some(fx.category_id),
                contract_number: "B-8".into(),
                contract_date: date(2024, 1, 1),
                term: Term::Indefinite,
                nickname: None,
            },
        )
        .unwrap();
        reg.attach_primary(id, &fx.source("live.pdf", b"live")).unwrap();

        let conn = reg.database().connect().unwrap();
        db::files::set_primary(&conn, id, &format!("gone_{}/missing.pdf", id)).unwrap();

        let lookup = reg.resolve_primary(id).unwrap();
        assert!(lookup.found);
        assert_eq!(std::fs::read(lookup.path.unwrap()).unwrap(), b"live");
    }

    #[test]
    fn test_media_lifecycle() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("A-6", date(2024, 1, 1));
        let src = fx.source("deck.jpg", b"jpg");
        assert!(matches!(reg.add_media(id, &src), Err(RegistryError::Validation(_))));

        reg.enable_module(id, ModuleName::Media).unwrap();
        let first = reg.add_media(id, &src).unwrap();
        let second = reg.add_media(id, &fx.source("hull.jpg", b"hull")).unwrap();
        assert!(first.contains(&format!("/{}/", MEDIA_DIR)));

        let listed = reg.list_media(id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].display_name, "deck.jpg");

        let dest = fx.dir.path().join("export").join("deck.jpg");
        assert_eq!(reg.export_media(id, &first, &dest).unwrap(), 3);

        reg.remove_media(id, &first).unwrap();
        assert!(!reg.store().absolute(&first).exists());
        assert!(matches!(reg.remove_media(id, &first), Err(RegistryError::NotFound(_))));

        assert_eq!(reg.remove_all_media(id).unwrap(), 1);
        assert!(!reg.store().absolute(&second).exists());
    }

    #[test]
    fn test_attachments_refused_on_locked_chain_but_readable() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let root = fx.root("A-7", date(2024, 1, 1));
        fx.amendment(root, "A-7-A", date(2024, 2, 1), Term::Indefinite);

        let src = fx.source("late.pdf", b"late");
        assert!(matches!(reg.attach_primary(root, &src), Err(RegistryError::Locked(_))));
        assert!(reg.resolve_primary(root).unwrap().found);
        let dest = fx.dir.path().join("root.pdf");
        assert!(reg.export_primary(root, &dest).is_ok());
    }
}
