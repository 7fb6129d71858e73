//! Attachment Store
//!
//! 계약별 폴더에 첨부 파일을 보관하는 파일 시스템 저장소
//!
//! 레이아웃:
//! - `<root>/<번호>_<id>/<uuid>_<원본이름>`        : 주 문서
//! - `<root>/<번호>_<id>/media/<uuid>_<원본이름>`  : 미디어 파일
//!
//! DB 에는 root 기준 상대 경로(`/` 구분)를 저장합니다.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use uuid::Uuid;

/// 미디어 파일 하위 폴더 이름
pub const MEDIA_DIR: &str = "media";

/// uuid(simple) 접두어 길이
const PREFIX_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// 저장된 상대 경로 -> 실제 경로
    pub fn absolute(&self, stored: &str) -> PathBuf {
        stored
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    pub fn contract_dir(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }

    pub fn media_dir(&self, folder: &str) -> PathBuf {
        self.contract_dir(folder).join(MEDIA_DIR)
    }

    /// 원본을 계약 폴더(또는 하위 폴더)에 충돌 없는 이름으로 복사하고 상대 경로를 반환
    pub fn store_copy(&self, folder: &str, sub_dir: Option<&str>, source: &Path) -> io::Result<String> {
        let mut dir = self.contract_dir(folder);
        let mut prefix = folder.to_string();
        if let Some(sub) = sub_dir {
            dir = dir.join(sub);
            prefix = format!("{}/{}", prefix, sub);
        }
        fs::create_dir_all(&dir)?;

        let original = source
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("attachment");
        let name = stored_file_name(original);
        fs::copy(source, dir.join(&name))?;

        Ok(format!("{}/{}", prefix, name))
    }

    pub fn exists(&self, stored: &str) -> bool {
        self.absolute(stored).is_file()
    }

    /// 최선 노력 삭제: 실패는 로그만 남긴다
    pub fn remove_stored(&self, stored: &str) {
        let path = self.absolute(stored);
        if !path.is_file() {
            return;
        }
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove attachment file");
        }
    }

    /// 최선 노력 폴더 삭제
    pub fn remove_dir(&self, dir: &Path) {
        if !dir.is_dir() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(dir) {
            tracing::warn!(path = %dir.display(), error = %e, "failed to remove attachment folder");
        }
    }

    /// `_<id>` 로 끝나는 모든 계약 폴더 (번호 변경으로 예전 폴더가 남아 있을 수 있음)
    pub fn find_folders_by_id(&self, contract_id: i64) -> io::Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let suffix = format!("_{}", contract_id);
        let mut matches: Vec<String> = fs::read_dir(&self.root)?
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(&suffix))
            .collect();
        matches.sort();
        Ok(matches)
    }

    fn newest_entry(&self, folder: &str) -> io::Result<Option<(SystemTime, String)>> {
        let dir = self.contract_dir(folder);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut newest: Option<(SystemTime, String)> = None;
        for entry in fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            if newest.as_ref().map_or(true, |best| (modified, &name) > (best.0, &best.1)) {
                newest = Some((modified, name));
            }
        }
        Ok(newest)
    }

    /// 폴더 안에서 가장 최근 수정된 (숨김 아닌) 파일 이름
    pub fn newest_file(&self, folder: &str) -> io::Result<Option<String>> {
        Ok(self.newest_entry(folder)?.map(|(_, name)| name))
    }

    /// 여러 폴더 중 가장 최근 파일의 상대 경로 (`<폴더>/<이름>`)
    pub fn newest_file_in(&self, folders: &[String]) -> io::Result<Option<String>> {
        let mut newest: Option<(SystemTime, String)> = None;
        for folder in folders {
            if let Some((modified, name)) = self.newest_entry(folder)? {
                let stored = format!("{}/{}", folder, name);
                if newest.as_ref().map_or(true, |best| (modified, &stored) > (best.0, &best.1)) {
                    newest = Some((modified, stored));
                }
            }
        }
        Ok(newest.map(|(_, stored)| stored))
    }

    /// 저장된 파일을 사용자가 지정한 위치로 복사 (다운로드)
    pub fn export(&self, stored: &str, dest: &Path) -> io::Result<u64> {
        let source = self.absolute(stored);
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(source, dest)
    }
}

/// `<uuid hex>_<원본 이름>`
pub fn stored_file_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), original)
}

/// 표시 이름: 32자리 hex 접두어를 뗀 원본 파일 이름
pub fn display_name(stored: &str) -> String {
    let base = stored.rsplit('/').next().unwrap_or(stored);
    if let Some((prefix, rest)) = base.split_once('_') {
        if prefix.len() == PREFIX_LEN && prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return rest.to_string();
        }
    }
    base.to_string()
}

/// 상대 경로의 첫 구간(계약 폴더 이름)
pub fn folder_of(stored: &str) -> Option<&str> {
    stored.split_once('/').map(|(folder, _)| folder).filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_copy_preserves_bytes_and_name() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path().join("files"));
        let src = dir.path().join("doc.pdf");
        fs::write(&src, b"contract body").unwrap();

        let stored = store.store_copy("SZ-001_1", None, &src).unwrap();
        assert!(stored.starts_with("SZ-001_1/"));
        assert_eq!(display_name(&stored), "doc.pdf");
        assert_eq!(fs::read(store.absolute(&stored)).unwrap(), b"contract body");

        let media = store.store_copy("SZ-001_1", Some(MEDIA_DIR), &src).unwrap();
        assert!(media.starts_with("SZ-001_1/media/"));
        assert_ne!(stored, media);
    }

    #[test]
    fn test_display_name_keeps_unprefixed_names() {
        assert_eq!(display_name("folder/plain_name.pdf"), "plain_name.pdf");
        assert_eq!(
            display_name("f/media/0123456789abcdef0123456789abcdef_photo 1.jpg"),
            "photo 1.jpg"
        );
        assert_eq!(folder_of("SZ_3/x.pdf"), Some("SZ_3"));
        assert_eq!(folder_of("x.pdf"), None);
    }

    #[test]
    fn test_find_folder_and_newest_file() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        fs::create_dir_all(dir.path().join("OLD-NUM_12")).unwrap();
        fs::create_dir_all(dir.path().join("OTHER_112x")).unwrap();
        fs::write(dir.path().join("OLD-NUM_12").join(".hidden"), b"x").unwrap();
        fs::write(dir.path().join("OLD-NUM_12").join("a.pdf"), b"a").unwrap();

        assert_eq!(store.find_folders_by_id(12).unwrap(), vec!["OLD-NUM_12".to_string()]);
        assert!(store.find_folders_by_id(99).unwrap().is_empty());
        assert_eq!(store.newest_file("OLD-NUM_12").unwrap(), Some("a.pdf".to_string()));
        assert_eq!(store.newest_file("missing").unwrap(), None);
    }

    #[test]
    fn test_newest_file_across_folders_skips_media_only_folder() {
        let dir = tempdir().unwrap();
        let store = AttachmentStore::new(dir.path());
        fs::create_dir_all(dir.path().join("A-1_4").join(MEDIA_DIR)).unwrap();
        fs::write(dir.path().join("A-1_4").join(MEDIA_DIR).join("p.jpg"), b"p").unwrap();
        fs::create_dir_all(dir.path().join("B-1_4")).unwrap();
        fs::write(dir.path().join("B-1_4").join("doc.pdf"), b"d").unwrap();

        let folders = store.find_folders_by_id(4).unwrap();
        assert_eq!(folders, vec!["A-1_4".to_string(), "B-1_4".to_string()]);
        assert_eq!(store.newest_file_in(&folders).unwrap(), Some("B-1_4/doc.pdf".to_string()));
        assert_eq!(store.newest_file_in(&[]).unwrap(), None);
    }
}
