//! Application Config
//!
//! 환경 변수에서 읽는 실행 설정과 `.env.local` / `.env` 로더
//!
//! - `CONTRACT_REGISTRY_DATA_DIR`: 데이터 폴더 (기본값: 실행 파일이 있는 폴더)
//! - `CONTRACT_REGISTRY_DELETE_SECRET`: 계약 삭제 확인 비밀번호

use std::path::{Path, PathBuf};

use crate::error::RegistryError;

pub const DATA_DIR_ENV: &str = "CONTRACT_REGISTRY_DATA_DIR";
pub const DELETE_SECRET_ENV: &str = "CONTRACT_REGISTRY_DELETE_SECRET";

/// 삭제 비밀번호 기본값 (실수 방지용)
pub const DEFAULT_DELETE_SECRET: &str = "registry-delete";

const DATABASE_FILE: &str = "database.db";
const FILES_DIR: &str = "files";
const INSTANCE_LOCK_FILE: &str = ".contract_registry.running";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub delete_secret: String,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            delete_secret: DEFAULT_DELETE_SECRET.to_string(),
        }
    }

    /// 환경 변수로 설정 구성 (빈 값은 미설정으로 취급)
    pub fn from_env() -> Result<Self, RegistryError> {
        let data_dir = match env_value(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let delete_secret = env_value(DELETE_SECRET_ENV).unwrap_or_else(|| DEFAULT_DELETE_SECRET.to_string());
        Ok(Self { data_dir, delete_secret })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join(FILES_DIR)
    }

    pub fn instance_lock_path(&self) -> PathBuf {
        self.data_dir.join(INSTANCE_LOCK_FILE)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn default_data_dir() -> Result<PathBuf, RegistryError> {
    let exe = std::env::current_exe()
        .map_err(|e| RegistryError::Config(format!("cannot locate executable: {}", e)))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| RegistryError::Config("executable has no parent directory".into()))
}

fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// 느슨한 `KEY=VALUE` 파싱: 대문자 키만, 주석/설명 라인은 버린다.
fn lenient_pairs(text: &str) -> Vec<(String, String)> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| is_valid_env_key(k))
        .map(|(k, v)| {
            let unquoted = v
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(v);
            (k.to_string(), unquoted.to_string())
        })
        .collect()
}

/// strict 파서(dotenvy) 우선, 실패하면 느슨한 파싱. 이미 설정된 값은 덮어쓰지 않는다.
fn load_env_file(path: &Path) -> bool {
    if dotenvy::from_path(path).is_ok() {
        return true;
    }
    let Ok(text) = std::fs::read_to_string(path) else {
        return false;
    };
    let pairs = lenient_pairs(&text);
    for (key, value) in &pairs {
        if env_value(key).is_none() {
            std::env::set_var(key, value);
        }
    }
    tracing::debug!(path = %path.display(), count = pairs.len(), "loaded env file leniently");
    !pairs.is_empty()
}

/// dir 과 상위 폴더에서 처음 발견되는 `.env.local`
fn nearest_env_local(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .take(5)
        .map(|d| d.join(".env.local"))
        .find(|p| p.is_file())
}

/// 데이터 폴더 설정용 `.env.local` (CWD 또는 실행 파일 위쪽) 과 `.env` 로드. 파일이 없어도 실패하지 않는다.
pub fn load_env_files() {
    let cwd = std::env::current_dir().ok();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    let local = [cwd, exe_dir]
        .into_iter()
        .flatten()
        .filter_map(|dir| nearest_env_local(&dir));
    for path in local {
        if load_env_file(&path) {
            break;
        }
    }

    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_derived_paths() {
        let config = AppConfig::new("/srv/registry");
        assert_eq!(config.database_path(), PathBuf::from("/srv/registry/database.db"));
        assert_eq!(config.files_dir(), PathBuf::from("/srv/registry/files"));
        assert_eq!(
            config.instance_lock_path(),
            PathBuf::from("/srv/registry/.contract_registry.running")
        );
        assert_eq!(config.delete_secret, DEFAULT_DELETE_SECRET);
    }

    #[test]
    fn test_lenient_pairs_skip_prose() {
        let pairs = lenient_pairs(
            "# registry settings\nCONTRACT_REGISTRY_DATA_DIR=\"/srv/data\"\nnot a setting\nlower=3\nCONTRACT_REGISTRY_DELETE_SECRET = pw\n",
        );
        assert_eq!(
            pairs,
            vec![
                ("CONTRACT_REGISTRY_DATA_DIR".to_string(), "/srv/data".to_string()),
                ("CONTRACT_REGISTRY_DELETE_SECRET".to_string(), "pw".to_string()),
            ]
        );
    }

    #[test]
    fn test_nearest_env_local_searches_parents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c").join("d");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(nearest_env_local(&nested), None);

        std::fs::write(dir.path().join(".env.local"), "CRTEST_NEAREST=1\n").unwrap();
        assert_eq!(nearest_env_local(&nested), Some(dir.path().join(".env.local")));
    }

    #[test]
    fn test_env_key_rules() {
        assert!(is_valid_env_key("CONTRACT_REGISTRY_DATA_DIR"));
        assert!(!is_valid_env_key("lower"));
        assert!(!is_valid_env_key(""));
    }
}
