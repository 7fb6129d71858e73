//! Registry Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// 계약 관리 대장 에러
#[derive(Error, Debug)]
pub enum RegistryError {
    /// 필수 입력 누락/잘못된 값 (상태 변경 없음)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 읽기 전용 head/재무 기록/체인에 대한 변경 시도
    #[error("Locked: {0}")]
    Locked(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 파일 복사/삭제 실패 (사용자에게는 경고로 보고)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 고유 제약 위반 (중복 이름 등)
    #[error("Integrity conflict: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RegistryError::Validation(msg.into())
    }

    pub fn locked(msg: impl Into<String>) -> Self {
        RegistryError::Locked(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        RegistryError::NotFound(msg.into())
    }
}

/// SQLite 제약 위반(UNIQUE 등)은 Integrity 로, 나머지는 Database 로 변환
pub(crate) fn integrity_or_db(err: rusqlite::Error, what: &str) -> RegistryError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            RegistryError::Integrity(format!("{} already exists", what))
        }
        _ => RegistryError::Database(err),
    }
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<RegistryError> for CommandError {
    fn from(error: RegistryError) -> Self {
        let code = match &error {
            RegistryError::Validation(_) => "VALIDATION_ERROR",
            RegistryError::Locked(_) => "LOCKED",
            RegistryError::NotFound(_) => "NOT_FOUND",
            RegistryError::Io(_) => "IO_ERROR",
            RegistryError::Integrity(_) => "INTEGRITY_CONFLICT",
            RegistryError::Database(_) => "DB_ERROR",
            RegistryError::Serialization(_) => "SERIALIZATION_ERROR",
            RegistryError::Config(_) => "CONFIG_ERROR",
        };

        CommandError {
            code: code.to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_codes() {
        let err: CommandError = RegistryError::locked("contract 3 is read-only").into();
        assert_eq!(err.code, "LOCKED");
        assert!(err.message.contains("contract 3 is read-only"));

        let err: CommandError = RegistryError::Integrity("Partner already exists".into()).into();
        assert_eq!(err.code, "INTEGRITY_CONFLICT");
    }

    #[test]
    fn test_unique_violation_maps_to_integrity() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(name TEXT UNIQUE); INSERT INTO t VALUES('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES('a')", [])
            .map_err(|e| integrity_or_db(e, "Name"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Integrity(_)));
    }
}
