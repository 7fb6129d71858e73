//! Contract Registry - 선박 사무소 계약 관리 대장
//!
//! 상대방, 4단계 카테고리, 원계약/변경계약 체인, 첨부 문서, 메모, 재무/미디어 모듈을 관리하는
//! 단일 사용자용 백엔드 라이브러리입니다.
//!
//! 화면 계층은 stdin 으로 한 줄짜리 JSON 명령(`{"cmd": ..., "args": {...}}`)을 보내고
//! stdout 으로 `{"ok": ...}` 또는 `{"error": {...}}` 응답을 받습니다.

pub mod attachments;
pub mod categories;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod models;
pub mod registry;
pub mod settlement;
pub mod utils;

use std::io::{self, BufRead, Write};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use crate::attachments::AttachmentStore;
use crate::commands::AppState;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{CommandError, RegistryError};
use crate::instance::InstanceLock;
use crate::registry::{ContractRegistry, DeletionGate};

/// 다른 인스턴스가 실행 중일 때의 종료 코드
pub const EXIT_ALREADY_RUNNING: i32 = 2;

/// 로그는 stderr 로 (stdout 은 응답 전용)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("contract_registry=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Debug, Deserialize)]
struct Request {
    cmd: String,
    #[serde(default)]
    args: Value,
}

/// 요청 한 줄 처리
fn handle_line(state: &AppState, line: &str) -> Value {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            let error = CommandError {
                code: "INVALID_REQUEST".to_string(),
                message: format!("Malformed request: {}", e),
                details: None,
            };
            return json!({ "error": error });
        }
    };

    match commands::dispatch(state, &request.cmd, request.args) {
        Ok(value) => json!({ "ok": value }),
        Err(error) => {
            tracing::warn!(cmd = %request.cmd, code = %error.code, message = %error.message, "command failed");
            json!({ "error": error })
        }
    }
}

/// 입력이 끝날 때까지 줄 단위 요청/응답 처리
pub fn serve<R: BufRead, W: Write>(state: &AppState, input: R, mut output: W) -> io::Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(state, &line);
        writeln!(output, "{}", response)?;
        output.flush()?;
    }
    Ok(())
}

fn start() -> Result<i32, RegistryError> {
    let config = AppConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let Some(lock) = InstanceLock::try_acquire(&config.instance_lock_path())? else {
        tracing::error!(data_dir = %config.data_dir.display(), "another instance is already running");
        eprintln!(
            "Contract registry is already running for {}. Close it before starting a new one.",
            config.data_dir.display()
        );
        return Ok(EXIT_ALREADY_RUNNING);
    };

    let db = Database::new(&config.database_path());
    db.initialize()?;
    let store = AttachmentStore::new(config.files_dir());
    store.ensure_root()?;

    let state = AppState {
        registry: ContractRegistry::new(db, store),
        deletion_gate: DeletionGate::new(config.delete_secret.clone()),
    };
    tracing::info!(
        data_dir = %config.data_dir.display(),
        lock = %lock.path().display(),
        actor = state.registry.actor(),
        "contract registry started"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&state, stdin.lock(), stdout.lock())?;

    tracing::info!("contract registry stopped");
    Ok(0)
}

/// 앱 실행: 설정 -> 단일 인스턴스 잠금 -> DB 마이그레이션 -> 명령 처리. 종료 코드 반환.
pub fn run() -> i32 {
    config::load_env_files();
    init_tracing();

    match start() {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            eprintln!("Contract registry failed: {}", e);
            1
        }
    }
}
