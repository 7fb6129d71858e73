//! 첨부 파일 명령
//!
//! 열기(`open_*`)는 OS 기본 프로그램으로 넘기고, 내보내기(`export_*`)는 사용자가 고른 위치로 복사합니다.
//! 둘 다 체인 잠금과 무관하게 허용됩니다.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::commands::contracts::ContractIdArgs;
use crate::error::{CommandError, CommandResult, RegistryError};
use crate::registry::attachments::{MediaFile, PrimaryLookup};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachArgs {
    pub contract_id: i64,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileDto {
    pub stored_path: String,
}

fn open_with_system(path: &Path) -> CommandResult<()> {
    open::that(path).map_err(|e| CommandError {
        code: "OPEN_ERROR".to_string(),
        message: format!("Failed to open {}", path.display()),
        details: Some(e.to_string()),
    })
}

pub fn attach_primary(args: AttachArgs, state: &AppState) -> CommandResult<StoredFileDto> {
    let stored_path = state
        .registry
        .replace_primary(args.contract_id, Path::new(&args.file_path))?;
    Ok(StoredFileDto { stored_path })
}

pub fn resolve_primary(args: ContractIdArgs, state: &AppState) -> CommandResult<PrimaryLookup> {
    Ok(state.registry.resolve_primary(args.contract_id)?)
}

pub fn open_primary(args: ContractIdArgs, state: &AppState) -> CommandResult<PrimaryLookup> {
    let lookup = state.registry.resolve_primary(args.contract_id)?;
    let Some(path) = &lookup.path else {
        return Err(RegistryError::not_found(format!("Primary document of contract {}", args.contract_id)).into());
    };
    open_with_system(path)?;
    Ok(lookup)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPrimaryArgs {
    pub contract_id: i64,
    pub destination: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDto {
    pub destination: PathBuf,
    pub bytes: u64,
}

pub fn export_primary(args: ExportPrimaryArgs, state: &AppState) -> CommandResult<ExportDto> {
    let destination = PathBuf::from(args.destination);
    let bytes = state.registry.export_primary(args.contract_id, &destination)?;
    Ok(ExportDto { destination, bytes })
}

pub fn add_media(args: AttachArgs, state: &AppState) -> CommandResult<MediaFile> {
    let stored_path = state.registry.add_media(args.contract_id, Path::new(&args.file_path))?;
    Ok(MediaFile {
        display_name: crate::attachments::display_name(&stored_path),
        stored_path,
    })
}

pub fn list_media(args: ContractIdArgs, state: &AppState) -> CommandResult<Vec<MediaFile>> {
    Ok(state.registry.list_media(args.contract_id)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaArgs {
    pub contract_id: i64,
    pub stored_path: String,
}

pub fn remove_media(args: MediaArgs, state: &AppState) -> CommandResult<()> {
    Ok(state.registry.remove_media(args.contract_id, &args.stored_path)?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedDto {
    pub removed: usize,
}

pub fn remove_all_media(args: ContractIdArgs, state: &AppState) -> CommandResult<RemovedDto> {
    let removed = state.registry.remove_all_media(args.contract_id)?;
    Ok(RemovedDto { removed })
}

pub fn open_media(args: MediaArgs, state: &AppState) -> CommandResult<()> {
    let path = state.registry.media_path(args.contract_id, &args.stored_path)?;
    open_with_system(&path)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMediaArgs {
    pub contract_id: i64,
    pub stored_path: String,
    pub destination: String,
}

pub fn export_media(args: ExportMediaArgs, state: &AppState) -> CommandResult<ExportDto> {
    let destination = PathBuf::from(args.destination);
    let bytes = state
        .registry
        .export_media(args.contract_id, &args.stored_path, &destination)?;
    Ok(ExportDto { destination, bytes })
}
