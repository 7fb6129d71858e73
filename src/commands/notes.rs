//! 메모 명령

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::commands::contracts::ContractIdArgs;
use crate::error::CommandResult;
use crate::models::Note;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    #[serde(flatten)]
    pub note: Note,
    pub is_markup: bool,
}

impl From<Note> for NoteDto {
    fn from(note: Note) -> Self {
        NoteDto {
            is_markup: note.is_markup(),
            note,
        }
    }
}

pub fn list_notes(args: ContractIdArgs, state: &AppState) -> CommandResult<Vec<NoteDto>> {
    Ok(state
        .registry
        .notes(args.contract_id)?
        .into_iter()
        .map(NoteDto::from)
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNoteArgs {
    pub contract_id: i64,
    pub text: String,
}

pub fn add_note(args: AddNoteArgs, state: &AppState) -> CommandResult<NoteDto> {
    Ok(state.registry.add_note(args.contract_id, &args.text)?.into())
}
