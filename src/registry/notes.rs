//! 계약 메모 (추가 전용)

use super::{ensure_head, load_contract, ContractRegistry};
use crate::db;
use crate::error::RegistryError;
use crate::models::Note;
use crate::utils::timestamp_now;

impl ContractRegistry {
    /// 메모 추가: head 에서만, 계약의 updated_at 도 갱신
    pub fn add_note(&self, id: i64, text: &str) -> Result<Note, RegistryError> {
        if text.trim().is_empty() {
            return Err(RegistryError::validation("Note text is empty"));
        }
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        ensure_head(&tx, id)?;

        let now = timestamp_now();
        let note_id = db::notes::insert(&tx, id, text, &now, &self.actor)?;
        db::contracts::touch(&tx, id, &now)?;
        tx.commit()?;

        Ok(Note {
            id: note_id,
            contract_id: id,
            body: text.to_string(),
            created_at: now,
            created_by: self.actor.clone(),
        })
    }

    /// 최신순 메모 목록
    pub fn notes(&self, id: i64) -> Result<Vec<Note>, RegistryError> {
        let conn = self.db.connect()?;
        load_contract(&conn, id)?;
        db::notes::list(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;
    use crate::registry::testing::{date, Fixture};

    #[test]
    fn test_notes_newest_first_with_author() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let id = fx.root("N-1", date(2024, 1, 1));

        reg.add_note(id, "<p>called the agent</p>").unwrap();
        let latest = reg.add_note(id, "deposit reminder sent").unwrap();
        assert_eq!(latest.created_by, "tester");

        let notes = reg.notes(id).unwrap();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].body, "deposit reminder sent");
        assert!(notes[1].is_markup());
        assert_eq!(notes[2].body, "Created. Created by: tester");

        assert!(matches!(reg.add_note(id, "  "), Err(RegistryError::Validation(_))));
    }

    #[test]
    fn test_notes_refused_on_superseded_row() {
        let fx = Fixture::new();
        let reg = &fx.registry;
        let root = fx.root("N-2", date(2024, 1, 1));
        let amendment = fx.amendment(root, "N-2-A", date(2024, 2, 1), Term::Indefinite);

        assert!(matches!(reg.add_note(root, "late"), Err(RegistryError::Locked(_))));
        assert!(reg.add_note(amendment, "ok").is_ok());
        assert_eq!(reg.notes(root).unwrap().len(), 1);
    }
}
