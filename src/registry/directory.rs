//! 상대방 / 연락처 / 카테고리 관리

use super::ContractRegistry;
use crate::categories::{CategoryChoice, CategoryTree, MAX_CATEGORY_DEPTH};
use crate::db;
use crate::error::RegistryError;
use crate::models::{Category, Contact, ContactKind, Partner};

fn required_name<'a>(name: &'a str, what: &str) -> Result<&'a str, RegistryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::validation(format!("{} name is required", what)));
    }
    Ok(name)
}

/// 같은 부모 아래 이름 중복 검사 (대소문자 무시)
fn ensure_unique_sibling(
    tree: &CategoryTree,
    parent_id: Option<i64>,
    name: &str,
    except: Option<i64>,
) -> Result<(), RegistryError> {
    let taken = tree
        .children(parent_id)
        .iter()
        .any(|c| Some(c.id) != except && c.name.trim().eq_ignore_ascii_case(name));
    if taken {
        return Err(RegistryError::Integrity(format!(
            "Category '{}' already exists on this level",
            name
        )));
    }
    Ok(())
}

impl ContractRegistry {
    // ---- partners ----

    pub fn list_partners(&self) -> Result<Vec<Partner>, RegistryError> {
        let conn = self.db.connect()?;
        db::partners::list(&conn)
    }

    pub fn create_partner(&self, name: &str) -> Result<Partner, RegistryError> {
        let name = required_name(name, "Partner")?;
        let conn = self.db.connect()?;
        let id = db::partners::insert(&conn, name)?;
        tracing::info!(partner_id = id, name, "created partner");
        Ok(Partner { id, name: name.to_string() })
    }

    pub fn rename_partner(&self, id: i64, name: &str) -> Result<(), RegistryError> {
        let name = required_name(name, "Partner")?;
        let conn = self.db.connect()?;
        if db::partners::rename(&conn, id, name)? == 0 {
            return Err(RegistryError::not_found(format!("Partner {}", id)));
        }
        Ok(())
    }

    /// 계약이 참조하는 상대방은 삭제할 수 없다
    pub fn delete_partner(&self, id: i64) -> Result<(), RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let in_use = db::partners::contract_count(&tx, id)?;
        if in_use > 0 {
            return Err(RegistryError::Integrity(format!(
                "Partner {} is used by {} contract(s)",
                id, in_use
            )));
        }
        if db::partners::delete(&tx, id)? == 0 {
            return Err(RegistryError::not_found(format!("Partner {}", id)));
        }
        tx.commit()?;
        tracing::info!(partner_id = id, "deleted partner");
        Ok(())
    }

    pub fn contacts(&self, partner_id: i64) -> Result<Vec<Contact>, RegistryError> {
        let conn = self.db.connect()?;
        db::partners::contacts(&conn, partner_id)
    }

    pub fn add_contact(
        &self,
        partner_id: i64,
        kind: ContactKind,
        label: Option<&str>,
        value: &str,
    ) -> Result<Contact, RegistryError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RegistryError::validation("Contact value is required"));
        }
        let label = label.map(str::trim).filter(|l| !l.is_empty());

        let conn = self.db.connect()?;
        if db::partners::get(&conn, partner_id)?.is_none() {
            return Err(RegistryError::not_found(format!("Partner {}", partner_id)));
        }
        let id = db::partners::insert_contact(&conn, partner_id, kind, label, value)?;
        Ok(Contact {
            id,
            partner_id,
            kind,
            label: label.map(str::to_string),
            value: value.to_string(),
        })
    }

    pub fn remove_contact(&self, contact_id: i64) -> Result<(), RegistryError> {
        let conn = self.db.connect()?;
        if db::partners::delete_contact(&conn, contact_id)? == 0 {
            return Err(RegistryError::not_found(format!("Contact {}", contact_id)));
        }
        Ok(())
    }

    // ---- categories ----

    pub fn category_tree(&self) -> Result<CategoryTree, RegistryError> {
        let conn = self.db.connect()?;
        Ok(CategoryTree::new(db::categories::list(&conn)?))
    }

    pub fn category_choices(&self) -> Result<Vec<CategoryChoice>, RegistryError> {
        Ok(self.category_tree()?.choices())
    }

    pub fn category_path(&self, id: i64) -> Result<String, RegistryError> {
        let tree = self.category_tree()?;
        if !tree.contains(id) {
            return Err(RegistryError::not_found(format!("Category {}", id)));
        }
        Ok(tree.path(Some(id)))
    }

    pub fn descendant_ids(&self, id: i64) -> Result<Vec<i64>, RegistryError> {
        let tree = self.category_tree()?;
        if !tree.contains(id) {
            return Err(RegistryError::not_found(format!("Category {}", id)));
        }
        Ok(tree.descendant_ids(id))
    }

    /// 카테고리 생성. 부모 아래 최대 4단계까지.
    pub fn create_category(&self, name: &str, parent_id: Option<i64>) -> Result<Category, RegistryError> {
        let name = required_name(name, "Category")?;
        let conn = self.db.connect()?;
        let tree = CategoryTree::new(db::categories::list(&conn)?);

        if let Some(parent) = parent_id {
            if !tree.contains(parent) {
                return Err(RegistryError::validation(format!("Parent category {} does not exist", parent)));
            }
            if tree.depth(parent) >= MAX_CATEGORY_DEPTH {
                return Err(RegistryError::validation(format!(
                    "Categories can be nested at most {} levels deep",
                    MAX_CATEGORY_DEPTH
                )));
            }
        }
        ensure_unique_sibling(&tree, parent_id, name, None)?;

        let id = db::categories::insert(&conn, name, parent_id)?;
        tracing::info!(category_id = id, name, ?parent_id, "created category");
        Ok(Category {
            id,
            name: name.to_string(),
            parent_id,
        })
    }

    pub fn rename_category(&self, id: i64, name: &str) -> Result<(), RegistryError> {
        let name = required_name(name, "Category")?;
        let conn = self.db.connect()?;
        let tree = CategoryTree::new(db::categories::list(&conn)?);
        let Some(node) = tree.get(id) else {
            return Err(RegistryError::not_found(format!("Category {}", id)));
        };
        ensure_unique_sibling(&tree, node.parent_id, name, Some(id))?;
        db::categories::rename(&conn, id, name)?;
        Ok(())
    }

    /// 하위 트리 전체 삭제. 어느 노드라도 계약이 참조하면 거부. 삭제된 노드 수 반환.
    pub fn delete_category(&self, id: i64) -> Result<usize, RegistryError> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;
        let tree = CategoryTree::new(db::categories::list(&tx)?);
        if !tree.contains(id) {
            return Err(RegistryError::not_found(format!("Category {}", id)));
        }

        let subtree = tree.descendant_ids(id);
        for node in &subtree {
            if db::categories::contract_count(&tx, *node)? > 0 {
                return Err(RegistryError::Integrity(format!(
                    "Category '{}' is used by contracts",
                    tree.path(Some(*node))
                )));
            }
        }
        for node in subtree.iter().rev() {
            db::categories::delete(&tx, *node)?;
        }
        tx.commit()?;

        tracing::info!(category_id = id, removed = subtree.len(), "deleted category subtree");
        Ok(subtree.len())
    }
}
