//! 상대방 / 연락처 / 카테고리 명령

use serde::{Deserialize, Serialize};

use super::{validation_error, AppState, NoArgs};
use crate::categories::CategoryChoice;
use crate::error::CommandResult;
use crate::models::{Category, Contact, ContactKind, Partner};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameArgs {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameArgs {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdArgs {
    pub id: i64,
}

pub fn list_partners(_args: NoArgs, state: &AppState) -> CommandResult<Vec<Partner>> {
    Ok(state.registry.list_partners()?)
}

pub fn create_partner(args: NameArgs, state: &AppState) -> CommandResult<Partner> {
    Ok(state.registry.create_partner(&args.name)?)
}

pub fn rename_partner(args: RenameArgs, state: &AppState) -> CommandResult<()> {
    Ok(state.registry.rename_partner(args.id, &args.name)?)
}

pub fn delete_partner(args: IdArgs, state: &AppState) -> CommandResult<()> {
    Ok(state.registry.delete_partner(args.id)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerIdArgs {
    pub partner_id: i64,
}

pub fn list_contacts(args: PartnerIdArgs, state: &AppState) -> CommandResult<Vec<Contact>> {
    Ok(state.registry.contacts(args.partner_id)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddContactArgs {
    pub partner_id: i64,
    /// "phone" | "email"
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    pub value: String,
}

pub fn add_contact(args: AddContactArgs, state: &AppState) -> CommandResult<Contact> {
    let kind: ContactKind = args.kind.parse()?;
    Ok(state
        .registry
        .add_contact(args.partner_id, kind, args.label.as_deref(), &args.value)?)
}

pub fn remove_contact(args: IdArgs, state: &AppState) -> CommandResult<()> {
    Ok(state.registry.remove_contact(args.id)?)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListDto {
    pub categories: Vec<CategoryChoice>,
}

/// 깊이 우선, 전체 경로 포함
pub fn list_categories(_args: NoArgs, state: &AppState) -> CommandResult<CategoryListDto> {
    Ok(CategoryListDto {
        categories: state.registry.category_choices()?,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryArgs {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

pub fn create_category(args: CreateCategoryArgs, state: &AppState) -> CommandResult<Category> {
    Ok(state.registry.create_category(&args.name, args.parent_id)?)
}

pub fn rename_category(args: RenameArgs, state: &AppState) -> CommandResult<()> {
    Ok(state.registry.rename_category(args.id, &args.name)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCategoryArgs {
    pub id: i64,
    /// 하위 카테고리가 있으면 확인 필요
    #[serde(default)]
    pub confirm_subtree: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCategoriesDto {
    pub removed: usize,
}

pub fn delete_category(args: DeleteCategoryArgs, state: &AppState) -> CommandResult<DeletedCategoriesDto> {
    let subtree = state.registry.descendant_ids(args.id)?;
    if subtree.len() > 1 && !args.confirm_subtree {
        return Err(validation_error(format!(
            "Category has {} sub-categories; confirm to delete them too",
            subtree.len() - 1
        )));
    }
    let removed = state.registry.delete_category(args.id)?;
    Ok(DeletedCategoriesDto { removed })
}

#[cfg(test)]
mod tests {
    use crate::commands::{dispatch, testing};
    use serde_json::json;

    #[test]
    fn test_category_commands_require_subtree_confirmation() {
        let (_dir, state) = testing::state();
        let root = dispatch(&state, "create_category", json!({ "name": "Transport" })).unwrap();
        dispatch(&state, "create_category", json!({ "name": "Sea", "parentId": root["id"] })).unwrap();

        let listed = dispatch(&state, "list_categories", json!({})).unwrap();
        assert_eq!(listed["categories"][1]["path"], "Transport > Sea");

        let err = dispatch(&state, "delete_category", json!({ "id": root["id"] })).unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        let deleted = dispatch(&state, "delete_category", json!({ "id": root["id"], "confirmSubtree": true })).unwrap();
        assert_eq!(deleted["removed"], 2);
    }

    #[test]
    fn test_contact_kind_is_validated() {
        let (_dir, state) = testing::state();
        let partner = dispatch(&state, "create_partner", json!({ "name": "Acme" })).unwrap();
        let err = dispatch(
            &state,
            "add_contact",
            json!({ "partnerId": partner["id"], "kind": "fax", "value": "1234" }),
        )
        .unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");

        dispatch(
            &state,
            "add_contact",
            json!({ "partnerId": partner["id"], "kind": "phone", "value": "+36 1 111 2222" }),
        )
        .unwrap();
        let contacts = dispatch(&state, "list_contacts", json!({ "partnerId": partner["id"] })).unwrap();
        assert_eq!(contacts[0]["kind"], "phone");
    }
}
