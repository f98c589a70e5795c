use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, Group, ResultEngine, UserId, expense_participants, expenses,
    group_members, groups, users,
};

use super::Engine;

impl Engine {
    async fn find_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Member ids of a group, owner first, then by join time.
    pub(super) async fn group_member_ids(
        &self,
        db: &DatabaseTransaction,
        model: &groups::Model,
    ) -> ResultEngine<Vec<UserId>> {
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(model.id.clone()))
            .order_by_asc(group_members::Column::AddedAt)
            .order_by_asc(group_members::Column::UserId)
            .all(db)
            .await?;
        let mut members: Vec<UserId> = rows.into_iter().map(|row| UserId::new(row.user_id)).collect();
        if let Some(position) = members.iter().position(|m| m.as_str() == model.owner_id) {
            members[..=position].rotate_right(1);
        }
        Ok(members)
    }

    pub(super) async fn load_group(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Group> {
        let model = self
            .find_group(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        let members = self.group_member_ids(db, &model).await?;
        Group::try_from((model, members))
    }

    /// Loads the group if `user_id` is one of its members.
    pub(super) async fn require_member(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &UserId,
    ) -> ResultEngine<Group> {
        let group = self.load_group(db, group_id).await?;
        if !group.is_member(user_id) {
            return Err(EngineError::Forbidden(format!(
                "user {user_id} is not a member of group {group_id}"
            )));
        }
        Ok(group)
    }

    /// Loads the group if `user_id` owns it.
    pub(super) async fn require_owner(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        user_id: &UserId,
    ) -> ResultEngine<Group> {
        let group = self.load_group(db, group_id).await?;
        if !group.is_owner(user_id) {
            return Err(EngineError::Forbidden(format!(
                "only the owner can manage group {group_id}"
            )));
        }
        Ok(group)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        user_id: &UserId,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    async fn expense_from_model(
        &self,
        db: &DatabaseTransaction,
        model: expenses::Model,
    ) -> ResultEngine<Expense> {
        let participants = expense_participants::Entity::find()
            .filter(expense_participants::Column::ExpenseId.eq(model.id.clone()))
            .all(db)
            .await?;
        Expense::try_from((model, participants))
    }

    pub(super) async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        self.expense_from_model(db, model).await
    }

    /// All expenses of a group, oldest first.
    pub(super) async fn load_expenses(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
    ) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .all(db)
            .await?;
        let mut expenses = Vec::with_capacity(models.len());
        for model in models {
            expenses.push(self.expense_from_model(db, model).await?);
        }
        Ok(expenses)
    }
}
