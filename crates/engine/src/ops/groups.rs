use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Group, ResultEngine, UserId, expense_participants, expenses, group_members,
    groups, util,
};

use super::{Engine, with_tx};

/// Changes to apply to a group. `None` leaves the field untouched; a blank
/// description clears it.
#[derive(Clone, Debug, Default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn membership(group_id: Uuid, user_id: &UserId) -> group_members::ActiveModel {
    group_members::ActiveModel {
        group_id: ActiveValue::Set(group_id.to_string()),
        user_id: ActiveValue::Set(user_id.to_string()),
        added_at: ActiveValue::Set(Utc::now()),
    }
}

impl Engine {
    /// Create a group owned by `owner_id`. The owner and `members` join it.
    pub async fn new_group(
        &self,
        owner_id: &UserId,
        name: &str,
        description: Option<&str>,
        members: &[UserId],
    ) -> ResultEngine<Group> {
        let mut group = Group::new(name, description, owner_id.clone())?;
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, owner_id).await?;
            for member in members {
                self.require_user_exists(&db_tx, member).await?;
                if !group.is_member(member) {
                    group.add_member(member.clone())?;
                }
            }

            groups::ActiveModel::from(&group).insert(&db_tx).await?;
            for member in &group.members {
                membership(group.id, member).insert(&db_tx).await?;
            }
            tracing::info!(
                "user {owner_id} created group {} with {} members",
                group.id,
                group.members.len()
            );
            Ok(group)
        })
    }

    /// Return a group the user is a member of.
    pub async fn group(&self, group_id: Uuid, user_id: &UserId) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await
        })
    }

    /// Groups the user is a member of, oldest first.
    pub async fn user_groups(&self, user_id: &UserId) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let memberships = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;
            let group_ids = memberships.into_iter().map(|m| m.group_id);
            let models = groups::Entity::find()
                .filter(groups::Column::Id.is_in(group_ids))
                .order_by_asc(groups::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut result = Vec::with_capacity(models.len());
            for model in models {
                let members = self.group_member_ids(&db_tx, &model).await?;
                result.push(Group::try_from((model, members))?);
            }
            Ok(result)
        })
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        user_id: &UserId,
        update: GroupUpdate,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let mut group = self.require_owner(&db_tx, group_id, user_id).await?;
            if let Some(name) = update.name.as_deref() {
                group.name = util::normalize_required_text(name, "group name")?;
            }
            if let Some(description) = update.description.as_deref() {
                group.description = util::normalize_optional_text(Some(description));
            }

            let model = groups::ActiveModel {
                id: ActiveValue::Unchanged(group.id.to_string()),
                name: ActiveValue::Set(group.name.clone()),
                description: ActiveValue::Set(group.description.clone()),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(group)
        })
    }

    /// Delete a group together with its members and expenses.
    pub async fn delete_group(&self, group_id: Uuid, user_id: &UserId) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_owner(&db_tx, group_id, user_id).await?;
            self.delete_group_rows(&db_tx, group_id).await?;
            tracing::info!("user {user_id} deleted group {group_id}");
            Ok(())
        })
    }

    async fn delete_group_rows(&self, db: &DatabaseTransaction, group_id: Uuid) -> ResultEngine<()> {
        let group_key = group_id.to_string();
        let expense_ids: Vec<String> = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_key.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();

        if !expense_ids.is_empty() {
            expense_participants::Entity::delete_many()
                .filter(expense_participants::Column::ExpenseId.is_in(expense_ids))
                .exec(db)
                .await?;
        }
        expenses::Entity::delete_many()
            .filter(expenses::Column::GroupId.eq(group_key.clone()))
            .exec(db)
            .await?;
        group_members::Entity::delete_many()
            .filter(group_members::Column::GroupId.eq(group_key.clone()))
            .exec(db)
            .await?;
        groups::Entity::delete_by_id(group_key).exec(db).await?;
        Ok(())
    }

    /// Add `member_id` to the group. Only the owner may do it.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: &UserId,
        member_id: &UserId,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let mut group = self.require_owner(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member_id).await?;
            group.add_member(member_id.clone())?;
            membership(group_id, member_id).insert(&db_tx).await?;
            tracing::info!("user {member_id} joined group {group_id}");
            Ok(group)
        })
    }

    /// Remove `member_id` from the group. The owner cannot be removed.
    ///
    /// Expenses the member took part in are kept: the member keeps a balance
    /// in the group's settlement.
    pub async fn remove_member(
        &self,
        group_id: Uuid,
        user_id: &UserId,
        member_id: &UserId,
    ) -> ResultEngine<Group> {
        with_tx!(self, |db_tx| {
            let mut group = self.require_owner(&db_tx, group_id, user_id).await?;
            group.remove_member(member_id)?;
            group_members::Entity::delete_by_id((group_id.to_string(), member_id.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!("user {member_id} left group {group_id}");
            Ok(group)
        })
    }
}
