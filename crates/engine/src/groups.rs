//! A `Group` collects the users who share expenses. The owner is always a
//! member.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, UserId, util};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Builds a new group owned (and joined) by `owner_id`.
    pub fn new(name: &str, description: Option<&str>, owner_id: UserId) -> ResultEngine<Self> {
        let name = util::normalize_required_text(name, "group name")?;
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: util::normalize_optional_text(description),
            members: vec![owner_id.clone()],
            owner_id,
            created_at: Utc::now(),
        })
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    pub fn add_member(&mut self, user_id: UserId) -> ResultEngine<()> {
        if self.is_member(&user_id) {
            return Err(EngineError::ExistingKey(user_id.to_string()));
        }
        self.members.push(user_id);
        Ok(())
    }

    pub fn remove_member(&mut self, user_id: &UserId) -> ResultEngine<()> {
        if self.is_owner(user_id) {
            return Err(EngineError::InvalidMember(
                "the owner cannot leave the group".to_string(),
            ));
        }
        let position = self
            .members
            .iter()
            .position(|member| member == user_id)
            .ok_or_else(|| EngineError::KeyNotFound(user_id.to_string()))?;
        self.members.remove(position);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(value: &Group) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            owner_id: ActiveValue::Set(value.owner_id.to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<(Model, Vec<UserId>)> for Group {
    type Error = EngineError;

    fn try_from((model, members): (Model, Vec<UserId>)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: util::parse_uuid(&model.id, "group")?,
            name: model.name,
            description: model.description,
            owner_id: UserId::new(model.owner_id),
            members,
            created_at: model.created_at,
        })
    }
}
