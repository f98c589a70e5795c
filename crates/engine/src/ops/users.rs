use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, User, UserId, users, util};

use super::{Engine, with_tx};

impl Engine {
    /// Register a new user. Usernames are unique.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<User> {
        let username = util::normalize_required_text(username, "username")?;
        if password.is_empty() {
            return Err(EngineError::InvalidName(
                "password must not be empty".to_string(),
            ));
        }
        let user = User {
            id: UserId::generate(),
            username,
            created_at: Utc::now(),
        };

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Username.eq(user.username.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(user.username));
            }
            users::ActiveModel::new_user(&user, password)
                .insert(&db_tx)
                .await?;
            tracing::info!("created user {} ({})", user.username, user.id);
            Ok(user)
        })
    }

    pub async fn user(&self, user_id: &UserId) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id)
                .await
                .map(User::from)
        })
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            users::Entity::find()
                .filter(users::Column::Username.eq(username.trim().to_string()))
                .one(&db_tx)
                .await?
                .map(User::from)
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
        })
    }

    /// Returns the user matching the credentials, if any.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Option<User>> {
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username.to_string()))
            .filter(users::Column::Password.eq(password.to_string()))
            .one(&self.database)
            .await?;
        Ok(model.map(User::from))
    }

    /// Display names of the given users. Unknown ids are left out.
    pub async fn usernames(&self, user_ids: &[UserId]) -> ResultEngine<HashMap<UserId, String>> {
        with_tx!(self, |db_tx| self.load_usernames(&db_tx, user_ids).await)
    }

    pub(super) async fn load_usernames(
        &self,
        db: &DatabaseTransaction,
        user_ids: &[UserId],
    ) -> ResultEngine<HashMap<UserId, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let models = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids.iter().map(UserId::to_string)))
            .all(db)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| (UserId::new(model.id), model.username))
            .collect())
    }
}
