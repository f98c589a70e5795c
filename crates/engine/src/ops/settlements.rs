use std::collections::HashMap;

use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{ResultEngine, Settlement, UserId, settlement};

use super::{Engine, with_tx};

/// A group's settlement together with the display name of every user in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSettlement {
    pub group_id: Uuid,
    pub settlement: Settlement,
    pub usernames: HashMap<UserId, String>,
}

impl GroupSettlement {
    /// Display name of a user, falling back to its id.
    pub fn username<'a>(&'a self, user_id: &'a UserId) -> &'a str {
        self.usernames
            .get(user_id)
            .map_or(user_id.as_str(), String::as_str)
    }
}

impl Engine {
    /// Compute who owes whom in a group. `user_id` must be a member.
    ///
    /// Members and expenses are read in one DB transaction, so the settlement
    /// reflects a single snapshot of the group.
    pub async fn group_settlement(
        &self,
        group_id: Uuid,
        user_id: &UserId,
    ) -> ResultEngine<GroupSettlement> {
        with_tx!(self, |db_tx| {
            let group = self.require_member(&db_tx, group_id, user_id).await?;
            let expenses = self.load_expenses(&db_tx, group_id).await?;
            let settlement = settlement::settle(group_id, &group.members, &expenses)?;

            let user_ids: Vec<UserId> = settlement.balances.keys().cloned().collect();
            let usernames = self.load_usernames(&db_tx, &user_ids).await?;
            Ok(GroupSettlement {
                group_id,
                settlement,
                usernames,
            })
        })
    }
}
