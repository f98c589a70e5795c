use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Expense, Group, Money, Participant, ResultEngine, UserId, expense_participants,
    expenses, group_members, split, util,
};

use super::{Engine, with_tx};

/// Input for [`Engine::new_expense`].
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub group_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub payer_id: UserId,
    pub participants: Vec<Participant>,
}

/// Changes to apply to an expense. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub payer_id: Option<UserId>,
    pub participants: Option<Vec<Participant>>,
}

/// Checks an expense against the group it is written to.
fn validate_expense(group: &Group, expense: &Expense) -> ResultEngine<()> {
    if !group.is_member(&expense.payer_id) {
        return Err(EngineError::InvalidMember(format!(
            "payer {} is not a member of group {}",
            expense.payer_id, group.id
        )));
    }
    if let Some(outsider) = expense
        .participants
        .iter()
        .find(|participant| !group.is_member(&participant.user_id))
    {
        return Err(EngineError::InvalidMember(format!(
            "participant {} is not a member of group {}",
            outsider.user_id, group.id
        )));
    }
    split::resolve_shares(expense)?;
    Ok(())
}

fn require_payer_or_owner(group: &Group, expense: &Expense, user_id: &UserId) -> ResultEngine<()> {
    if &expense.payer_id != user_id && !group.is_owner(user_id) {
        return Err(EngineError::Forbidden(format!(
            "only the payer or the group owner can modify expense {}",
            expense.id
        )));
    }
    Ok(())
}

impl Engine {
    /// Record a new expense. `user_id` must be a member of the group.
    pub async fn new_expense(&self, user_id: &UserId, new: NewExpense) -> ResultEngine<Expense> {
        let expense = Expense::new(
            new.group_id,
            &new.description,
            new.amount,
            new.payer_id,
            new.participants,
        )?;
        let expense_model = expenses::ActiveModel::try_from(&expense)?;
        let participant_models = expense.participant_models()?;

        with_tx!(self, |db_tx| {
            let group = self.require_member(&db_tx, expense.group_id, user_id).await?;
            validate_expense(&group, &expense)?;

            expense_model.insert(&db_tx).await?;
            for participant in participant_models {
                participant.insert(&db_tx).await?;
            }
            tracing::info!(
                "user {user_id} added expense {} of {} to group {}",
                expense.id,
                expense.amount,
                expense.group_id
            );
            Ok(expense)
        })
    }

    /// Return an expense of a group the user is a member of.
    pub async fn expense(&self, expense_id: Uuid, user_id: &UserId) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let expense = self.require_expense(&db_tx, expense_id).await?;
            self.require_member(&db_tx, expense.group_id, user_id).await?;
            Ok(expense)
        })
    }

    /// Expenses of a group, oldest first.
    pub async fn group_expenses(
        &self,
        group_id: Uuid,
        user_id: &UserId,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            self.require_member(&db_tx, group_id, user_id).await?;
            self.load_expenses(&db_tx, group_id).await
        })
    }

    /// Expenses paid for or shared by `target_id`, restricted to the groups
    /// `user_id` belongs to. Oldest first.
    pub async fn user_expenses(
        &self,
        target_id: &UserId,
        user_id: &UserId,
    ) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            let memberships = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?;

            let mut result = Vec::new();
            for membership in memberships {
                let group_id = util::parse_uuid(&membership.group_id, "group")?;
                let expenses = self.load_expenses(&db_tx, group_id).await?;
                result.extend(expenses.into_iter().filter(|e| e.involves(target_id)));
            }
            result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(result)
        })
    }

    /// Update an expense. Only the payer or the group owner may do it.
    pub async fn update_expense(
        &self,
        expense_id: Uuid,
        user_id: &UserId,
        update: ExpenseUpdate,
    ) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = self.require_expense(&db_tx, expense_id).await?;
            let group = self.load_group(&db_tx, expense.group_id).await?;
            require_payer_or_owner(&group, &expense, user_id)?;

            if let Some(description) = update.description.as_deref() {
                expense.description =
                    util::normalize_required_text(description, "expense description")?;
            }
            if let Some(amount) = update.amount {
                expense.amount = amount;
            }
            if let Some(payer_id) = update.payer_id {
                expense.payer_id = payer_id;
            }
            if let Some(participants) = update.participants {
                expense.participants = participants;
            }
            validate_expense(&group, &expense)?;

            let mut model = expenses::ActiveModel::try_from(&expense)?;
            model.id = ActiveValue::Unchanged(expense.id.to_string());
            model.created_at = ActiveValue::Unchanged(expense.created_at);
            model.update(&db_tx).await?;
            self.replace_participants(&db_tx, &expense).await?;

            tracing::info!("user {user_id} updated expense {expense_id}");
            Ok(expense)
        })
    }

    async fn replace_participants(
        &self,
        db: &DatabaseTransaction,
        expense: &Expense,
    ) -> ResultEngine<()> {
        expense_participants::Entity::delete_many()
            .filter(expense_participants::Column::ExpenseId.eq(expense.id.to_string()))
            .exec(db)
            .await?;
        for participant in expense.participant_models()? {
            participant.insert(db).await?;
        }
        Ok(())
    }

    /// Delete an expense. Only the payer or the group owner may do it.
    pub async fn delete_expense(&self, expense_id: Uuid, user_id: &UserId) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let expense = self.require_expense(&db_tx, expense_id).await?;
            let group = self.load_group(&db_tx, expense.group_id).await?;
            require_payer_or_owner(&group, &expense, user_id)?;

            expense_participants::Entity::delete_many()
                .filter(expense_participants::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;

            tracing::info!("user {user_id} deleted expense {expense_id}");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        let mut group = Group::new("Flat", None, UserId::from("alice")).unwrap();
        group.add_member(UserId::from("bob")).unwrap();
        group
    }

    fn expense(group: &Group, payer: &str, participants: Vec<Participant>) -> Expense {
        Expense::new(
            group.id,
            "Groceries",
            Money::from_minor(30_00),
            UserId::from(payer),
            participants,
        )
        .unwrap()
    }

    #[test]
    fn members_can_share_an_expense() {
        let group = group();
        let expense = expense(
            &group,
            "bob",
            vec![Participant::implicit("alice"), Participant::implicit("bob")],
        );
        assert_eq!(validate_expense(&group, &expense), Ok(()));
    }

    #[test]
    fn outsider_participant_is_rejected() {
        let group = group();
        let expense = expense(
            &group,
            "bob",
            vec![Participant::implicit("bob"), Participant::implicit("mallory")],
        );
        assert!(matches!(
            validate_expense(&group, &expense),
            Err(EngineError::InvalidMember(_))
        ));
    }

    #[test]
    fn outsider_payer_is_rejected() {
        let group = group();
        let expense = expense(&group, "mallory", vec![Participant::implicit("bob")]);
        assert!(matches!(
            validate_expense(&group, &expense),
            Err(EngineError::InvalidMember(_))
        ));
    }

    #[test]
    fn resolver_errors_surface() {
        let group = group();
        let expense = expense(
            &group,
            "bob",
            vec![Participant::explicit("alice", Money::from_minor(5_00))],
        );
        assert!(validate_expense(&group, &expense)
            .unwrap_err()
            .is_expense_rejection());
    }

    #[test]
    fn only_payer_or_owner_may_modify() {
        let mut group = group();
        group.add_member(UserId::from("carol")).unwrap();
        let expense = expense(&group, "bob", vec![Participant::implicit("carol")]);

        assert_eq!(require_payer_or_owner(&group, &expense, &UserId::from("bob")), Ok(()));
        assert_eq!(require_payer_or_owner(&group, &expense, &UserId::from("alice")), Ok(()));
        assert!(matches!(
            require_payer_or_owner(&group, &expense, &UserId::from("carol")),
            Err(EngineError::Forbidden(_))
        ));
    }
}
