//! Expense records.
//!
//! An `Expense` is paid by one member of a group and split among an ordered
//! list of participants. Each participant either carries an explicit share or
//! takes an equal part of what the explicit shares leave uncovered.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, UserId, expense_participants, util};

/// How much of an expense a participant takes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Share {
    /// A manually assigned portion.
    Explicit(Money),
    /// An equal part of the amount not covered by explicit shares.
    Implicit,
}

impl Share {
    pub fn explicit(self) -> Option<Money> {
        match self {
            Self::Explicit(amount) => Some(amount),
            Self::Implicit => None,
        }
    }
}

impl From<Option<Money>> for Share {
    fn from(value: Option<Money>) -> Self {
        value.map_or(Self::Implicit, Self::Explicit)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub user_id: UserId,
    pub share: Share,
}

impl Participant {
    pub fn implicit(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            share: Share::Implicit,
        }
    }

    pub fn explicit(user_id: impl Into<UserId>, share: Money) -> Self {
        Self {
            user_id: user_id.into(),
            share: Share::Explicit(share),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub payer_id: UserId,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        group_id: Uuid,
        description: &str,
        amount: Money,
        payer_id: UserId,
        participants: Vec<Participant>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            description: util::normalize_required_text(description, "expense description")?,
            amount,
            payer_id,
            participants,
            created_at: Utc::now(),
        })
    }

    /// Returns `true` if the user pays for or takes part in the expense.
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.payer_id == user_id || self.participants.iter().any(|p| &p.user_id == user_id)
    }

    /// Rows to persist for the participants, in order.
    pub(crate) fn participant_models(
        &self,
    ) -> ResultEngine<Vec<expense_participants::ActiveModel>> {
        self.participants
            .iter()
            .enumerate()
            .map(|(position, participant)| {
                let share_minor = participant.share.explicit().map(Money::to_minor).transpose()?;
                let position = i32::try_from(position)
                    .map_err(|_| EngineError::InvalidMember("too many participants".to_string()))?;
                Ok(expense_participants::ActiveModel {
                    expense_id: ActiveValue::Set(self.id.to_string()),
                    user_id: ActiveValue::Set(participant.user_id.to_string()),
                    position: ActiveValue::Set(position),
                    share_minor: ActiveValue::Set(share_minor),
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub payer_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(has_many = "super::expense_participants::Entity")]
    ExpenseParticipants,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Expense> for ActiveModel {
    type Error = EngineError;

    fn try_from(value: &Expense) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(value.id.to_string()),
            group_id: ActiveValue::Set(value.group_id.to_string()),
            description: ActiveValue::Set(value.description.clone()),
            amount_minor: ActiveValue::Set(value.amount.to_minor()?),
            payer_id: ActiveValue::Set(value.payer_id.to_string()),
            created_at: ActiveValue::Set(value.created_at),
        })
    }
}

impl TryFrom<(Model, Vec<expense_participants::Model>)> for Expense {
    type Error = EngineError;

    fn try_from(
        (model, mut participants): (Model, Vec<expense_participants::Model>),
    ) -> Result<Self, Self::Error> {
        participants.sort_by_key(|p| p.position);
        Ok(Self {
            id: util::parse_uuid(&model.id, "expense")?,
            group_id: util::parse_uuid(&model.group_id, "group")?,
            description: model.description,
            amount: Money::from_minor(model.amount_minor),
            payer_id: UserId::new(model.payer_id),
            participants: participants
                .into_iter()
                .map(|p| Participant {
                    user_id: UserId::new(p.user_id),
                    share: p.share_minor.map(Money::from_minor).into(),
                })
                .collect(),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participants_keep_order_and_shares() {
        let group_id = Uuid::new_v4();
        let expense = Expense::new(
            group_id,
            "Dinner",
            Money::from_minor(100_00),
            UserId::from("alice"),
            vec![
                Participant::explicit("alice", Money::from_minor(20_00)),
                Participant::implicit("bob"),
            ],
        )
        .unwrap();

        let rows = expense.participant_models().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].position, ActiveValue::Set(0));
        assert_eq!(rows[0].share_minor, ActiveValue::Set(Some(20_00)));
        assert_eq!(rows[1].user_id, ActiveValue::Set("bob".to_string()));
        assert_eq!(rows[1].share_minor, ActiveValue::Set(None));
    }

    #[test]
    fn stored_rows_round_trip_into_domain() {
        let expense_id = Uuid::new_v4();
        let group_id = Uuid::new_v4();
        let created_at = Utc::now();
        let model = Model {
            id: expense_id.to_string(),
            group_id: group_id.to_string(),
            description: "Taxi".to_string(),
            amount_minor: 42_50,
            payer_id: "bob".to_string(),
            created_at,
        };
        let rows = vec![
            expense_participants::Model {
                expense_id: expense_id.to_string(),
                user_id: "carol".to_string(),
                position: 1,
                share_minor: None,
            },
            expense_participants::Model {
                expense_id: expense_id.to_string(),
                user_id: "bob".to_string(),
                position: 0,
                share_minor: Some(10_00),
            },
        ];

        let expense = Expense::try_from((model, rows)).unwrap();
        assert_eq!(expense.amount, Money::from_minor(42_50));
        assert_eq!(
            expense.participants,
            vec![
                Participant::explicit("bob", Money::from_minor(10_00)),
                Participant::implicit("carol"),
            ]
        );
        assert!(expense.involves(&UserId::from("carol")));
        assert!(!expense.involves(&UserId::from("dave")));
    }

    #[test]
    #[should_panic(expected = "InvalidName(\"expense description must not be empty\")")]
    fn fail_empty_description() {
        Expense::new(
            Uuid::new_v4(),
            " ",
            Money::from_minor(1),
            UserId::from("alice"),
            vec![],
        )
        .unwrap();
    }
}
