//! The module contains the errors the engine can throw.
//!
//! Expense validation errors:
//!
//! - [`EmptyParticipants`] an expense without participants.
//! - [`InvalidShare`] an explicit share below zero.
//! - [`ShareMismatch`] explicit shares that do not reconcile with the amount.
//! - [`DuplicateParticipant`] the same user listed twice in one expense.
//!
//! [`InternalConsistency`] is never caused by user input: it means a computed
//! settlement broke one of its invariants.
//!
//!  [`EmptyParticipants`]: EngineError::EmptyParticipants
//!  [`InvalidShare`]: EngineError::InvalidShare
//!  [`ShareMismatch`]: EngineError::ShareMismatch
//!  [`DuplicateParticipant`]: EngineError::DuplicateParticipant
//!  [`InternalConsistency`]: EngineError::InternalConsistency
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::{Money, UserId};

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("expense {expense_id} has no participants")]
    EmptyParticipants { expense_id: Uuid },
    #[error("expense {expense_id}: share {share} of user {user_id} must not be negative")]
    InvalidShare {
        expense_id: Uuid,
        user_id: UserId,
        share: Money,
    },
    #[error(
        "expense {expense_id}: explicit shares ({explicit_total}) do not reconcile with amount {amount}"
    )]
    ShareMismatch {
        expense_id: Uuid,
        amount: Money,
        explicit_total: Money,
    },
    #[error("expense {expense_id}: user {user_id} listed more than once")]
    DuplicateParticipant { expense_id: Uuid, user_id: UserId },
    #[error("expense {expense_id} does not belong to group {group_id}")]
    GroupMismatch { expense_id: Uuid, group_id: Uuid },
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid member: {0}")]
    InvalidMember(String),
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` for errors caused by malformed expense data.
    pub fn is_expense_rejection(&self) -> bool {
        matches!(
            self,
            Self::EmptyParticipants { .. }
                | Self::InvalidShare { .. }
                | Self::ShareMismatch { .. }
                | Self::DuplicateParticipant { .. }
        )
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::EmptyParticipants { expense_id: a },
                Self::EmptyParticipants { expense_id: b },
            ) => a == b,
            (
                Self::InvalidShare {
                    expense_id: a,
                    user_id: ua,
                    share: sa,
                },
                Self::InvalidShare {
                    expense_id: b,
                    user_id: ub,
                    share: sb,
                },
            ) => a == b && ua == ub && sa == sb,
            (
                Self::ShareMismatch {
                    expense_id: a,
                    amount: aa,
                    explicit_total: ta,
                },
                Self::ShareMismatch {
                    expense_id: b,
                    amount: ab,
                    explicit_total: tb,
                },
            ) => a == b && aa == ab && ta == tb,
            (
                Self::DuplicateParticipant {
                    expense_id: a,
                    user_id: ua,
                },
                Self::DuplicateParticipant {
                    expense_id: b,
                    user_id: ub,
                },
            ) => a == b && ua == ub,
            (
                Self::GroupMismatch {
                    expense_id: a,
                    group_id: ga,
                },
                Self::GroupMismatch {
                    expense_id: b,
                    group_id: gb,
                },
            ) => a == b && ga == gb,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidMember(a), Self::InvalidMember(b)) => a == b,
            (Self::InternalConsistency(a), Self::InternalConsistency(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
