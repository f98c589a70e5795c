//! JSON bodies exchanged with the BillSplit HTTP API.
//!
//! Amounts are JSON numbers with at most two decimals. Timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct UserView {
        pub id: String,
        pub username: String,
        pub created_at: DateTime<Utc>,
    }
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub description: Option<String>,
        /// Users joining next to the owner.
        #[serde(default)]
        pub members: Vec<String>,
    }

    /// Partial update; absent fields are left untouched, an empty description
    /// clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GroupUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberNew {
        pub user_id: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct MemberView {
        pub id: String,
        pub username: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub owner_id: String,
        pub members: Vec<MemberView>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod expense {
    use super::*;

    /// A participant of an expense. Without `share` the participant takes an
    /// equal part of what the explicit shares leave uncovered.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ParticipantInput {
        pub user_id: String,
        pub share: Option<f64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: Uuid,
        pub description: String,
        pub amount: f64,
        /// Defaults to the caller.
        pub payer_id: Option<String>,
        pub participants: Vec<ParticipantInput>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub description: Option<String>,
        pub amount: Option<f64>,
        pub payer_id: Option<String>,
        pub participants: Option<Vec<ParticipantInput>>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub user_id: String,
        /// Explicit share as entered, `None` for an equal split.
        pub share: Option<f64>,
        /// Resolved share, rounded to cents.
        pub amount: f64,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub group_id: Uuid,
        pub description: String,
        pub amount: f64,
        pub payer_id: String,
        pub participants: Vec<ParticipantView>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod settlement {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub payer_id: String,
        pub receiver_id: String,
        pub amount: f64,
        pub payer_name: String,
        pub receiver_name: String,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct SettlementView {
        /// Net balance per user id: positive is owed, negative owes.
        pub balances: BTreeMap<String, f64>,
        pub transactions: Vec<TransactionView>,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
