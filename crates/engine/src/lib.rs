//! Expense splitting and settlement for groups of users.
//!
//! [`split`] and [`settlement`] are pure: they turn expenses into balances and
//! suggested transactions. [`Engine`] persists users, groups and expenses with
//! sea-orm and enforces who may read or change what.

pub use error::EngineError;
pub use expenses::{Expense, Participant, Share};
pub use groups::Group;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, ExpenseUpdate, GroupSettlement, GroupUpdate, NewExpense};
pub use settlement::{Settlement, Transaction};
pub use split::Obligation;
pub use users::{User, UserId};

mod error;
mod expense_participants;
mod expenses;
mod group_members;
mod groups;
mod money;
mod ops;
pub mod settlement;
pub mod split;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
