//! Settlement of a group's expenses.
//!
//! [`settle`] folds the obligations of every expense into net balances,
//! rounds them to cents without breaking their zero sum, then pairs the
//! largest creditor with the largest debtor until every balance is zero.
//! Largest-first matching emits at most `N - 1` transactions for `N` users
//! with a non-zero balance. It is a heuristic: some balance distributions
//! admit fewer transactions.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use uuid::Uuid;

use crate::{EngineError, Expense, Money, ResultEngine, UserId, split};

/// A suggested payment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub payer: UserId,
    pub receiver: UserId,
    pub amount: Money,
}

/// Net balances (positive = is owed) and the transactions settling them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    pub balances: BTreeMap<UserId, Money>,
    pub transactions: Vec<Transaction>,
}

impl Settlement {
    /// Returns `true` if nobody owes anything.
    pub fn is_settled(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Outstanding amount of one party during matching.
///
/// Ordered by amount, then by lower user id first.
#[derive(Debug, PartialEq, Eq)]
struct Outstanding {
    amount: Money,
    user_id: Reverse<UserId>,
}

impl Ord for Outstanding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| self.user_id.cmp(&other.user_id))
    }
}

impl PartialOrd for Outstanding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes the net balance of every member from the group's expenses.
///
/// Members untouched by any expense get a zero balance. Users referenced by an
/// expense but no longer members keep their balance.
pub fn balances(
    group_id: Uuid,
    members: &[UserId],
    expenses: &[Expense],
) -> ResultEngine<BTreeMap<UserId, Money>> {
    let mut balances: BTreeMap<UserId, Money> = members
        .iter()
        .map(|member| (member.clone(), Money::ZERO))
        .collect();

    let mut strangers = BTreeSet::new();
    for expense in expenses {
        if expense.group_id != group_id {
            return Err(EngineError::GroupMismatch {
                expense_id: expense.id,
                group_id,
            });
        }
        for obligation in split::resolve(expense)? {
            for user_id in [&obligation.debtor, &obligation.creditor] {
                if !members.contains(user_id) {
                    strangers.insert(user_id.clone());
                }
            }
            *balances.entry(obligation.debtor).or_default() -= obligation.amount;
            *balances.entry(obligation.creditor).or_default() += obligation.amount;
        }
    }

    for user_id in &strangers {
        tracing::warn!("group {group_id}: user {user_id} has expenses but is not a member");
    }

    let total: Money = balances.values().sum();
    if !total.is_negligible() {
        tracing::error!("group {group_id}: balances sum to {total} instead of zero");
        return Err(EngineError::InternalConsistency(format!(
            "balances of group {group_id} sum to {total}"
        )));
    }

    Ok(balances)
}

/// Rounds balances to cents while keeping their sum at exactly zero.
///
/// Every balance is rounded on its own first. The cents the rounding left
/// over are then taken back from the balances that gained most by rounding,
/// or given to those that lost most, one cent each, lower user id first on
/// ties.
pub fn round_balances(
    group_id: Uuid,
    balances: &BTreeMap<UserId, Money>,
) -> ResultEngine<BTreeMap<UserId, Money>> {
    let mut rounded: BTreeMap<UserId, Money> = balances
        .iter()
        .map(|(user_id, balance)| (user_id.clone(), balance.round_cents()))
        .collect();

    let leftover = rounded
        .values()
        .sum::<Money>()
        .to_minor()
        .map_err(|err| EngineError::InternalConsistency(format!("group {group_id}: {err}")))?;
    if leftover == 0 {
        return Ok(rounded);
    }

    let mut candidates: Vec<(Money, &UserId)> = balances
        .iter()
        .map(|(user_id, exact)| (rounded[user_id] - *exact, user_id))
        .collect();
    if leftover > 0 {
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    } else {
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    }

    let cents = leftover.unsigned_abs() as usize;
    if cents > candidates.len() {
        tracing::error!("group {group_id}: {leftover} cents left over after rounding");
        return Err(EngineError::InternalConsistency(format!(
            "rounding of group {group_id} left {leftover} cents"
        )));
    }

    let step = if leftover > 0 {
        -Money::from_minor(1)
    } else {
        Money::from_minor(1)
    };
    for (_, user_id) in candidates.into_iter().take(cents) {
        if let Some(balance) = rounded.get_mut(user_id) {
            *balance += step;
        }
    }

    Ok(rounded)
}

/// Greedy largest-first matching of creditors and debtors.
///
/// Expects balances in whole cents, as produced by [`round_balances`], so that
/// every transaction amount is exact.
pub fn transactions(balances: &BTreeMap<UserId, Money>) -> Vec<Transaction> {
    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (user_id, balance) in balances {
        if balance.is_zero() {
            continue;
        }
        let outstanding = Outstanding {
            amount: balance.abs(),
            user_id: Reverse(user_id.clone()),
        };
        if balance.is_positive() {
            creditors.push(outstanding);
        } else {
            debtors.push(outstanding);
        }
    }

    let mut transactions = Vec::new();
    while let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.amount.min(debtor.amount);
        transactions.push(Transaction {
            payer: debtor.user_id.0.clone(),
            receiver: creditor.user_id.0.clone(),
            amount,
        });

        creditor.amount -= amount;
        debtor.amount -= amount;
        if !creditor.amount.is_zero() {
            creditors.push(creditor);
        }
        if !debtor.amount.is_zero() {
            debtors.push(debtor);
        }
    }

    transactions
}

/// Settles a group.
///
/// `members` and `expenses` must be a consistent snapshot of the group. Any
/// malformed expense aborts the whole computation.
pub fn settle(group_id: Uuid, members: &[UserId], expenses: &[Expense]) -> ResultEngine<Settlement> {
    let exact = balances(group_id, members, expenses)?;
    let balances = round_balances(group_id, &exact)?;
    let transactions = transactions(&balances);
    tracing::debug!(
        "group {group_id}: {} expenses settled with {} transactions",
        expenses.len(),
        transactions.len()
    );

    Ok(Settlement {
        balances,
        transactions,
    })
}
