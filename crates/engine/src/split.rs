//! Share resolution for a single expense.
//!
//! Explicit shares are honoured as given; whatever they leave uncovered is
//! divided equally among the implicit participants. Every participant other
//! than the payer then owes their share to the payer.

use std::collections::HashSet;

use crate::{EngineError, Expense, Money, ResultEngine, Share, UserId};

/// One debtor → creditor amount derived from a single expense.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obligation {
    pub debtor: UserId,
    pub creditor: UserId,
    pub amount: Money,
}

/// Computes the share of every participant, in participant order.
///
/// Fails when:
/// - the amount is not positive ([`EngineError::InvalidAmount`])
/// - there are no participants ([`EngineError::EmptyParticipants`])
/// - a user is listed twice ([`EngineError::DuplicateParticipant`])
/// - an explicit share is negative ([`EngineError::InvalidShare`])
/// - explicit shares do not reconcile with the amount within
///   [`Money::EPSILON`] ([`EngineError::ShareMismatch`])
pub fn resolve_shares(expense: &Expense) -> ResultEngine<Vec<(UserId, Money)>> {
    if !expense.amount.is_positive() {
        return Err(EngineError::InvalidAmount(format!(
            "expense {}: amount must be > 0, got {}",
            expense.id, expense.amount
        )));
    }
    if expense.participants.is_empty() {
        return Err(EngineError::EmptyParticipants {
            expense_id: expense.id,
        });
    }

    let mut seen = HashSet::with_capacity(expense.participants.len());
    let mut explicit_total = Money::ZERO;
    let mut implicit_count = 0usize;
    for participant in &expense.participants {
        if !seen.insert(&participant.user_id) {
            return Err(EngineError::DuplicateParticipant {
                expense_id: expense.id,
                user_id: participant.user_id.clone(),
            });
        }
        match participant.share {
            Share::Explicit(share) if share.is_negative() => {
                return Err(EngineError::InvalidShare {
                    expense_id: expense.id,
                    user_id: participant.user_id.clone(),
                    share,
                });
            }
            Share::Explicit(share) => explicit_total += share,
            Share::Implicit => implicit_count += 1,
        }
    }

    let remainder = expense.amount - explicit_total;
    let mismatch = || EngineError::ShareMismatch {
        expense_id: expense.id,
        amount: expense.amount,
        explicit_total,
    };
    let implicit_share = if implicit_count == 0 {
        if !remainder.is_negligible() {
            return Err(mismatch());
        }
        Money::ZERO
    } else if remainder.is_negative() {
        if !remainder.is_negligible() {
            return Err(mismatch());
        }
        Money::ZERO
    } else {
        remainder.split_evenly(implicit_count)
    };

    Ok(expense
        .participants
        .iter()
        .map(|participant| {
            let share = participant.share.explicit().unwrap_or(implicit_share);
            (participant.user_id.clone(), share)
        })
        .collect())
}

/// Resolves an expense into the obligations it creates towards the payer.
///
/// The payer's own share and zero shares produce no obligation.
pub fn resolve(expense: &Expense) -> ResultEngine<Vec<Obligation>> {
    Ok(resolve_shares(expense)?
        .into_iter()
        .filter(|(user_id, share)| share.is_positive() && user_id != &expense.payer_id)
        .map(|(debtor, amount)| Obligation {
            debtor,
            creditor: expense.payer_id.clone(),
            amount,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::Participant;

    fn money(cents: i64) -> Money {
        Money::from_minor(cents)
    }

    fn expense(amount: i64, payer: &str, participants: Vec<Participant>) -> Expense {
        Expense::new(
            Uuid::new_v4(),
            "Dinner",
            money(amount),
            UserId::from(payer),
            participants,
        )
        .unwrap()
    }

    fn obligation(debtor: &str, creditor: &str, amount: Money) -> Obligation {
        Obligation {
            debtor: UserId::from(debtor),
            creditor: UserId::from(creditor),
            amount,
        }
    }

    #[test]
    fn equal_split_owes_payer() {
        let expense = expense(
            90_00,
            "a",
            vec![
                Participant::implicit("a"),
                Participant::implicit("b"),
                Participant::implicit("c"),
            ],
        );

        assert_eq!(
            resolve(&expense).unwrap(),
            vec![
                obligation("b", "a", money(30_00)),
                obligation("c", "a", money(30_00)),
            ]
        );
    }

    #[test]
    fn remainder_splits_among_implicit_participants() {
        let expense = expense(
            100_00,
            "a",
            vec![
                Participant::explicit("a", money(20_00)),
                Participant::implicit("b"),
                Participant::implicit("c"),
            ],
        );

        assert_eq!(
            resolve(&expense).unwrap(),
            vec![
                obligation("b", "a", money(40_00)),
                obligation("c", "a", money(40_00)),
            ]
        );
    }

    #[test]
    fn explicit_shares_are_honoured_exactly() {
        let expense = expense(
            50_00,
            "a",
            vec![
                Participant::explicit("a", money(12_50)),
                Participant::explicit("b", money(37_50)),
            ],
        );

        assert_eq!(
            resolve(&expense).unwrap(),
            vec![obligation("b", "a", money(37_50))]
        );
    }

    #[test]
    fn payer_outside_participants_is_owed_everything() {
        let expense = expense(
            60_00,
            "a",
            vec![Participant::implicit("b"), Participant::implicit("c")],
        );

        let total: Money = resolve(&expense).unwrap().iter().map(|o| o.amount).sum();
        assert_eq!(total, money(60_00));
    }

    #[test]
    fn uneven_split_keeps_precision() {
        let expense = expense(
            100_00,
            "a",
            vec![
                Participant::implicit("a"),
                Participant::implicit("b"),
                Participant::implicit("c"),
            ],
        );

        let shares = resolve_shares(&expense).unwrap();
        let total: Money = shares.iter().map(|(_, share)| *share).sum();
        assert!((total - money(100_00)).is_negligible());
        assert_eq!(shares[1].1.round_cents(), money(33_33));
    }

    #[test]
    fn zero_share_produces_no_obligation() {
        let expense = expense(
            40_00,
            "a",
            vec![
                Participant::explicit("b", Money::ZERO),
                Participant::explicit("c", money(40_00)),
            ],
        );

        assert_eq!(
            resolve(&expense).unwrap(),
            vec![obligation("c", "a", money(40_00))]
        );
    }

    #[test]
    fn implicit_participants_get_nothing_when_explicit_covers_amount() {
        let expense = expense(
            30_00,
            "a",
            vec![
                Participant::explicit("b", money(30_00)),
                Participant::implicit("c"),
            ],
        );

        assert_eq!(
            resolve(&expense).unwrap(),
            vec![obligation("b", "a", money(30_00))]
        );
    }

    #[test]
    fn rounding_noise_within_epsilon_is_accepted() {
        let expense = expense(
            10_00,
            "a",
            vec![
                Participant::explicit("a", money(3_33)),
                Participant::explicit("b", money(3_33)),
                Participant::explicit("c", money(3_33)),
            ],
        );

        assert_eq!(resolve(&expense).unwrap().len(), 2);
    }

    #[test]
    fn explicit_shares_exceeding_amount_are_rejected() {
        let expense = expense(
            50_00,
            "a",
            vec![
                Participant::explicit("a", money(30_00)),
                Participant::explicit("b", money(30_00)),
            ],
        );

        assert_eq!(
            resolve(&expense),
            Err(EngineError::ShareMismatch {
                expense_id: expense.id,
                amount: money(50_00),
                explicit_total: money(60_00),
            })
        );
    }

    #[test]
    fn explicit_shares_exceeding_amount_are_rejected_with_implicit_participants() {
        let expense = expense(
            50_00,
            "a",
            vec![
                Participant::explicit("b", money(60_00)),
                Participant::implicit("c"),
            ],
        );

        assert!(matches!(
            resolve(&expense),
            Err(EngineError::ShareMismatch { .. })
        ));
    }

    #[test]
    fn explicit_shares_below_amount_are_rejected() {
        let expense = expense(
            50_00,
            "a",
            vec![
                Participant::explicit("a", money(10_00)),
                Participant::explicit("b", money(10_00)),
            ],
        );

        assert!(matches!(
            resolve(&expense),
            Err(EngineError::ShareMismatch { .. })
        ));
    }

    #[test]
    fn negative_share_is_rejected() {
        let expense = expense(
            10_00,
            "a",
            vec![
                Participant::explicit("b", money(-5_00)),
                Participant::implicit("c"),
            ],
        );

        assert_eq!(
            resolve(&expense),
            Err(EngineError::InvalidShare {
                expense_id: expense.id,
                user_id: UserId::from("b"),
                share: money(-5_00),
            })
        );
    }

    #[test]
    fn empty_participants_are_rejected() {
        let expense = expense(10_00, "a", vec![]);

        assert_eq!(
            resolve(&expense),
            Err(EngineError::EmptyParticipants {
                expense_id: expense.id
            })
        );
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let expense = expense(0, "a", vec![Participant::implicit("a")]);
        assert!(matches!(
            resolve(&expense),
            Err(EngineError::InvalidAmount(_))
        ));

        let expense = expense_with_amount(money(-1_00));
        assert!(matches!(
            resolve(&expense),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    fn expense_with_amount(amount: Money) -> Expense {
        let mut expense = expense(1, "a", vec![Participant::implicit("b")]);
        expense.amount = amount;
        expense
    }

    #[test]
    fn duplicate_participant_is_rejected() {
        let expense = expense(
            10_00,
            "a",
            vec![Participant::implicit("b"), Participant::implicit("b")],
        );

        assert_eq!(
            resolve(&expense),
            Err(EngineError::DuplicateParticipant {
                expense_id: expense.id,
                user_id: UserId::from("b"),
            })
        );
    }
}
