use rust_decimal::{Decimal, RoundingStrategy};

use crate::balance::{compute_balances, BalanceMap};
use crate::error::SettlementError;
use crate::schemas::{Balance, Expense, Member, Party, Settlement, Transaction};

/// Balances within one cent of zero count as settled. Applied everywhere a
/// balance is compared against zero so rounding drift never produces a
/// phantom debt.
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Clone, Debug)]
struct PersonalBalance {
    party: Party,
    remaining: Decimal,
}

/// Reduces net balances into an ordered list of settle-up transactions by
/// greedy largest-magnitude-first matching.
///
/// The plan is not guaranteed to be globally minimal, only deterministic: the
/// same balances always produce the same transactions in the same order.
pub fn plan_transactions(balances: &BalanceMap) -> Result<Vec<Transaction>, SettlementError> {
    let total: Decimal = balances.values().map(|entry| entry.balance).sum();
    if total.abs() > EPSILON {
        tracing::warn!(sum = %total, members = balances.len(), "balances do not sum to zero");
        return Err(SettlementError::InconsistentBalances(total));
    }

    // Divide members into creditors (owed money) and debtors (owing money).
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();
    for entry in balances.values() {
        let person = PersonalBalance {
            party: Party::from(&entry.member),
            remaining: entry.balance,
        };
        if entry.balance > EPSILON {
            creditors.push(person);
        } else if entry.balance < -EPSILON {
            debtors.push(person);
        }
    }

    // Largest magnitudes first; equal balances fall back to member id so the
    // output order is reproducible.
    creditors.sort_by(|a, b| {
        b.remaining
            .cmp(&a.remaining)
            .then_with(|| a.party.member_id.cmp(&b.party.member_id))
    });
    debtors.sort_by(|a, b| {
        a.remaining
            .cmp(&b.remaining)
            .then_with(|| a.party.member_id.cmp(&b.party.member_id))
    });

    let mut transactions = Vec::new();
    let mut i = 0;
    let mut j = 0;

    while i < creditors.len() && j < debtors.len() {
        let amount = creditors[i].remaining.min(debtors[j].remaining.abs());

        if amount > EPSILON {
            transactions.push(Transaction {
                from: debtors[j].party.clone(),
                to: creditors[i].party.clone(),
                amount: round_to_2_decimals(amount),
            });
        }

        // Remainders shrink by the unrounded amount; whoever reaches (near)
        // zero is done and the sweep moves past them.
        creditors[i].remaining -= amount;
        debtors[j].remaining += amount;

        if creditors[i].remaining.abs() < EPSILON {
            i += 1;
        }
        if debtors[j].remaining.abs() < EPSILON {
            j += 1;
        }
    }

    Ok(transactions)
}

/// The boundary the rest of the application calls: balances in roster order,
/// the transaction plan, and the ledger total, all rounded to cents.
pub fn settle_trip(
    members: &[Member],
    expenses: &[Expense],
) -> Result<Settlement, SettlementError> {
    let balances = compute_balances(members, expenses)?;
    let transactions = plan_transactions(&balances)?;

    let total_expenses: Decimal = expenses.iter().map(|expense| expense.amount).sum();

    let balances = members
        .iter()
        .map(|member| {
            let entry = &balances[&member.id];
            Balance {
                member_id: member.id.clone(),
                name: member.name.clone(),
                email: member.email.clone(),
                paid: round_to_2_decimals(entry.paid),
                share: round_to_2_decimals(entry.share),
                balance: round_to_2_decimals(entry.balance),
            }
        })
        .collect();

    Ok(Settlement {
        balances,
        transactions,
        total_expenses: round_to_2_decimals(total_expenses),
    })
}

fn round_to_2_decimals(n: Decimal) -> Decimal {
    n.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::MemberBalance;
    use crate::schemas::MemberId;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("valid decimal")
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_uppercase(),
            email: format!("{id}@example.com"),
        }
    }

    fn balance_map(entries: &[(&str, &str)]) -> BalanceMap {
        entries
            .iter()
            .map(|(id, balance)| {
                (
                    id.to_string(),
                    MemberBalance {
                        member: member(id),
                        paid: Decimal::ZERO,
                        share: Decimal::ZERO,
                        balance: dec(balance),
                    },
                )
            })
            .collect()
    }

    fn expense(amount: &str, paid_by: &str, split_among: &[&str]) -> Expense {
        Expense {
            description: format!("{amount} paid by {paid_by}"),
            amount: dec(amount),
            paid_by: paid_by.to_string(),
            split_among: split_among.iter().map(|id| id.to_string()).collect(),
            category: Default::default(),
            date: None,
        }
    }

    #[rstest]
    #[case::single_pair(
        &[("a", "50"), ("b", "-50")],
        &[("b", "a", "50")]
    )]
    #[case::biggest_debtor_pays_first(
        &[("a", "80"), ("b", "-10"), ("c", "-70")],
        &[("c", "a", "70"), ("b", "a", "10")]
    )]
    #[case::fully_settled(
        &[("a", "0"), ("b", "0"), ("c", "0")],
        &[]
    )]
    #[case::drift_within_tolerance_is_settled(
        &[("a", "0.005"), ("b", "-0.005")],
        &[]
    )]
    #[case::equal_debtors_ordered_by_id(
        &[("a", "50"), ("c", "-25"), ("b", "-25")],
        &[("b", "a", "25"), ("c", "a", "25")]
    )]
    #[case::sweep_crosses_both_lists(
        &[("a", "30"), ("b", "20"), ("c", "-40"), ("d", "-10")],
        &[("c", "a", "30"), ("c", "b", "10"), ("d", "b", "10")]
    )]
    fn planner_cases(
        #[case] balances: &[(&str, &str)],
        #[case] expected: &[(&str, &str, &str)],
    ) {
        let transactions = plan_transactions(&balance_map(balances)).unwrap();

        let got: Vec<(MemberId, MemberId, Decimal)> = transactions
            .into_iter()
            .map(|t| (t.from.member_id, t.to.member_id, t.amount))
            .collect();
        let want: Vec<(MemberId, MemberId, Decimal)> = expected
            .iter()
            .map(|(from, to, amount)| (from.to_string(), to.to_string(), dec(amount)))
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn imbalanced_input_is_rejected() {
        let balances = balance_map(&[("a", "5"), ("b", "-1")]);

        let err = plan_transactions(&balances).unwrap_err();
        assert_eq!(err, SettlementError::InconsistentBalances(dec("4")));
    }

    #[test]
    fn emitted_amounts_are_rounded_to_cents() {
        let roster = [member("a"), member("b"), member("c")];
        let expenses = [expense("100", "a", &["a", "b", "c"])];

        let balances = compute_balances(&roster, &expenses).unwrap();
        let transactions = plan_transactions(&balances).unwrap();

        assert_eq!(transactions.len(), 2);
        for transaction in &transactions {
            assert_eq!(transaction.amount, dec("33.33"));
            assert_eq!(transaction.to.member_id, "a");
        }
    }

    #[test]
    fn applying_the_plan_settles_every_member() {
        let roster = [member("a"), member("b"), member("c"), member("d")];
        let expenses = [
            expense("120", "a", &["a", "b", "c"]),
            expense("60", "b", &["b", "c"]),
            expense("17.35", "c", &["a", "c", "d"]),
            expense("99.99", "d", &["a", "b", "c", "d"]),
        ];

        let balances = compute_balances(&roster, &expenses).unwrap();
        let transactions = plan_transactions(&balances).unwrap();

        let mut remaining: HashMap<MemberId, Decimal> = balances
            .iter()
            .map(|(id, entry)| (id.clone(), entry.balance))
            .collect();
        for transaction in &transactions {
            *remaining.get_mut(&transaction.from.member_id).unwrap() += transaction.amount;
            *remaining.get_mut(&transaction.to.member_id).unwrap() -= transaction.amount;
        }

        for (id, balance) in &remaining {
            assert!(
                balance.abs() <= EPSILON,
                "{id} left with residual balance {balance}"
            );
        }
    }

    #[test]
    fn transaction_count_stays_below_participant_count() {
        let balances = balance_map(&[
            ("a", "90"),
            ("b", "10"),
            ("c", "-30"),
            ("d", "-30"),
            ("e", "-40"),
        ]);

        let transactions = plan_transactions(&balances).unwrap();
        assert!(transactions.len() <= 4);
    }

    #[test]
    fn plan_is_deterministic_for_identical_input() {
        let balances = balance_map(&[("a", "12.34"), ("b", "-6.17"), ("c", "-6.17")]);

        let first = plan_transactions(&balances).unwrap();
        let second = plan_transactions(&balances).unwrap();
        assert_eq!(first, second);
    }
}
