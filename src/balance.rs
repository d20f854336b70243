use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::error::SettlementError;
use crate::schemas::{Expense, Member, MemberId};

/// A member's position accumulated at full precision. Rounding happens only
/// when values cross the reporting boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct MemberBalance {
    pub member: Member,
    pub paid: Decimal,
    pub share: Decimal,
    pub balance: Decimal,
}

pub type BalanceMap = HashMap<MemberId, MemberBalance>;

/// Reduces the expense ledger into each roster member's paid / share / balance.
///
/// Every roster member gets an entry, including those with no activity.
/// Expenses may reference ids outside the roster; those contributions are not
/// attributed to anyone in the output.
pub fn compute_balances(
    members: &[Member],
    expenses: &[Expense],
) -> Result<BalanceMap, SettlementError> {
    let mut balances: BalanceMap = members
        .iter()
        .map(|member| {
            (
                member.id.clone(),
                MemberBalance {
                    member: member.clone(),
                    paid: Decimal::ZERO,
                    share: Decimal::ZERO,
                    balance: Decimal::ZERO,
                },
            )
        })
        .collect();

    for expense in expenses {
        if expense.amount <= Decimal::ZERO {
            return Err(SettlementError::InvalidExpense(format!(
                "\"{}\" has a non-positive amount",
                expense.description
            )));
        }
        if expense.split_among.is_empty() {
            return Err(SettlementError::InvalidExpense(format!(
                "\"{}\" has an empty split set",
                expense.description
            )));
        }

        let share_per_person = expense.amount / Decimal::from(expense.split_among.len());

        if let Some(entry) = balances.get_mut(&expense.paid_by) {
            entry.paid += expense.amount;
        }
        for member_id in &expense.split_among {
            if let Some(entry) = balances.get_mut(member_id) {
                entry.share += share_per_person;
            }
        }
    }

    for entry in balances.values_mut() {
        entry.balance = entry.paid - entry.share;
    }

    Ok(balances)
}
