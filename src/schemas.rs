use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type MemberId = String;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Transport,
    Accommodation,
    Entertainment,
    Shopping,
    #[default]
    Other,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub description: String,
    pub amount: Decimal,
    pub paid_by: MemberId,
    pub split_among: Vec<MemberId>,
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A member's reported position: what they paid, what they consumed, and the
/// difference (positive means they are owed money).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub paid: Decimal,
    pub share: Decimal,
    pub balance: Decimal,
}

/// One endpoint of a settle-up transaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
}

impl From<&Member> for Party {
    fn from(member: &Member) -> Self {
        Self {
            member_id: member.id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub from: Party,
    pub to: Party,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub balances: Vec<Balance>,
    pub transactions: Vec<Transaction>,
    pub total_expenses: Decimal,
}
