use std::collections::BTreeMap;

use serde::Serialize;

use crate::schemas::{Expense, Group};

type Totals = BTreeMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub total: f64,
    pub count: usize,
    pub by_category: Totals,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    pub total_expense: f64,
    pub count: usize,
    /// Amount spent by each member, keyed by user id. Members without
    /// expenses are listed with 0.
    pub by_member: Totals,
    pub by_category: Totals,
}

fn add_to(totals: &mut Totals, key: &str, amount: f64) {
    totals
        .entry(key.to_string())
        .and_modify(|v| *v += amount)
        .or_insert(amount);
}

fn round_to_2_decimals(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

fn rounded(mut totals: Totals) -> Totals {
    totals.values_mut().for_each(|v| *v = round_to_2_decimals(*v));
    totals
}

pub fn summarize_expenses(expenses: &[Expense]) -> ExpenseSummary {
    let mut by_category = Totals::new();
    let mut total = 0.0;
    for expense in expenses {
        total += expense.amount;
        add_to(&mut by_category, &expense.category, expense.amount);
    }
    ExpenseSummary {
        total: round_to_2_decimals(total),
        count: expenses.len(),
        by_category: rounded(by_category),
    }
}

pub fn summarize_group(group: &Group, expenses: &[Expense]) -> GroupSummary {
    let mut by_member: Totals = group
        .members
        .iter()
        .map(|member| (member.to_hex(), 0.0))
        .collect();
    for expense in expenses {
        add_to(&mut by_member, &expense.user_id.to_hex(), expense.amount);
    }
    let overall = summarize_expenses(expenses);

    GroupSummary {
        group_id: group.id.to_hex(),
        total_expense: round_to_2_decimals(group.total_expense),
        count: overall.count,
        by_member: rounded(by_member),
        by_category: overall.by_category,
    }
}
