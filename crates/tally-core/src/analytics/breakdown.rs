//! Breakdown Calculator
//!
//! Category-level income or spending breakdowns with percentages and
//! period-over-period deltas.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::models::{CategoryBreakdownEntry, FlowDirection, TransactionRecord};

/// Per-category (amount, count) totals for one side of the ledger
fn category_totals(
    transactions: &[TransactionRecord],
    direction: FlowDirection,
) -> BTreeMap<String, (Decimal, i64)> {
    let mut totals: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| direction.matches(tx.direction)) {
        let entry = totals
            .entry(tx.category_or_default().to_string())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }
    totals
}

/// Break `transactions` down by category for one direction
///
/// Returns an empty list when the in-scope total is zero. When
/// `previous_period_transactions` is supplied, each entry carries its change
/// against the same category there (absent categories count as 0).
/// Sorted by amount descending, then category name ascending.
pub fn breakdown(
    transactions: &[TransactionRecord],
    direction: FlowDirection,
    previous_period_transactions: Option<&[TransactionRecord]>,
) -> Vec<CategoryBreakdownEntry> {
    let totals = category_totals(transactions, direction);
    let total: Decimal = totals.values().map(|(amount, _)| *amount).sum();
    if total.is_zero() {
        return vec![];
    }

    let previous = previous_period_transactions.map(|txs| category_totals(txs, direction));

    let mut entries: Vec<CategoryBreakdownEntry> = totals
        .into_iter()
        .map(|(category, (amount, count))| {
            let change_from_previous = previous.as_ref().map(|prev| {
                let before = prev.get(&category).map(|(a, _)| *a).unwrap_or(Decimal::ZERO);
                amount - before
            });
            CategoryBreakdownEntry {
                category,
                amount,
                percentage: Decimal::ZERO,
                transaction_count: count,
                change_from_previous,
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    let shares: Vec<Decimal> = entries.iter().map(|e| e.amount / total * Decimal::ONE_HUNDRED).collect();
    for (entry, pct) in entries.iter_mut().zip(apportion_percentages(&shares)) {
        entry.percentage = pct;
    }

    entries
}

/// Allowed distance between the summed percentages and 100
const PERCENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// Round shares to 2 dp, keeping their sum within `PERCENT_TOLERANCE` of 100
///
/// Equal shares round to equal percentages. Only when plain rounding drifts
/// past the tolerance are the entries with the largest rounding error nudged
/// by a hundredth, just enough to get back inside it.
fn apportion_percentages(shares: &[Decimal]) -> Vec<Decimal> {
    let mut rounded: Vec<Decimal> = shares.iter().map(|s| s.round_dp(2)).collect();

    let drift = rounded.iter().sum::<Decimal>() - Decimal::ONE_HUNDRED;
    if drift.abs() <= PERCENT_TOLERANCE {
        return rounded;
    }

    let step = Decimal::new(1, 2);
    let excess = ((drift.abs() - PERCENT_TOLERANCE) / step)
        .ceil()
        .to_usize()
        .unwrap_or(0)
        .min(shares.len());
    let (nudge, sign) = if drift.is_sign_positive() {
        (-step, Decimal::ONE)
    } else {
        (step, Decimal::NEGATIVE_ONE)
    };

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ea = (rounded[a] - shares[a]) * sign;
        let eb = (rounded[b] - shares[b]) * sign;
        eb.cmp(&ea).then_with(|| a.cmp(&b))
    });
    for &i in order.iter().take(excess) {
        rounded[i] += nudge;
    }

    rounded
}

/// Sum of all entry amounts
pub fn breakdown_total(entries: &[CategoryBreakdownEntry]) -> Decimal {
    entries.iter().map(|e| e.amount).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNCATEGORIZED;
    use crate::test_utils::TxBuilder;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_set_yields_no_entries() {
        assert!(breakdown(&[], FlowDirection::Expense, None).is_empty());
        assert!(breakdown(&[], FlowDirection::Income, Some(&[][..])).is_empty());
    }

    #[test]
    fn test_zero_total_yields_no_entries() {
        let txs = vec![
            TxBuilder::expense(dec!(0)).category("Fees").build(),
            TxBuilder::income(dec!(500)).category("Salary").build(),
        ];
        assert!(breakdown(&txs, FlowDirection::Expense, None).is_empty());
    }

    #[test]
    fn test_groups_and_sorts_by_amount_then_name() {
        let txs = vec![
            TxBuilder::expense(dec!(50)).category("Dining").build(),
            TxBuilder::expense(dec!(150)).category("Groceries").build(),
            TxBuilder::expense(dec!(50)).category("Books").build(),
            TxBuilder::expense(dec!(25)).category("Groceries").build(),
            TxBuilder::income(dec!(9999)).category("Salary").build(),
            TxBuilder::transfer(dec!(400)).category("Savings").build(),
        ];

        let entries = breakdown(&txs, FlowDirection::Expense, None);
        let names: Vec<&str> = entries.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(names, vec!["Groceries", "Books", "Dining"]);

        assert_eq!(entries[0].amount, dec!(175));
        assert_eq!(entries[0].transaction_count, 2);
        assert_eq!(entries[0].percentage, dec!(63.64));
        assert!(entries.iter().all(|e| e.change_from_previous.is_none()));
    }

    #[test]
    fn test_missing_categories_collapse_to_uncategorized() {
        let txs = vec![
            TxBuilder::expense(dec!(10)).build(),
            TxBuilder::expense(dec!(15)).category("").build(),
            TxBuilder::expense(dec!(75)).category("Rent").build(),
        ];

        let entries = breakdown(&txs, FlowDirection::Expense, None);
        assert_eq!(entries.len(), 2);
        let uncategorized = entries.iter().find(|e| e.category == UNCATEGORIZED).unwrap();
        assert_eq!(uncategorized.amount, dec!(25));
        assert_eq!(uncategorized.transaction_count, 2);
        assert_eq!(uncategorized.percentage, dec!(25));
    }

    #[test]
    fn test_percentages_sum_to_one_hundred() {
        let txs = vec![
            TxBuilder::expense(dec!(1)).category("A").build(),
            TxBuilder::expense(dec!(1)).category("B").build(),
            TxBuilder::expense(dec!(1)).category("C").build(),
        ];
        let entries = breakdown(&txs, FlowDirection::Expense, None);
        let sum: Decimal = entries.iter().map(|e| e.percentage).sum();
        assert_eq!(sum, dec!(99.99));

        let many: Vec<_> = (0..37)
            .map(|i| {
                TxBuilder::expense(Decimal::from(i * 7 + 3))
                    .category(&format!("cat-{:02}", i))
                    .build()
            })
            .collect();
        let entries = breakdown(&many, FlowDirection::Expense, None);
        let sum: Decimal = entries.iter().map(|e| e.percentage).sum();
        assert!((sum - dec!(100)).abs() <= dec!(0.1));
    }

    #[test]
    fn test_tied_categories_get_equal_percentages() {
        let txs = vec![
            TxBuilder::expense(dec!(2)).category("Rent").build(),
            TxBuilder::expense(dec!(1)).category("Dining").build(),
            TxBuilder::expense(dec!(1)).category("Travel").build(),
            TxBuilder::expense(dec!(1)).category("Books").build(),
            TxBuilder::expense(dec!(1)).category("Games").build(),
            TxBuilder::expense(dec!(1)).category("Music").build(),
            TxBuilder::expense(dec!(1)).category("Pets").build(),
        ];
        let entries = breakdown(&txs, FlowDirection::Expense, None);
        assert_eq!(entries[0].percentage, dec!(25));
        assert!(entries[1..].iter().all(|e| e.percentage == dec!(12.5)));

        let thirds: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|c| TxBuilder::expense(dec!(1)).category(c).build())
            .collect();
        let entries = breakdown(&thirds, FlowDirection::Expense, None);
        assert!(entries.iter().all(|e| e.percentage == dec!(33.33)));
    }

    #[test]
    fn test_many_equal_categories_stay_within_tolerance() {
        // 300 shares of 0.333... round to 0.33 and drift a whole point
        let txs: Vec<_> = (0..300)
            .map(|i| TxBuilder::expense(dec!(1)).category(&format!("cat-{:03}", i)).build())
            .collect();
        let entries = breakdown(&txs, FlowDirection::Expense, None);
        let sum: Decimal = entries.iter().map(|e| e.percentage).sum();
        assert_eq!(sum, dec!(99.9));
        assert!(entries
            .iter()
            .all(|e| e.percentage == dec!(0.33) || e.percentage == dec!(0.34)));
    }

    #[test]
    fn test_change_from_previous() {
        let current = vec![
            TxBuilder::income(dec!(3000)).category("Salary").build(),
            TxBuilder::income(dec!(200)).category("Freelance").build(),
        ];
        let previous = vec![
            TxBuilder::income(dec!(2800)).category("Salary").build(),
            TxBuilder::income(dec!(50)).category("Interest").build(),
        ];

        let entries = breakdown(&current, FlowDirection::Income, Some(previous.as_slice()));
        assert_eq!(entries.len(), 2);

        let salary = &entries[0];
        assert_eq!(salary.category, "Salary");
        assert_eq!(salary.change_from_previous, Some(dec!(200)));

        // New category: the whole amount is the delta
        let freelance = &entries[1];
        assert_eq!(freelance.change_from_previous, Some(dec!(200)));
    }

    #[test]
    fn test_breakdown_total() {
        let txs = vec![
            TxBuilder::expense(dec!(12.34)).category("A").build(),
            TxBuilder::expense(dec!(0.66)).category("B").build(),
        ];
        let entries = breakdown(&txs, FlowDirection::Expense, None);
        assert_eq!(breakdown_total(&entries), dec!(13.00));
    }
}
