//! Alignment engine properties exercised through the public API

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use finmetrics::commodity::PriceTable;
use finmetrics::register::{Balance, Register, RegisterRow};
use finmetrics::series::{cumulative_sum, date_range, fill};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Sample {
    date: NaiveDate,
    group: &'static str,
    value: Decimal,
}

fn sample(day: u32, group: &'static str, value: Decimal) -> Sample {
    Sample {
        date: d(day),
        group,
        value,
    }
}

fn carry_forward(items: Vec<Sample>, grid: &[NaiveDate]) -> Vec<Sample> {
    let mut filled = fill(
        items,
        grid.iter().copied(),
        |s| s.date,
        |s| s.group,
        |date, group, nearest| Sample {
            date,
            group: *group,
            value: nearest.value,
        },
    );
    filled.sort();
    filled
}

#[test]
fn grid_fill_covers_every_group_at_every_point() {
    let grid: Vec<_> = date_range(d(1), d(8), 1).collect();
    let items = vec![
        sample(2, "bank", dec!(1)),
        sample(5, "bank", dec!(2)),
        sample(7, "broker", dec!(3)),
        sample(1, "card", dec!(-4)),
    ];
    let filled = carry_forward(items, &grid);

    for group in ["bank", "broker", "card"] {
        for date in &grid {
            assert!(
                filled.iter().any(|s| s.group == group && s.date == *date),
                "{} missing {}",
                group,
                date
            );
        }
    }
}

#[test]
fn grid_fill_scenario_carries_values_forward() {
    let grid: Vec<_> = date_range(d(1), d(6), 1).collect();
    let filled = carry_forward(
        vec![sample(1, "a", dec!(10)), sample(3, "a", dec!(30))],
        &grid,
    );

    let values: Vec<_> = filled.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![dec!(10), dec!(10), dec!(30), dec!(30), dec!(30)]);
}

#[test]
fn grid_fill_is_idempotent_on_sorted_output() {
    let grid: Vec<_> = date_range(d(1), d(6), 1).collect();
    let once = carry_forward(
        vec![sample(2, "a", dec!(1)), sample(4, "b", dec!(2))],
        &grid,
    );
    let twice = carry_forward(once.clone(), &grid);

    assert_eq!(once, twice);
}

#[test]
fn running_total_final_value_is_group_sum() {
    let items = vec![
        ("a", dec!(1.5)),
        ("b", dec!(10)),
        ("a", dec!(-0.5)),
        ("a", dec!(4)),
        ("b", dec!(-3)),
    ];
    let mut last: HashMap<&str, Decimal> = HashMap::new();
    for ((group, _), total) in cumulative_sum(items.clone(), |i| i.0, |i| i.1, Decimal::ZERO) {
        last.insert(group, total);
    }

    for group in ["a", "b"] {
        let sum: Decimal = items.iter().filter(|i| i.0 == group).map(|i| i.1).sum();
        assert_eq!(last[group], sum);
    }
}

#[test]
fn running_total_scenario() {
    let totals: Vec<_> = cumulative_sum(
        vec![("A", dec!(5)), ("A", dec!(3)), ("B", dec!(1))],
        |i| i.0,
        |i| i.1,
        Decimal::ZERO,
    )
    .map(|(_, total)| total)
    .collect();

    assert_eq!(totals, vec![dec!(5), dec!(8), dec!(1)]);
}

fn usd_row(day: u32, amount: Decimal) -> RegisterRow {
    RegisterRow::new(
        d(day),
        vec![Balance {
            amount,
            commodity: "USD".to_string(),
        }],
    )
}

#[test]
fn register_fill_suppresses_everything_after_trailing_zero() {
    let mut register = Register::new("assets:bank", vec![usd_row(1, dec!(5)), usd_row(3, dec!(0))]);
    let dates: Vec<_> = date_range(d(1), d(6), 1).collect();
    register.fill(&dates, &PriceTable::new());

    let dates: Vec<_> = register.rows().iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![d(1), d(3)]);
    assert!(register.rows().iter().all(|r| r.date <= d(3)));
}

#[test]
fn register_fill_with_all_rows_before_dates_carries_last() {
    let mut register = Register::new("assets:bank", vec![usd_row(1, dec!(7))]);
    let dates: Vec<_> = date_range(d(4), d(7), 1).collect();
    register.fill(&dates, &PriceTable::new());

    let values: Vec<_> = register
        .rows()
        .iter()
        .map(|r| (r.date, r.balances[0].amount))
        .collect();
    assert_eq!(values, vec![(d(4), dec!(7)), (d(5), dec!(7)), (d(6), dec!(7))]);
}
