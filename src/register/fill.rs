use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;

use super::{CommodityValuer, RegisterRow};

/// Regime of a register fill step.
///
/// The step taken depends on how the current target date compares with the
/// current row, and whether that row is the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    /// Target date precedes the current row
    Backfill,
    /// Target date follows the current row and more rows remain
    Infill,
    /// Target date follows the last row
    Postfill,
    /// Target date is the current row's date
    Match,
    /// Target dates exhausted, or filling halted on a zero balance
    Done,
}

impl FillState {
    /// Transition for a target date against the row at `row_index` of `row_count`.
    ///
    /// `row_index` may run past the end once every row has been consumed; the
    /// last row then stays the reference.
    pub fn classify(
        target: NaiveDate,
        row_date: NaiveDate,
        row_index: usize,
        row_count: usize,
    ) -> Self {
        match target.cmp(&row_date) {
            Ordering::Less => FillState::Backfill,
            Ordering::Greater if row_index + 1 < row_count => FillState::Infill,
            Ordering::Greater => FillState::Postfill,
            Ordering::Equal => FillState::Match,
        }
    }
}

/// Two-cursor walk over target dates and existing rows.
pub(super) struct RegisterFiller<'a> {
    rows: &'a [RegisterRow],
    values: Vec<Decimal>,
    dates: &'a [NaiveDate],
    date_index: usize,
    row_index: usize,
    halted: bool,
    out: Vec<RegisterRow>,
}

impl<'a> RegisterFiller<'a> {
    /// `rows` must be non-empty and sorted by date.
    pub(super) fn new<V: CommodityValuer + ?Sized>(
        rows: &'a [RegisterRow],
        dates: &'a [NaiveDate],
        valuer: &V,
    ) -> Self {
        Self {
            rows,
            values: rows.iter().map(|r| r.value(valuer)).collect(),
            dates,
            date_index: 0,
            row_index: 0,
            halted: false,
            out: Vec::with_capacity(rows.len().max(dates.len())),
        }
    }

    pub(super) fn run(mut self) -> Vec<RegisterRow> {
        loop {
            match self.state() {
                FillState::Backfill => self.backfill(),
                FillState::Infill => self.infill(),
                FillState::Postfill => self.postfill(),
                FillState::Match => self.copy_match(),
                FillState::Done => break,
            }
        }
        self.out
    }

    fn state(&self) -> FillState {
        if self.halted || self.date_index >= self.dates.len() {
            return FillState::Done;
        }

        let row = &self.rows[self.current()];
        FillState::classify(
            self.dates[self.date_index],
            row.date,
            self.row_index,
            self.rows.len(),
        )
    }

    /// Index of the reference row; stays on the last row once all are consumed
    fn current(&self) -> usize {
        self.row_index.min(self.rows.len() - 1)
    }

    fn backfill(&mut self) {
        // Nothing to copy backward from before the first row
        if self.row_index == 0 {
            self.date_index += 1;
            return;
        }

        let rows = self.rows;
        let current = self.current();
        let row = &rows[current];
        if !self.values[current].is_zero() {
            self.out.push(row.restamp(self.dates[self.date_index]));
            self.date_index += 1;
        } else {
            // zero-valued rows are never backfilled
            while self.date_index < self.dates.len() && self.dates[self.date_index] < row.date {
                self.date_index += 1;
            }
        }
    }

    fn infill(&mut self) {
        let target = self.dates[self.date_index];
        while self.row_index < self.rows.len() && target > self.rows[self.row_index].date {
            self.out.push(self.rows[self.row_index].clone());
            self.row_index += 1;
        }
    }

    fn postfill(&mut self) {
        let current = self.current();
        if self.values[current].is_zero() {
            self.halted = true;
            return;
        }

        let rows = self.rows;
        let row = &rows[current];
        self.out.extend(
            self.dates[self.date_index..]
                .iter()
                .map(|&date| row.restamp(date)),
        );
        self.date_index = self.dates.len();
    }

    fn copy_match(&mut self) {
        self.out.push(self.rows[self.current()].clone());
        self.date_index += 1;
        self.row_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_classify_transitions() {
        assert_eq!(FillState::classify(d(1), d(3), 0, 2), FillState::Backfill);
        assert_eq!(FillState::classify(d(3), d(3), 1, 2), FillState::Match);
        assert_eq!(FillState::classify(d(4), d(3), 0, 2), FillState::Infill);
        assert_eq!(FillState::classify(d(4), d(3), 1, 2), FillState::Postfill);
        // cursor past the end still compares against the last row
        assert_eq!(FillState::classify(d(4), d(3), 2, 2), FillState::Postfill);
    }

    #[test]
    fn test_zero_backfill_skip_stops_at_end_of_dates() {
        use super::super::Balance;

        struct One;
        impl CommodityValuer for One {
            fn value(&self, _commodity: &str, _date: NaiveDate) -> Decimal {
                Decimal::ONE
            }
        }

        let rows = vec![
            RegisterRow::new(
                d(1),
                vec![Balance {
                    amount: Decimal::ONE,
                    commodity: "USD".to_string(),
                }],
            ),
            RegisterRow::new(
                d(9),
                vec![Balance {
                    amount: Decimal::ZERO,
                    commodity: "USD".to_string(),
                }],
            ),
        ];
        let dates = vec![d(1), d(2), d(3)];

        let out = RegisterFiller::new(&rows, &dates, &One).run();
        let out_dates: Vec<_> = out.iter().map(|r| r.date).collect();
        assert_eq!(out_dates, vec![d(1)]);
    }
}
