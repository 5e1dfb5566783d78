use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

/// Position of the walk through one group's sorted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Next real item that can match a grid point.
    At(usize),
    /// Every real item has been matched; the last one stays the nearest.
    Exhausted,
}

/// Ensure every group has at least one item per grid point.
///
/// Items are grouped by `group_key_of` and sorted (stable) by `order_key_of`.
/// Each group is then walked against `grid`: a grid point equal to the next
/// real item consumes it, any other grid point is synthesized by
/// `fill_policy(point, group_key, nearest)` where `nearest` is the most
/// recently consumed item (the first item before anything is consumed).
///
/// Synthesized items are appended after the group's real items, so the
/// result is not in grid order. Groups are emitted in order of first
/// appearance. Callers that need chronological output must sort it.
///
/// # Examples
/// ```
/// use finmetrics::series::fill;
///
/// // (day, group, value)
/// let items = vec![(1, "a", 10), (3, "a", 30)];
/// let mut filled = fill(
///     items,
///     1..=5,
///     |item| item.0,
///     |item| item.1,
///     |day, group, nearest| (day, *group, nearest.2),
/// );
/// filled.sort();
/// let values: Vec<_> = filled.iter().map(|item| item.2).collect();
/// assert_eq!(values, vec![10, 10, 30, 30, 30]);
/// ```
pub fn fill<T, K, G, O, B, P>(
    items: impl IntoIterator<Item = T>,
    grid: impl IntoIterator<Item = K>,
    order_key_of: O,
    group_key_of: B,
    mut fill_policy: P,
) -> Vec<T>
where
    K: Ord + Clone,
    G: Eq + Hash + Clone,
    O: Fn(&T) -> K,
    B: Fn(&T) -> G,
    P: FnMut(K, &G, &T) -> T,
{
    let grid: Vec<K> = grid.into_iter().collect();

    // Keep first-appearance order of groups so output is deterministic
    let mut index_of: HashMap<G, usize> = HashMap::new();
    let mut groups: Vec<(G, Vec<T>)> = Vec::new();
    for item in items {
        let key = group_key_of(&item);
        match index_of.get(&key) {
            Some(&idx) => groups[idx].1.push(item),
            None => {
                index_of.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }

    debug!(
        "Filling {} groups across {} grid points",
        groups.len(),
        grid.len()
    );

    let mut out = Vec::with_capacity(groups.len() * grid.len());
    for (key, mut group) in groups {
        group.sort_by(|a, b| order_key_of(a).cmp(&order_key_of(b)));

        let real = group.len();
        let mut nearest = 0;
        let mut cursor = Cursor::At(0);

        for point in &grid {
            match cursor {
                Cursor::At(idx) if order_key_of(&group[idx]) == *point => {
                    nearest = idx;
                    cursor = if idx + 1 < real {
                        Cursor::At(idx + 1)
                    } else {
                        Cursor::Exhausted
                    };
                }
                _ => {
                    let synthetic = fill_policy(point.clone(), &key, &group[nearest]);
                    group.push(synthetic);
                }
            }
        }

        out.extend(group);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    struct Quote {
        date: NaiveDate,
        symbol: &'static str,
        price: Decimal,
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn quote(day: u32, symbol: &'static str, price: Decimal) -> Quote {
        Quote {
            date: d(day),
            symbol,
            price,
        }
    }

    fn carry_forward(items: Vec<Quote>, grid: Vec<NaiveDate>) -> Vec<Quote> {
        let mut filled = fill(
            items,
            grid,
            |q| q.date,
            |q| q.symbol,
            |date, symbol, nearest| Quote {
                date,
                symbol: *symbol,
                price: nearest.price,
            },
        );
        filled.sort();
        filled
    }

    #[test]
    fn test_forward_fills_gaps_between_items() {
        let grid = (1..=5).map(d).collect();
        let filled = carry_forward(vec![quote(1, "A", dec!(10)), quote(3, "A", dec!(30))], grid);

        let prices: Vec<_> = filled.iter().map(|q| q.price).collect();
        assert_eq!(prices, vec![dec!(10), dec!(10), dec!(30), dec!(30), dec!(30)]);
    }

    #[test]
    fn test_grid_points_before_first_item_use_first_item() {
        let grid = (1..=4).map(d).collect();
        let filled = carry_forward(vec![quote(3, "A", dec!(7))], grid);

        assert_eq!(filled.len(), 4);
        assert!(filled.iter().all(|q| q.price == dec!(7)));
    }

    #[test]
    fn test_synthesized_items_appended_after_real_items() {
        let grid: Vec<_> = (1..=3).map(d).collect();
        let filled = fill(
            vec![quote(2, "A", dec!(1))],
            grid,
            |q| q.date,
            |q| q.symbol,
            |date, symbol, nearest| Quote {
                date,
                symbol: *symbol,
                price: nearest.price,
            },
        );

        let dates: Vec<_> = filled.iter().map(|q| q.date).collect();
        assert_eq!(dates, vec![d(2), d(1), d(3)]);
    }

    #[test]
    fn test_groups_filled_independently() {
        let grid = (1..=3).map(d).collect();
        let filled = carry_forward(
            vec![
                quote(1, "A", dec!(1)),
                quote(2, "B", dec!(2)),
                quote(3, "A", dec!(3)),
            ],
            grid,
        );

        assert_eq!(filled.iter().filter(|q| q.symbol == "A").count(), 3);
        assert_eq!(filled.iter().filter(|q| q.symbol == "B").count(), 3);
        let b_first = filled.iter().find(|q| q.symbol == "B").unwrap();
        assert_eq!(b_first.date, d(1));
        assert_eq!(b_first.price, dec!(2));
    }

    #[test]
    fn test_unsorted_input_is_sorted_within_group() {
        let grid = (1..=3).map(d).collect();
        let filled = carry_forward(vec![quote(3, "A", dec!(3)), quote(1, "A", dec!(1))], grid);

        let prices: Vec<_> = filled.iter().map(|q| q.price).collect();
        assert_eq!(prices, vec![dec!(1), dec!(1), dec!(3)]);
    }

    #[test]
    fn test_empty_inputs_degrade_to_empty_output() {
        let empty: Vec<Quote> = Vec::new();
        assert!(carry_forward(empty, (1..=3).map(d).collect()).is_empty());

        let items = vec![quote(1, "A", dec!(1))];
        let filled = carry_forward(items.clone(), Vec::new());
        assert_eq!(filled, items);
    }

    #[test]
    fn test_items_off_grid_are_kept_and_stall_the_cursor() {
        // The Jan 2 item never matches the odd-day grid, so everything
        // after it is synthesized from the last matched item.
        let grid = vec![d(1), d(3), d(5)];
        let filled = carry_forward(
            vec![
                quote(1, "A", dec!(1)),
                quote(2, "A", dec!(2)),
                quote(5, "A", dec!(5)),
            ],
            grid,
        );

        let by_date: Vec<_> = filled.iter().map(|q| (q.date, q.price)).collect();
        assert_eq!(
            by_date,
            vec![
                (d(1), dec!(1)),
                (d(2), dec!(2)),
                (d(3), dec!(1)),
                (d(5), dec!(1)),
                (d(5), dec!(5)),
            ]
        );
    }
}
