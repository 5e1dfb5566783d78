use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Add;

/// Running total per group over a sequence, in input order.
///
/// Created by [`cumulative_sum`]. Holds one total per group seen so far and
/// is consumed by a single traversal.
#[derive(Debug, Clone)]
pub struct CumulativeSum<I, G, A, KF, VF> {
    items: I,
    totals: HashMap<G, A>,
    zero: A,
    group_key_of: KF,
    value_of: VF,
}

/// Pair every item with the running total of `value_of` over the items of
/// its group seen so far, including itself.
///
/// Input order is preserved and nothing is sorted: sort by date first when a
/// chronological running balance is wanted.
///
/// # Examples
/// ```
/// use finmetrics::series::cumulative_sum;
///
/// let items = vec![("A", 5), ("A", 3), ("B", 1)];
/// let totals: Vec<_> = cumulative_sum(items, |i| i.0, |i| i.1, 0)
///     .map(|(_, total)| total)
///     .collect();
/// assert_eq!(totals, vec![5, 8, 1]);
/// ```
pub fn cumulative_sum<I, G, A, KF, VF>(
    items: I,
    group_key_of: KF,
    value_of: VF,
    zero: A,
) -> CumulativeSum<I::IntoIter, G, A, KF, VF>
where
    I: IntoIterator,
    G: Eq + Hash,
    A: Add<Output = A> + Clone,
    KF: FnMut(&I::Item) -> G,
    VF: FnMut(&I::Item) -> A,
{
    CumulativeSum {
        items: items.into_iter(),
        totals: HashMap::new(),
        zero,
        group_key_of,
        value_of,
    }
}

impl<I, G, A, KF, VF> Iterator for CumulativeSum<I, G, A, KF, VF>
where
    I: Iterator,
    G: Eq + Hash,
    A: Add<Output = A> + Clone,
    KF: FnMut(&I::Item) -> G,
    VF: FnMut(&I::Item) -> A,
{
    type Item = (I::Item, A);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        let key = (self.group_key_of)(&item);

        let prior = self
            .totals
            .get(&key)
            .cloned()
            .unwrap_or_else(|| self.zero.clone());
        let total = prior + (self.value_of)(&item);
        self.totals.insert(key, total.clone());

        Some((item, total))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}
