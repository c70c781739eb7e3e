//! Copy-on-write helpers over `Arc`-shared collections.
//!
//! Each helper builds a new vector. Elements that are not touched are the
//! same `Arc` as before, so observers can detect changes with
//! [`Arc::ptr_eq`] instead of deep comparison.

use std::sync::Arc;

/// Copy `items`, replacing each element that matches `is_target` with
/// `update(element)`.
#[must_use]
pub fn replace_matching<T>(
    items: &[Arc<T>],
    mut is_target: impl FnMut(&T) -> bool,
    mut update: impl FnMut(&T) -> T,
) -> Vec<Arc<T>> {
    items
        .iter()
        .map(|item| {
            if is_target(item) {
                Arc::new(update(item))
            } else {
                Arc::clone(item)
            }
        })
        .collect()
}

/// Copy `items` without the elements matching `is_target`.
#[must_use]
pub fn remove_matching<T>(items: &[Arc<T>], mut is_target: impl FnMut(&T) -> bool) -> Vec<Arc<T>> {
    items
        .iter()
        .filter(|item| !is_target(item))
        .map(Arc::clone)
        .collect()
}

/// Copy `items` with `item` in front, keeping at most `capacity` elements.
///
/// The oldest elements (at the back) are dropped first.
#[must_use]
pub fn prepend_bounded<T>(items: &[Arc<T>], item: Arc<T>, capacity: usize) -> Vec<Arc<T>> {
    let keep = capacity.saturating_sub(1).min(items.len());
    let mut next = Vec::with_capacity(keep + 1);
    next.push(item);
    next.extend(items[..keep].iter().map(Arc::clone));
    next.truncate(capacity);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[u32]) -> Vec<Arc<u32>> {
        values.iter().copied().map(Arc::new).collect()
    }

    #[test]
    fn test_replace_keeps_untouched_identity() {
        let before = items(&[1, 2, 3]);
        let after = replace_matching(&before, |v| *v == 2, |v| v * 10);

        assert_eq!(after.iter().map(|v| **v).collect::<Vec<_>>(), [1, 20, 3]);
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
        assert!(Arc::ptr_eq(&before[2], &after[2]));
    }

    #[test]
    fn test_replace_without_match_shares_everything() {
        let before = items(&[1, 2]);
        let after = replace_matching(&before, |v| *v == 9, |v| *v);
        assert!(before.iter().zip(&after).all(|(a, b)| Arc::ptr_eq(a, b)));
    }

    #[test]
    fn test_remove_matching() {
        let before = items(&[1, 2, 3, 2]);
        let after = remove_matching(&before, |v| *v == 2);
        assert_eq!(after.iter().map(|v| **v).collect::<Vec<_>>(), [1, 3]);
        assert!(Arc::ptr_eq(&before[2], &after[1]));
    }

    #[test]
    fn test_prepend_bounded_evicts_oldest() {
        let before = items(&[3, 2, 1]);
        let after = prepend_bounded(&before, Arc::new(4), 3);
        assert_eq!(after.iter().map(|v| **v).collect::<Vec<_>>(), [4, 3, 2]);
    }

    #[test]
    fn test_prepend_bounded_under_capacity() {
        let after = prepend_bounded(&items(&[1]), Arc::new(2), 20);
        assert_eq!(after.len(), 2);
        assert_eq!(*after[0], 2);
    }
}
