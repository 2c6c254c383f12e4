/// Field-level reconciliation of a freshly parsed entity into a stored one.
///
/// Entities are keyed by the source's numeric id. `merge_from` folds the
/// incoming value into `self` in place:
/// * optional scalars: an incoming `Some` overwrites, `None` never clears
/// * enums with an "unknown" sentinel: overwritten unless incoming is the sentinel
/// * lists: union with value-equality dedup
///
/// The precedence is incoming-biased, so merging A into B and B into A may
/// differ when both set the same scalar.
pub trait Mergeable {
    fn id(&self) -> i64;

    fn merge_from(&mut self, incoming: &Self);
}

/// Incoming value wins when present.
pub fn merge_option<T: Clone>(target: &mut Option<T>, incoming: &Option<T>) {
    if let Some(value) = incoming {
        *target = Some(value.clone());
    }
}

/// Incoming value wins unless it equals the "unknown" sentinel.
pub fn merge_sentinel<T: Copy + PartialEq>(target: &mut T, incoming: T, sentinel: T) {
    if incoming != sentinel {
        *target = incoming;
    }
}

/// Union of two optional lists.
///
/// The result holds each distinct value once, in first-seen order: existing
/// target entries first, then incoming ones. An absent incoming list leaves
/// the target alone.
pub fn merge_list<T: Clone + PartialEq>(target: &mut Option<Vec<T>>, incoming: &Option<Vec<T>>) {
    let Some(incoming) = incoming else {
        return;
    };

    let existing = target.take().unwrap_or_default();
    let mut merged: Vec<T> = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.into_iter().chain(incoming.iter().cloned()) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    *target = Some(merged);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_option_incoming_wins() {
        let mut target = Some(1);
        merge_option(&mut target, &Some(2));
        assert_eq!(target, Some(2));
    }

    #[test]
    fn test_merge_option_none_never_clears() {
        let mut target = Some("kept".to_string());
        merge_option(&mut target, &None);
        assert_eq!(target.as_deref(), Some("kept"));
    }

    #[test]
    fn test_merge_sentinel() {
        let mut target = 5;
        merge_sentinel(&mut target, 0, 0);
        assert_eq!(target, 5);
        merge_sentinel(&mut target, 7, 0);
        assert_eq!(target, 7);
    }

    #[test]
    fn test_merge_list_union() {
        let mut target = Some(vec![1, 2]);
        merge_list(&mut target, &Some(vec![2, 3]));
        let mut merged = target.unwrap();
        merged.sort();
        assert_eq!(merged, vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_list_collapses_duplicates_on_both_sides() {
        let mut target = Some(vec![1, 1, 3]);
        merge_list(&mut target, &Some(vec![2, 2, 3]));
        assert_eq!(target, Some(vec![1, 3, 2]));

        let mut target = None;
        merge_list(&mut target, &Some(vec![5, 5]));
        assert_eq!(target, Some(vec![5]));
    }

    #[test]
    fn test_merge_list_absent_sides() {
        let mut target: Option<Vec<i64>> = None;
        merge_list(&mut target, &Some(vec![4]));
        assert_eq!(target, Some(vec![4]));

        merge_list(&mut target, &None);
        assert_eq!(target, Some(vec![4]));
    }

    #[test]
    fn test_merge_list_is_idempotent() {
        let incoming = Some(vec![9, 9, 3]);
        let mut target = None;
        merge_list(&mut target, &incoming);
        let once = target.clone();
        merge_list(&mut target, &incoming);
        assert_eq!(target, once);
    }
}
