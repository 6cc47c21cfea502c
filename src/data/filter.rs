use std::collections::{BTreeMap, BTreeSet};

use super::model::{Dimension, EventDataset, EventRecord};

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// Per-dimension selection state: maps dimension → set of selected values.
/// A dimension that is absent, has nothing selected, or has everything
/// selected does not constrain the rows.
pub type FilterState = BTreeMap<Dimension, BTreeSet<String>>;

/// Initialise a [`FilterState`] with all values selected (i.e., show everything).
pub fn init_filter_state(dataset: &EventDataset) -> FilterState {
    dataset
        .unique_values
        .iter()
        .map(|(dim, vals)| (*dim, vals.clone()))
        .collect()
}

/// Whether a dimension's selection narrows the dataset at all.
pub fn is_active(dataset: &EventDataset, dim: Dimension, selected: &BTreeSet<String>) -> bool {
    if selected.is_empty() {
        return false;
    }
    match dataset.unique_values.get(&dim) {
        Some(all_vals) => !all_vals.is_subset(selected),
        None => true,
    }
}

/// Return indices of events that pass all active filters.
///
/// An event passes an active dimension filter only when its value for that
/// dimension is present and selected; missing values are excluded.
pub fn filtered_indices(dataset: &EventDataset, filters: &FilterState) -> Vec<usize> {
    let active: Vec<(Dimension, &BTreeSet<String>)> = filters
        .iter()
        .filter(|(dim, selected)| is_active(dataset, **dim, selected))
        .map(|(dim, selected)| (*dim, selected))
        .collect();

    dataset
        .events
        .iter()
        .enumerate()
        .filter(|(_, ev)| {
            active.iter().all(|(dim, selected)| match ev.category(*dim) {
                Some(val) => selected.contains(val),
                None => false,
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// Borrow the events at `indices`.
pub fn select<'a>(dataset: &'a EventDataset, indices: &[usize]) -> Vec<&'a EventRecord> {
    indices
        .iter()
        .filter_map(|&i| dataset.events.get(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> EventDataset {
        EventDataset::from_events(
            vec![
                EventRecord::new("1", "a").with_category(Dimension::Location, "P-50"),
                EventRecord::new("2", "b").with_category(Dimension::Location, "P-52"),
                EventRecord::new("3", "c"),
            ],
            vec![],
        )
    }

    #[test]
    fn everything_selected_keeps_every_row() {
        let ds = dataset();
        let filters = init_filter_state(&ds);
        assert_eq!(filtered_indices(&ds, &filters), vec![0, 1, 2]);
    }

    #[test]
    fn subset_excludes_other_values_and_missing() {
        let ds = dataset();
        let mut filters = init_filter_state(&ds);
        filters.insert(Dimension::Location, ["P-52".to_string()].into());
        assert_eq!(filtered_indices(&ds, &filters), vec![1]);
    }

    #[test]
    fn empty_selection_means_no_filter() {
        let ds = dataset();
        let mut filters = FilterState::new();
        filters.insert(Dimension::Location, BTreeSet::new());
        assert_eq!(filtered_indices(&ds, &filters).len(), 3);
    }
}
