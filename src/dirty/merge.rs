// src/dirty/merge.rs

//! Folding per-command descriptors into one aggregate descriptor.

use tracing::debug;

use crate::dirty::descriptor::DirtyDescriptor;

impl DirtyDescriptor {
    /// Fold `other` into `self`.
    ///
    /// - ranges: appended, duplicates kept
    /// - name / defined-name maps: last wins per (unit, sheet)
    /// - feature / other-formula maps: OR per (unit, sheet, id)
    pub fn merge_from(&mut self, other: &DirtyDescriptor) {
        self.dirty_ranges.extend(other.dirty_ranges.iter().cloned());
        self.dirty_name_map.merge_last_wins(&other.dirty_name_map);
        self.dirty_defined_name_map
            .merge_last_wins(&other.dirty_defined_name_map);
        self.dirty_unit_feature_map
            .merge_or(&other.dirty_unit_feature_map);
        self.dirty_unit_other_formula_map
            .merge_or(&other.dirty_unit_other_formula_map);
    }
}

/// Merge descriptors in order. An empty input yields an empty descriptor.
pub fn merge<'a, I>(descriptors: I) -> DirtyDescriptor
where
    I: IntoIterator<Item = &'a DirtyDescriptor>,
{
    let mut merged = DirtyDescriptor::default();
    let mut count = 0usize;
    for descriptor in descriptors {
        merged.merge_from(descriptor);
        count += 1;
    }
    debug!(
        inputs = count,
        ranges = merged.dirty_ranges.len(),
        "merged dirty descriptors"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty::descriptor::{CellRange, UnitRange};

    fn range(row: u32) -> UnitRange {
        UnitRange::new("book", "s1", CellRange::cell(row, 0))
    }

    #[test]
    fn empty_input_is_empty_descriptor() {
        let merged = merge(std::iter::empty());
        assert!(merged.is_empty());
        assert_eq!(merged, DirtyDescriptor::default());
    }

    #[test]
    fn ranges_concatenate_in_order_without_dedup() {
        let a = DirtyDescriptor::new().with_range(range(1)).with_range(range(2));
        let b = DirtyDescriptor::new().with_range(range(1));

        let merged = merge([&a, &b]);
        assert_eq!(merged.dirty_ranges, vec![range(1), range(2), range(1)]);
    }

    #[test]
    fn name_maps_last_wins_feature_maps_or() {
        let a = DirtyDescriptor::new()
            .with_name("u", "s", true)
            .with_defined_name("u", "s", true)
            .with_feature("u", "s", "f", true)
            .with_other_formula("u", "s", "o", true);
        let b = DirtyDescriptor::new()
            .with_name("u", "s", false)
            .with_defined_name("u", "s", false)
            .with_feature("u", "s", "f", false)
            .with_other_formula("u", "s", "o", false);

        let merged = merge([&a, &b]);
        assert_eq!(merged.dirty_name_map.get("u", "s"), Some(false));
        assert_eq!(merged.dirty_defined_name_map.get("u", "s"), Some(false));
        assert!(merged.dirty_unit_feature_map.is_dirty("u", "s", "f"));
        assert!(merged.dirty_unit_other_formula_map.is_dirty("u", "s", "o"));
    }

    #[test]
    fn name_map_merge_is_order_dependent() {
        let set = DirtyDescriptor::new().with_name("u", "s", true);
        let unset = DirtyDescriptor::new().with_name("u", "s", false);

        assert_eq!(merge([&set, &unset]).dirty_name_map.get("u", "s"), Some(false));
        assert_eq!(merge([&unset, &set]).dirty_name_map.get("u", "s"), Some(true));
    }

    #[test]
    fn feature_map_merge_is_order_independent() {
        let set = DirtyDescriptor::new().with_feature("u", "s", "f", true);
        let unset = DirtyDescriptor::new().with_feature("u", "s", "f", false);

        assert_eq!(
            merge([&set, &unset]).dirty_unit_feature_map,
            merge([&unset, &set]).dirty_unit_feature_map
        );
    }
}
