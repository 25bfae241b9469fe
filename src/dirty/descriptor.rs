// src/dirty/descriptor.rs

use serde::{Deserialize, Serialize};

use crate::dirty::maps::{DirtyFeatureMap, DirtyNameMap, SheetId, UnitId};

/// Inclusive row/column rectangle on a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub start_row: u32,
    pub end_row: u32,
    pub start_column: u32,
    pub end_column: u32,
}

impl CellRange {
    pub fn new(start_row: u32, end_row: u32, start_column: u32, end_column: u32) -> Self {
        Self {
            start_row,
            end_row,
            start_column,
            end_column,
        }
    }

    pub fn cell(row: u32, column: u32) -> Self {
        Self::new(row, row, column, column)
    }
}

/// A range qualified by workbook (unit) and sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRange {
    pub unit_id: UnitId,
    pub sheet_id: SheetId,
    pub range: CellRange,
}

impl UnitRange {
    pub fn new(unit_id: impl Into<UnitId>, sheet_id: impl Into<SheetId>, range: CellRange) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            range,
        }
    }
}

/// Everything a command (or a batch of commands) invalidated.
///
/// Field names serialise to the camelCase shape the calculation engine
/// expects. Empty parts are treated the same as absent ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirtyDescriptor {
    pub dirty_ranges: Vec<UnitRange>,
    pub dirty_name_map: DirtyNameMap,
    pub dirty_defined_name_map: DirtyNameMap,
    pub dirty_unit_feature_map: DirtyFeatureMap,
    pub dirty_unit_other_formula_map: DirtyFeatureMap,
}

impl DirtyDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing at all is marked (the bootstrap descriptor).
    pub fn is_empty(&self) -> bool {
        self.dirty_ranges.is_empty()
            && self.dirty_name_map.is_empty()
            && self.dirty_defined_name_map.is_empty()
            && self.dirty_unit_feature_map.is_empty()
            && self.dirty_unit_other_formula_map.is_empty()
    }

    pub fn with_range(mut self, range: UnitRange) -> Self {
        self.dirty_ranges.push(range);
        self
    }

    pub fn with_name(mut self, unit: &str, sheet: &str, flag: bool) -> Self {
        self.dirty_name_map.insert(unit, sheet, flag);
        self
    }

    pub fn with_defined_name(mut self, unit: &str, sheet: &str, flag: bool) -> Self {
        self.dirty_defined_name_map.insert(unit, sheet, flag);
        self
    }

    pub fn with_feature(mut self, unit: &str, sheet: &str, feature: &str, flag: bool) -> Self {
        self.dirty_unit_feature_map.insert(unit, sheet, feature, flag);
        self
    }

    pub fn with_other_formula(mut self, unit: &str, sheet: &str, formula: &str, flag: bool) -> Self {
        self.dirty_unit_other_formula_map
            .insert(unit, sheet, formula, flag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_json_deserializes_with_defaults() {
        let d: DirtyDescriptor = serde_json::from_value(json!({
            "dirtyRanges": [
                { "unitId": "book", "sheetId": "s1",
                  "range": { "startRow": 0, "endRow": 2, "startColumn": 1, "endColumn": 1 } }
            ]
        }))
        .unwrap();

        assert_eq!(d.dirty_ranges.len(), 1);
        assert_eq!(d.dirty_ranges[0].range, CellRange::new(0, 2, 1, 1));
        assert!(d.dirty_name_map.is_empty());
        assert!(!d.is_empty());
    }

    #[test]
    fn default_descriptor_is_empty() {
        assert!(DirtyDescriptor::new().is_empty());
    }
}
