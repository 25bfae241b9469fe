// src/dirty/maps.rs

//! Sparse nested flag maps with explicit merge operators.
//!
//! The two map shapes deliberately do not share a merge method name, so a
//! caller cannot apply the wrong policy by accident:
//!
//! - [`DirtyNameMap::merge_last_wins`]: unit -> sheet -> flag, later writers
//!   replace earlier ones (including with `false`).
//! - [`DirtyFeatureMap::merge_or`]: unit -> sheet -> id -> flag, a `true`
//!   can never be cleared by a later `false`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type UnitId = String;
pub type SheetId = String;

/// unit -> sheet -> "names on this sheet must be re-resolved".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirtyNameMap(BTreeMap<UnitId, BTreeMap<SheetId, bool>>);

impl DirtyNameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, unit: impl Into<UnitId>, sheet: impl Into<SheetId>, flag: bool) {
        self.0
            .entry(unit.into())
            .or_default()
            .insert(sheet.into(), flag);
    }

    pub fn get(&self, unit: &str, sheet: &str) -> Option<bool> {
        self.0.get(unit)?.get(sheet).copied()
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Copy every (unit, sheet) entry of `other` over `self`.
    ///
    /// Entries absent from `other` are left untouched; entries present in
    /// `other` win, whatever their value.
    pub fn merge_last_wins(&mut self, other: &DirtyNameMap) {
        for (unit, sheets) in &other.0 {
            let slot = self.0.entry(unit.clone()).or_default();
            for (sheet, flag) in sheets {
                slot.insert(sheet.clone(), *flag);
            }
        }
    }
}

/// unit -> sheet -> feature/formula id -> dirty flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirtyFeatureMap(BTreeMap<UnitId, BTreeMap<SheetId, BTreeMap<String, bool>>>);

impl DirtyFeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(
        &mut self,
        unit: impl Into<UnitId>,
        sheet: impl Into<SheetId>,
        id: impl Into<String>,
        flag: bool,
    ) {
        self.0
            .entry(unit.into())
            .or_default()
            .entry(sheet.into())
            .or_default()
            .insert(id.into(), flag);
    }

    pub fn get(&self, unit: &str, sheet: &str, id: &str) -> Option<bool> {
        self.0.get(unit)?.get(sheet)?.get(id).copied()
    }

    /// `true` only if the entry exists and is set.
    pub fn is_dirty(&self, unit: &str, sheet: &str, id: &str) -> bool {
        self.get(unit, sheet, id).unwrap_or(false)
    }

    /// All (unit, sheet, id, flag) entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str, bool)> {
        self.0.iter().flat_map(|(unit, sheets)| {
            sheets.iter().flat_map(move |(sheet, ids)| {
                ids.iter()
                    .map(move |(id, flag)| (unit.as_str(), sheet.as_str(), id.as_str(), *flag))
            })
        })
    }

    /// OR every innermost flag of `other` into `self`, treating unseen keys
    /// as `false`.
    pub fn merge_or(&mut self, other: &DirtyFeatureMap) {
        for (unit, sheets) in &other.0 {
            let unit_slot = self.0.entry(unit.clone()).or_default();
            for (sheet, ids) in sheets {
                let sheet_slot = unit_slot.entry(sheet.clone()).or_default();
                for (id, flag) in ids {
                    let current = sheet_slot.entry(id.clone()).or_insert(false);
                    *current = *current || *flag;
                }
            }
        }
    }
}
