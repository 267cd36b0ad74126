//! Destructive-operation impact estimate and bottom-up row deletion.

use rustc_hash::FxHashSet;
use sheetplan_common::{CellRef, CellValue, RangeAddress};
use sheetplan_workbook::{StoreError, TabularStore};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
    pub removed: usize,
    pub total: usize,
    pub ratio: f64,
    pub high: bool,
}

impl Impact {
    pub fn estimate(removed: usize, total: usize, threshold: f64) -> Self {
        let ratio = if total == 0 {
            0.0
        } else {
            removed as f64 / total as f64
        };
        Self {
            removed,
            total,
            ratio,
            high: removed > 0 && ratio >= threshold,
        }
    }

    pub fn percent(&self) -> u32 {
        (self.ratio * 100.0).round() as u32
    }

    /// `"Deleted 9 of 10 data rows (90%)"`, with a warning appended when high.
    pub fn message(&self, what: &str) -> String {
        let mut msg = format!(
            "Deleted {} of {} data rows{} ({}%)",
            self.removed,
            self.total,
            what,
            self.percent()
        );
        if self.high {
            msg.push_str(&format!(
                ". Warning: high-impact operation removed {}% of the data",
                self.percent()
            ));
        }
        msg
    }
}

/// Delete `rows` highest first so earlier deletions never shift later targets.
pub fn delete_rows_descending(
    store: &mut dyn TabularStore,
    rows: &[u32],
) -> Result<usize, StoreError> {
    let mut ordered = rows.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    for row in &ordered {
        store.delete_row(*row)?;
    }
    Ok(ordered.len())
}

/// Remove `rows` from columns `1..=width` only. Rows below move up inside
/// that span and the vacated tail is blanked; cells right of `width` stay
/// where they are. Moved cells keep their values, not their formulas.
pub fn delete_rows_within(
    store: &mut dyn TabularStore,
    first: u32,
    width: u32,
    rows: &[u32],
) -> Result<usize, StoreError> {
    let last = store.last_row();
    let drop: FxHashSet<u32> = rows
        .iter()
        .copied()
        .filter(|r| (first..=last).contains(r))
        .collect();
    if drop.is_empty() || width == 0 {
        return Ok(0);
    }
    let span = RangeAddress::new(first, 1, last, width)?;
    let mut kept: Vec<Vec<CellValue>> = store
        .read_range(span)?
        .into_iter()
        .zip(first..)
        .filter(|(_, row)| !drop.contains(row))
        .map(|(values, _)| values)
        .collect();
    kept.resize((last - first + 1) as usize, vec![CellValue::Empty; width as usize]);
    store.write_range(CellRef { row: first, col: 1 }, &kept)?;
    Ok(drop.len())
}
