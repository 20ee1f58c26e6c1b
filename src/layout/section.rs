//! Locating labelled sections by keywords in the first cell of a row
use crate::spreadsheet::CellGrid;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

/// How the keywords of a group must appear in a cell
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Match {
    /// Any one keyword
    Any,
    /// Every keyword, in the same cell
    All,
}

/// What happens when a section keyword appears more than once
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SectionOverwrite {
    /// The later row replaces the earlier one
    #[default]
    #[serde(rename = "last")]
    LastWins,
    #[serde(rename = "first")]
    FirstWins,
}

/// A named section with its keyword group
#[derive(Clone, Debug)]
pub struct SectionGroup {
    pub name: &'static str,
    pub keywords: Vec<&'static str>,
    pub mode: Match,
}

impl SectionGroup {
    pub fn any(name: &'static str, keywords: &[&'static str]) -> Self {
        Self { name, keywords: keywords.to_vec(), mode: Match::Any }
    }

    pub fn all(name: &'static str, keywords: &[&'static str]) -> Self {
        Self { name, keywords: keywords.to_vec(), mode: Match::All }
    }

    /// Tests lower-cased cell text against the group.
    pub fn matches(&self, cell: &str) -> bool {
        match self.mode {
            Match::Any => self.keywords.iter().any(|keyword| cell.contains(keyword)),
            Match::All => self.keywords.iter().all(|keyword| cell.contains(keyword)),
        }
    }
}

/// Where a section starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionStart {
    pub name: &'static str,
    pub row: usize,
}

/// Finds section start rows from a set of keyword groups
#[derive(Clone, Debug)]
pub struct SectionLocator {
    groups: Vec<SectionGroup>,
    overwrite: SectionOverwrite,
}

impl SectionLocator {
    pub fn new(groups: Vec<SectionGroup>) -> Self {
        Self { groups, overwrite: SectionOverwrite::default() }
    }

    pub fn with_overwrite(mut self, overwrite: SectionOverwrite) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// True when the first cell text belongs to any group (a section boundary).
    pub fn is_boundary(&self, first_cell: &str) -> bool {
        let cell = first_cell.trim().to_lowercase();
        self.groups.iter().any(|group| group.matches(&cell))
    }

    /// Scans the first cell of every row
    ///
    /// # Returns
    /// One start per group that matched somewhere, ordered by row. A group matching
    /// several rows keeps the last (or first) according to the overwrite policy.
    pub fn locate(&self, grid: &CellGrid) -> Vec<SectionStart> {
        let mut starts: Vec<Option<usize>> = vec![None; self.groups.len()];
        for row in 0..grid.height() {
            let cell = grid.text(row, 0).to_lowercase();
            if cell.is_empty() {
                continue;
            }
            for (index, group) in self.groups.iter().enumerate() {
                if group.matches(&cell) {
                    match (self.overwrite, starts[index]) {
                        (SectionOverwrite::FirstWins, Some(_)) => (),
                        _ => starts[index] = Some(row),
                    }
                }
            }
        }

        let mut located: Vec<SectionStart> = self.groups.iter()
            .zip(starts)
            .filter_map(|(group, row)| row.map(|row| SectionStart { name: group.name, row }))
            .collect();
        located.sort_by_key(|start| start.row);
        for start in &located {
            debug!(section = start.name, row = start.row, "Located section");
        }
        located
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> SectionLocator {
        SectionLocator::new(vec![
            SectionGroup::any("availability", &["availability", "avail"]),
            SectionGroup::any("resident_activity", &["resident", "activity"]),
            SectionGroup::all("conversion_ratios", &["conversion", "ratios"]),
        ])
    }

    #[test]
    fn any_and_all_groups() {
        let grid = CellGrid::from_text_rows(&[
            &["Availability"],
            &["Conversion"],
            &["Resident Activity"],
            &["Conversion Ratios"],
        ]);
        let starts = locator().locate(&grid);
        assert_eq!(starts, vec![
            SectionStart { name: "availability", row: 0 },
            SectionStart { name: "resident_activity", row: 2 },
            SectionStart { name: "conversion_ratios", row: 3 },
        ]);
    }

    #[test]
    fn later_match_overwrites_by_default() {
        let grid = CellGrid::from_text_rows(&[&["Availability"], &["x"], &["AVAILABILITY (cont.)"]]);
        assert_eq!(locator().locate(&grid), vec![SectionStart { name: "availability", row: 2 }]);
        let first = locator().with_overwrite(SectionOverwrite::FirstWins);
        assert_eq!(first.locate(&grid), vec![SectionStart { name: "availability", row: 0 }]);
    }

    #[test]
    fn only_first_cell_is_scanned() {
        let grid = CellGrid::from_text_rows(&[&["Code", "Availability"]]);
        assert!(locator().locate(&grid).is_empty());
    }

    #[test]
    fn boundaries() {
        assert!(locator().is_boundary("  Resident Activity "));
        assert!(!locator().is_boundary("Conversion"));
        assert!(!locator().is_boundary("a1"));
    }
}
