//! Header row detection and column naming
use crate::spreadsheet::CellGrid;
use std::collections::HashMap;
use std::collections::HashSet;
use tracing::debug;

/// Words expected in a header row, with an optional bonus for a canonical first cell
#[derive(Clone, Debug)]
pub struct HeaderVocabulary {
    words: Vec<&'static str>,
    label: Option<(&'static str, usize)>,
}

impl HeaderVocabulary {
    pub fn new(words: &[&'static str]) -> Self {
        Self { words: words.to_vec(), label: None }
    }

    /// Adds `bonus` to rows whose first cell equals `label` (ignoring case).
    pub fn with_label(mut self, label: &'static str, bonus: usize) -> Self {
        self.label = Some((label, bonus));
        self
    }
}

/// Scores a candidate header row.
///
/// Counts the vocabulary words found in the lower-cased row text (cells joined
/// by spaces), plus the label bonus when the first cell is the canonical label.
pub fn score(row: &[String], vocabulary: &HeaderVocabulary) -> usize {
    let joined = row.join(" ").to_lowercase();
    let hits = vocabulary.words.iter().filter(|word| joined.contains(*word)).count();
    let bonus = match (vocabulary.label, row.first()) {
        (Some((label, bonus)), Some(first)) if first.trim().eq_ignore_ascii_case(label) => bonus,
        _ => 0,
    };
    hits + bonus
}

/// Picks the best header row among the `lookahead` rows after `start`
///
/// # Returns
/// The first row with the highest score, or `None` when nothing scores above zero
pub fn resolve_scored(grid: &CellGrid, start: usize, lookahead: usize, vocabulary: &HeaderVocabulary) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    let end = (start + 1 + lookahead).min(grid.height());
    for row in start + 1..end {
        let value = score(&grid.row_texts(row, None), vocabulary);
        if value > best.map(|(_, score)| score).unwrap_or(0) {
            best = Some((row, value));
        }
    }
    best.map(|(row, _)| row)
}

/// A fixed-content test that identifies a header row
#[derive(Clone, Debug)]
pub enum HeaderAnchor {
    /// Every `(column, needle)` pair: the cell contains the needle
    All(Vec<(usize, &'static str)>),
    /// At least one `(column, needle)` pair holds
    Any(Vec<(usize, &'static str)>),
    /// Each label equals some cell of the row
    Labels(Vec<&'static str>),
}

impl HeaderAnchor {
    pub fn matches(&self, grid: &CellGrid, row: usize) -> bool {
        let contains = |(col, needle): &(usize, &str)| grid.text(row, *col).contains(needle);
        match self {
            HeaderAnchor::All(pairs) => pairs.iter().all(contains),
            HeaderAnchor::Any(pairs) => pairs.iter().any(contains),
            HeaderAnchor::Labels(labels) => {
                let cells = grid.row_texts(row, None);
                labels.iter().all(|label| cells.iter().any(|cell| cell == label))
            }
        }
    }

    /// First matching row at or after `from`.
    pub fn find(&self, grid: &CellGrid, from: usize) -> Option<usize> {
        (from..grid.height()).find(|row| self.matches(grid, *row))
    }
}

/// Where column naming stops
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderEnd {
    /// Columns end at the first blank header cell
    FirstBlank,
    /// Blank header cells become `Column_<index>`; trailing blanks are dropped
    TrailingBlanks,
}

/// Combines stacked header rows column by column.
///
/// Non-empty parts are joined with a space, each distinct part once;
/// a column blank in every row yields `None`.
pub fn merge_header_rows(rows: &[Vec<String>]) -> Vec<Option<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            let mut parts: Vec<&str> = Vec::new();
            for row in rows {
                let part = row.get(col).map(|text| text.trim()).unwrap_or("");
                if !part.is_empty() && !parts.contains(&part) {
                    parts.push(part);
                }
            }
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .collect()
}

/// Turns merged header cells into unique column names.
///
/// Repeated names get `.1`, `.2`, … suffixes in order of appearance. A suffix
/// already taken by another column is skipped.
pub fn header_columns(merged: Vec<Option<String>>, end: HeaderEnd) -> Vec<String> {
    let names: Vec<String> = match end {
        HeaderEnd::FirstBlank => merged.into_iter().map_while(|name| name).collect(),
        HeaderEnd::TrailingBlanks => {
            let last = merged.iter().rposition(Option::is_some).map(|index| index + 1).unwrap_or(0);
            merged.into_iter()
                .take(last)
                .enumerate()
                .map(|(index, name)| name.unwrap_or_else(|| format!("Column_{}", index)))
                .collect()
        }
    };

    let mut used: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    names.into_iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name;
            }
            let suffix = suffixes.entry(name.clone()).or_insert(0);
            loop {
                *suffix += 1;
                let candidate = format!("{}.{}", name, suffix);
                if used.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// A resolved header: its first row, how many rows it spans, and the column names
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub row: usize,
    pub height: usize,
    pub columns: Vec<String>,
}

impl Header {
    /// Reads `height` stacked rows starting at `row`
    ///
    /// # Returns
    /// `None` when no column name results
    pub fn read(grid: &CellGrid, row: usize, height: usize, end: HeaderEnd) -> Option<Header> {
        let last = (row + height.max(1)).min(grid.height());
        let rows: Vec<Vec<String>> = (row..last).map(|index| grid.row_texts(index, None)).collect();
        let columns = header_columns(merge_header_rows(&rows), end);
        if columns.is_empty() {
            return None;
        }
        debug!(row, height = rows.len(), columns = ?columns, "Resolved header");
        Some(Header { row, height: rows.len(), columns })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// First row after the header.
    pub fn data_start(&self) -> usize {
        self.row + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn vocabulary() -> HeaderVocabulary {
        HeaderVocabulary::new(&["code", "name", "units", "rent"]).with_label("code", 5)
    }

    #[test]
    fn scores_words_and_label_bonus() {
        assert_eq!(score(&strings(&["Name", "Units", "Market Rent"]), &vocabulary()), 3);
        assert_eq!(score(&strings(&["Code", "Name", "Units"]), &vocabulary()), 8);
        assert_eq!(score(&strings(&["a1", "10", "1200"]), &vocabulary()), 0);
    }

    #[test]
    fn first_maximum_wins() {
        let grid = CellGrid::from_text_rows(&[
            &["Availability", ""],
            &["Name", "Units"],
            &["Units", "Name"],
            &["a1", "10"],
        ]);
        assert_eq!(resolve_scored(&grid, 0, 4, &vocabulary()), Some(1));
    }

    #[test]
    fn lookahead_is_bounded() {
        let grid = CellGrid::from_text_rows(&[
            &["Availability"], &[""], &[""], &[""], &[""], &["Code"],
        ]);
        assert_eq!(resolve_scored(&grid, 0, 4, &vocabulary()), None);
        assert_eq!(resolve_scored(&grid, 0, 5, &vocabulary()), Some(5));
    }

    #[test]
    fn anchors() {
        let grid = CellGrid::from_text_rows(&[
            &["Work Orders", ""],
            &["WO#", "Brief Desc", "Status"],
            &["Property", "Unit", "Resident", "Notice Date"],
        ]);
        assert_eq!(HeaderAnchor::All(vec![(0, "WO#")]).find(&grid, 0), Some(1));
        assert_eq!(HeaderAnchor::Any(vec![(0, "nothing"), (1, "Brief Desc")]).find(&grid, 0), Some(1));
        assert_eq!(HeaderAnchor::Labels(vec!["Unit", "Notice Date", "Property"]).find(&grid, 0), Some(2));
        assert_eq!(HeaderAnchor::Labels(vec!["Unit", "Notice"]).find(&grid, 0), None);
    }

    #[test]
    fn merges_two_rows() {
        let merged = merge_header_rows(&[strings(&["Code", "Move"]), strings(&["", "In"])]);
        assert_eq!(merged, vec![Some("Code".to_owned()), Some("Move In".to_owned())]);
    }

    #[test]
    fn merges_unique_parts() {
        let merged = merge_header_rows(&[
            strings(&["Market", "Units", ""]),
            strings(&["Rent", "Units", ""]),
            strings(&["Average", "", ""]),
        ]);
        assert_eq!(merged, vec![Some("Market Rent Average".to_owned()), Some("Units".to_owned()), None]);
    }

    #[test]
    fn header_end_policies() {
        let merged = vec![Some("Unit".to_owned()), None, Some("Rent".to_owned()), None, None];
        assert_eq!(header_columns(merged.clone(), HeaderEnd::FirstBlank), vec!["Unit"]);
        assert_eq!(header_columns(merged, HeaderEnd::TrailingBlanks), vec!["Unit", "Column_1", "Rent"]);
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let merged = vec![Some("Rent".to_owned()), Some("Rent".to_owned()), Some("Rent".to_owned())];
        assert_eq!(header_columns(merged, HeaderEnd::FirstBlank), vec!["Rent", "Rent.1", "Rent.2"]);
    }

    #[test]
    fn suffixes_skip_names_already_in_the_header() {
        let names = |cells: &[&str]| cells.iter().map(|cell| Some(cell.to_string())).collect::<Vec<_>>();
        assert_eq!(
            header_columns(names(&["Rent", "Rent", "Rent.1"]), HeaderEnd::FirstBlank),
            vec!["Rent", "Rent.1", "Rent.1.1"]
        );
        assert_eq!(
            header_columns(names(&["Rent.1", "Rent", "Rent"]), HeaderEnd::FirstBlank),
            vec!["Rent.1", "Rent", "Rent.2"]
        );
        let merged = vec![Some("Unit".to_owned()), None, Some("Column_1".to_owned())];
        assert_eq!(
            header_columns(merged, HeaderEnd::TrailingBlanks),
            vec!["Unit", "Column_1", "Column_1.1"]
        );
    }

    #[test]
    fn reads_stacked_header() {
        let grid = CellGrid::from_text_rows(&[
            &["Code", "Move", ""],
            &["", "In", ""],
            &["a1", "3", ""],
        ]);
        let header = Header::read(&grid, 0, 2, HeaderEnd::FirstBlank).unwrap();
        assert_eq!(header.columns, vec!["Code", "Move In"]);
        assert_eq!(header.data_start(), 2);
        let blank = CellGrid::from_text_rows(&[&["", ""]]);
        assert!(Header::read(&blank, 0, 1, HeaderEnd::FirstBlank).is_none());
    }
}
