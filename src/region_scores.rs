//! Functions for reading per-region sensorimotor-association (SA) rank tables.
//!
//! The table is a comma-separated file with a header row. Only the columns `Abbrev` and `MeanSA`
//! are used, they may appear in any position. A region can be unscored: either it is not listed
//! at all, or its `MeanSA` cell is empty or one of the `MISSING_SCORE_TOKENS` such as `NaN`, `NA`
//! or `NULL`. An unscored region has no score, which is different from a score of zero.

use csv::{ReaderBuilder, Trim};
use log::debug;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::error::{LesionSaError, Result};
use crate::region_labels::RegionLabelTable;
use crate::util::open_maybe_gz;

pub const ABBREV_COLUMN: &str = "Abbrev";
pub const SCORE_COLUMN: &str = "MeanSA";

/// Maps region abbreviations to their mean SA rank.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionScoreTable {
    scores: HashMap<String, f64>,
}


impl RegionScoreTable {

    /// Read a region score table from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RegionScoreTable> {
        RegionScoreTable::from_reader(open_maybe_gz(path)?)
    }


    /// Read a region score table from the given reader.
    ///
    /// If a region is listed more than once, the first row wins.
    pub fn from_reader<S>(input: S) -> Result<RegionScoreTable>
    where
        S: Read,
    {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(b',')
            .trim(Trim::All)
            .from_reader(input);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| LesionSaError::InvalidRegionScores(
                format!("missing column '{}'", name)))
        };
        let abbrev_col = column(ABBREV_COLUMN)?;
        let score_col = column(SCORE_COLUMN)?;

        let mut scores: HashMap<String, f64> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let abbrev = record.get(abbrev_col).unwrap_or("");
            let raw_score = record.get(score_col).unwrap_or("");

            let score = parse_score(raw_score).ok_or_else(|| LesionSaError::InvalidRegionScores(
                format!("line {}: '{}' is not a valid {} value", line, raw_score, SCORE_COLUMN)))?;

            if abbrev.is_empty() {
                continue;
            }
            if !seen.insert(abbrev.to_string()) {
                debug!("Region '{}' is scored more than once, keeping the first score.", abbrev);
                continue;
            }
            if let Some(score) = score {
                scores.insert(abbrev.to_string(), score);
            }
        }

        Ok(RegionScoreTable { scores })
    }


    /// Get the score of a region, or `None` if the region is unscored.
    pub fn score(&self, abbrev: &str) -> Option<f64> {
        self.scores.get(abbrev).copied()
    }


    /// Number of scored regions.
    pub fn len(&self) -> usize {
        self.scores.len()
    }


    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }


    /// Get the abbreviations of all regions in the label table which have no score, in table order.
    pub fn unscored_regions<'a>(&self, labels: &'a RegionLabelTable) -> Vec<&'a str> {
        labels
            .iter()
            .filter(|r| self.score(&r.abbrev).is_none())
            .map(|r| r.abbrev.as_str())
            .collect()
    }
}


impl<S: Into<String>> std::iter::FromIterator<(S, f64)> for RegionScoreTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        RegionScoreTable {
            scores: iter.into_iter().map(|(abbrev, score)| (abbrev.into(), score)).collect(),
        }
    }
}


impl fmt::Display for RegionScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Region score table with {} scored regions.", self.scores.len())
    }
}


/// Cell values which mark a missing score. These are the usual spreadsheet and data frame spellings.
pub const MISSING_SCORE_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Parse a score cell. `Some(None)` is an explicitly missing score, `None` an invalid cell.
fn parse_score(raw: &str) -> Option<Option<f64>> {
    if MISSING_SCORE_TOKENS.contains(&raw) || raw.eq_ignore_ascii_case("nan") {
        return Some(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Some(None),
        Ok(v) => Some(Some(v)),
        Err(_) => None,
    }
}


/// Read a comma-separated region score table with the columns `Abbrev` and `MeanSA`.
///
/// # Examples
///
/// ```no_run
/// let scores = lesionsa::read_region_scores("/path/to/MeanSA_in_JHU_ROIs.csv").unwrap();
/// println!("SA rank of PreCG_L: {:?}", scores.score("PreCG_L"));
/// ```
pub fn read_region_scores<P: AsRef<Path>>(path: P) -> Result<RegionScoreTable> {
    RegionScoreTable::from_file(path)
}
