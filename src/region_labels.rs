//! Functions for reading atlas region label tables.
//!
//! A label table is a pipe-delimited text file without header, with the four columns
//! `Index|Abbrev|Name|Type`, one line per atlas region. The `Index` is the region identifier
//! used in the atlas volume, the `Abbrev` is the short region name used to look up region scores.

use csv::{ReaderBuilder, Trim};

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::error::{LesionSaError, Result};
use crate::util::open_maybe_gz;

/// A single atlas region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLabel {
    pub index: i32,
    pub abbrev: String,
    pub name: String,
    pub region_type: String,
}


/// The regions of an atlas, in file order. Both the `index` and the `abbrev` of each region are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionLabelTable {
    pub regions: Vec<RegionLabel>,
}


impl RegionLabelTable {

    /// Read a region label table from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RegionLabelTable> {
        RegionLabelTable::from_reader(open_maybe_gz(path)?)
    }


    /// Read a region label table from the given reader.
    pub fn from_reader<S>(input: S) -> Result<RegionLabelTable>
    where
        S: Read,
    {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'|')
            .double_quote(false)
            .quoting(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        let mut regions: Vec<RegionLabel> = Vec::new();
        let mut seen_indices: HashSet<i32> = HashSet::new();
        let mut seen_abbrevs: HashSet<String> = HashSet::new();

        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            // Lines with nothing but whitespace.
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            if record.len() != 4 {
                return Err(LesionSaError::InvalidRegionLabels(format!(
                    "line {}: expected 4 '|'-separated fields, found {}", line, record.len())));
            }

            let index: i32 = record[0].parse().map_err(|_| LesionSaError::InvalidRegionLabels(format!(
                "line {}: region index '{}' is not an integer", line, &record[0])))?;
            let abbrev = record[1].to_string();

            if !seen_indices.insert(index) {
                return Err(LesionSaError::InvalidRegionLabels(format!(
                    "line {}: duplicate region index {}", line, index)));
            }
            if !seen_abbrevs.insert(abbrev.clone()) {
                return Err(LesionSaError::InvalidRegionLabels(format!(
                    "line {}: duplicate region abbreviation '{}'", line, abbrev)));
            }

            regions.push(RegionLabel {
                index,
                abbrev,
                name: record[2].to_string(),
                region_type: record[3].to_string(),
            });
        }

        Ok(RegionLabelTable { regions })
    }


    pub fn len(&self) -> usize {
        self.regions.len()
    }


    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }


    pub fn iter(&self) -> std::slice::Iter<'_, RegionLabel> {
        self.regions.iter()
    }


    /// Get the region abbreviations, in table order.
    pub fn abbrevs(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.abbrev.as_str()).collect()
    }
}


impl fmt::Display for RegionLabelTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Region label table for {} brain regions.", self.regions.len())
    }
}


/// Read a pipe-delimited region label table.
///
/// # Examples
///
/// ```no_run
/// let labels = lesionsa::read_region_labels("/path/to/jhu.txt").unwrap();
/// println!("Atlas has regions {:?}.", labels.abbrevs());
/// ```
pub fn read_region_labels<P: AsRef<Path>>(path: P) -> Result<RegionLabelTable> {
    RegionLabelTable::from_file(path)
}
