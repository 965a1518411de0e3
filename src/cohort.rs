//! Runs the per-subject aggregation over a whole cohort of lesion masks.
//!
//! The atlas, the region label table and the region score table are loaded once. Lesion files are
//! discovered in a directory by file name prefix and suffix and processed in lexicographic file
//! name order, which is also the row order of the result table. By default the first failing
//! subject aborts the whole run.

use log::{debug, info, warn};
use rayon::prelude::*;

use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::{aggregate_subject, SubjectRecord};
use crate::atlas::Atlas;
use crate::cohort_csv::write_cohort_csv;
use crate::error::{LesionSaError, Result};
use crate::lesion_mask::LesionMask;
use crate::region_labels::RegionLabelTable;
use crate::region_scores::RegionScoreTable;

pub const DEFAULT_FILE_PREFIX: &str = "rM";
pub const DEFAULT_FILE_SUFFIX: &str = "_lesion.nii";

/// All paths and switches of a cohort run.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortConfig {
    pub lesion_dir: PathBuf,
    pub atlas_path: PathBuf,
    pub labels_path: PathBuf,
    pub scores_path: PathBuf,
    pub output_path: PathBuf,
    pub file_prefix: String,
    pub file_suffix: String,
    /// Process subjects on all cores. Row order is not affected.
    pub parallel: bool,
    /// Record failing subjects and continue, instead of aborting the run.
    pub isolate_subject_errors: bool,
}


impl CohortConfig {

    /// Create a config with the default lesion file naming (`rM*_lesion.nii`), sequential and fail-fast.
    pub fn new<P: Into<PathBuf>>(lesion_dir: P, atlas_path: P, labels_path: P, scores_path: P, output_path: P) -> CohortConfig {
        CohortConfig {
            lesion_dir: lesion_dir.into(),
            atlas_path: atlas_path.into(),
            labels_path: labels_path.into(),
            scores_path: scores_path.into(),
            output_path: output_path.into(),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            parallel: false,
            isolate_subject_errors: false,
        }
    }
}


/// The inputs shared by all subjects. Read-only after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortInputs {
    pub atlas: Atlas,
    pub labels: RegionLabelTable,
    pub scores: RegionScoreTable,
}


impl CohortInputs {

    /// Load atlas, region labels and region scores.
    ///
    /// # Errors
    ///
    /// If any of the three files is missing or malformed. Nothing is processed in that case.
    pub fn load(config: &CohortConfig) -> Result<CohortInputs> {
        let atlas = Atlas::from_file(&config.atlas_path)?;
        info!("Loaded atlas '{}': {}", config.atlas_path.display(), atlas);

        let labels = RegionLabelTable::from_file(&config.labels_path)?;
        info!("Loaded {} atlas regions from '{}'.", labels.len(), config.labels_path.display());

        let scores = RegionScoreTable::from_file(&config.scores_path)?;
        info!("Loaded SA ranks for {} regions from '{}'.", scores.len(), config.scores_path.display());

        let inputs = CohortInputs { atlas, labels, scores };
        inputs.check_coverage();
        Ok(inputs)
    }


    /// Warn about regions that can never contribute a weighted volume.
    fn check_coverage(&self) {
        let unscored = self.scores.unscored_regions(&self.labels);
        if !unscored.is_empty() {
            warn!("{} of {} atlas regions have no SA rank, their weighted volumes stay empty: {}",
                unscored.len(), self.labels.len(), unscored.join(", "));
        }

        let counts = self.atlas.label_counts();
        let absent: Vec<&str> = self.labels
            .iter()
            .filter(|r| !counts.contains_key(&r.index))
            .map(|r| r.abbrev.as_str())
            .collect();
        if !absent.is_empty() {
            warn!("{} regions of the label table do not occur in the atlas (highest atlas label is {:?}): {}",
                absent.len(), self.atlas.max_label(), absent.join(", "));
        }
    }


    /// Load the lesion mask of one subject and aggregate it.
    ///
    /// Errors are wrapped in `LesionSaError::SubjectFailed`, carrying the lesion file path.
    pub fn process_subject(&self, path: &Path) -> Result<SubjectRecord> {
        let participant = subject_id(path);
        debug!("Processing subject '{}' from '{}'.", participant, path.display());

        LesionMask::from_file(path)
            .and_then(|mask| aggregate_subject(&participant, &mask, &self.atlas, &self.labels, &self.scores))
            .map_err(|err| LesionSaError::SubjectFailed { path: path.to_path_buf(), err: Box::new(err) })
    }
}


/// A subject that could not be processed in a run with isolated subject errors.
#[derive(Debug)]
pub struct SubjectFailure {
    pub path: PathBuf,
    pub error: LesionSaError,
}


/// The cohort result: one record per subject in file name order, plus the region columns.
#[derive(Debug, Default)]
pub struct CohortTable {
    /// Region abbreviations, in label table order.
    pub regions: Vec<String>,
    pub records: Vec<SubjectRecord>,
    pub failures: Vec<SubjectFailure>,
}


impl CohortTable {

    pub fn new(labels: &RegionLabelTable) -> CohortTable {
        CohortTable {
            regions: labels.iter().map(|r| r.abbrev.clone()).collect(),
            records: Vec::new(),
            failures: Vec::new(),
        }
    }


    fn push_outcome(&mut self, path: &Path, outcome: Result<SubjectRecord>, isolate: bool) -> Result<()> {
        match outcome {
            Ok(record) => self.records.push(record),
            Err(err) if isolate => {
                warn!("Skipping subject: {}", err);
                self.failures.push(SubjectFailure { path: path.to_path_buf(), error: err });
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}


/// Find the lesion files in a directory: regular files whose name starts with `prefix` and ends with `suffix`.
///
/// The files are returned sorted by file name.
///
/// # Errors
///
/// If `dir` is not a directory or cannot be listed.
pub fn discover_lesion_files<P: AsRef<Path>>(dir: P, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(LesionSaError::MissingLesionDir(dir.to_path_buf()));
    }

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let matches = name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix);
        if matches && path.is_file() {
            files.push((name, path));
        }
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}


/// Extract the subject identifier from a lesion file path: the part of the file name before the first underscore.
///
/// # Examples
///
/// ```
/// assert_eq!("rM1023", lesionsa::subject_id("/data/lesions/rM1023_lesion.nii"));
/// ```
pub fn subject_id<P: AsRef<Path>>(path: P) -> String {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('_').next().unwrap_or_default().to_string()
}


/// Aggregate the given lesion files, in the given order.
pub fn process_cohort(inputs: &CohortInputs, files: &[PathBuf], parallel: bool, isolate: bool) -> Result<CohortTable> {
    let mut table = CohortTable::new(&inputs.labels);

    if parallel {
        let outcomes: Vec<Result<SubjectRecord>> = files
            .par_iter()
            .map(|path| inputs.process_subject(path))
            .collect();
        for (path, outcome) in files.iter().zip(outcomes) {
            table.push_outcome(path, outcome, isolate)?;
        }
    } else {
        for path in files {
            table.push_outcome(path, inputs.process_subject(path), isolate)?;
        }
    }

    Ok(table)
}


/// Run the whole cohort in memory: load the shared inputs, discover and aggregate all subjects.
pub fn run_cohort(config: &CohortConfig) -> Result<CohortTable> {
    let inputs = CohortInputs::load(config)?;

    let files = discover_lesion_files(&config.lesion_dir, &config.file_prefix, &config.file_suffix)?;
    if files.is_empty() {
        warn!("No lesion files matching '{}*{}' found in '{}'.", config.file_prefix, config.file_suffix, config.lesion_dir.display());
    } else {
        info!("Found {} lesion files in '{}'.", files.len(), config.lesion_dir.display());
    }

    let table = process_cohort(&inputs, &files, config.parallel, config.isolate_subject_errors)?;
    if !table.failures.is_empty() {
        warn!("{} of {} subjects failed and are missing from the results.", table.failures.len(), files.len());
    }
    Ok(table)
}


/// Run the whole cohort and write the result file. The output file is only created if the run succeeds.
pub fn run_and_write(config: &CohortConfig) -> Result<CohortTable> {
    let table = run_cohort(config)?;
    write_cohort_csv(&config.output_path, &table)?;
    info!("Saved results for {} subjects to '{}'.", table.records.len(), config.output_path.display());
    Ok(table)
}
