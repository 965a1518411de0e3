//! Lesion volume per brain atlas region, weighted by a per-region sensorimotor-association (SA) rank.
//!
//! For every subject of a cohort, the binary lesion mask is overlapped with the regions of a
//! volumetric brain atlas. The lesioned volume per region is weighted with the region's SA rank,
//! and the weighted volumes of all lesioned and scored regions are averaged into a single
//! proportional SA rank per subject. Lesion masks must already be co-registered to the atlas.

pub mod aggregate;
pub mod atlas;
pub mod cohort;
pub mod cohort_csv;
pub mod error;
pub mod lesion_mask;
pub mod nifti;
pub mod region_labels;
pub mod region_scores;
pub mod util;

pub use aggregate::{aggregate_subject, proportional_sa_rank, RegionOverlap, SubjectRecord};
pub use atlas::{read_atlas, Atlas};
pub use cohort::{discover_lesion_files, run_and_write, run_cohort, subject_id, CohortConfig, CohortInputs, CohortTable, SubjectFailure};
pub use cohort_csv::{write_cohort_csv, write_cohort_to};
pub use error::{LesionSaError, Result};
pub use lesion_mask::{read_lesion_mask, LesionMask};
pub use nifti::{read_nifti, NiftiHeader, NiftiVolume};
pub use region_labels::{read_region_labels, RegionLabel, RegionLabelTable};
pub use region_scores::{read_region_scores, RegionScoreTable};
