//! Per-subject lesion overlap with atlas regions, and the proportional SA rank.
//!
//! For each region of the label table, the lesioned volume inside the region is computed and
//! weighted with the region's SA rank. The proportional SA rank of a subject is the mean of these
//! weighted volumes over all regions which are both lesioned and scored. Note that this is not
//! normalized by the total lesion volume.

use log::debug;
use ndarray::Zip;

use std::collections::HashMap;

use crate::atlas::Atlas;
use crate::error::{LesionSaError, Result};
use crate::lesion_mask::LesionMask;
use crate::region_labels::RegionLabelTable;
use crate::region_scores::RegionScoreTable;

/// The overlap of a lesion with a single atlas region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOverlap {
    pub abbrev: String,
    pub overlap_voxels: usize,
    pub volume_cm3: f64,
    pub score: Option<f64>,
    /// The volume multiplied with the score, `None` if the region has no score.
    pub weighted_cm3: Option<f64>,
}


impl RegionOverlap {

    pub fn new(abbrev: &str, overlap_voxels: usize, voxel_volume_cm3: f64, score: Option<f64>) -> RegionOverlap {
        let volume_cm3 = overlap_voxels as f64 * voxel_volume_cm3;
        RegionOverlap {
            abbrev: abbrev.to_string(),
            overlap_voxels,
            volume_cm3,
            score,
            weighted_cm3: score.map(|s| volume_cm3 * s),
        }
    }


    /// Whether the region enters the proportional SA rank.
    pub fn is_lesioned_and_scored(&self) -> bool {
        self.volume_cm3 > 0. && self.score.is_some()
    }
}


/// The result for one subject: per-region overlaps in label table order, and the summary score.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRecord {
    pub participant: String,
    pub regions: Vec<RegionOverlap>,
    pub proportional_sa_rank: Option<f64>,
}


impl SubjectRecord {

    /// Get the overlap for the region with the given abbreviation.
    pub fn region(&self, abbrev: &str) -> Option<&RegionOverlap> {
        self.regions.iter().find(|r| r.abbrev == abbrev)
    }


    /// The lesion volume inside all labeled regions, in cubic centimeters.
    pub fn total_lesion_volume_cm3(&self) -> f64 {
        self.regions.iter().map(|r| r.volume_cm3).sum()
    }
}


/// Count the lesioned voxels per atlas region identifier.
///
/// # Errors
///
/// If the lesion mask and the atlas are not defined on voxel grids of identical shape.
pub fn lesion_label_counts(mask: &LesionMask, atlas: &Atlas) -> Result<HashMap<i32, usize>> {
    if mask.shape() != atlas.shape() {
        return Err(LesionSaError::ShapeMismatch { expected: atlas.shape(), found: mask.shape() });
    }

    let mut counts: HashMap<i32, usize> = HashMap::new();
    Zip::from(&atlas.labels).and(&mask.voxels).for_each(|&label, &lesioned| {
        if lesioned {
            *counts.entry(label).or_insert(0) += 1;
        }
    });
    Ok(counts)
}


/// Compute the proportional SA rank from region overlaps.
///
/// This is the sum of `volume * score` over all regions with a positive volume and a score, divided
/// by the number of such regions. Returns `None` if there is no such region.
pub fn proportional_sa_rank(regions: &[RegionOverlap]) -> Option<f64> {
    let (weighted_sum, count) = regions
        .iter()
        .filter(|r| r.is_lesioned_and_scored())
        .filter_map(|r| r.weighted_cm3)
        .fold((0.0_f64, 0_usize), |(sum, count), weighted| (sum + weighted, count + 1));

    if count > 0 {
        Some(weighted_sum / count as f64)
    } else {
        None
    }
}


/// Compute the per-region lesion overlap and the proportional SA rank for one subject.
///
/// # Errors
///
/// `LesionSaError::ShapeMismatch` if the mask's voxel grid differs from the atlas grid.
///
/// # Examples
///
/// ```no_run
/// let atlas = lesionsa::read_atlas("/path/to/rjhu.nii").unwrap();
/// let labels = lesionsa::read_region_labels("/path/to/jhu.txt").unwrap();
/// let scores = lesionsa::read_region_scores("/path/to/MeanSA_in_JHU_ROIs.csv").unwrap();
/// let mask = lesionsa::read_lesion_mask("/path/to/lesions/rM1023_lesion.nii").unwrap();
/// let record = lesionsa::aggregate_subject("rM1023", &mask, &atlas, &labels, &scores).unwrap();
/// println!("Proportional SA rank: {:?}", record.proportional_sa_rank);
/// ```
pub fn aggregate_subject(participant: &str, mask: &LesionMask, atlas: &Atlas, labels: &RegionLabelTable, scores: &RegionScoreTable) -> Result<SubjectRecord> {
    let counts = lesion_label_counts(mask, atlas)?;

    let regions: Vec<RegionOverlap> = labels
        .iter()
        .map(|region| {
            let overlap_voxels = counts.get(&region.index).copied().unwrap_or(0);
            RegionOverlap::new(&region.abbrev, overlap_voxels, atlas.voxel_volume_cm3, scores.score(&region.abbrev))
        })
        .collect();

    let proportional_sa_rank = proportional_sa_rank(&regions);

    debug!("Subject '{}': {} of {} regions lesioned, proportional SA rank {:?}.",
        participant, regions.iter().filter(|r| r.overlap_voxels > 0).count(), regions.len(), proportional_sa_rank);

    Ok(SubjectRecord {
        participant: participant.to_string(),
        regions,
        proportional_sa_rank,
    })
}
