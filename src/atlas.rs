//! Functions for managing a volumetric brain atlas.
//!
//! An atlas assigns each voxel of a 3D grid to at most one brain region, identified by a
//! non-negative integer. The identifier `0`, and any identifier that is not listed in the
//! region label table, means that the voxel belongs to no region.

use ndarray::Array3;
use ndarray_stats::QuantileExt;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::nifti::NiftiVolume;

/// Models a volumetric brain atlas: the region identifier of every voxel, and the physical volume of one voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas {
    pub labels: Array3<i32>,
    pub spacing_mm: [f64; 3],
    pub voxel_volume_cm3: f64,
}


impl Atlas {

    /// Build an atlas from a NIfTI volume.
    ///
    /// Stored values are rounded to the nearest integer, so that float-encoded label volumes with
    /// slight numerical noise (e.g., `2.9999998`) still map to the intended region. Non-finite
    /// values and values outside of the `i32` range are mapped to `0`, i.e., no region.
    ///
    /// # Errors
    ///
    /// If the volume lacks usable voxel spacing metadata, or is not a 3D volume.
    pub fn from_volume(vol: &NiftiVolume) -> Result<Atlas> {
        vol.header.volume_dims()?;
        let spacing_mm = vol.header.voxel_spacing_mm()?;
        let voxel_volume_cm3 = vol.header.voxel_volume_cm3()?;
        let labels = vol.data.mapv(label_from_value);

        Ok(Atlas {
            labels,
            spacing_mm,
            voxel_volume_cm3,
        })
    }


    /// Read an atlas from a NIfTI file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Atlas> {
        let vol = NiftiVolume::from_file(path)?;
        Atlas::from_volume(&vol)
    }


    /// The shape of the voxel grid.
    pub fn shape(&self) -> [usize; 3] {
        let dims = self.labels.dim();
        [dims.0, dims.1, dims.2]
    }


    pub fn num_voxels(&self) -> usize {
        self.labels.len()
    }


    /// The highest region identifier present in the atlas, or `None` for an empty grid.
    pub fn max_label(&self) -> Option<i32> {
        self.labels.max().ok().copied()
    }


    /// Count the voxels assigned to each region identifier, including `0`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let atlas = lesionsa::read_atlas("/path/to/rjhu.nii").unwrap();
    /// let counts = atlas.label_counts();
    /// println!("Region 1 has {} voxels.", counts.get(&1).copied().unwrap_or(0));
    /// ```
    pub fn label_counts(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for &label in self.labels.iter() {
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }
}


impl fmt::Display for Atlas {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [nx, ny, nz] = self.shape();
        write!(f, "Volumetric atlas with {}x{}x{} voxels of {} cm3 each.", nx, ny, nz, self.voxel_volume_cm3)
    }
}


/// Round a stored voxel value to a region identifier.
fn label_from_value(value: f64) -> i32 {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= i32::MIN as f64 && rounded <= i32::MAX as f64 {
        rounded as i32
    } else {
        0
    }
}


/// Read a volumetric brain atlas from a NIfTI file.
///
/// The file must carry voxel spacing metadata, which determines the physical voxel volume.
///
/// # Examples
///
/// ```no_run
/// let atlas = lesionsa::read_atlas("/path/to/rjhu.nii").unwrap();
/// println!("{}", atlas);
/// ```
pub fn read_atlas<P: AsRef<Path>>(path: P) -> Result<Atlas> {
    Atlas::from_file(path)
}
