//! Functions for loading binary lesion masks.

use ndarray::Array3;

use std::path::Path;

use crate::error::Result;
use crate::nifti::NiftiVolume;

/// A subject's lesion mask: `true` for every voxel of lesioned tissue.
#[derive(Debug, Clone, PartialEq)]
pub struct LesionMask {
    pub voxels: Array3<bool>,
}


impl LesionMask {

    /// Threshold a lesion volume: any value greater than zero is lesioned. `NaN` voxels are not lesioned.
    pub fn from_volume(vol: &NiftiVolume) -> LesionMask {
        LesionMask { voxels: vol.data.mapv(|v| v > 0.) }
    }


    /// Read a lesion mask from a NIfTI file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<LesionMask> {
        let vol = NiftiVolume::from_file(path)?;
        Ok(LesionMask::from_volume(&vol))
    }


    /// The shape of the voxel grid.
    pub fn shape(&self) -> [usize; 3] {
        let dims = self.voxels.dim();
        [dims.0, dims.1, dims.2]
    }


    /// The number of lesioned voxels.
    pub fn lesioned_voxels(&self) -> usize {
        self.voxels.iter().filter(|&&v| v).count()
    }
}


impl From<Array3<bool>> for LesionMask {
    fn from(voxels: Array3<bool>) -> LesionMask {
        LesionMask { voxels }
    }
}


/// Read a lesion mask from a NIfTI file, treating every voxel with a value greater than zero as lesioned.
///
/// # Examples
///
/// ```no_run
/// let mask = lesionsa::read_lesion_mask("/path/to/lesions/rM1023_lesion.nii").unwrap();
/// println!("Subject has {} lesioned voxels.", mask.lesioned_voxels());
/// ```
pub fn read_lesion_mask<P: AsRef<Path>>(path: P) -> Result<LesionMask> {
    LesionMask::from_file(path)
}
