use quick_error::quick_error;
use std::io::Error as IOError;
use std::path::PathBuf;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum LesionSaError {
        /// Invalid NIfTI file: wrong header size or magic.
        InvalidNiftiFormat {
            display("Invalid NIfTI-1 file")
        }

        UnsupportedNiftiDatatype(code: i16) {
            display("Unsupported NIfTI datatype code {}", code)
        }

        /// More than 3 non-singleton dimensions, or fewer than 3 dimensions.
        UnsupportedNiftiDimensionality(dim: Vec<i16>) {
            display("Unsupported NIfTI dimensions {:?}, expected a 3D volume", dim)
        }

        /// The volume does not carry three finite, positive voxel sizes.
        MissingVoxelSpacing {
            display("NIfTI volume has no usable voxel spacing (pixdim) metadata")
        }

        InvalidRegionLabels(msg: String) {
            display("Invalid region label file: {}", msg)
        }

        InvalidRegionScores(msg: String) {
            display("Invalid region score file: {}", msg)
        }

        ShapeMismatch { expected: [usize; 3], found: [usize; 3] } {
            display("Lesion mask shape {:?} differs from atlas shape {:?}", found, expected)
        }

        MissingLesionDir(path: PathBuf) {
            display("Lesion directory '{}' does not exist or is not a directory", path.display())
        }

        /// Wraps the failure of a single subject together with its lesion file.
        SubjectFailed { path: PathBuf, err: Box<LesionSaError> } {
            display("Failed to process lesion file '{}': {}", path.display(), err)
            source(&**err)
        }

        Csv(err: csv::Error) {
            from()
            display("CSV error: {}", err)
            source(err)
        }

        /// Renaming the finished temporary output file failed.
        Persist(err: tempfile::PersistError) {
            from()
            display("Could not move output file into place: {}", err)
            source(err)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            display("I/O error: {}", err)
            source(err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, LesionSaError>;
