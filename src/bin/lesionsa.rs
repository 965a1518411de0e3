//! lesionsa -- lesion volume per atlas region, weighted by SA rank, for a cohort of lesion masks.
//!
//! ```text
//! lesionsa --lesion-dir lesions/ --atlas rjhu.nii --labels jhu.txt \
//!     --scores MeanSA_in_JHU_ROIs.csv --output JHU_lesion_volumes_byROI.csv
//! ```
//!
//! Set `RUST_LOG=debug` to see per-subject progress.

use clap::Parser;
use log::{error, info, warn};

use std::path::PathBuf;
use std::process;

use lesionsa::cohort::{DEFAULT_FILE_PREFIX, DEFAULT_FILE_SUFFIX};
use lesionsa::CohortConfig;

#[derive(Debug, Parser)]
#[command(name = "lesionsa", version, about = "Lesion volume per atlas region, weighted by sensorimotor-association rank")]
struct Args {
    /// Directory containing the co-registered lesion masks
    #[arg(long)]
    lesion_dir: PathBuf,

    /// Atlas volume (NIfTI-1) with voxel spacing metadata
    #[arg(long)]
    atlas: PathBuf,

    /// Pipe-delimited region label file: Index|Abbrev|Name|Type
    #[arg(long)]
    labels: PathBuf,

    /// Comma-separated region score file with columns Abbrev and MeanSA
    #[arg(long)]
    scores: PathBuf,

    /// Output CSV file
    #[arg(long)]
    output: PathBuf,

    /// Lesion file name prefix
    #[arg(long, default_value = DEFAULT_FILE_PREFIX)]
    prefix: String,

    /// Lesion file name suffix
    #[arg(long, default_value = DEFAULT_FILE_SUFFIX)]
    suffix: String,

    /// Process subjects in parallel
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Skip subjects that fail to load instead of aborting the run
    #[arg(long, default_value_t = false)]
    isolate_failures: bool,
}


impl Args {
    fn into_config(self) -> CohortConfig {
        CohortConfig {
            lesion_dir: self.lesion_dir,
            atlas_path: self.atlas,
            labels_path: self.labels,
            scores_path: self.scores,
            output_path: self.output,
            file_prefix: self.prefix,
            file_suffix: self.suffix,
            parallel: self.parallel,
            isolate_subject_errors: self.isolate_failures,
        }
    }
}


fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();

    match lesionsa::run_and_write(&config) {
        Ok(table) => {
            for failure in table.failures.iter() {
                warn!("Not in results: '{}' ({})", failure.path.display(), failure.error);
            }
            info!("Done.");
        }
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    }
}
