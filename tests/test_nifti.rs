mod common;

use approx::assert_abs_diff_eq;
use byteordered::Endianness;
use ndarray::{Array, Array3};

use lesionsa::{read_nifti, LesionSaError, NiftiHeader};

fn ramp() -> Array3<f32> {
    Array::from_shape_fn((3, 2, 2), |(x, y, z)| (x + 10 * y + 100 * z) as f32)
}

fn assert_is_ramp(data: &Array3<f64>) {
    assert_eq!((3, 2, 2), data.dim());
    for ((x, y, z), v) in data.indexed_iter() {
        assert_abs_diff_eq!((x + 10 * y + 100 * z) as f64, *v);
    }
}

#[test]
fn a_nii_file_can_be_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.nii");
    common::write_nifti(&path, &ramp(), [1., 1.5, 2.]);

    let vol = read_nifti(&path).unwrap();
    assert_is_ramp(&vol.data);
    assert_eq!([3, 2, 2], vol.shape());
    assert_abs_diff_eq!(0.003, vol.header.voxel_volume_cm3().unwrap(), epsilon = 1e-12);

    let hdr = NiftiHeader::from_file(&path).unwrap();
    assert_eq!(hdr, vol.header);
}

#[test]
fn a_gzipped_nii_file_can_be_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.nii.gz");
    common::write_nifti(&path, &ramp(), [1., 1., 1.]);

    let vol = read_nifti(&path).unwrap();
    assert_is_ramp(&vol.data);
}

#[test]
fn a_big_endian_file_can_be_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.nii");
    common::write_nifti_with(&path, &ramp(), [2., 2., 2.], Endianness::Big);

    let vol = read_nifti(&path).unwrap();
    assert_eq!(Endianness::Big, vol.header.endianness);
    assert_is_ramp(&vol.data);
}

#[test]
fn a_header_image_pair_can_be_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.hdr");
    common::write_nifti_pair(&path, &ramp(), [1., 1., 1.], Endianness::Little);

    let vol = read_nifti(&path).unwrap();
    assert!(!vol.header.is_single_file());
    assert_is_ramp(&vol.data);
}

#[test]
fn a_truncated_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.nii");
    common::write_nifti(&path, &ramp(), [1., 1., 1.]);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    assert!(matches!(read_nifti(&path), Err(LesionSaError::Io(_))));
}

#[test]
fn a_file_that_is_not_nifti_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vol.nii");
    std::fs::write(&path, vec![7u8; 400]).unwrap();

    assert!(matches!(read_nifti(&path), Err(LesionSaError::InvalidNiftiFormat)));
}
