//! Synthetic NIfTI-1 fixtures for the integration tests.
#![allow(dead_code)]

use byteordered::{ByteOrdered, Endianness};
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array3;

use std::fs;
use std::io::Write;
use std::path::Path;

pub const DT_FLOAT32: i16 = 16;

/// A NIfTI-1 header for a float32 volume. Single files get the 4 extension bytes appended.
pub fn nifti_header(dims: [usize; 3], pixdim: [f32; 3], endianness: Endianness, single_file: bool) -> Vec<u8> {
    let mut out = ByteOrdered::runtime(Vec::new(), endianness);
    out.write_i32(348).unwrap();
    out.write_all(&[0u8; 36]).unwrap();
    let dim: [i16; 8] = [3, dims[0] as i16, dims[1] as i16, dims[2] as i16, 1, 1, 1, 1];
    for d in dim.iter() {
        out.write_i16(*d).unwrap();
    }
    out.write_all(&[0u8; 14]).unwrap();
    out.write_i16(DT_FLOAT32).unwrap();
    out.write_i16(32).unwrap();
    out.write_i16(0).unwrap();
    out.write_f32(1.).unwrap();
    for p in pixdim.iter() {
        out.write_f32(*p).unwrap();
    }
    for _ in 0..4 {
        out.write_f32(0.).unwrap();
    }
    out.write_f32(if single_file { 352. } else { 0. }).unwrap();
    out.write_f32(1.).unwrap(); // scl_slope
    out.write_f32(0.).unwrap(); // scl_inter
    out.write_all(&[0u8; 3]).unwrap();
    out.write_u8(10).unwrap(); // mm, sec
    out.write_all(&[0u8; 24]).unwrap();
    out.write_all(&[0u8; 80]).unwrap();
    out.write_all(&[0u8; 116]).unwrap();
    out.write_all(if single_file { b"n+1\0" } else { b"ni1\0" }).unwrap();
    if single_file {
        out.write_all(&[0u8; 4]).unwrap();
    }
    out.into_inner()
}

/// The voxel values in file order, i.e., with the first axis varying fastest.
pub fn nifti_data(volume: &Array3<f32>, endianness: Endianness) -> Vec<u8> {
    let mut out = ByteOrdered::runtime(Vec::new(), endianness);
    for v in volume.t().iter() {
        out.write_f32(*v).unwrap();
    }
    out.into_inner()
}

/// Write bytes to a file, GZip-compressed if the file name ends with ".gz".
pub fn write_bytes(path: &Path, bytes: &[u8]) {
    if path.to_string_lossy().ends_with(".gz") {
        let mut enc = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap();
    } else {
        fs::write(path, bytes).unwrap();
    }
}

/// Write a little endian single file NIfTI volume (`.nii` or `.nii.gz`).
pub fn write_nifti(path: &Path, volume: &Array3<f32>, pixdim: [f32; 3]) {
    write_nifti_with(path, volume, pixdim, Endianness::Little);
}

pub fn write_nifti_with(path: &Path, volume: &Array3<f32>, pixdim: [f32; 3], endianness: Endianness) {
    let (nx, ny, nz) = volume.dim();
    let mut bytes = nifti_header([nx, ny, nz], pixdim, endianness, true);
    bytes.extend(nifti_data(volume, endianness));
    write_bytes(path, &bytes);
}

/// Write a NIfTI header/image pair. `hdr_path` must end with ".hdr".
pub fn write_nifti_pair(hdr_path: &Path, volume: &Array3<f32>, pixdim: [f32; 3], endianness: Endianness) {
    let (nx, ny, nz) = volume.dim();
    write_bytes(hdr_path, &nifti_header([nx, ny, nz], pixdim, endianness, false));
    write_bytes(&hdr_path.with_extension("img"), &nifti_data(volume, endianness));
}
