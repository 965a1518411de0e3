//! Functions for reading 3D brain volumes from NIfTI-1 files.
//!
//! Both single files (`.nii`, magic `n+1`) and header/image pairs (`.hdr` + `.img`, magic `ni1`) are
//! supported, optionally GZip-compressed. Voxel values are always returned as `f64`, with the
//! header's intensity scaling already applied.

use byteordered::{ByteOrdered, Endianness};
use ndarray::{Array3, ShapeBuilder};

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{LesionSaError, Result};
use crate::util::{open_maybe_gz, read_fixed_length_string, skip_bytes};

pub const NIFTI1_HEADER_SIZE: i32 = 348;

/// Upper bound for the voxel buffer reserved up front, 256^3 voxels.
const MAX_PREALLOCATED_VOXELS: usize = 1 << 24;

pub const NIFTI_DATATYPE_NAMES : [&str; 10] = ["DT_UINT8", "DT_INT16", "DT_INT32", "DT_FLOAT32", "DT_FLOAT64", "DT_INT8", "DT_UINT16", "DT_UINT32", "DT_INT64", "DT_UINT64"];
pub const NIFTI_DATATYPE_CODES : [i16; 10] = [2, 4, 8, 16, 64, 256, 512, 768, 1024, 1280];

pub const DT_UINT8: i16 = 2;
pub const DT_INT16: i16 = 4;
pub const DT_INT32: i16 = 8;
pub const DT_FLOAT32: i16 = 16;
pub const DT_FLOAT64: i16 = 64;
pub const DT_INT8: i16 = 256;
pub const DT_UINT16: i16 = 512;
pub const DT_UINT32: i16 = 768;
pub const DT_INT64: i16 = 1024;
pub const DT_UINT64: i16 = 1280;

/// Models the parts of a NIfTI-1 header needed to interpret a 3D volume.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub dim: [i16; 8],
    pub datatype: i16,
    pub bitpix: i16,
    pub pixdim: [f32; 8],
    pub vox_offset: f32,
    pub scl_slope: f32,
    pub scl_inter: f32,
    pub xyzt_units: u8,
    pub descrip: String,
    pub magic: String,
    pub endianness: Endianness,
}


/// Models a NIfTI-1 volume: the header and the (scaled) voxel values.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiVolume {
    pub header: NiftiHeader,
    pub data: Array3<f64>,
}


impl Default for NiftiHeader {
    fn default() -> NiftiHeader {
        NiftiHeader {
            dim: [0; 8],
            datatype: DT_UINT8,
            bitpix: 8,
            pixdim: [0.; 8],
            vox_offset: 352.,
            scl_slope: 0.,
            scl_inter: 0.,
            xyzt_units: 0,
            descrip: String::new(),
            magic: String::from("n+1"),
            endianness: Endianness::Little,
        }
    }
}


impl NiftiHeader {

    /// Read a NIfTI-1 header from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
        NiftiHeader::from_reader(open_maybe_gz(path)?)
    }


    /// Read a NIfTI-1 header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// header. Exactly 348 bytes are consumed.
    pub fn from_reader<S>(mut input: S) -> Result<NiftiHeader>
    where
        S: Read,
    {
        let mut hdr = NiftiHeader::default();

        // sizeof_hdr must be 348, which also tells us the byte order of the file.
        let mut sizeof_hdr = [0u8; 4];
        input.read_exact(&mut sizeof_hdr)?;
        hdr.endianness = if i32::from_le_bytes(sizeof_hdr) == NIFTI1_HEADER_SIZE {
            Endianness::Little
        } else if i32::from_be_bytes(sizeof_hdr) == NIFTI1_HEADER_SIZE {
            Endianness::Big
        } else {
            return Err(LesionSaError::InvalidNiftiFormat);
        };

        let mut input = ByteOrdered::runtime(input, hdr.endianness);

        skip_bytes(&mut input, 36)?; // data_type, db_name, extents, session_error, regular, dim_info

        for idx in 0..8 {
            hdr.dim[idx] = input.read_i16()?;
        }

        skip_bytes(&mut input, 14)?; // intent_p1..3, intent_code

        hdr.datatype = input.read_i16()?;
        hdr.bitpix = input.read_i16()?;
        let _slice_start = input.read_i16()?;

        for idx in 0..8 {
            hdr.pixdim[idx] = input.read_f32()?;
        }

        hdr.vox_offset = input.read_f32()?;
        hdr.scl_slope = input.read_f32()?;
        hdr.scl_inter = input.read_f32()?;

        skip_bytes(&mut input, 3)?; // slice_end, slice_code
        hdr.xyzt_units = input.read_u8()?;

        skip_bytes(&mut input, 24)?; // cal_max, cal_min, slice_duration, toffset, glmax, glmin
        hdr.descrip = read_fixed_length_string(&mut input, 80)?;

        skip_bytes(&mut input, 116)?; // aux_file, qform/sform codes and matrices, intent_name
        hdr.magic = read_fixed_length_string(&mut input, 4)?;

        if !(hdr.is_single_file() || hdr.magic == "ni1") {
            return Err(LesionSaError::InvalidNiftiFormat);
        }
        Ok(hdr)
    }


    /// Whether header and voxel data live in the same file (magic `n+1`).
    pub fn is_single_file(&self) -> bool {
        self.magic == "n+1"
    }


    /// The byte offset of the voxel data, relative to the start of the file holding the data.
    pub fn data_offset(&self) -> u64 {
        let offset = if self.vox_offset.is_finite() && self.vox_offset > 0. { self.vox_offset as u64 } else { 0 };
        if self.is_single_file() {
            offset.max(NIFTI1_HEADER_SIZE as u64)
        } else {
            offset
        }
    }


    /// The length of the three spatial dimensions.
    ///
    /// Trailing dimensions are accepted only if they are singletons, so a 4D file with a single frame is fine.
    pub fn volume_dims(&self) -> Result<[usize; 3]> {
        let ndim = self.dim[0];
        let unsupported = || LesionSaError::UnsupportedNiftiDimensionality(self.dim.to_vec());
        if !(3..=7).contains(&ndim) {
            return Err(unsupported());
        }
        if self.dim[1..=3].iter().any(|&d| d < 1) {
            return Err(unsupported());
        }
        if self.dim[4..=ndim as usize].iter().any(|&d| d != 1) {
            return Err(unsupported());
        }
        Ok([self.dim[1] as usize, self.dim[2] as usize, self.dim[3] as usize])
    }


    /// The voxel size along the three spatial axes, in millimeters.
    pub fn voxel_spacing_mm(&self) -> Result<[f64; 3]> {
        let spacing = [self.pixdim[1] as f64, self.pixdim[2] as f64, self.pixdim[3] as f64];
        if spacing.iter().all(|s| s.is_finite() && *s > 0.) {
            Ok(spacing)
        } else {
            Err(LesionSaError::MissingVoxelSpacing)
        }
    }


    /// The physical volume of a single voxel, in cubic centimeters.
    pub fn voxel_volume_cm3(&self) -> Result<f64> {
        let spacing = self.voxel_spacing_mm()?;
        Ok(spacing.iter().product::<f64>() / 1000.)
    }


    /// The `(slope, intercept)` pair to apply to raw voxel values, if the header requests scaling.
    pub fn scaling(&self) -> Option<(f64, f64)> {
        if self.scl_slope.is_finite() && self.scl_slope != 0. {
            let inter = if self.scl_inter.is_finite() { self.scl_inter as f64 } else { 0. };
            Some((self.scl_slope as f64, inter))
        } else {
            None
        }
    }


    /// The datatype name, like `DT_FLOAT32`.
    pub fn datatype_name(&self) -> Option<&'static str> {
        NIFTI_DATATYPE_CODES
            .iter()
            .position(|&c| c == self.datatype)
            .map(|idx| NIFTI_DATATYPE_NAMES[idx])
    }
}


impl fmt::Display for NiftiHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NIfTI-1 volume with dimensions {}x{}x{}, datatype {}, voxel size {}x{}x{} mm.",
            self.dim[1], self.dim[2], self.dim[3],
            self.datatype_name().unwrap_or("unknown"),
            self.pixdim[1], self.pixdim[2], self.pixdim[3])
    }
}


impl NiftiVolume {

    /// Read a NIfTI-1 volume from a `.nii`, `.nii.gz`, `.hdr` or `.hdr.gz` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NiftiVolume> {
        let mut input = open_maybe_gz(&path)?;
        let header = NiftiHeader::from_reader(&mut input)?;

        let data = if header.is_single_file() {
            skip_bytes(&mut input, header.data_offset() - NIFTI1_HEADER_SIZE as u64)?;
            NiftiVolume::data_from_reader(input, &header)?
        } else {
            let mut img = open_maybe_gz(image_file_for(path.as_ref())?)?;
            skip_bytes(&mut img, header.data_offset())?;
            NiftiVolume::data_from_reader(img, &header)?
        };

        Ok(NiftiVolume { header, data })
    }


    /// Read the voxel values described by the header from the given byte stream.
    /// It is assumed that the input is currently at the start of the voxel data.
    pub fn data_from_reader<S>(input: S, hdr: &NiftiHeader) -> Result<Array3<f64>>
    where
        S: Read,
    {
        let [nx, ny, nz] = hdr.volume_dims()?;
        let num_voxels = nx
            .checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .ok_or_else(|| LesionSaError::UnsupportedNiftiDimensionality(hdr.dim.to_vec()))?;

        let mut input = ByteOrdered::runtime(input, hdr.endianness);
        // The header may claim more voxels than the file holds, so the buffer grows with the data read.
        let mut values: Vec<f64> = Vec::with_capacity(num_voxels.min(MAX_PREALLOCATED_VOXELS));

        match hdr.datatype {
            DT_UINT8 => read_voxels(num_voxels, &mut values, || input.read_u8().map(f64::from))?,
            DT_INT8 => read_voxels(num_voxels, &mut values, || input.read_i8().map(f64::from))?,
            DT_INT16 => read_voxels(num_voxels, &mut values, || input.read_i16().map(f64::from))?,
            DT_UINT16 => read_voxels(num_voxels, &mut values, || input.read_u16().map(f64::from))?,
            DT_INT32 => read_voxels(num_voxels, &mut values, || input.read_i32().map(f64::from))?,
            DT_UINT32 => read_voxels(num_voxels, &mut values, || input.read_u32().map(f64::from))?,
            DT_INT64 => read_voxels(num_voxels, &mut values, || input.read_i64().map(|v| v as f64))?,
            DT_UINT64 => read_voxels(num_voxels, &mut values, || input.read_u64().map(|v| v as f64))?,
            DT_FLOAT32 => read_voxels(num_voxels, &mut values, || input.read_f32().map(f64::from))?,
            DT_FLOAT64 => read_voxels(num_voxels, &mut values, || input.read_f64())?,
            other => return Err(LesionSaError::UnsupportedNiftiDatatype(other)),
        }

        if let Some((slope, inter)) = hdr.scaling() {
            for v in values.iter_mut() {
                *v = *v * slope + inter;
            }
        }

        // NIfTI stores the first axis fastest, i.e., in column-major order.
        Array3::from_shape_vec((nx, ny, nz).f(), values).map_err(|_| LesionSaError::InvalidNiftiFormat)
    }


    /// The shape of the voxel grid.
    pub fn shape(&self) -> [usize; 3] {
        let dims = self.data.dim();
        [dims.0, dims.1, dims.2]
    }
}


/// Read `count` voxel values, stopping at the first read error.
fn read_voxels<F>(count: usize, values: &mut Vec<f64>, mut read_value: F) -> Result<()>
where
    F: FnMut() -> std::io::Result<f64>,
{
    for _ in 0..count {
        values.push(read_value()?);
    }
    Ok(())
}


/// Determine the image file belonging to a `.hdr` (or `.hdr.gz`) header file.
fn image_file_for(hdr_path: &Path) -> Result<PathBuf> {
    let file_name = hdr_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or(LesionSaError::InvalidNiftiFormat)?;
    let img_name = if let Some(stem) = file_name.strip_suffix(".hdr.gz") {
        format!("{}.img.gz", stem)
    } else if let Some(stem) = file_name.strip_suffix(".hdr") {
        format!("{}.img", stem)
    } else {
        return Err(LesionSaError::InvalidNiftiFormat);
    };
    Ok(hdr_path.with_file_name(img_name))
}


/// Read a 3D volume from a NIfTI-1 file.
///
/// # Examples
///
/// ```no_run
/// let vol = lesionsa::read_nifti("/path/to/rM1023_lesion.nii").unwrap();
/// println!("{}", vol.header);
/// ```
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<NiftiVolume> {
    NiftiVolume::from_file(path)
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    /// Assemble a 348 byte header followed by 4 bytes of extension flags.
    fn header_bytes(endianness: Endianness, dim: [i16; 8], datatype: i16, pixdim: [f32; 3], scl: (f32, f32), magic: &[u8; 4]) -> Vec<u8> {
        let mut out = ByteOrdered::runtime(Vec::new(), endianness);
        out.write_i32(NIFTI1_HEADER_SIZE).unwrap();
        out.write_all(&[0u8; 36]).unwrap();
        for d in dim.iter() {
            out.write_i16(*d).unwrap();
        }
        out.write_all(&[0u8; 14]).unwrap();
        out.write_i16(datatype).unwrap();
        out.write_i16(0).unwrap();
        out.write_i16(0).unwrap();
        out.write_f32(1.).unwrap();
        for p in pixdim.iter() {
            out.write_f32(*p).unwrap();
        }
        for _ in 0..4 {
            out.write_f32(0.).unwrap();
        }
        out.write_f32(352.).unwrap();
        out.write_f32(scl.0).unwrap();
        out.write_f32(scl.1).unwrap();
        out.write_all(&[0u8; 3]).unwrap();
        out.write_u8(2).unwrap();
        out.write_all(&[0u8; 24]).unwrap();
        let mut descrip = [0u8; 80];
        descrip[..4].copy_from_slice(b"test");
        out.write_all(&descrip).unwrap();
        out.write_all(&[0u8; 116]).unwrap();
        out.write_all(magic).unwrap();
        out.write_all(&[0u8; 4]).unwrap();
        out.into_inner()
    }

    #[test]
    fn a_little_endian_header_can_be_read() {
        let bytes = header_bytes(Endianness::Little, [3, 4, 5, 6, 1, 1, 1, 1], DT_FLOAT32, [1., 2., 2.5], (0., 0.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();

        assert_eq!(Endianness::Little, hdr.endianness);
        assert_eq!([4, 5, 6], hdr.volume_dims().unwrap());
        assert_eq!(DT_FLOAT32, hdr.datatype);
        assert_eq!(Some("DT_FLOAT32"), hdr.datatype_name());
        assert_eq!("test", hdr.descrip);
        assert_eq!(2, hdr.xyzt_units);
        assert!(hdr.is_single_file());
        assert_eq!(352, hdr.data_offset());
        assert_abs_diff_eq!(0.005, hdr.voxel_volume_cm3().unwrap(), epsilon = 1e-12);
        assert_eq!(None, hdr.scaling());
    }

    #[test]
    fn a_big_endian_header_can_be_read() {
        let bytes = header_bytes(Endianness::Big, [3, 2, 2, 2, 0, 0, 0, 0], DT_INT16, [2., 2., 2.], (2., 1.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();

        assert_eq!(Endianness::Big, hdr.endianness);
        assert_eq!([2, 2, 2], hdr.volume_dims().unwrap());
        assert_eq!(Some((2., 1.)), hdr.scaling());
        assert_abs_diff_eq!(0.008, hdr.voxel_volume_cm3().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn a_wrong_header_size_is_rejected() {
        let mut bytes = header_bytes(Endianness::Little, [3, 2, 2, 2, 1, 1, 1, 1], DT_UINT8, [1., 1., 1.], (0., 0.), b"n+1\0");
        bytes[0] = 0;
        assert!(matches!(NiftiHeader::from_reader(&bytes[..]), Err(LesionSaError::InvalidNiftiFormat)));
    }

    #[test]
    fn a_wrong_magic_is_rejected() {
        let bytes = header_bytes(Endianness::Little, [3, 2, 2, 2, 1, 1, 1, 1], DT_UINT8, [1., 1., 1.], (0., 0.), b"n+2\0");
        assert!(matches!(NiftiHeader::from_reader(&bytes[..]), Err(LesionSaError::InvalidNiftiFormat)));
    }

    #[test]
    fn volumes_with_several_frames_are_rejected() {
        let bytes = header_bytes(Endianness::Little, [4, 2, 2, 2, 3, 1, 1, 1], DT_UINT8, [1., 1., 1.], (0., 0.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();
        assert!(matches!(hdr.volume_dims(), Err(LesionSaError::UnsupportedNiftiDimensionality(_))));

        let bytes = header_bytes(Endianness::Little, [2, 2, 2, 1, 1, 1, 1, 1], DT_UINT8, [1., 1., 1.], (0., 0.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();
        assert!(hdr.volume_dims().is_err());
    }

    #[test]
    fn a_single_frame_4d_volume_is_accepted() {
        let bytes = header_bytes(Endianness::Little, [4, 2, 3, 4, 1, 1, 1, 1], DT_UINT8, [1., 1., 1.], (0., 0.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();
        assert_eq!([2, 3, 4], hdr.volume_dims().unwrap());
    }

    #[test]
    fn zero_spacing_counts_as_missing() {
        let bytes = header_bytes(Endianness::Little, [3, 2, 2, 2, 1, 1, 1, 1], DT_UINT8, [1., 0., 1.], (0., 0.), b"n+1\0");
        let hdr = NiftiHeader::from_reader(&bytes[..]).unwrap();
        assert!(matches!(hdr.voxel_spacing_mm(), Err(LesionSaError::MissingVoxelSpacing)));
    }

    #[test]
    fn voxel_data_is_read_in_column_major_order_and_scaled() {
        let hdr = NiftiHeader {
            dim: [3, 2, 2, 1, 1, 1, 1, 1],
            datatype: DT_INT16,
            scl_slope: 0.5,
            scl_inter: 1.,
            endianness: Endianness::Big,
            ..NiftiHeader::default()
        };
        let mut raw = ByteOrdered::be(Vec::new());
        for v in [0i16, 2, 4, 6].iter() {
            raw.write_i16(*v).unwrap();
        }
        let raw = raw.into_inner();

        let data = NiftiVolume::data_from_reader(&raw[..], &hdr).unwrap();
        assert_eq!((2, 2, 1), data.dim());
        assert_abs_diff_eq!(1.0, data[[0, 0, 0]]);
        assert_abs_diff_eq!(2.0, data[[1, 0, 0]]);
        assert_abs_diff_eq!(3.0, data[[0, 1, 0]]);
        assert_abs_diff_eq!(4.0, data[[1, 1, 0]]);
    }

    #[test]
    fn truncated_voxel_data_is_an_error() {
        let hdr = NiftiHeader {
            dim: [3, 2, 2, 2, 1, 1, 1, 1],
            datatype: DT_UINT8,
            ..NiftiHeader::default()
        };
        let raw = [1u8; 7];
        assert!(matches!(NiftiVolume::data_from_reader(&raw[..], &hdr), Err(LesionSaError::Io(_))));
    }

    #[test]
    fn a_header_claiming_a_huge_grid_without_data_is_an_error() {
        let hdr = NiftiHeader {
            dim: [3, i16::MAX, i16::MAX, i16::MAX, 1, 1, 1, 1],
            datatype: DT_FLOAT64,
            ..NiftiHeader::default()
        };
        let raw = [0u8; 16];
        assert!(matches!(NiftiVolume::data_from_reader(&raw[..], &hdr), Err(LesionSaError::Io(_))));
    }

    #[test]
    fn unsupported_datatypes_are_rejected() {
        let hdr = NiftiHeader {
            dim: [3, 1, 1, 1, 1, 1, 1, 1],
            datatype: 128, // DT_RGB24
            ..NiftiHeader::default()
        };
        let raw = [0u8; 3];
        assert!(matches!(NiftiVolume::data_from_reader(&raw[..], &hdr), Err(LesionSaError::UnsupportedNiftiDatatype(128))));
    }

    #[test]
    fn image_files_are_derived_from_header_files() {
        assert_eq!(PathBuf::from("/data/atlas.img"), image_file_for(Path::new("/data/atlas.hdr")).unwrap());
        assert_eq!(PathBuf::from("/data/atlas.img.gz"), image_file_for(Path::new("/data/atlas.hdr.gz")).unwrap());
        assert!(image_file_for(Path::new("/data/atlas.nii")).is_err());
    }
}
