//! Utility functions used by the volume and table readers.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::bufread::GzDecoder;

use crate::error::Result;

/// Check whether the file extension ends with ".gz".
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}


/// Open a file for buffered reading, transparently decompressing it if its name ends with ".gz".
pub fn open_maybe_gz<P>(path: P) -> Result<Box<dyn Read>>
where
    P: AsRef<Path>,
{
    let file = BufReader::new(File::open(path.as_ref())?);
    if is_gz_file(&path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}


/// Read a fixed length zero-terminated byte string of the given length from the input. Embedded '\0' chars are allowed, but not added to the returned String.
pub fn read_fixed_length_string<S>(input: &mut S, len: usize) -> Result<String>
where
    S: Read,
{
    let mut raw = vec![0u8; len];
    input.read_exact(&mut raw)?;
    let info_line: String = raw
        .iter()
        .filter(|&&b| b != b'\0')
        .map(|&b| b as char)
        .collect();
    Ok(info_line)
}


/// Consume and discard exactly `count` bytes. Works on streams that cannot seek, like GZip decoders.
pub fn skip_bytes<S>(input: &mut S, count: u64) -> Result<()>
where
    S: Read,
{
    let skipped = std::io::copy(&mut input.by_ref().take(count), &mut std::io::sink())?;
    if skipped < count {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "file ended before the data section",
        )
        .into());
    }
    Ok(())
}
