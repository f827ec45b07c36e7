//! Naming and validation of the numbered still sequence.
//!
//! Stills are `image_00001.jpg`, `image_00002.jpg`, ... with no gaps; the
//! encoder reads them back through [`IMAGE_PATTERN`].

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TimelapseError;

/// printf-style pattern matching every still in a sequence.
pub const IMAGE_PATTERN: &str = "image_%05d.jpg";

const PREFIX: &str = "image_";
const SUFFIX: &str = ".jpg";
const DIGITS: usize = 5;

/// File name of still number `seq` (1-based).
#[must_use]
pub fn image_file_name(seq: u32) -> String {
    format!("{PREFIX}{seq:05}{SUFFIX}")
}

/// Path of still number `seq` inside `dir`.
#[must_use]
pub fn image_path(dir: &Path, seq: u32) -> PathBuf {
    dir.join(image_file_name(seq))
}

/// Sequence number of a still file name, if it is one.
#[must_use]
pub fn parse_sequence_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    if digits.len() < DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|seq| *seq > 0)
}

/// Count the stills in `dir`, checking they run from 1 without gaps.
///
/// A missing directory holds zero stills.
///
/// # Errors
///
/// Returns a validation error naming the first missing number, or an
/// output-directory error if `dir` cannot be read.
pub fn scan_image_sequence(dir: &Path) -> Result<u32, TimelapseError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(TimelapseError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let numbers: BTreeSet<u32> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| parse_sequence_number(&entry.file_name().to_string_lossy()))
        .collect();

    for (expected, actual) in (1u32..).zip(numbers.iter().copied()) {
        if actual != expected {
            return Err(TimelapseError::validation(format!(
                "image sequence in {} has a gap: {} is missing",
                dir.display(),
                image_file_name(expected)
            )));
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    Ok(numbers.len() as u32)
}
