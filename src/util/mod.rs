//! Filesystem and text helpers.

pub mod fs;

pub use fs::{ensure_dir_exists, sanitize_file_name, write_file};

/// Pad `s` with spaces to at least `width` characters.
pub fn right_pad(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}
