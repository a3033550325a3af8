//! Collision-free names for generated artifacts.

use std::path::{Path, PathBuf};

/// Extension of every generated artifact.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// First free name for output `index` in `output_dir`.
///
/// Tries `<base>-<index>.mp4`, then `<base>-<index>-1.mp4`,
/// `<base>-<index>-2.mp4` and so on. Never returns an existing name.
pub fn unique_name(output_dir: &Path, base: &str, index: usize) -> String {
    let first = format!("{}-{}.{}", base, index, OUTPUT_EXTENSION);
    if !output_dir.join(&first).exists() {
        return first;
    }

    let mut counter = 1usize;
    loop {
        let candidate = format!("{}-{}-{}.{}", base, index, counter, OUTPUT_EXTENSION);
        if !output_dir.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// [`unique_name`] joined onto `output_dir`.
pub fn unique_path(output_dir: &Path, base: &str, index: usize) -> PathBuf {
    output_dir.join(unique_name(output_dir, base, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn uses_plain_name_when_free() {
        let dir = tempdir().unwrap();
        assert_eq!(unique_name(dir.path(), "mix", 1), "mix-1.mp4");
    }

    #[test]
    fn skips_existing_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mix-1.mp4"), b"x").unwrap();
        fs::write(dir.path().join("mix-1-1.mp4"), b"x").unwrap();

        assert_eq!(unique_name(dir.path(), "mix", 1), "mix-1-2.mp4");
        assert_eq!(unique_name(dir.path(), "mix", 2), "mix-2.mp4");
        assert_eq!(
            unique_path(dir.path(), "mix", 1),
            dir.path().join("mix-1-2.mp4")
        );
    }
}
