//! Filesystem helpers for backup and restore.

use std::fs;
use std::io;
use std::path::Path;

/// Copies `source` into `target`, creating `target` and any missing parents.
///
/// Existing files in `target` are overwritten.
pub fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir_all(target)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let destination = target.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&path, &destination)?;
        } else {
            fs::copy(&path, &destination)?;
        }
    }

    Ok(())
}
