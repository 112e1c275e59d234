use log::debug;
use std::fs;
use std::io;
use std::path::Path;

use crate::storage::is_internal_name;

/// Sums the sizes of all regular files under `dir`, skipping vault bookkeeping
/// files. Symlinks are not followed, so linked content is never counted twice.
pub fn used_bytes(dir: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            match used_bytes(&entry.path()) {
                Ok(bytes) => total = total.saturating_add(bytes),
                Err(e) => debug!("Skipping unreadable {}: {}", entry.path().display(), e),
            }
        } else if file_type.is_file() && !is_internal_name(&entry.file_name().to_string_lossy()) {
            total = total.saturating_add(entry.metadata()?.len());
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_nested_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("a/b")).unwrap();
        fs::write(temp.path().join("one.bin"), vec![0u8; 100]).unwrap();
        fs::write(temp.path().join("a/two.bin"), vec![0u8; 20]).unwrap();
        fs::write(temp.path().join("a/b/three.bin"), vec![0u8; 3]).unwrap();
        fs::write(temp.path().join("a/pending.bin.part"), vec![0u8; 999]).unwrap();

        assert_eq!(used_bytes(temp.path()).unwrap(), 123);
    }

    #[test]
    fn test_empty_root() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(used_bytes(temp.path()).unwrap(), 0);
    }
}
