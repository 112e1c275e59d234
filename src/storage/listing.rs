//! Directory listing
//!
//! Builds browse views: sorted entries, breadcrumbs and pages.

use chrono::{DateTime, Local};
use log::{debug, warn};
use std::fs;
use std::path::Path;

use crate::storage::is_internal_name;
use crate::storage::results::{Breadcrumb, Page, StoredItem};
use crate::storage::validation::VaultRoot;
use crate::utils::human_size;

/// Lists the contents of a directory, directories first, then files, each
/// group ordered case-insensitively.
///
/// Errors opening the directory give an empty listing so browsing keeps
/// working over partially inaccessible trees.
pub fn list_directory(root: &VaultRoot, dir: &Path) -> Vec<StoredItem> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut items: Vec<StoredItem> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_internal_name(&name) {
                return None;
            }

            // Follows symlinks; the resolver decides later whether a link may be used.
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    return None;
                }
            };

            let is_file = metadata.is_file();
            let size = if is_file { metadata.len() } else { 0 };
            let mtime = metadata
                .modified()
                .map(|time| {
                    DateTime::<Local>::from(time)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                })
                .unwrap_or_default();

            Some(StoredItem {
                path: root.relative(&entry.path()),
                size_label: if is_file { human_size(size) } else { String::new() },
                name,
                is_file,
                size,
                mtime,
            })
        })
        .collect();

    items.sort_by_cached_key(|item| (item.is_file, item.name.to_lowercase()));
    items
}

/// Breadcrumb trail from the root to `dir`, empty at the root.
pub fn breadcrumbs(root: &VaultRoot, dir: &Path) -> Vec<Breadcrumb> {
    let relative = root.relative(dir);
    let mut trail = Vec::new();
    let mut current = String::new();

    for part in relative.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        trail.push(Breadcrumb {
            name: part.to_string(),
            path: current.clone(),
        });
    }

    trail
}

/// Cuts one page out of `items`. Pages are 1-based; anything below 1 is page 1.
pub fn paginate(items: Vec<StoredItem>, page: usize, page_size: usize) -> Page {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let count = items.len();
    let total_pages = count.div_ceil(page_size);
    let entries = items
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .collect();

    Page {
        entries,
        count,
        page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, VaultRoot) {
        let temp = tempfile::tempdir().unwrap();
        let root = VaultRoot::new(temp.path()).unwrap();
        (temp, root)
    }

    #[test]
    fn test_directories_first_case_insensitive() {
        let (_temp, root) = setup();
        fs::write(root.path().join("beta.txt"), b"12345").unwrap();
        fs::write(root.path().join("Alpha.txt"), b"1").unwrap();
        fs::create_dir(root.path().join("zeta")).unwrap();
        fs::create_dir(root.path().join("Music")).unwrap();

        let items = list_directory(&root, root.path());
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Music", "zeta", "Alpha.txt", "beta.txt"]);

        let beta = &items[3];
        assert!(beta.is_file);
        assert_eq!(beta.size, 5);
        assert_eq!(beta.size_label, "5.0 B");
        assert_eq!(beta.path, "beta.txt");
        assert!(!items[0].is_file);
        assert_eq!(items[0].size_label, "");
    }

    #[test]
    fn test_hides_staging_and_lock_files() {
        let (_temp, root) = setup();
        fs::write(root.path().join("video.mp4.part"), b"partial").unwrap();
        fs::write(root.path().join(crate::storage::LOCK_FILE_NAME), b"").unwrap();
        fs::write(root.path().join("video2.mp4"), b"done").unwrap();

        let items = list_directory(&root, root.path());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "video2.mp4");
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let (_temp, root) = setup();
        assert!(list_directory(&root, &root.path().join("nope")).is_empty());
    }

    #[test]
    fn test_nested_paths_and_breadcrumbs() {
        let (_temp, root) = setup();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("c.txt"), b"c").unwrap();

        let items = list_directory(&root, &nested);
        assert_eq!(items[0].path, "a/b/c.txt");

        assert!(breadcrumbs(&root, root.path()).is_empty());
        assert_eq!(
            breadcrumbs(&root, &nested),
            vec![
                Breadcrumb { name: "a".into(), path: "a".into() },
                Breadcrumb { name: "b".into(), path: "a/b".into() },
            ]
        );
    }

    #[test]
    fn test_paginate() {
        let (_temp, root) = setup();
        for i in 0..7 {
            fs::write(root.path().join(format!("f{i}.txt")), b"x").unwrap();
        }
        let items = list_directory(&root, root.path());

        let page = paginate(items.clone(), 2, 3);
        assert_eq!(page.count, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.entries[0].name, "f3.txt");

        let last = paginate(items.clone(), 3, 3);
        assert_eq!(last.entries.len(), 1);

        let clamped = paginate(items.clone(), 0, 3);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.entries[0].name, "f0.txt");

        assert!(paginate(items, 9, 3).entries.is_empty());
    }
}
