//! Branch directory scanning
//!
//! A branch is a flat directory of package archives plus generated index
//! artifacts. Scans here answer two questions: which archive files exist,
//! and which files currently claim a given package identity.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::Result;

/// Package archive suffix, with the leading dot.
pub const PKG_SUFFIX: &str = ".pkg.tar.zst";

/// `true` for file names following the package archive naming convention.
pub fn is_package_name(name: &str) -> bool {
    name.ends_with(PKG_SUFFIX)
}

/// All package archive files in `dir`, sorted by file name.
///
/// Non-package files (index artifacts, stray uploads) are ignored.
pub fn list_package_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_package_name(name) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Map each package identity in `dir` to the set of archive files claiming
/// it.
///
/// More than one file may claim an identity while a replace is in flight;
/// callers use the set to find the stale copies. A file whose metadata
/// cannot be read fails the whole scan - a branch with a corrupt archive has
/// no trustworthy index.
pub fn scan_packages(dir: &Path) -> Result<BTreeMap<String, BTreeSet<PathBuf>>> {
    let mut packages: BTreeMap<String, BTreeSet<PathBuf>> = BTreeMap::new();

    for path in list_package_files(dir)? {
        let identity = archive::extract_identity(&path)?;
        packages.entry(identity).or_default().insert(path);
    }

    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::write_package;
    use tempfile::TempDir;

    #[test]
    fn test_is_package_name() {
        assert!(is_package_name("htop-3.3.0-1-x86_64.pkg.tar.zst"));
        assert!(!is_package_name("stable.db.tar.gz"));
        assert!(!is_package_name("htop-3.3.0-1-x86_64.pkg.tar.xz"));
        assert!(!is_package_name(""));
    }

    #[test]
    fn test_list_ignores_non_packages() {
        let temp = TempDir::new().unwrap();
        write_package(&temp.path().join("b-1.0-1.pkg.tar.zst"), "b");
        write_package(&temp.path().join("a-1.0-1.pkg.tar.zst"), "a");
        std::fs::write(temp.path().join("stable.db.tar.gz"), b"db").unwrap();
        std::fs::create_dir(temp.path().join("subdir.pkg.tar.zst")).unwrap();

        let files = list_package_files(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a-1.0-1.pkg.tar.zst", "b-1.0-1.pkg.tar.zst"]);
    }

    #[test]
    fn test_scan_collapses_identities() {
        let temp = TempDir::new().unwrap();
        write_package(&temp.path().join("htop-3.2.0-1.pkg.tar.zst"), "htop");
        write_package(&temp.path().join("htop-3.3.0-1.pkg.tar.zst"), "htop");
        write_package(&temp.path().join("tmux-3.4-1.pkg.tar.zst"), "tmux");

        let packages = scan_packages(temp.path()).unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages["htop"].len(), 2);
        assert_eq!(packages["tmux"].len(), 1);
    }

    #[test]
    fn test_scan_fails_on_corrupt_archive() {
        let temp = TempDir::new().unwrap();
        write_package(&temp.path().join("ok-1.0-1.pkg.tar.zst"), "ok");
        std::fs::write(temp.path().join("bad-1.0-1.pkg.tar.zst"), b"junk").unwrap();

        assert!(scan_packages(temp.path()).is_err());
    }

    #[test]
    fn test_scan_empty_dir() {
        let temp = TempDir::new().unwrap();
        assert!(scan_packages(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_ext_and_suffix_agree() {
        assert_eq!(PKG_SUFFIX, &format!(".{}", archive::PKG_EXT));
    }
}
