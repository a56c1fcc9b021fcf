//! Depot Core - package archive inspection for the depot repository manager
//!
//! This crate provides the pieces of depot that know what a package archive
//! looks like from the inside:
//! - `pkginfo`: the `.PKGINFO` key/value metadata format
//! - `archive`: streaming identity extraction from zstd-compressed tarballs
//! - `scan`: branch directory scans mapping package identity to archive files

pub mod archive;
pub mod error;
pub mod pkginfo;
pub mod scan;

pub use archive::{extract_identity, read_pkginfo, METADATA_ENTRY, PKG_EXT};
pub use error::{CoreError, Result};
pub use pkginfo::PkgInfo;
pub use scan::{is_package_name, list_package_files, scan_packages, PKG_SUFFIX};
