//! Shared helpers for the service tests

use std::fs::File;
use std::path::Path;

use tar::{Builder, Header};

use crate::state::AppState;
use crate::upgrade::UpgradeCoordinator;

/// State over `root` with a no-op indexer and a throwaway upgrade target.
pub fn test_state(root: impl Into<std::path::PathBuf>) -> AppState {
    let root = root.into();
    let exe = root.join(".depot-test-exe");
    AppState::new(root, UpgradeCoordinator::new(exe)).with_indexer("true")
}

/// Write a package archive declaring the given identity.
pub fn write_package(path: &Path, identity: &str) {
    let pkginfo = format!("pkgname = {identity}\npkgver = 1.0-1\n");
    write_archive(path, &[(".PKGINFO", &pkginfo), ("usr/bin/placeholder", "#!/bin/sh\n")]);
}

/// Raw bytes of a package archive declaring the given identity.
pub fn package_bytes(identity: &str) -> Vec<u8> {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("pkg.pkg.tar.zst");
    write_package(&path, identity);
    std::fs::read(&path).unwrap()
}

/// Write a zstd-compressed tar archive with the given entries.
pub fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let encoder = zstd::stream::write::Encoder::new(file, 0).unwrap();
    let mut builder = Builder::new(encoder);

    for &(name, content) in entries {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }

    let encoder = builder.into_inner().unwrap();
    encoder.finish().unwrap();
}
