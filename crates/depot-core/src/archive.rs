//! Package archive inspection
//!
//! Archives are zstd-compressed tarballs. The only thing depot ever reads
//! out of one is the `.PKGINFO` metadata entry, and it does so through a
//! streaming decoder so large archives are never pulled into memory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tar::Archive;
use zstd::stream::read::Decoder;

use crate::error::{CoreError, Result};
use crate::pkginfo::PkgInfo;

/// Package archive extension, without the leading dot.
pub const PKG_EXT: &str = "pkg.tar.zst";

/// Name of the metadata entry inside every package archive.
pub const METADATA_ENTRY: &str = ".PKGINFO";

/// Read and parse the `.PKGINFO` entry of a package archive.
///
/// The archive is decompressed incrementally; reading stops at the metadata
/// entry, which by convention sits at the front of the tarball.
pub fn read_pkginfo(path: &Path) -> Result<PkgInfo> {
    let file =
        File::open(path).map_err(|e| CoreError::corrupt(path, format!("cannot open: {e}")))?;
    let decoder = Decoder::new(file)
        .map_err(|e| CoreError::corrupt(path, format!("not a zstd stream: {e}")))?;
    let mut archive = Archive::new(decoder);

    let entries = archive
        .entries()
        .map_err(|e| CoreError::corrupt(path, format!("not a tar archive: {e}")))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| CoreError::corrupt(path, format!("unreadable entry: {e}")))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let is_metadata = entry
            .path()
            .map(|p| p.as_ref() == Path::new(METADATA_ENTRY))
            .unwrap_or(false);
        if !is_metadata {
            continue;
        }

        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| CoreError::corrupt(path, format!("unreadable {METADATA_ENTRY}: {e}")))?;
        return Ok(PkgInfo::parse(&content));
    }

    Err(CoreError::corrupt(
        path,
        format!("no {METADATA_ENTRY} entry"),
    ))
}

/// Extract the package identity (`pkgname`) declared by an archive.
pub fn extract_identity(path: &Path) -> Result<String> {
    let info = read_pkginfo(path)?;
    info.name()
        .map(str::to_owned)
        .ok_or_else(|| CoreError::corrupt(path, format!("no pkgname in {METADATA_ENTRY}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs::File;
    use std::path::Path;

    use tar::{Builder, EntryType, Header};

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
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }

        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap();
    }

    /// Write a package archive declaring the given identity.
    pub fn write_package(path: &Path, identity: &str) {
        let pkginfo = format!("# Generated by makepkg\npkgname = {identity}\npkgver = 1.0-1\n");
        write_archive(path, &[(".PKGINFO", &pkginfo), ("usr/bin/placeholder", "#!/bin/sh\n")]);
    }

    /// Write an archive whose only `.PKGINFO`-named entry is a directory.
    pub fn write_archive_with_dir_entry(path: &Path) {
        let file = File::create(path).unwrap();
        let encoder = zstd::stream::write::Encoder::new(file, 0).unwrap();
        let mut builder = Builder::new(encoder);

        let mut header = Header::new_gnu();
        header.set_size(0);
        header.set_mode(0o755);
        header.set_mtime(0);
        header.set_entry_type(EntryType::Directory);
        header.set_cksum();
        builder.append_data(&mut header, ".PKGINFO", std::io::empty()).unwrap();

        let encoder = builder.into_inner().unwrap();
        encoder.finish().unwrap();
    }
}
