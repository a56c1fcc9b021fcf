//! `.PKGINFO` metadata parsing
//!
//! Every package archive carries its metadata as a single `.PKGINFO` entry
//! of `key = value` lines. The format is line oriented: the first `=` splits
//! key from value, both sides are trimmed, `#` starts a comment line, and
//! keys may repeat (`depend` does in practice).

/// Parsed `.PKGINFO` contents.
///
/// Fields are kept in file order; lookups return the first occurrence of a
/// key.
#[derive(Debug, Clone, Default)]
pub struct PkgInfo {
    fields: Vec<(String, String)>,
}

impl PkgInfo {
    /// Parse `.PKGINFO` text.
    ///
    /// Lines without a `=`, blank lines and comments are skipped rather than
    /// rejected - real files contain all three.
    pub fn parse(content: &str) -> Self {
        let mut fields = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }

        Self { fields }
    }

    /// First value recorded for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `key`, in file order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.fields
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The package identity declared by this metadata (`pkgname`).
    pub fn name(&self) -> Option<&str> {
        self.get("pkgname")
    }

    /// Number of parsed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` if no fields were parsed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
