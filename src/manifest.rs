//! Project manifest access (`package.json` or `Cargo.toml`)

use crate::error::{KiaraError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{value, DocumentMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    PackageJson,
    CargoToml,
}

impl ManifestKind {
    fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ManifestKind::CargoToml,
            _ => ManifestKind::PackageJson,
        }
    }
}

/// Name and version fields as found on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    path: PathBuf,
    kind: ManifestKind,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = ManifestKind::detect(&path);
        Manifest { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ManifestKind {
        self.kind
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn contents(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            KiaraError::manifest(format!("Cannot read {}: {}", self.path.display(), e))
        })
    }

    pub fn fields(&self) -> Result<ManifestFields> {
        let contents = self.contents()?;
        let fields = match self.kind {
            ManifestKind::PackageJson => serde_json::from_str::<ManifestFields>(&contents)
                .map_err(|e| KiaraError::manifest(format!("{}: {}", self.path.display(), e)))?,
            ManifestKind::CargoToml => {
                let doc = parse_toml(&self.path, &contents)?;
                let package = doc.get("package");
                ManifestFields {
                    name: package
                        .and_then(|p| p.get("name"))
                        .and_then(|n| n.as_str())
                        .map(str::to_string),
                    version: package
                        .and_then(|p| p.get("version"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                }
            }
        };

        Ok(ManifestFields {
            name: fields.name.filter(|n| !n.trim().is_empty()),
            version: fields.version.filter(|v| !v.trim().is_empty()),
        })
    }

    /// The version field; missing is an error
    pub fn version(&self) -> Result<String> {
        self.fields()?.version.ok_or_else(|| {
            KiaraError::manifest(format!("Version field not found in {}", self.path.display()))
        })
    }

    /// Rewrite the version field in place, leaving the rest of the file untouched
    pub fn set_version(&self, version: &str) -> Result<()> {
        let contents = self.contents()?;
        let updated = match self.kind {
            ManifestKind::PackageJson => rewrite_json_version(&contents, version),
            ManifestKind::CargoToml => rewrite_toml_version(&self.path, &contents, version),
        }?;
        fs::write(&self.path, updated)?;
        Ok(())
    }
}

fn parse_toml(path: &Path, contents: &str) -> Result<DocumentMut> {
    contents
        .parse::<DocumentMut>()
        .map_err(|e| KiaraError::manifest(format!("{}: {}", path.display(), e)))
}

/// Index of the quote closing the string that opens at `start`
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

/// Byte range of the top-level `"version"` string value, quotes included.
///
/// Keys of nested objects and arrays are ignored.
fn top_level_version_span(contents: &str) -> Option<(usize, usize)> {
    let bytes = contents.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = string_end(bytes, i)?;
                if depth == 1 {
                    let colon = skip_whitespace(bytes, end + 1);
                    if bytes.get(colon) == Some(&b':')
                        && contents.get(i + 1..end) == Some("version")
                    {
                        let value = skip_whitespace(bytes, colon + 1);
                        if bytes.get(value) != Some(&b'"') {
                            return None;
                        }
                        return string_end(bytes, value).map(|close| (value, close + 1));
                    }
                }
                i = end + 1;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }

    None
}

fn rewrite_json_version(contents: &str, version: &str) -> Result<String> {
    let (start, end) = top_level_version_span(contents)
        .ok_or_else(|| KiaraError::manifest("Version field not found in package.json"))?;

    let mut updated = String::with_capacity(contents.len() + version.len());
    updated.push_str(&contents[..start]);
    updated.push('"');
    updated.push_str(version);
    updated.push('"');
    updated.push_str(&contents[end..]);

    let written = serde_json::from_str::<ManifestFields>(&updated)
        .map_err(|e| KiaraError::manifest(format!("package.json: {}", e)))?;
    if written.version.as_deref() != Some(version) {
        return Err(KiaraError::manifest("Rewriting package.json did not update its version field"));
    }
    Ok(updated)
}

fn rewrite_toml_version(path: &Path, contents: &str, version: &str) -> Result<String> {
    let mut doc = parse_toml(path, contents)?;
    let table = doc
        .get_mut("package")
        .and_then(|p| p.as_table_like_mut())
        .ok_or_else(|| {
            KiaraError::manifest(format!("No [package] section in {}", path.display()))
        })?;

    let slot = table
        .get_mut("version")
        .filter(|item| item.is_str())
        .ok_or_else(|| {
            KiaraError::manifest(format!("Version field not found in {}", path.display()))
        })?;

    let decor = slot.as_value().map(|v| v.decor().clone());
    *slot = value(version);
    if let (Some(decor), Some(new)) = (decor, slot.as_value_mut()) {
        *new.decor_mut() = decor;
    }

    Ok(doc.to_string())
}
