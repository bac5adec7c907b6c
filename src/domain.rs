use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DATASET_EXTENSION: &str = ".h5";
pub const IMAGE_EXTENSION: &str = ".tif";

pub fn strip_extension(raw: &str) -> &str {
    let mut stem = raw.trim();
    while let Some(rest) = stem.strip_suffix(DATASET_EXTENSION) {
        stem = rest.trim_end();
    }
    stem
}

fn normalize_stem(raw: &str) -> &str {
    let mut stem = raw;
    loop {
        let next = strip_extension(stem.trim().trim_end_matches('/'));
        if next == stem {
            return stem;
        }
        stem = next;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetPath {
    filename: String,
    username: String,
}

impl DatasetPath {
    // An embedded `user/file` wins over `username`, then the session account.
    pub fn resolve(raw: &str, username: Option<&str>, session_username: &str) -> Self {
        let stem = normalize_stem(raw);
        let (embedded, filename) = match stem.rsplit_once('/') {
            Some((prefix, filename)) => {
                let owner = prefix.rsplit('/').next().unwrap_or(prefix);
                (non_empty(owner), filename)
            }
            None => (None, stem),
        };

        let username = embedded
            .or_else(|| username.and_then(non_empty))
            .unwrap_or(session_username);

        Self {
            filename: filename.to_string(),
            username: username.to_string(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn raw_dir(&self) -> String {
        format!("{}/{}/raw", self.username, self.filename)
    }

    pub fn raw_file(&self) -> String {
        format!("{}/{}{}", self.raw_dir(), self.filename, DATASET_EXTENSION)
    }
}

impl fmt::Display for DatasetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.filename)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DerivedDataset {
    pub fn new(kind: Option<&str>, path: &str) -> Self {
        Self {
            kind: kind.map(str::to_string),
            path: path.to_string(),
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> Option<&str> {
        if let Some(kind) = self.kind.as_deref() {
            return Some(kind);
        }
        let mut segments = self.path.trim_end_matches('/').rsplit('/');
        segments.next()?;
        segments.next().filter(|segment| !segment.is_empty())
    }
}

pub fn find_derived<'a>(derived: &'a [DerivedDataset], kind: &str) -> Option<&'a DerivedDataset> {
    derived.iter().find(|entry| entry.kind() == Some(kind))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_strips_extension() {
        let with = DatasetPath::resolve("20130713_185717_sample.h5", None, "me");
        let without = DatasetPath::resolve("20130713_185717_sample", None, "me");
        assert_eq!(with, without);
        assert_eq!(with.filename(), "20130713_185717_sample");
    }

    #[test]
    fn resolve_keeps_inner_h5_characters() {
        let path = DatasetPath::resolve("h5_scan_5h.h5", None, "me");
        assert_eq!(path.filename(), "h5_scan_5h");
    }

    #[test]
    fn resolve_splits_embedded_username() {
        let path = DatasetPath::resolve("hmwood/scan_01", None, "me");
        assert_eq!(path.username(), "hmwood");
        assert_eq!(path.filename(), "scan_01");

        let nested = DatasetPath::resolve("a/b/scan_01.h5", Some("other"), "me");
        assert_eq!(nested.username(), "b");
        assert_eq!(nested.filename(), "scan_01");
    }

    #[test]
    fn resolve_falls_back_to_session_username() {
        let path = DatasetPath::resolve("scan_01", None, "me");
        assert_eq!(path.username(), "me");

        let explicit = DatasetPath::resolve("scan_01", Some("hmwood"), "me");
        assert_eq!(explicit.username(), "hmwood");

        let blank = DatasetPath::resolve("/scan_01", Some("  "), "me");
        assert_eq!(blank.username(), "me");
        assert_eq!(blank.filename(), "scan_01");
    }

    #[test]
    fn raw_file_layout() {
        let path = DatasetPath::resolve("hmwood/scan_01", None, "me");
        assert_eq!(path.raw_dir(), "hmwood/scan_01/raw");
        assert_eq!(path.raw_file(), "hmwood/scan_01/raw/scan_01.h5");
    }

    #[test]
    fn derived_kind_from_path_or_field() {
        let inferred = DerivedDataset::new(None, "/als/bl832/hmwood/scan/norm/scan-norm.h5");
        assert_eq!(inferred.kind(), Some("norm"));

        let explicit = DerivedDataset::new(Some("sino"), "/p1");
        assert_eq!(explicit.kind(), Some("sino"));

        let bare = DerivedDataset::new(None, "/p1");
        assert_eq!(bare.kind(), None);
    }

    #[test]
    fn find_derived_exact_kind() {
        let derived = vec![
            DerivedDataset::new(None, "/u/scan/raw/scan.h5"),
            DerivedDataset::new(None, "/u/scan/norm/scan-norm.h5"),
            DerivedDataset::new(None, "/u/scan/norm/scan-norm-2.h5"),
        ];
        let found = find_derived(&derived, "norm").unwrap();
        assert_eq!(found.path, "/u/scan/norm/scan-norm.h5");
        assert!(find_derived(&derived, "no").is_none());
    }
}
