use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{DATASET_EXTENSION, strip_extension};
use crate::error::SpotError;

pub const DEFAULT_ARCHIVE_ROOT: &str = "/global/project/projectdirs/als/spade/warehouse/als/bl832/";

pub fn parse_file_list(
    path: impl AsRef<Utf8Path>,
    comment_prefix: &str,
) -> Result<Vec<String>, SpotError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| SpotError::Format {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    Ok(parse_list_text(&text, comment_prefix))
}

pub fn parse_list_text(text: &str, comment_prefix: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| comment_prefix.is_empty() || !line.starts_with(comment_prefix))
        .map(str::to_string)
        .collect()
}

pub fn list_local_files(directory: impl AsRef<Utf8Path>) -> Result<Vec<Utf8PathBuf>, SpotError> {
    let directory = directory.as_ref();
    let entries = fs::read_dir(directory).map_err(|err| SpotError::io(directory, err))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| SpotError::io(directory, err))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let is_dataset = path
            .extension()
            .map(|ext| format!(".{ext}") == DATASET_EXTENSION)
            .unwrap_or(false);
        if is_dataset && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn archive_path(
    filename: &str,
    account: &str,
    archive_root: impl AsRef<Utf8Path>,
) -> Utf8PathBuf {
    let filename = strip_extension(filename);
    archive_root
        .as_ref()
        .join(account)
        .join(filename)
        .join("raw")
}

pub fn archive_paths<I, S>(
    filenames: I,
    account: &str,
    archive_root: impl AsRef<Utf8Path>,
) -> Vec<Utf8PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let archive_root = archive_root.as_ref();
    filenames
        .into_iter()
        .map(|filename| archive_path(filename.as_ref(), account, archive_root))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyOutcome {
    pub filename: String,
    pub source: Utf8PathBuf,
    pub destination: Utf8PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CopyOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn bulk_copy<I, S>(
    filenames: I,
    account: &str,
    destination_dir: impl AsRef<Utf8Path>,
    archive_root: impl AsRef<Utf8Path>,
) -> Result<Vec<CopyOutcome>, SpotError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let destination_dir = destination_dir.as_ref();
    let archive_root = archive_root.as_ref();
    fs::create_dir_all(destination_dir).map_err(|err| SpotError::io(destination_dir, err))?;

    let mut outcomes = Vec::new();
    for filename in filenames {
        let filename = strip_extension(filename.as_ref());
        let file = format!("{filename}{DATASET_EXTENSION}");
        let source = archive_path(filename, account, archive_root).join(&file);
        let destination = destination_dir.join(&file);

        info!(%source, "begin transfer");
        let result = fs::copy(&source, &destination);
        let (bytes, error) = match result {
            Ok(bytes) => {
                info!(%destination, bytes, "transfer complete");
                (Some(bytes), None)
            }
            Err(err) => {
                warn!(%source, error = %err, "transfer failed");
                (None, Some(err.to_string()))
            }
        };
        outcomes.push(CopyOutcome {
            filename: filename.to_string(),
            source,
            destination,
            bytes,
            error,
        });
    }
    Ok(outcomes)
}
