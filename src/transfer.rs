use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{DATASET_EXTENSION, DatasetPath, DerivedDataset, IMAGE_EXTENSION, find_derived};
use crate::endpoints::image_group;
use crate::error::SpotError;
use crate::session::Session;
use crate::transport::PortalTransport;

pub const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub dir: Option<PathBuf>,
    pub name: Option<String>,
}

impl Destination {
    pub fn new(dir: Option<PathBuf>, name: Option<String>) -> Self {
        Self { dir, name }
    }

    pub fn file_path(&self, default_name: &str, extension: &str) -> PathBuf {
        let dir = self.dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let name = self
            .name
            .as_deref()
            .map(|name| {
                let name = name.trim();
                name.strip_suffix(extension).unwrap_or(name)
            })
            .filter(|name| !name.is_empty())
            .unwrap_or(default_name);
        dir.join(format!("{name}{extension}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLocation {
    pub dataset: DatasetPath,
    pub derived: DerivedDataset,
    pub image: String,
}

impl<T: PortalTransport> Session<T> {
    pub fn stage(&self, dataset: &str, username: Option<&str>) -> Result<Value, SpotError> {
        let path = self.resolve(dataset, username);
        let url = self.endpoints().stage(&path);
        let status = self.get_json(&url, &[])?;
        info!(dataset = %path, "staging requested");
        Ok(status)
    }

    // A closed or unauthenticated session aborts the batch; other errors are recorded.
    pub fn stage_many<S: AsRef<str>>(
        &self,
        datasets: &[S],
        username: Option<&str>,
    ) -> Result<Vec<StageOutcome>, SpotError> {
        let mut outcomes = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let dataset = dataset.as_ref();
            match self.stage(dataset, username) {
                Ok(status) => outcomes.push(StageOutcome {
                    dataset: dataset.to_string(),
                    status: Some(status),
                    error: None,
                }),
                Err(err @ (SpotError::SessionClosed | SpotError::NotAuthenticated)) => {
                    return Err(err);
                }
                Err(err) => {
                    warn!(dataset, error = %err, "staging failed");
                    outcomes.push(StageOutcome {
                        dataset: dataset.to_string(),
                        status: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    // A partially written file is left in place on failure.
    pub fn download_dataset(
        &self,
        dataset: &str,
        username: Option<&str>,
        destination: &Destination,
    ) -> Result<PathBuf, SpotError> {
        let path = self.resolve(dataset, username);
        let url = self.endpoints().download(&path);
        let target = destination.file_path(path.filename(), DATASET_EXTENSION);

        let response = self.get(&url, &[])?;
        let bytes = write_chunks(response.body, &url, &target)?;
        info!(target = %target.display(), bytes, "download complete");
        Ok(target)
    }

    pub fn locate_image(
        &self,
        dataset: &str,
        username: Option<&str>,
        kind: &str,
        index: usize,
    ) -> Result<ImageLocation, SpotError> {
        let path = self.resolve(dataset, username);
        let derived = self.derived_datasets(dataset)?;
        let derived = find_derived(&derived, kind)
            .cloned()
            .ok_or_else(|| SpotError::DerivedNotFound {
                dataset: path.to_string(),
                kind: kind.to_string(),
            })?;

        let images = self.list_images(dataset, username)?;
        let count = images.len();
        let image = images
            .into_iter()
            .nth(index)
            .ok_or_else(|| SpotError::ImageIndexOutOfRange {
                dataset: path.to_string(),
                index,
                count,
            })?;
        debug!(derived = %derived.path, %image, "located image");

        Ok(ImageLocation {
            dataset: path,
            derived,
            image,
        })
    }

    pub fn download_image(
        &self,
        dataset: &str,
        username: Option<&str>,
        kind: &str,
        index: usize,
        destination: &Destination,
    ) -> Result<PathBuf, SpotError> {
        let location = self.locate_image(dataset, username, kind, index)?;
        let url = self.endpoints().raw_image(&location.derived.path);
        let group = image_group(&location.image);
        let target = destination.file_path(location.dataset.filename(), IMAGE_EXTENSION);

        let response = self.get(&url, &[("group", group.as_str())])?;
        let bytes = write_chunks(response.body, &url, &target)?;
        info!(target = %target.display(), bytes, "image download complete");
        Ok(target)
    }

    pub fn download_urls(
        &self,
        dataset: &str,
        username: Option<&str>,
        kind: &str,
        index: usize,
    ) -> Result<Value, SpotError> {
        let location = self.locate_image(dataset, username, kind, index)?;
        let url = self.endpoints().image_urls(&location.derived.path);
        let group = image_group(&location.image);
        self.get_json(&url, &[("group", group.as_str())])
    }
}

fn write_chunks(mut body: impl Read, url: &str, target: &Path) -> Result<u64, SpotError> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| SpotError::io(parent, err))?;
        }
    }

    let mut out = File::create(target).map_err(|err| SpotError::io(target, err))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(SpotError::Network {
                    url: url.to_string(),
                    message: format!("download interrupted after {written} bytes: {err}"),
                });
            }
        };
        out.write_all(&buf[..n])
            .map_err(|err| SpotError::io(target, err))?;
        written += n as u64;
    }
    out.flush().map_err(|err| SpotError::io(target, err))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn destination_defaults_and_overrides() {
        let default = Destination::default();
        assert_eq!(
            default.file_path("scan_01", DATASET_EXTENSION),
            PathBuf::from("./scan_01.h5")
        );

        let named = Destination::new(Some(PathBuf::from("/data")), Some("copy.h5".to_string()));
        assert_eq!(
            named.file_path("scan_01", DATASET_EXTENSION),
            PathBuf::from("/data/copy.h5")
        );
        assert_eq!(
            named.file_path("scan_01", IMAGE_EXTENSION),
            PathBuf::from("/data/copy.h5.tif")
        );
    }

    #[test]
    fn write_chunks_spans_several_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("nested").join("big.h5");
        let payload = vec![7u8; CHUNK_SIZE * 2 + 13];

        let written = write_chunks(Cursor::new(payload.clone()), "http://x", &target).unwrap();
        assert_eq!(written, payload.len() as u64);
        assert_eq!(fs::read(&target).unwrap(), payload);
    }

    struct Broken {
        sent: bool,
    }

    impl Read for Broken {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"abcd");
            Ok(4)
        }
    }

    #[test]
    fn interrupted_body_keeps_partial_file() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("partial.h5");

        let err = write_chunks(Broken { sent: false }, "http://x/dl", &target).unwrap_err();
        assert_matches!(err, SpotError::Network { ref url, .. } if url == "http://x/dl");
        assert_eq!(fs::read(&target).unwrap(), b"abcd");
    }
}
