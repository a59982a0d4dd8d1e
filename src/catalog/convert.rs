use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::codec::ImageCodec;
use super::manifest::ManifestStore;
use super::{AssetError, ConversionConfig};
use crate::fsio::FileSystem;

/// Result of one successful conversion: destination written, with any
/// non-fatal follow-up failures recorded as warnings.
#[derive(Debug)]
pub struct AssetOutcome {
    pub asset: ConvertedAsset,
    /// Original-delete or manifest-update failures. The conversion still
    /// counts: there is no rollback of the destination file.
    pub warnings: Vec<AssetError>,
}

#[derive(Debug, Clone)]
pub struct ConvertedAsset {
    pub original: PathBuf,
    pub destination: PathBuf,
}

/// One lock per image-group directory, so concurrent conversions inside the
/// same group serialize their find→load→rewrite→save manifest region.
/// Concurrent load-rewrite-save on one manifest file is a lost-update race.
#[derive(Default)]
pub struct GroupLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub fn lock_for(&self, group_dir: &Path) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry(group_dir.to_path_buf())
            .or_default()
            .clone()
    }
}

/// Converts one image at a time: read → transcode → write → optional delete
/// → manifest sync; each step fails independently and stops only this asset.
pub struct ConversionWorker {
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn ImageCodec>,
    manifests: ManifestStore,
    locks: GroupLocks,
    quality: f32,
    delete_original: bool,
    destination_extension: String,
}

/// Destination naming: same directory and stem, swapped extension.
/// Independent of quality and delete-flag settings.
pub fn destination_path(image: &Path, destination_extension: &str) -> PathBuf {
    image.with_extension(destination_extension)
}

impl ConversionWorker {
    pub fn new(config: &ConversionConfig, fs: Arc<dyn FileSystem>, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            manifests: ManifestStore::new(config, Arc::clone(&fs)),
            fs,
            codec,
            locks: GroupLocks::default(),
            quality: config.quality,
            delete_original: config.delete_original,
            destination_extension: config.destination_extension.clone(),
        }
    }

    pub fn convert(&self, image: &Path) -> Result<AssetOutcome, AssetError> {
        // Source read and decode both count as codec failures: the asset is
        // skipped entirely, nothing is written and the manifest is untouched.
        let source = self.fs.read(image).map_err(|error| AssetError::Codec {
            path: image.to_path_buf(),
            reason: anyhow::Error::new(error).context("failed to read source image"),
        })?;

        let encoded = self
            .codec
            .transcode(&source, self.quality)
            .map_err(|reason| AssetError::Codec {
                path: image.to_path_buf(),
                reason,
            })?;

        // An existing destination is silently overwritten.
        let destination = destination_path(image, &self.destination_extension);
        self.fs
            .write(&destination, &encoded)
            .map_err(|error| AssetError::Write {
                path: destination.clone(),
                reason: anyhow::Error::new(error).context("failed to write converted image"),
            })?;

        let mut warnings = Vec::new();

        // Delete only after the destination write succeeded; a failed delete
        // leaves the stale original in place and the conversion still counts.
        if self.delete_original {
            if let Err(error) = self.fs.remove_file(image) {
                warnings.push(AssetError::Write {
                    path: image.to_path_buf(),
                    reason: anyhow::Error::new(error).context("failed to delete original image"),
                });
            }
        }

        // The manifest sync runs regardless of the delete outcome. A group
        // without a manifest is a silent no-op; sync failures are reported
        // but the converted file stays on disk.
        if let Some(group_dir) = image.parent() {
            let lock = self.locks.lock_for(group_dir);
            let _guard = lock.lock().unwrap();
            if let Err(reason) = self.manifests.sync_group(group_dir) {
                warnings.push(AssetError::Manifest {
                    path: group_dir.to_path_buf(),
                    reason,
                });
            }
        }

        Ok(AssetOutcome {
            asset: ConvertedAsset {
                original: image.to_path_buf(),
                destination,
            },
            warnings,
        })
    }
}
