pub mod codec;
pub mod convert;
pub mod discover;
pub mod manifest;

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::fsio::FileSystem;
use codec::ImageCodec;
use convert::{ConversionWorker, ConvertedAsset};
use discover::AssetDiscoverer;

/// Caller-declared structural kind of an input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Top-level catalog (`.xcassets`) holding multiple image groups.
    Container,
    /// One image group (`.imageset`) holding rasters plus a manifest.
    ImageGroup,
    /// A direct path to one raster file, no manifest lookup during discovery.
    SingleImage,
}

/// An input path together with its declared shape. Shapes are supplied by
/// the caller, never auto-detected.
#[derive(Debug, Clone)]
pub struct CatalogPath {
    pub path: PathBuf,
    pub kind: PathKind,
}

impl CatalogPath {
    pub fn new(path: impl Into<PathBuf>, kind: PathKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Per-asset failure, carrying the offending path and the underlying cause.
///
/// Every step of the pipeline is contained at the asset boundary: these are
/// collected into a [`BatchReport`], never raised across sibling assets.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("discovery failed for {}: {:#}", .path.display(), .reason)]
    Discovery { path: PathBuf, reason: anyhow::Error },
    #[error("codec failed for {}: {:#}", .path.display(), .reason)]
    Codec { path: PathBuf, reason: anyhow::Error },
    #[error("write failed for {}: {:#}", .path.display(), .reason)]
    Write { path: PathBuf, reason: anyhow::Error },
    #[error("manifest update failed for {}: {:#}", .path.display(), .reason)]
    Manifest { path: PathBuf, reason: anyhow::Error },
}

impl AssetError {
    /// The path the failure is attributed to.
    pub fn path(&self) -> &Path {
        match self {
            AssetError::Discovery { path, .. }
            | AssetError::Codec { path, .. }
            | AssetError::Write { path, .. }
            | AssetError::Manifest { path, .. } => path,
        }
    }
}

/// Settings for one batch run. Read-only once the pipeline starts.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Lossy encoder quality in [0.0, 1.0].
    pub quality: f32,
    /// Remove the source file after a successful destination write.
    pub delete_original: bool,
    /// Source raster extension, matched case-sensitively (e.g. "png").
    pub source_extension: String,
    /// Destination raster extension (e.g. "heic").
    pub destination_extension: String,
    /// Extension a container path must carry (e.g. "xcassets").
    pub container_extension: String,
    /// Extension of image-group directories inside a container (e.g. "imageset").
    pub group_extension: String,
    /// Extension of the per-group manifest file (e.g. "json").
    pub manifest_extension: String,
    /// Worker count: 1 = sequential reference behavior, 0 = all cores.
    pub parallel_jobs: usize,
    pub verbose: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: 0.76,
            delete_original: false,
            source_extension: "png".to_string(),
            destination_extension: "heic".to_string(),
            container_extension: "xcassets".to_string(),
            group_extension: "imageset".to_string(),
            manifest_extension: "json".to_string(),
            parallel_jobs: 1,
            verbose: false,
        }
    }
}

/// Outcome of one batch run. The pipeline itself never fails on asset-level
/// problems; everything ends up in here.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Assets whose destination file was written.
    pub converted: Vec<ConvertedAsset>,
    /// Fatal per-asset failures (discovery, codec, destination write).
    pub errors: Vec<AssetError>,
    /// Non-fatal failures on assets that still converted (original delete,
    /// manifest update).
    pub warnings: Vec<AssetError>,
}

/// Orchestrates discovery and per-asset conversion across a set of catalog
/// paths.
pub struct ConversionEngine {
    config: ConversionConfig,
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn ImageCodec>,
}

impl ConversionEngine {
    pub fn new(
        config: ConversionConfig,
        fs: Arc<dyn FileSystem>,
        codec: Arc<dyn ImageCodec>,
    ) -> Self {
        Self { config, fs, codec }
    }

    /// Walk all supplied paths and collect convertible image files, in input
    /// order. Listing failures are reported per path and never abort
    /// discovery.
    pub fn discover(&self, paths: &[CatalogPath]) -> (Vec<PathBuf>, Vec<AssetError>) {
        AssetDiscoverer::new(self.fs.as_ref(), &self.config).discover(paths)
    }

    /// Discover and convert every asset, invoking `on_converted` after each
    /// attempt (success or failure) for progress tracking.
    ///
    /// Discovery completes fully before any conversion begins. With
    /// `parallel_jobs <= 1` assets are processed strictly in discovery
    /// order; otherwise they are dispatched to a scoped rayon pool, with
    /// manifest updates serialized per group.
    pub fn run<F>(&self, paths: &[CatalogPath], on_converted: F) -> Result<BatchReport>
    where
        F: Fn(&Path) + Send + Sync,
    {
        let (images, discovery_errors) = self.discover(paths);
        let mut report = self.process(&images, on_converted)?;

        // Discovery failures come first in the report, before conversion
        // failures.
        let mut errors = discovery_errors;
        errors.append(&mut report.errors);
        report.errors = errors;
        Ok(report)
    }

    /// Convert an already-discovered list of images. Callers that need the
    /// image count up front (e.g. to size a progress bar) discover once,
    /// then hand the list here instead of discovering twice.
    pub fn process<F>(&self, images: &[PathBuf], on_converted: F) -> Result<BatchReport>
    where
        F: Fn(&Path) + Send + Sync,
    {
        let mut report = BatchReport::default();

        let worker = ConversionWorker::new(&self.config, Arc::clone(&self.fs), Arc::clone(&self.codec));

        let jobs = match self.config.parallel_jobs {
            0 => num_cpus::get(),
            n => n,
        };

        let outcomes: Vec<_> = if jobs <= 1 {
            images
                .iter()
                .map(|image| {
                    let outcome = worker.convert(image);
                    on_converted(image);
                    outcome
                })
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .context("failed to build worker thread pool")?;
            pool.install(|| {
                images
                    .par_iter()
                    .map(|image| {
                        let outcome = worker.convert(image);
                        on_converted(image);
                        outcome
                    })
                    .collect()
            })
        };

        for outcome in outcomes {
            match outcome {
                Ok(converted) => {
                    report.warnings.extend(converted.warnings);
                    report.converted.push(converted.asset);
                }
                Err(error) => report.errors.push(error),
            }
        }

        Ok(report)
    }
}
