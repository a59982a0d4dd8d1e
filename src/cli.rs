use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::catalog::PathKind;

#[derive(Debug, Clone, ValueEnum, PartialEq, Eq)]
pub enum PathType {
    /// Each path is a full asset catalog holding .imageset groups
    #[value(name = "xcassets")]
    Xcassets,
    /// Each path is a single .imageset directory
    #[value(name = "imageset")]
    Imageset,
    /// Each path is one image file
    #[value(name = "image")]
    Image,
}

impl From<PathType> for PathKind {
    fn from(path_type: PathType) -> Self {
        match path_type {
            PathType::Xcassets => PathKind::Container,
            PathType::Imageset => PathKind::ImageGroup,
            PathType::Image => PathKind::SingleImage,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "heicify",
    about = "Batch-convert PNG assets in Xcode asset catalogs to HEIC",
    long_about = "
heicify - asset catalog HEIC converter

Converts the PNG files referenced by Xcode asset catalogs to HEIC and
rewrites each image group's Contents.json so filename references point at
the converted files. Per-asset failures are reported and never abort the
batch; only invalid flags make the process exit non-zero.

Requires the heif-enc tool from libheif on PATH.

Example Usage:
  # Convert every imageset inside one or more catalogs
  heicify Assets.xcassets Icons.xcassets

  # A single imageset, lower quality, removing the original PNGs
  heicify -t imageset -c 0.6 -d MyIcon.imageset

  # One standalone image, no manifest involved
  heicify -t image photo.png

  # Four parallel workers with detailed output
  heicify -j 4 -v Assets.xcassets"
)]
pub struct Args {
    /// Asset catalogs, imageset directories or image files to convert
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Lossy compression quality passed to the encoder (0.0-1.0)
    ///
    /// Negative values parse so that range validation can reject them with
    /// a proper message instead of clap's "unexpected argument".
    #[arg(
        short = 'c',
        long = "compression-quality",
        default_value = "0.76",
        allow_negative_numbers = true,
        value_name = "QUALITY"
    )]
    pub compression_quality: f32,

    /// How to interpret the supplied paths
    #[arg(short = 't', long = "path-type", default_value = "xcassets", value_name = "TYPE")]
    pub path_type: PathType,

    /// Delete each original image after its conversion succeeds
    #[arg(short = 'd', long = "delete-original-image")]
    pub delete_original_image: bool,

    /// Extension of the source raster files (case-sensitive match)
    #[arg(long = "source-extension", default_value = "png", value_name = "EXT")]
    pub source_extension: String,

    /// Extension given to converted files and manifest references
    #[arg(long = "destination-extension", default_value = "heic", value_name = "EXT")]
    pub destination_extension: String,

    /// Number of parallel conversion jobs (1 = sequential, 0 = all cores)
    #[arg(short = 'j', long = "jobs", default_value = "1", value_name = "N")]
    pub jobs: usize,

    /// Enable verbose output with per-asset progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
