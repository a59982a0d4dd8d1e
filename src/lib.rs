// Library exports for reuse by the CLI binary and integration tooling
pub mod catalog;
pub mod cli;
pub mod fsio;
pub mod utils;

// Re-export commonly used types
pub use catalog::codec::{HeifEncCodec, ImageCodec};
pub use catalog::convert::ConvertedAsset;
pub use catalog::{
    AssetError, BatchReport, CatalogPath, ConversionConfig, ConversionEngine, PathKind,
};
pub use fsio::{FileSystem, MemoryFileSystem, StdFileSystem};
