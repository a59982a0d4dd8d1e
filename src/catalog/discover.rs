use anyhow::anyhow;
use std::path::{Path, PathBuf};

use super::{AssetError, CatalogPath, ConversionConfig, PathKind};
use crate::fsio::FileSystem;

/// Walks catalog paths and yields the raster files eligible for conversion.
///
/// Listing problems are collected as [`AssetError::Discovery`] entries; a
/// failing path contributes zero images and never aborts discovery of the
/// remaining paths.
pub struct AssetDiscoverer<'a> {
    fs: &'a dyn FileSystem,
    config: &'a ConversionConfig,
}

impl<'a> AssetDiscoverer<'a> {
    pub fn new(fs: &'a dyn FileSystem, config: &'a ConversionConfig) -> Self {
        Self { fs, config }
    }

    /// Expand every input path according to its declared shape, in input
    /// order. Within one path, files come back in filesystem listing order.
    pub fn discover(&self, paths: &[CatalogPath]) -> (Vec<PathBuf>, Vec<AssetError>) {
        let mut images = Vec::new();
        let mut errors = Vec::new();

        for catalog_path in paths {
            match catalog_path.kind {
                // No extension check here: the caller asked for this exact file.
                PathKind::SingleImage => images.push(catalog_path.path.clone()),
                PathKind::ImageGroup => {
                    images.extend(self.group_images(&catalog_path.path, &mut errors));
                }
                PathKind::Container => {
                    images.extend(self.container_images(&catalog_path.path, &mut errors));
                }
            }
        }

        (images, errors)
    }

    /// Direct children of one image group carrying the source extension.
    fn group_images(&self, group_dir: &Path, errors: &mut Vec<AssetError>) -> Vec<PathBuf> {
        self.files_with_extension(group_dir, &self.config.source_extension, errors)
    }

    /// Expand a container: validate its extension, then apply the image
    /// group rule to each `.imageset` child, concatenating in listing order.
    fn container_images(&self, container: &Path, errors: &mut Vec<AssetError>) -> Vec<PathBuf> {
        if !has_extension(container, &self.config.container_extension) {
            errors.push(AssetError::Discovery {
                path: container.to_path_buf(),
                reason: anyhow!(
                    "path is not a .{} container",
                    self.config.container_extension
                ),
            });
            return Vec::new();
        }

        let groups: Vec<PathBuf> = self
            .files_with_extension(container, &self.config.group_extension, errors);

        groups
            .iter()
            .flat_map(|group| self.group_images(group, errors))
            .collect()
    }

    /// List a directory and keep the entries whose extension matches
    /// exactly (case-sensitive). A listing failure is reported and yields
    /// nothing.
    fn files_with_extension(
        &self,
        dir: &Path,
        extension: &str,
        errors: &mut Vec<AssetError>,
    ) -> Vec<PathBuf> {
        match self.fs.list_dir(dir) {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| has_extension(entry, extension))
                .collect(),
            Err(error) => {
                errors.push(AssetError::Discovery {
                    path: dir.to_path_buf(),
                    reason: anyhow::Error::new(error).context("failed to list directory"),
                });
                Vec::new()
            }
        }
    }
}

/// Case-sensitive exact extension match, e.g. `png` matches `icon.png` but
/// not `icon.PNG`.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsio::MemoryFileSystem;

    fn discover(fs: &MemoryFileSystem, paths: &[CatalogPath]) -> (Vec<PathBuf>, Vec<AssetError>) {
        let config = ConversionConfig::default();
        AssetDiscoverer::new(fs, &config).discover(paths)
    }

    #[test]
    fn test_single_image_yields_path_unconditionally() {
        let fs = MemoryFileSystem::new();
        // Not even present on disk, and not a .png: still yielded as-is.
        let paths = [CatalogPath::new("/pics/photo.jpeg", PathKind::SingleImage)];
        let (images, errors) = discover(&fs, &paths);
        assert_eq!(images, vec![PathBuf::from("/pics/photo.jpeg")]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_group_keeps_only_source_extension() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/g.imageset/a.png", b"x".to_vec());
        fs.add_file("/g.imageset/b.PNG", b"x".to_vec());
        fs.add_file("/g.imageset/c.jpg", b"x".to_vec());
        fs.add_file("/g.imageset/Contents.json", b"{}".to_vec());
        fs.add_dir("/g.imageset/nested.png");

        let paths = [CatalogPath::new("/g.imageset", PathKind::ImageGroup)];
        let (images, errors) = discover(&fs, &paths);

        // Extension match is case-sensitive and exact; the nested directory
        // named like a png is listed by the filesystem and matched on name
        // only, same as the original's pathExtension filter.
        assert_eq!(
            images,
            vec![
                PathBuf::from("/g.imageset/a.png"),
                PathBuf::from("/g.imageset/nested.png")
            ]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_container_requires_extension() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/assets/g.imageset/a.png", b"x".to_vec());

        let paths = [CatalogPath::new("/assets", PathKind::Container)];
        let (images, errors) = discover(&fs, &paths);
        assert!(images.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Path::new("/assets"));
    }

    #[test]
    fn test_container_ignores_non_group_siblings() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/A.xcassets/B.imageset/icon.png", b"x".to_vec());
        fs.add_file("/A.xcassets/C.colorset/swatch.png", b"x".to_vec());
        fs.add_file("/A.xcassets/loose.png", b"x".to_vec());

        let paths = [CatalogPath::new("/A.xcassets", PathKind::Container)];
        let (images, errors) = discover(&fs, &paths);
        assert_eq!(images, vec![PathBuf::from("/A.xcassets/B.imageset/icon.png")]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_listing_failure_is_non_fatal() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/ok.imageset/a.png", b"x".to_vec());

        let paths = [
            CatalogPath::new("/gone.imageset", PathKind::ImageGroup),
            CatalogPath::new("/ok.imageset", PathKind::ImageGroup),
        ];
        let (images, errors) = discover(&fs, &paths);
        assert_eq!(images, vec![PathBuf::from("/ok.imageset/a.png")]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), Path::new("/gone.imageset"));
    }

    #[test]
    fn test_results_concatenate_in_input_order() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/two.imageset/b.png", b"x".to_vec());
        fs.add_file("/one.imageset/a.png", b"x".to_vec());

        let paths = [
            CatalogPath::new("/two.imageset", PathKind::ImageGroup),
            CatalogPath::new("/one.imageset", PathKind::ImageGroup),
        ];
        let (images, _) = discover(&fs, &paths);
        assert_eq!(
            images,
            vec![
                PathBuf::from("/two.imageset/b.png"),
                PathBuf::from("/one.imageset/a.png")
            ]
        );
    }
}
