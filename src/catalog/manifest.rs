use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::discover::has_extension;
use super::ConversionConfig;
use crate::fsio::FileSystem;

/// One `Contents.json` document. Fields are declared in alphabetical order
/// so struct serialization and the sorted-key save agree.
///
/// Unknown keys are dropped on load, so a save round-trips only the modeled
/// fields, exactly like the original tool's strict decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub images: Vec<ImageEntry>,
    pub info: Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub idiom: String,
    pub scale: String,
}

/// Opaque catalog metadata, passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub author: String,
    pub version: i64,
}

/// Result of one per-group manifest synchronization.
#[derive(Debug, PartialEq)]
pub enum ManifestSync {
    /// The group carries no manifest; nothing to do, not an error.
    NoManifest,
    Updated { path: PathBuf, rewritten: usize },
}

/// Rewrite an entry's filename from the source to the destination
/// extension.
///
/// This is a literal substring replacement of every `.{old_ext}`
/// occurrence, not a trailing-extension swap: `icon.png.png` becomes
/// `icon.heic.heic`. Catalogs in the wild rely on the original tool's
/// behavior, so it is preserved verbatim. Returns whether the entry
/// changed; entries without a filename or without the pattern are left
/// untouched, which also makes the rewrite idempotent.
pub fn rewrite_filename(entry: &mut ImageEntry, old_ext: &str, new_ext: &str) -> bool {
    let Some(name) = entry.filename.as_deref() else {
        return false;
    };
    let pattern = format!(".{old_ext}");
    if !name.contains(&pattern) {
        return false;
    }
    let replacement = format!(".{new_ext}");
    entry.filename = Some(name.replace(&pattern, &replacement));
    true
}

/// Loads, rewrites and atomically rewrites the JSON manifest co-located
/// with an image group.
pub struct ManifestStore {
    fs: Arc<dyn FileSystem>,
    manifest_extension: String,
    source_extension: String,
    destination_extension: String,
}

impl ManifestStore {
    pub fn new(config: &ConversionConfig, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            manifest_extension: config.manifest_extension.clone(),
            source_extension: config.source_extension.clone(),
            destination_extension: config.destination_extension.clone(),
        }
    }

    /// First direct child of the group carrying the manifest extension.
    /// Zero candidates, or a listing failure, yields `None`; with several
    /// candidates the first listed wins (no uniqueness validation).
    pub fn find_manifest(&self, group_dir: &Path) -> Option<PathBuf> {
        self.fs
            .list_dir(group_dir)
            .ok()?
            .into_iter()
            .find(|entry| has_extension(entry, &self.manifest_extension))
    }

    /// Strict parse: any structurally invalid document fails the whole
    /// group's metadata update.
    pub fn load(&self, path: &Path) -> Result<Manifest> {
        let bytes = self
            .fs
            .read(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse manifest {}", path.display()))
    }

    /// Serialize deterministically (sorted keys, pretty-printed) and write
    /// atomically via a sibling temp file + rename, so a crash mid-write
    /// never replaces a valid manifest with a corrupt one.
    pub fn save(&self, manifest: &Manifest, path: &Path) -> Result<()> {
        // The Value round trip sorts keys: serde_json's default Map is a
        // BTreeMap.
        let value = serde_json::to_value(manifest).context("failed to serialize manifest")?;
        let bytes = serde_json::to_vec_pretty(&value).context("failed to serialize manifest")?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("manifest");
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

        self.fs
            .write(&temp_path, &bytes)
            .with_context(|| format!("failed to write manifest temp file {}", temp_path.display()))?;
        self.fs
            .rename(&temp_path, path)
            .with_context(|| format!("failed to replace manifest {}", path.display()))
    }

    /// Re-find, re-load, rewrite and re-save the group's manifest. Called
    /// once per converted image; intentionally redundant to keep per-image
    /// failure isolation simple.
    pub fn sync_group(&self, group_dir: &Path) -> Result<ManifestSync> {
        let Some(path) = self.find_manifest(group_dir) else {
            return Ok(ManifestSync::NoManifest);
        };

        let mut manifest = self.load(&path)?;
        let mut rewritten = 0;
        for entry in &mut manifest.images {
            if rewrite_filename(entry, &self.source_extension, &self.destination_extension) {
                rewritten += 1;
            }
        }

        // Saved even when nothing changed, matching the original's
        // unconditional re-encode of the document.
        self.save(&manifest, &path)?;
        Ok(ManifestSync::Updated { path, rewritten })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsio::MemoryFileSystem;

    fn entry(filename: Option<&str>) -> ImageEntry {
        ImageEntry {
            filename: filename.map(str::to_string),
            idiom: "universal".to_string(),
            scale: "2x".to_string(),
        }
    }

    fn store(fs: Arc<MemoryFileSystem>) -> ManifestStore {
        ManifestStore::new(&ConversionConfig::default(), fs)
    }

    #[test]
    fn test_rewrite_filename_basic() {
        let mut e = entry(Some("icon.png"));
        assert!(rewrite_filename(&mut e, "png", "heic"));
        assert_eq!(e.filename.as_deref(), Some("icon.heic"));
    }

    #[test]
    fn test_rewrite_filename_idempotent() {
        let mut e = entry(Some("icon.heic"));
        assert!(!rewrite_filename(&mut e, "png", "heic"));
        assert_eq!(e.filename.as_deref(), Some("icon.heic"));
    }

    #[test]
    fn test_rewrite_filename_substring_semantics() {
        // Every occurrence of the textual pattern is replaced, not just the
        // trailing extension.
        let mut e = entry(Some("icon.png.png"));
        assert!(rewrite_filename(&mut e, "png", "heic"));
        assert_eq!(e.filename.as_deref(), Some("icon.heic.heic"));

        let mut e = entry(Some("shot.pngpreview.png"));
        assert!(rewrite_filename(&mut e, "png", "heic"));
        assert_eq!(e.filename.as_deref(), Some("shot.heicpreview.heic"));
    }

    #[test]
    fn test_rewrite_filename_none_untouched() {
        let mut e = entry(None);
        assert!(!rewrite_filename(&mut e, "png", "heic"));
        assert_eq!(e.filename, None);
    }

    #[test]
    fn test_find_manifest() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/empty.imageset");
        fs.add_file("/g.imageset/Contents.json", b"{}".to_vec());
        fs.add_file("/g.imageset/icon.png", b"x".to_vec());

        let store = store(Arc::clone(&fs));
        assert_eq!(store.find_manifest(Path::new("/empty.imageset")), None);
        assert_eq!(store.find_manifest(Path::new("/missing")), None);
        assert_eq!(
            store.find_manifest(Path::new("/g.imageset")),
            Some(PathBuf::from("/g.imageset/Contents.json"))
        );
    }

    #[test]
    fn test_find_manifest_multiple_candidates_takes_first() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/g.imageset/Contents.json", b"{}".to_vec());
        fs.add_file("/g.imageset/Other.json", b"{}".to_vec());

        // Listing order in the fake is sorted, so the first candidate is
        // deterministic here; the contract only promises "the first found".
        let store = store(Arc::clone(&fs));
        assert_eq!(
            store.find_manifest(Path::new("/g.imageset")),
            Some(PathBuf::from("/g.imageset/Contents.json"))
        );
    }

    #[test]
    fn test_load_strict() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/g.imageset/Contents.json", b"{\"images\": 42}".to_vec());
        let store = store(Arc::clone(&fs));
        assert!(store.load(Path::new("/g.imageset/Contents.json")).is_err());
    }

    #[test]
    fn test_save_sorted_and_round_trip_stable() {
        let fs = Arc::new(MemoryFileSystem::new());
        // Keys deliberately out of order in the source document.
        fs.add_file(
            "/g.imageset/Contents.json",
            br#"{
                "info": {"version": 1, "author": "xcode"},
                "images": [
                    {"scale": "2x", "idiom": "universal", "filename": "icon.png"},
                    {"idiom": "universal", "scale": "3x"}
                ]
            }"#
            .to_vec(),
        );
        let store = store(Arc::clone(&fs));
        let path = Path::new("/g.imageset/Contents.json");

        let manifest = store.load(path).unwrap();
        store.save(&manifest, path).unwrap();
        let first = fs.file(path).unwrap();

        // Load-then-save with no rewrites keeps the values and is
        // byte-stable on a second pass.
        let manifest = store.load(path).unwrap();
        assert_eq!(manifest.images[0].filename.as_deref(), Some("icon.png"));
        assert_eq!(manifest.images[1].filename, None);
        assert_eq!(manifest.info.author, "xcode");
        store.save(&manifest, path).unwrap();
        assert_eq!(fs.file(path).unwrap(), first);

        let text = String::from_utf8(first).unwrap();
        // Sorted keys within each object.
        assert!(text.find("\"filename\"").unwrap() < text.find("\"idiom\"").unwrap());
        assert!(text.find("\"author\"").unwrap() < text.find("\"version\"").unwrap());
        // Filename-less entries stay filename-less.
        assert_eq!(text.matches("\"filename\"").count(), 1);
        // No temp file left behind.
        assert!(!fs.contains("/g.imageset/.Contents.json.tmp"));
    }

    #[test]
    fn test_sync_group_rewrites_all_matching_entries() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file(
            "/g.imageset/Contents.json",
            br#"{
                "images": [
                    {"filename": "icon.png", "idiom": "universal", "scale": "1x"},
                    {"filename": "icon@2x.png", "idiom": "universal", "scale": "2x"},
                    {"filename": "done.heic", "idiom": "universal", "scale": "3x"},
                    {"idiom": "universal", "scale": "1x"}
                ],
                "info": {"author": "xcode", "version": 1}
            }"#
            .to_vec(),
        );
        let store = store(Arc::clone(&fs));

        let sync = store.sync_group(Path::new("/g.imageset")).unwrap();
        assert_eq!(
            sync,
            ManifestSync::Updated {
                path: PathBuf::from("/g.imageset/Contents.json"),
                rewritten: 2
            }
        );

        let text = String::from_utf8(fs.file("/g.imageset/Contents.json").unwrap()).unwrap();
        assert!(text.contains("icon.heic"));
        assert!(text.contains("icon@2x.heic"));
        assert!(text.contains("done.heic"));
        assert!(!text.contains(".png"));
    }

    #[test]
    fn test_sync_group_without_manifest_is_silent() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/g.imageset");
        let store = store(Arc::clone(&fs));
        assert_eq!(
            store.sync_group(Path::new("/g.imageset")).unwrap(),
            ManifestSync::NoManifest
        );
    }

    #[test]
    fn test_sync_group_parse_failure_is_error() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_file("/g.imageset/Contents.json", b"not json".to_vec());
        let store = store(Arc::clone(&fs));
        assert!(store.sync_group(Path::new("/g.imageset")).is_err());
    }
}
