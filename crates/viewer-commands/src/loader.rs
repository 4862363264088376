//! Dataset loading.
//!
//! A dataset is a folder of single-page TIFF slices, one per Z step, ordered
//! by file name. A JSON manifest describing the extent is accepted as a
//! fallback. The bus only needs a dataset's identity and voxel extent;
//! decoding voxel data belongs to the renderer.

use crate::{LoadError, LoadResult};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::Decoder;
use tracing::{info, warn};

/// Manifest file looked up inside a dataset directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Slice file extensions, matched case-insensitively.
pub const SLICE_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// What a successful load yields.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInfo {
    /// Path the caller asked for.
    pub path: PathBuf,
    /// Display name; the directory or file stem when the manifest has none.
    pub name: String,
    /// Voxel extent `[x, y, z]`.
    pub extent: [usize; 3],
}

/// Loads a dataset's description from disk.
pub trait VolumeLoader: Send {
    /// Load the dataset at `path`, reporting progress through `progress`.
    fn load(&self, path: &Path, progress: &mut dyn FnMut(&str)) -> LoadResult<VolumeInfo>;
}

fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads the extent of a folder of TIFF slices: width and height from the
/// first slice's header, depth from the slice count.
#[derive(Debug, Clone, Default)]
pub struct TiffStackLoader;

impl TiffStackLoader {
    /// TIFF files directly inside `dir`, sorted by file name.
    pub fn slices(dir: &Path) -> LoadResult<Vec<PathBuf>> {
        let mut slices = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_slice = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    SLICE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                });
            if is_slice && path.is_file() {
                slices.push(path);
            }
        }
        slices.sort();
        Ok(slices)
    }

    /// `(width, height)` from a slice's header.
    pub fn slice_dimensions(path: &Path) -> LoadResult<(u32, u32)> {
        let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
        Ok(decoder.dimensions()?)
    }
}

impl VolumeLoader for TiffStackLoader {
    fn load(&self, path: &Path, progress: &mut dyn FnMut(&str)) -> LoadResult<VolumeInfo> {
        if !path.is_dir() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let slices = Self::slices(path)?;
        let first = slices
            .first()
            .ok_or_else(|| LoadError::NoSlices(path.to_path_buf()))?;
        progress(&format!("Found {} slices", slices.len()));

        let (width, height) = Self::slice_dimensions(first)?;

        let mismatched = slices[1..]
            .iter()
            .filter(|slice| {
                !matches!(Self::slice_dimensions(slice), Ok(dims) if dims == (width, height))
            })
            .count();
        if mismatched > 0 {
            warn!(
                path = %path.display(),
                mismatched,
                width,
                height,
                "Slices differ from the first slice's dimensions"
            );
        }

        let extent = [width as usize, height as usize, slices.len()];
        if extent.contains(&0) {
            return Err(LoadError::InvalidExtent(extent));
        }
        progress(&format!("Extent {}x{}x{}", extent[0], extent[1], extent[2]));

        let name = dataset_name(path);
        info!(path = %path.display(), name = %name, ?extent, "TIFF stack loaded");

        Ok(VolumeInfo {
            path: path.to_path_buf(),
            name,
            extent,
        })
    }
}

/// TIFF slice folders first, then manifests.
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader;

impl VolumeLoader for DatasetLoader {
    fn load(&self, path: &Path, progress: &mut dyn FnMut(&str)) -> LoadResult<VolumeInfo> {
        if path.is_dir() {
            if !TiffStackLoader::slices(path)?.is_empty() {
                return TiffStackLoader.load(path, progress);
            }
            if !path.join(MANIFEST_FILE).is_file() {
                return Err(LoadError::NoSlices(path.to_path_buf()));
            }
        }
        ManifestLoader.load(path, progress)
    }
}

#[derive(Deserialize)]
struct Manifest {
    width: usize,
    height: usize,
    depth: usize,
    #[serde(default)]
    name: Option<String>,
}

/// Reads `{"width", "height", "depth", "name"?}` from a manifest file, or from
/// `manifest.json` inside a dataset directory.
#[derive(Debug, Clone, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    fn manifest_path(path: &Path) -> LoadResult<PathBuf> {
        if path.is_dir() {
            let manifest = path.join(MANIFEST_FILE);
            if manifest.is_file() {
                Ok(manifest)
            } else {
                Err(LoadError::NotFound(manifest))
            }
        } else if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(LoadError::NotFound(path.to_path_buf()))
        }
    }
}

impl VolumeLoader for ManifestLoader {
    fn load(&self, path: &Path, progress: &mut dyn FnMut(&str)) -> LoadResult<VolumeInfo> {
        let manifest_path = Self::manifest_path(path)?;
        progress(&format!("Reading {}", manifest_path.display()));

        let content = std::fs::read_to_string(&manifest_path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;

        let extent = [manifest.width, manifest.height, manifest.depth];
        if extent.contains(&0) {
            return Err(LoadError::InvalidExtent(extent));
        }
        progress(&format!("Extent {}x{}x{}", extent[0], extent[1], extent[2]));

        let name = manifest.name.unwrap_or_else(|| dataset_name(path));

        info!(path = %path.display(), name = %name, ?extent, "Dataset loaded");

        Ok(VolumeInfo {
            path: path.to_path_buf(),
            name,
            extent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tiff::encoder::{colortype, TiffEncoder};

    fn load(path: &Path) -> (LoadResult<VolumeInfo>, Vec<String>) {
        load_with(&ManifestLoader, path)
    }

    fn load_with(loader: &dyn VolumeLoader, path: &Path) -> (LoadResult<VolumeInfo>, Vec<String>) {
        let mut messages = Vec::new();
        let result = loader.load(path, &mut |m: &str| messages.push(m.to_string()));
        (result, messages)
    }

    fn write_slice(path: &Path, width: u32, height: u32) {
        let mut encoder = TiffEncoder::new(File::create(path).unwrap()).unwrap();
        let pixels = vec![0u16; (width * height) as usize];
        encoder
            .write_image::<colortype::Gray16>(width, height, &pixels)
            .unwrap();
    }

    #[test]
    fn test_tiff_stack_extent() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("knee_ct");
        std::fs::create_dir(&dataset).unwrap();
        write_slice(&dataset.join("slice_002.tif"), 8, 4);
        write_slice(&dataset.join("slice_000.tif"), 8, 4);
        write_slice(&dataset.join("slice_001.TIFF"), 8, 4);
        std::fs::write(dataset.join("notes.txt"), "scanner notes").unwrap();

        let slices = TiffStackLoader::slices(&dataset).unwrap();
        assert_eq!(slices.len(), 3);
        assert!(slices[0].ends_with("slice_000.tif"));
        assert!(slices[2].ends_with("slice_002.tif"));

        let (result, messages) = load_with(&TiffStackLoader, &dataset);
        let info = result.unwrap();
        assert_eq!(info.extent, [8, 4, 3]);
        assert_eq!(info.name, "knee_ct");
        assert_eq!(messages[0], "Found 3 slices");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_tiff_stack_mismatched_slice_still_loads() {
        let dir = tempdir().unwrap();
        write_slice(&dir.path().join("a.tif"), 16, 16);
        write_slice(&dir.path().join("b.tif"), 8, 8);

        let (result, _) = load_with(&TiffStackLoader, dir.path());
        assert_eq!(result.unwrap().extent, [16, 16, 2]);
    }

    #[test]
    fn test_tiff_stack_failures() {
        let dir = tempdir().unwrap();

        let (result, messages) = load_with(&TiffStackLoader, dir.path());
        assert!(matches!(result, Err(LoadError::NoSlices(_))));
        assert!(messages.is_empty());

        std::fs::write(dir.path().join("broken.tif"), "not a tiff").unwrap();
        let (result, _) = load_with(&TiffStackLoader, dir.path());
        assert!(matches!(result, Err(LoadError::Tiff(_))));

        let (result, _) = load_with(&TiffStackLoader, &dir.path().join("broken.tif"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_dataset_loader_prefers_slices_then_manifest() {
        let dir = tempdir().unwrap();

        let stack = dir.path().join("stack");
        std::fs::create_dir(&stack).unwrap();
        write_slice(&stack.join("0001.tif"), 12, 10);
        std::fs::write(
            stack.join(MANIFEST_FILE),
            r#"{"width": 1, "height": 1, "depth": 1}"#,
        )
        .unwrap();
        let (result, _) = load_with(&DatasetLoader, &stack);
        assert_eq!(result.unwrap().extent, [12, 10, 1]);

        let described = dir.path().join("described");
        std::fs::create_dir(&described).unwrap();
        std::fs::write(
            described.join(MANIFEST_FILE),
            r#"{"width": 64, "height": 32, "depth": 16}"#,
        )
        .unwrap();
        let (result, _) = load_with(&DatasetLoader, &described);
        assert_eq!(result.unwrap().extent, [64, 32, 16]);

        let empty = dir.path().join("empty");
        std::fs::create_dir(&empty).unwrap();
        let (result, _) = load_with(&DatasetLoader, &empty);
        assert!(matches!(result, Err(LoadError::NoSlices(_))));

        let (result, _) = load_with(&DatasetLoader, &dir.path().join("missing"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_load_directory_manifest() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("head_ct");
        std::fs::create_dir(&dataset).unwrap();
        std::fs::write(
            dataset.join(MANIFEST_FILE),
            r#"{"width": 256, "height": 256, "depth": 101}"#,
        )
        .unwrap();

        let (result, messages) = load(&dataset);
        let info = result.unwrap();
        assert_eq!(info.extent, [256, 256, 101]);
        assert_eq!(info.name, "head_ct");
        assert_eq!(info.path, dataset);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_load_manifest_file_with_name() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("knee.json");
        std::fs::write(
            &file,
            r#"{"width": 64, "height": 32, "depth": 16, "name": "Knee MRI"}"#,
        )
        .unwrap();

        let (result, _) = load(&file);
        let info = result.unwrap();
        assert_eq!(info.extent, [64, 32, 16]);
        assert_eq!(info.name, "Knee MRI");
    }

    #[test]
    fn test_missing_path() {
        let dir = tempdir().unwrap();
        let (result, messages) = load(&dir.path().join("nope"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_directory_without_manifest() {
        let dir = tempdir().unwrap();
        let (result, _) = load(dir.path());
        assert!(matches!(result, Err(LoadError::NotFound(p)) if p.ends_with(MANIFEST_FILE)));
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.json");
        std::fs::write(&file, r#"{"width": 64}"#).unwrap();

        let (result, _) = load(&file);
        assert!(matches!(result, Err(LoadError::Manifest(_))));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("flat.json");
        std::fs::write(&file, r#"{"width": 64, "height": 64, "depth": 0}"#).unwrap();

        let (result, _) = load(&file);
        assert!(matches!(result, Err(LoadError::InvalidExtent([64, 64, 0]))));
    }
}
