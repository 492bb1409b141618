//! Images packaged in an asset directory.
//!
//! A bundle is a directory on disk. Resolution-aware variants live next to
//! the base image with an `@<scale>` suffix on the file stem:
//!
//! ```text
//! icons/
//!   logo.png       (scale 1)
//!   logo@2.png     (scale 2)
//!   logo@3.png     (scale 3)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::ImageError;
use crate::io::FileSource;
use crate::stream::ImageStreamCompleter;

use super::codec::load_from_source;
use super::{ImageConfiguration, ImageProvider};

/// Highest variant scale that is looked up.
pub const MAX_VARIANT_SCALE: u32 = 3;

/// A directory of image assets.
///
/// Variant lookups are memoized per bundle: once a name has been resolved for
/// a device pixel ratio, the filesystem is not probed again. Clones share the
/// memo; equality and hashing only consider the root.
#[derive(Clone)]
pub struct AssetBundle {
    root: PathBuf,

    /// (asset name, device pixel ratio bits) -> (resolved name, scale bits)
    variants: Arc<Mutex<HashMap<(String, u32), (String, u32)>>>,
}

impl AssetBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            variants: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name` inside the bundle.
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_file()
    }

    /// Drop memoized variant lookups, e.g. after the directory changed.
    pub fn clear_variants(&self) {
        self.variants.lock().clear();
    }

    /// Pick the best `@scale` variant of `name` for `ratio`.
    fn variant(&self, name: &str, ratio: f32) -> (String, u32) {
        let memo_key = (name.to_string(), ratio.to_bits());
        if let Some(found) = self.variants.lock().get(&memo_key) {
            return found.clone();
        }

        let highest = if ratio.is_finite() && ratio > 1.0 {
            (ratio.ceil() as u32).min(MAX_VARIANT_SCALE)
        } else {
            1
        };

        let found = (1..=highest)
            .rev()
            .map(|scale| (variant_name(name, scale), scale))
            .find(|(candidate, _)| self.contains(candidate))
            .map(|(candidate, scale)| (candidate, (scale as f32).to_bits()))
            .unwrap_or_else(|| (name.to_string(), 1.0f32.to_bits()));

        trace!(name, ratio, resolved = %found.0, "Resolved asset variant");
        self.variants.lock().insert(memo_key, found.clone());
        found
    }
}

impl PartialEq for AssetBundle {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Eq for AssetBundle {}

impl Hash for AssetBundle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
    }
}

impl fmt::Debug for AssetBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBundle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetImageKey {
    bundle: AssetBundle,
    name: String,
    scale_bits: u32,
}

impl AssetImageKey {
    pub fn bundle(&self) -> &AssetBundle {
        &self.bundle
    }

    /// The resolved asset name, including any `@<scale>` suffix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }
}

/// Name of the `@scale` variant of `name`: `a/logo.png` -> `a/logo@2.png`.
fn variant_name(name: &str, scale: u32) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}@{}.{}", stem, scale, ext),
        None => format!("{}@{}", stem, scale),
    };
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.join(file).to_string_lossy().into_owned(),
        None => file,
    }
}

fn pick_bundle(
    own: &Option<AssetBundle>,
    configuration: &ImageConfiguration,
) -> Result<AssetBundle, ImageError> {
    own.clone()
        .or_else(|| configuration.bundle.clone())
        .ok_or_else(|| ImageError::InvalidKey("no asset bundle available".to_string()))
}

fn load_asset(key: AssetImageKey) -> ImageStreamCompleter {
    let scale = key.scale();
    let path = key.bundle.resolve(&key.name);
    if !path.is_file() {
        return ImageStreamCompleter::failed(ImageError::AssetNotFound { name: key.name });
    }
    load_from_source(FileSource::new(path), scale)
}

/// An asset whose variant is chosen from the device pixel ratio.
///
/// With a ratio of 2.5 the lookup order is `logo@3.png`, `logo@2.png`,
/// `logo@1.png`, then `logo.png` at scale 1.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetImage {
    name: String,
    bundle: Option<AssetBundle>,
}

impl AssetImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bundle: None,
        }
    }

    /// Use `bundle` instead of the one in the configuration.
    pub fn with_bundle(mut self, bundle: AssetBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ImageProvider for AssetImage {
    type Key = AssetImageKey;

    fn obtain_key(&self, configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        let bundle = pick_bundle(&self.bundle, configuration)?;
        let ratio = configuration.device_pixel_ratio.unwrap_or(1.0);
        let (name, scale_bits) = bundle.variant(&self.name, ratio);

        Ok(AssetImageKey {
            bundle,
            name,
            scale_bits,
        })
    }

    fn load(&self, key: Self::Key) -> ImageStreamCompleter {
        load_asset(key)
    }
}

/// An asset loaded by exact name at a fixed scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactAssetImage {
    name: String,
    scale: f32,
    bundle: Option<AssetBundle>,
}

impl ExactAssetImage {
    pub fn new(name: impl Into<String>, scale: f32) -> Self {
        Self {
            name: name.into(),
            scale,
            bundle: None,
        }
    }

    pub fn with_bundle(mut self, bundle: AssetBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }
}

impl ImageProvider for ExactAssetImage {
    type Key = AssetImageKey;

    fn obtain_key(&self, configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        Ok(AssetImageKey {
            bundle: pick_bundle(&self.bundle, configuration)?,
            name: self.name.clone(),
            scale_bits: self.scale.to_bits(),
        })
    }

    fn load(&self, key: Self::Key) -> ImageStreamCompleter {
        load_asset(key)
    }
}
