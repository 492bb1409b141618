//! Target configuration passed to providers when resolving an image.

use std::fmt;

use super::asset::AssetBundle;

/// Logical size hint for the image being resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Size({:.1}, {:.1})", self.width, self.height)
    }
}

/// Describes where and how an image will be displayed.
///
/// Providers use it to derive their cache key, e.g. to pick an asset variant
/// matching the device pixel ratio. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageConfiguration {
    /// Default bundle for asset images that do not name one
    pub bundle: Option<AssetBundle>,

    pub device_pixel_ratio: Option<f32>,

    pub locale: Option<String>,

    pub size: Option<Size>,

    pub platform: Option<String>,
}

impl ImageConfiguration {
    /// A configuration with no hints.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_bundle(mut self, bundle: AssetBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn with_device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.device_pixel_ratio = Some(ratio);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

impl fmt::Display for ImageConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(bundle) = &self.bundle {
            parts.push(format!("bundle: {}", bundle.root().display()));
        }
        if let Some(ratio) = self.device_pixel_ratio {
            parts.push(format!("devicePixelRatio: {:.1}", ratio));
        }
        if let Some(locale) = &self.locale {
            parts.push(format!("locale: {}", locale));
        }
        if let Some(size) = &self.size {
            parts.push(format!("size: {}", size));
        }
        if let Some(platform) = &self.platform {
            parts.push(format!("platform: {}", platform));
        }
        write!(f, "ImageConfiguration({})", parts.join(", "))
    }
}
