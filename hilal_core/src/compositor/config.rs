// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability negotiation and the fixed texture/material parameters.

use crate::time::Duration;

/// Output surface edge length. Square and power-of-two so upload cost is
/// bounded and independent of the source video's resolution.
pub const SURFACE_SIZE: u32 = 1024;

/// Alpha below which fragments are discarded, hiding codec chroma bleed at
/// the matte edges.
pub const ALPHA_TEST: f32 = 0.01;

/// Color enhancement applied while drawing when the context supports filters.
pub const COLOR_FILTER: &str = "saturate(1.05) contrast(1.02)";

/// Optional drawing-context features, probed once per compositor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    /// A `display-p3` 2D context can be requested.
    pub wide_gamut: bool,
    /// The 2D context honors `filter`.
    pub filters: bool,
}

/// Color space requested for the drawing context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorPath {
    /// Wide-gamut `display-p3`.
    DisplayP3,
    /// Standard `srgb`.
    Srgb,
}

impl ColorPath {
    /// The canvas `colorSpace` keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DisplayP3 => "display-p3",
            Self::Srgb => "srgb",
        }
    }
}

/// Parameters for creating the off-screen drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceRequest {
    /// Edge length in pixels.
    pub size: u32,
    /// Requested color space; `None` creates a context without color options.
    pub color: Option<ColorPath>,
    /// Drawing filter to install, if any.
    pub filter: Option<&'static str>,
    /// Hint that pixels are read back often.
    pub will_read_frequently: bool,
}

impl SurfaceRequest {
    /// A plain alpha context: no color space, no filter, no hints.
    #[must_use]
    pub const fn plain(size: u32) -> Self {
        Self {
            size,
            color: None,
            filter: None,
            will_read_frequently: false,
        }
    }

    /// Returns `true` if this is already the plain request.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        *self == Self::plain(self.size)
    }
}

/// Blend factor, mirroring the renderer's constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    One,
    /// Source alpha.
    SrcAlpha,
    /// 1 − source alpha.
    OneMinusSrcAlpha,
}

/// Explicit blend equation with separate color and alpha factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlendConfig {
    /// Source color factor.
    pub src: BlendFactor,
    /// Destination color factor.
    pub dst: BlendFactor,
    /// Source alpha factor.
    pub src_alpha: BlendFactor,
    /// Destination alpha factor.
    pub dst_alpha: BlendFactor,
}

impl BlendConfig {
    /// Straight-alpha source-over, used to composite over the camera feed.
    pub const SOURCE_OVER: Self = Self {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
        src_alpha: BlendFactor::One,
        dst_alpha: BlendFactor::OneMinusSrcAlpha,
    };
}

/// Texture sampling and encoding parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureConfig {
    /// Linear min/mag filtering.
    pub linear_filter: bool,
    /// Treat texels as sRGB-encoded.
    pub srgb: bool,
    /// Upload without premultiplying alpha.
    pub premultiply_alpha: bool,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            linear_filter: true,
            srgb: true,
            premultiply_alpha: false,
        }
    }
}

/// Material applied to the marker's video plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialConfig {
    /// Render in the transparent pass.
    pub transparent: bool,
    /// Discard threshold.
    pub alpha_test: f32,
    /// Blend equation.
    pub blend: BlendConfig,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            transparent: true,
            alpha_test: ALPHA_TEST,
            blend: BlendConfig::SOURCE_OVER,
        }
    }
}

/// Per-session compositor settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorSettings {
    /// Delay before the single retry when the mesh is not there yet.
    pub mesh_retry_delay: Duration,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            mesh_retry_delay: Duration::from_millis(250),
        }
    }
}

/// Immutable configuration produced once by [`CompositorConfig::negotiate`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Preferred surface request.
    pub surface: SurfaceRequest,
    /// Texture parameters.
    pub texture: TextureConfig,
    /// Material parameters.
    pub material: MaterialConfig,
    /// Mesh retry delay.
    pub mesh_retry_delay: Duration,
}

impl CompositorConfig {
    /// Chooses the best surface the platform offers. The surface is always
    /// [`SURFACE_SIZE`] square, whatever the source video's size.
    ///
    /// Wide gamut and filters are enhancements: missing capabilities select
    /// the standard path, never an error.
    #[must_use]
    pub fn negotiate(caps: SurfaceCapabilities, settings: CompositorSettings) -> Self {
        let color = if caps.wide_gamut {
            ColorPath::DisplayP3
        } else {
            ColorPath::Srgb
        };
        Self {
            surface: SurfaceRequest {
                size: SURFACE_SIZE,
                color: Some(color),
                filter: caps.filters.then_some(COLOR_FILTER),
                will_read_frequently: true,
            },
            texture: TextureConfig::default(),
            material: MaterialConfig::default(),
            mesh_retry_delay: settings.mesh_retry_delay,
        }
    }
}
