// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform seam for the software compositor.

use kurbo::Rect;

use super::config::{MaterialConfig, SurfaceCapabilities, SurfaceRequest, TextureConfig};
use crate::error::CompositeError;
use crate::marker::TargetIndex;

/// Playback state of a source video at tick time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Playback {
    /// Frames are advancing.
    Playing,
    /// Paused by the page or not started yet.
    Paused,
    /// Reached the end without looping.
    Ended,
}

/// Resources and per-frame operations a platform supplies to
/// [`FrameCompositor`](super::FrameCompositor).
///
/// Handles are owned by the compositor; the backend only operates on them.
pub trait CompositorBackend {
    /// Decoded video source.
    type Video;
    /// Off-screen RGBA drawing surface.
    type Surface;
    /// Live texture sampling the surface.
    type Texture;

    /// Optional drawing features of the platform.
    fn capabilities(&self) -> SurfaceCapabilities;

    /// Looks up an existing video element by CSS selector.
    fn resolve_video(&mut self, selector: &str) -> Option<Self::Video>;

    /// Creates a muted, looping, inline video playing `src`.
    fn synthetic_video(&mut self, src: &str) -> Result<Self::Video, CompositeError>;

    /// Creates a drawing surface for `request`.
    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<Self::Surface, CompositeError>;

    /// Wraps `surface` in a texture.
    fn create_texture(
        &mut self,
        surface: &Self::Surface,
        config: &TextureConfig,
    ) -> Result<Self::Texture, CompositeError>;

    /// Installs a material sampling `texture` on the video mesh of `target`.
    ///
    /// Returns [`CompositeError::MeshMissing`] when the mesh is not built yet.
    fn apply_material(
        &mut self,
        target: TargetIndex,
        texture: &Self::Texture,
        config: &MaterialConfig,
    ) -> Result<(), CompositeError>;

    /// Current playback state of `video`.
    fn playback(&self, video: &Self::Video) -> Playback;

    /// Clears `area` of `surface` to transparent.
    fn clear(&mut self, surface: &mut Self::Surface, area: Rect);

    /// Draws the current frame of `video` into `dest` with source-over.
    fn draw(
        &mut self,
        surface: &mut Self::Surface,
        video: &Self::Video,
        dest: Rect,
    ) -> Result<(), CompositeError>;

    /// Flags `texture` for re-upload before the next render.
    fn mark_dirty(&mut self, texture: &mut Self::Texture);

    /// Pauses `video` and clears its source.
    fn release_video(&mut self, video: &mut Self::Video);
}
