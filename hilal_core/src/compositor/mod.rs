// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software alpha-video compositing.
//!
//! Some platforms cannot sample an alpha-carrying video directly as a texture.
//! There, each marker gets a [`FrameCompositor`] that copies the current
//! video frame into a fixed-size RGBA surface every render tick and flags the
//! texture wrapping that surface for re-upload.
//!
//! ```text
//!   Uninitialized ──attach──▶ Ready ──tick──▶ Composited / Skipped / Failed
//!        │   ▲                  │
//!        │   └─ mesh retry      └──release──▶ Released
//!        └──────────release──────────────────────▲
//! ```
//!
//! Lost and re-found markers never release a compositor; only teardown does.

mod backend;
mod config;

pub use backend::{CompositorBackend, Playback};
pub use config::{
    ALPHA_TEST, BlendConfig, BlendFactor, COLOR_FILTER, ColorPath, CompositorConfig,
    CompositorSettings, MaterialConfig, SURFACE_SIZE, SurfaceCapabilities, SurfaceRequest,
    TextureConfig,
};

use core::fmt;

use kurbo::Rect;

use crate::device::VideoAsset;
use crate::error::CompositeError;
use crate::marker::TargetIndex;
use crate::time::HostTime;

/// Externally visible lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositorState {
    /// Resources not (fully) acquired.
    Uninitialized,
    /// Compositing on every tick.
    Ready,
    /// Torn down; never leaves this state.
    Released,
}

/// Result of [`FrameCompositor::attach`] and [`FrameCompositor::poll_retry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    /// All resources acquired and the material installed.
    Ready,
    /// Nothing to do; the compositor was already ready.
    AlreadyReady,
    /// The mesh was missing; one retry is due at the given time.
    RetryScheduled(HostTime),
    /// Acquisition failed; the compositor stays uninitialized.
    Failed(CompositeError),
    /// The compositor was released and cannot attach again.
    Released,
}

/// Why a tick did not composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The video is paused.
    Paused,
    /// The video has ended.
    Ended,
    /// The compositor is not ready.
    NotReady,
}

/// Result of one [`FrameCompositor::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The frame was drawn and the texture flagged dirty.
    Composited,
    /// Nothing was drawn; the texture keeps its previous frame.
    Skipped(SkipReason),
    /// Drawing failed; the frame was skipped.
    Failed(CompositeError),
}

/// Degraded paths taken during acquisition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fallbacks {
    /// The page had no video element; a synthetic one was created.
    pub synthetic_video: bool,
    /// The preferred surface was refused; a plain alpha context is used.
    pub plain_surface: bool,
}

struct Resources<B: CompositorBackend> {
    video: B::Video,
    surface: B::Surface,
    texture: B::Texture,
}

enum State<B: CompositorBackend> {
    Uninitialized {
        /// Resources acquired before the mesh turned out to be missing.
        staged: Option<Resources<B>>,
        retry_at: Option<HostTime>,
    },
    Ready(Resources<B>),
    Released,
}

/// Per-marker compositor driving one video into one texture.
pub struct FrameCompositor<B: CompositorBackend> {
    target: TargetIndex,
    selector: String,
    fallback_src: String,
    config: CompositorConfig,
    state: State<B>,
    fallbacks: Fallbacks,
    /// Set while draws keep failing, so only the first failure is logged.
    failing: bool,
}

impl<B: CompositorBackend> fmt::Debug for FrameCompositor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameCompositor")
            .field("target", &self.target)
            .field("selector", &self.selector)
            .field("state", &self.state())
            .field("retry_deadline", &self.retry_deadline())
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}

impl<B: CompositorBackend> FrameCompositor<B> {
    /// Creates an uninitialized compositor for the video of `asset` on
    /// `target`, negotiating its configuration from `backend` once.
    #[must_use]
    pub fn new(
        backend: &B,
        target: TargetIndex,
        asset: &VideoAsset,
        settings: CompositorSettings,
    ) -> Self {
        let config = CompositorConfig::negotiate(backend.capabilities(), settings);
        log::debug!(
            "compositor for marker {target}: {:?} surface, filter {:?}",
            config.surface.color,
            config.surface.filter
        );
        Self {
            target,
            selector: asset.selector(),
            fallback_src: asset.src.clone(),
            config,
            state: State::Uninitialized {
                staged: None,
                retry_at: None,
            },
            fallbacks: Fallbacks::default(),
            failing: false,
        }
    }

    /// The marker this compositor draws for.
    #[must_use]
    pub fn target(&self) -> TargetIndex {
        self.target
    }

    /// The negotiated configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> CompositorState {
        match self.state {
            State::Uninitialized { .. } => CompositorState::Uninitialized,
            State::Ready(_) => CompositorState::Ready,
            State::Released => CompositorState::Released,
        }
    }

    /// When the pending mesh retry is due, if one is scheduled.
    #[must_use]
    pub fn retry_deadline(&self) -> Option<HostTime> {
        match self.state {
            State::Uninitialized { retry_at, .. } => retry_at,
            _ => None,
        }
    }

    /// Degraded paths taken so far.
    #[must_use]
    pub fn fallbacks(&self) -> Fallbacks {
        self.fallbacks
    }

    /// Acquires resources and installs the material.
    ///
    /// A missing mesh keeps the acquired resources and schedules one retry
    /// `mesh_retry_delay` after `now`, serviced by [`poll_retry`](Self::poll_retry).
    pub fn attach(&mut self, backend: &mut B, now: HostTime) -> AttachOutcome {
        self.install(backend, Some(now))
    }

    /// Runs the scheduled mesh retry once its deadline has passed.
    ///
    /// Returns `None` when no retry is due. A retry that still finds no mesh
    /// gives up until the next [`attach`](Self::attach).
    pub fn poll_retry(&mut self, backend: &mut B, now: HostTime) -> Option<AttachOutcome> {
        match self.retry_deadline() {
            Some(deadline) if now >= deadline => Some(self.install(backend, None)),
            _ => None,
        }
    }

    /// Shared body of attach and retry. `schedule_from` is the time to
    /// schedule a retry from, or `None` if no further retry is allowed.
    fn install(&mut self, backend: &mut B, schedule_from: Option<HostTime>) -> AttachOutcome {
        let staged = match &mut self.state {
            State::Released => return AttachOutcome::Released,
            State::Ready(_) => return AttachOutcome::AlreadyReady,
            State::Uninitialized { staged, retry_at } => {
                *retry_at = None;
                staged.take()
            }
        };
        let resources = match staged {
            Some(resources) => resources,
            None => match self.acquire(backend) {
                Ok(resources) => resources,
                Err(err) => {
                    log::error!("compositor for marker {}: {err}", self.target);
                    return AttachOutcome::Failed(err);
                }
            },
        };

        let applied = backend.apply_material(self.target, &resources.texture, &self.config.material);
        match (applied, schedule_from) {
            (Ok(()), _) => {
                log::info!("compositor for marker {} ready", self.target);
                self.state = State::Ready(resources);
                AttachOutcome::Ready
            }
            (Err(CompositeError::MeshMissing(_)), Some(now)) => {
                let deadline = now.saturating_add(self.config.mesh_retry_delay);
                log::debug!(
                    "marker {} has no mesh yet; retrying at {deadline:?}",
                    self.target
                );
                self.state = State::Uninitialized {
                    staged: Some(resources),
                    retry_at: Some(deadline),
                };
                AttachOutcome::RetryScheduled(deadline)
            }
            (Err(err), _) => {
                log::error!("compositor for marker {}: {err}", self.target);
                self.state = State::Uninitialized {
                    staged: Some(resources),
                    retry_at: None,
                };
                AttachOutcome::Failed(err)
            }
        }
    }

    fn acquire(&mut self, backend: &mut B) -> Result<Resources<B>, CompositeError> {
        // Page videos belong to the shared asset pool; only a synthetic one
        // is ours to release.
        let (mut video, synthetic) = match backend.resolve_video(&self.selector) {
            Some(video) => (video, false),
            None => {
                log::warn!(
                    "video {} not found; creating a synthetic element",
                    self.selector
                );
                (backend.synthetic_video(&self.fallback_src)?, true)
            }
        };
        let created = self.create_surface(backend).and_then(|surface| {
            let texture = backend.create_texture(&surface, &self.config.texture)?;
            Ok((surface, texture))
        });
        match created {
            Ok((surface, texture)) => {
                self.fallbacks.synthetic_video = synthetic;
                Ok(Resources {
                    video,
                    surface,
                    texture,
                })
            }
            Err(err) => {
                if synthetic {
                    backend.release_video(&mut video);
                }
                Err(err)
            }
        }
    }

    fn create_surface(&mut self, backend: &mut B) -> Result<B::Surface, CompositeError> {
        let preferred = self.config.surface;
        match backend.create_surface(&preferred) {
            Ok(surface) => Ok(surface),
            Err(err) if !preferred.is_plain() => {
                log::warn!("{err}; falling back to a plain alpha context");
                let surface = backend.create_surface(&SurfaceRequest::plain(preferred.size))?;
                self.fallbacks.plain_surface = true;
                Ok(surface)
            }
            Err(err) => Err(err),
        }
    }

    /// Composites the current video frame.
    ///
    /// Paused or ended videos leave the texture untouched. Draw failures are
    /// reported and skipped; the next tick tries again.
    pub fn tick(&mut self, backend: &mut B) -> TickOutcome {
        let State::Ready(res) = &mut self.state else {
            return TickOutcome::Skipped(SkipReason::NotReady);
        };
        match backend.playback(&res.video) {
            Playback::Playing => {}
            Playback::Paused => return TickOutcome::Skipped(SkipReason::Paused),
            Playback::Ended => return TickOutcome::Skipped(SkipReason::Ended),
        }

        let edge = f64::from(self.config.surface.size);
        let area = Rect::new(0.0, 0.0, edge, edge);
        backend.clear(&mut res.surface, area);
        match backend.draw(&mut res.surface, &res.video, area) {
            Ok(()) => {
                backend.mark_dirty(&mut res.texture);
                self.failing = false;
                TickOutcome::Composited
            }
            Err(err) => {
                if self.failing {
                    log::debug!("marker {} frame skipped: {err}", self.target);
                } else {
                    log::error!("marker {} frame skipped: {err}", self.target);
                    self.failing = true;
                }
                TickOutcome::Failed(err)
            }
        }
    }

    /// Pauses and detaches the video and drops the surface and texture.
    ///
    /// Returns `false` if the compositor was already released.
    pub fn release(&mut self, backend: &mut B) -> bool {
        let previous = core::mem::replace(&mut self.state, State::Released);
        let resources = match previous {
            State::Released => return false,
            State::Ready(resources) => Some(resources),
            State::Uninitialized { staged, .. } => staged,
        };
        if let Some(mut resources) = resources {
            backend.release_video(&mut resources.video);
        }
        log::debug!("compositor for marker {} released", self.target);
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::device::RenderStrategy;
    use crate::marker::target;
    use crate::time::Duration;

    /// Scriptable backend counting every operation.
    #[derive(Debug)]
    pub(crate) struct FakeBackend {
        pub(crate) caps: SurfaceCapabilities,
        pub(crate) page_has_video: bool,
        pub(crate) synthetic_fails: bool,
        pub(crate) refuse_preferred_surface: bool,
        /// How many material attempts find no mesh before one succeeds.
        pub(crate) missing_mesh_attempts: u32,
        pub(crate) playback: Playback,
        pub(crate) draw_fails: bool,
        pub(crate) texture_fails: bool,
        pub(crate) surfaces: Vec<SurfaceRequest>,
        pub(crate) material_attempts: u32,
        pub(crate) clears: u32,
        pub(crate) draws: u32,
        pub(crate) dirty: u32,
        pub(crate) released: Vec<String>,
        next_texture: u32,
    }

    impl Default for FakeBackend {
        fn default() -> Self {
            Self {
                caps: SurfaceCapabilities {
                    wide_gamut: true,
                    filters: true,
                },
                page_has_video: true,
                synthetic_fails: false,
                refuse_preferred_surface: false,
                missing_mesh_attempts: 0,
                playback: Playback::Playing,
                draw_fails: false,
                texture_fails: false,
                surfaces: Vec::new(),
                material_attempts: 0,
                clears: 0,
                draws: 0,
                dirty: 0,
                released: Vec::new(),
                next_texture: 0,
            }
        }
    }

    impl CompositorBackend for FakeBackend {
        type Video = String;
        type Surface = SurfaceRequest;
        type Texture = u32;

        fn capabilities(&self) -> SurfaceCapabilities {
            self.caps
        }

        fn resolve_video(&mut self, selector: &str) -> Option<String> {
            self.page_has_video.then(|| selector.to_owned())
        }

        fn synthetic_video(&mut self, src: &str) -> Result<String, CompositeError> {
            if self.synthetic_fails {
                return Err(CompositeError::VideoUnavailable(src.to_owned()));
            }
            Ok(format!("synthetic:{src}"))
        }

        fn create_surface(
            &mut self,
            request: &SurfaceRequest,
        ) -> Result<SurfaceRequest, CompositeError> {
            if self.refuse_preferred_surface && !request.is_plain() {
                return Err(CompositeError::ContextUnavailable("display-p3".into()));
            }
            self.surfaces.push(*request);
            Ok(*request)
        }

        fn create_texture(
            &mut self,
            _surface: &SurfaceRequest,
            config: &TextureConfig,
        ) -> Result<u32, CompositeError> {
            assert!(!config.premultiply_alpha, "video alpha is straight");
            if self.texture_fails {
                return Err(CompositeError::TextureUnavailable("no webgl".into()));
            }
            self.next_texture += 1;
            Ok(self.next_texture)
        }

        fn apply_material(
            &mut self,
            target: TargetIndex,
            _texture: &u32,
            config: &MaterialConfig,
        ) -> Result<(), CompositeError> {
            assert_eq!(config.blend, BlendConfig::SOURCE_OVER);
            self.material_attempts += 1;
            if self.missing_mesh_attempts > 0 {
                self.missing_mesh_attempts -= 1;
                return Err(CompositeError::MeshMissing(target));
            }
            Ok(())
        }

        fn playback(&self, _video: &String) -> Playback {
            self.playback
        }

        fn clear(&mut self, _surface: &mut SurfaceRequest, area: Rect) {
            assert_eq!(area, Rect::new(0.0, 0.0, 1024.0, 1024.0));
            self.clears += 1;
        }

        fn draw(
            &mut self,
            _surface: &mut SurfaceRequest,
            _video: &String,
            _dest: Rect,
        ) -> Result<(), CompositeError> {
            self.draws += 1;
            if self.draw_fails {
                return Err(CompositeError::Draw("decode error".into()));
            }
            Ok(())
        }

        fn mark_dirty(&mut self, _texture: &mut u32) {
            self.dirty += 1;
        }

        fn release_video(&mut self, video: &mut String) {
            self.released.push(core::mem::take(video));
        }
    }

    fn compositor(backend: &FakeBackend) -> FrameCompositor<FakeBackend> {
        let asset = VideoAsset::for_target(&target(0, "intro"), RenderStrategy::SoftwareCompositor);
        FrameCompositor::new(backend, TargetIndex(0), &asset, CompositorSettings::default())
    }

    #[test]
    fn attach_then_composites_once_per_tick() {
        let mut backend = FakeBackend::default();
        let mut comp = compositor(&backend);
        assert_eq!(comp.tick(&mut backend), TickOutcome::Skipped(SkipReason::NotReady));

        assert_eq!(comp.attach(&mut backend, HostTime(0)), AttachOutcome::Ready);
        assert_eq!(comp.state(), CompositorState::Ready);
        assert_eq!(comp.attach(&mut backend, HostTime(1)), AttachOutcome::AlreadyReady);
        assert_eq!(backend.surfaces[0].color, Some(ColorPath::DisplayP3));

        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
        assert_eq!((backend.clears, backend.draws, backend.dirty), (1, 1, 1));
        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
        assert_eq!((backend.clears, backend.draws, backend.dirty), (2, 2, 2));
    }

    #[test]
    fn paused_and_ended_videos_leave_texture_stale() {
        let mut backend = FakeBackend::default();
        let mut comp = compositor(&backend);
        comp.attach(&mut backend, HostTime(0));

        backend.playback = Playback::Paused;
        assert_eq!(comp.tick(&mut backend), TickOutcome::Skipped(SkipReason::Paused));
        backend.playback = Playback::Ended;
        assert_eq!(comp.tick(&mut backend), TickOutcome::Skipped(SkipReason::Ended));
        assert_eq!((backend.clears, backend.draws, backend.dirty), (0, 0, 0));
    }

    #[test]
    fn refused_wide_gamut_context_falls_back_and_still_updates() {
        let mut backend = FakeBackend {
            refuse_preferred_surface: true,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        assert_eq!(comp.attach(&mut backend, HostTime(0)), AttachOutcome::Ready);
        assert!(comp.fallbacks().plain_surface);
        assert_eq!(backend.surfaces, vec![SurfaceRequest::plain(1024)]);

        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
        assert_eq!(backend.dirty, 1);
    }

    #[test]
    fn missing_video_uses_synthetic_element() {
        let mut backend = FakeBackend {
            page_has_video: false,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        assert_eq!(comp.attach(&mut backend, HostTime(0)), AttachOutcome::Ready);
        assert!(comp.fallbacks().synthetic_video);

        comp.release(&mut backend);
        assert_eq!(backend.released, vec!["synthetic:https://cdn.example/intro.mov"]);
    }

    #[test]
    fn failed_acquire_leaves_page_video_alone() {
        let mut backend = FakeBackend {
            texture_fails: true,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        assert!(matches!(
            comp.attach(&mut backend, HostTime(0)),
            AttachOutcome::Failed(CompositeError::TextureUnavailable(_))
        ));
        assert!(backend.released.is_empty(), "page video is shared");

        backend.texture_fails = false;
        assert_eq!(comp.attach(&mut backend, HostTime(10)), AttachOutcome::Ready);
        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
    }

    #[test]
    fn failed_acquire_releases_synthetic_video() {
        let mut backend = FakeBackend {
            page_has_video: false,
            texture_fails: true,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        assert!(matches!(comp.attach(&mut backend, HostTime(0)), AttachOutcome::Failed(_)));
        assert_eq!(backend.released, vec!["synthetic:https://cdn.example/intro.mov"]);
        assert!(!comp.fallbacks().synthetic_video);
    }

    #[test]
    fn unavailable_video_stays_uninitialized_until_next_attach() {
        let mut backend = FakeBackend {
            page_has_video: false,
            synthetic_fails: true,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        assert!(matches!(
            comp.attach(&mut backend, HostTime(0)),
            AttachOutcome::Failed(CompositeError::VideoUnavailable(_))
        ));
        assert_eq!(comp.state(), CompositorState::Uninitialized);

        backend.page_has_video = true;
        assert_eq!(comp.attach(&mut backend, HostTime(10)), AttachOutcome::Ready);
    }

    #[test]
    fn missing_mesh_is_retried_once() {
        let mut backend = FakeBackend {
            missing_mesh_attempts: 2,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        let delay = Duration::from_millis(250);

        let deadline = HostTime(1_000) + delay;
        assert_eq!(
            comp.attach(&mut backend, HostTime(1_000)),
            AttachOutcome::RetryScheduled(deadline)
        );
        assert_eq!(comp.retry_deadline(), Some(deadline));
        assert_eq!(comp.poll_retry(&mut backend, HostTime(1_100)), None, "not due");

        assert_eq!(
            comp.poll_retry(&mut backend, deadline),
            Some(AttachOutcome::Failed(CompositeError::MeshMissing(TargetIndex(0))))
        );
        assert_eq!(comp.retry_deadline(), None, "no second retry");
        assert_eq!(comp.poll_retry(&mut backend, HostTime(u64::MAX)), None);
        assert_eq!(backend.material_attempts, 2);
        // Resources acquired by the first attempt are reused.
        assert_eq!(backend.surfaces.len(), 1);

        assert_eq!(comp.attach(&mut backend, HostTime(5_000)), AttachOutcome::Ready);
        assert_eq!(backend.surfaces.len(), 1);
    }

    #[test]
    fn retry_succeeds_when_mesh_appears() {
        let mut backend = FakeBackend {
            missing_mesh_attempts: 1,
            ..FakeBackend::default()
        };
        let mut comp = compositor(&backend);
        let deadline = HostTime(0) + Duration::from_millis(250);
        assert_eq!(
            comp.attach(&mut backend, HostTime(0)),
            AttachOutcome::RetryScheduled(deadline)
        );
        assert_eq!(comp.poll_retry(&mut backend, deadline), Some(AttachOutcome::Ready));
        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
    }

    #[test]
    fn draw_failure_is_skipped_without_dirtying() {
        let mut backend = FakeBackend::default();
        let mut comp = compositor(&backend);
        comp.attach(&mut backend, HostTime(0));

        backend.draw_fails = true;
        assert!(matches!(comp.tick(&mut backend), TickOutcome::Failed(_)));
        assert!(matches!(comp.tick(&mut backend), TickOutcome::Failed(_)));
        assert_eq!(backend.dirty, 0);

        backend.draw_fails = false;
        assert_eq!(comp.tick(&mut backend), TickOutcome::Composited);
        assert_eq!(backend.dirty, 1);
    }

    #[test]
    fn release_is_idempotent() {
        let mut backend = FakeBackend::default();
        let mut comp = compositor(&backend);
        comp.attach(&mut backend, HostTime(0));

        assert!(comp.release(&mut backend));
        assert!(!comp.release(&mut backend));
        assert_eq!(backend.released, vec!["#intro"]);
        assert_eq!(comp.state(), CompositorState::Released);
        assert_eq!(comp.attach(&mut backend, HostTime(1)), AttachOutcome::Released);
        assert_eq!(comp.tick(&mut backend), TickOutcome::Skipped(SkipReason::NotReady));
    }
}
