// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event routing between tracking, content panels and compositors.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::compositor::{
    AttachOutcome, CompositorBackend, CompositorSettings, CompositorState, FrameCompositor,
    TickOutcome,
};
use crate::content::ContentPayload;
use crate::device::{RenderStrategy, VideoAsset};
use crate::extension::{ExtensionFactory, SceneGraph};
use crate::marker::{MarkerConfig, TargetIndex};
use crate::panel::PanelLayout;
use crate::time::HostTime;
use crate::visibility::{AggregateChange, MarkerSignal, VisibilityTracker, VisibilityUpdate};

/// Counts from one [`Orchestrator::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Compositors that drew a frame.
    pub composited: usize,
    /// Compositors that skipped (paused, ended or not ready).
    pub skipped: usize,
    /// Compositors whose draw failed.
    pub failed: usize,
    /// Mesh retries serviced.
    pub retries: usize,
    /// Deferred panels built.
    pub panels_built: usize,
}

/// Owns the per-session state and routes tracking events and render ticks.
///
/// Content creation waits for [`content_ready`](Self::content_ready): markers
/// found earlier are queued and built once the payload arrives.
pub struct Orchestrator<S: SceneGraph, B: CompositorBackend> {
    markers: MarkerConfig,
    strategy: RenderStrategy,
    settings: CompositorSettings,
    tracker: VisibilityTracker,
    factory: ExtensionFactory<S::Handle>,
    compositors: BTreeMap<TargetIndex, FrameCompositor<B>>,
    payload: Option<Rc<ContentPayload>>,
    /// Found before the payload resolved.
    pending: BTreeSet<TargetIndex>,
    scene: S,
    backend: B,
    torn_down: bool,
}

impl<S: SceneGraph, B: CompositorBackend> core::fmt::Debug for Orchestrator<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("strategy", &self.strategy)
            .field("visible", &self.tracker.visible_count())
            .field("compositors", &self.compositors.len())
            .field("content_ready", &self.payload.is_some())
            .field("pending", &self.pending)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl<S: SceneGraph, B: CompositorBackend> Orchestrator<S, B> {
    /// Creates an orchestrator for `markers`. Nothing is built until markers
    /// are found.
    #[must_use]
    pub fn new(
        markers: MarkerConfig,
        strategy: RenderStrategy,
        layout: PanelLayout,
        settings: CompositorSettings,
        scene: S,
        backend: B,
    ) -> Self {
        log::info!(
            "session with {} markers, {strategy:?} rendering",
            markers.len()
        );
        Self {
            tracker: VisibilityTracker::new(&markers),
            markers,
            strategy,
            settings,
            factory: ExtensionFactory::new(layout),
            compositors: BTreeMap::new(),
            payload: None,
            pending: BTreeSet::new(),
            scene,
            backend,
            torn_down: false,
        }
    }

    /// Handles a found event from the tracking framework.
    pub fn on_target_found(&mut self, target: TargetIndex, now: HostTime) -> VisibilityUpdate {
        let update = self.tracker.on_target_found(target);
        if self.torn_down {
            return update;
        }
        if matches!(update.signal, MarkerSignal::Create | MarkerSignal::Show) {
            self.present(target);
            if self.strategy.needs_compositor() {
                self.attach_compositor(target, now);
            }
        }
        self.apply_aggregate(update.aggregate);
        update
    }

    /// Handles a lost event from the tracking framework.
    ///
    /// Only hides the panel; the compositor keeps its resources so a
    /// flickering marker does not reacquire them.
    pub fn on_target_lost(&mut self, target: TargetIndex) -> VisibilityUpdate {
        let update = self.tracker.on_target_lost(target);
        if self.torn_down {
            return update;
        }
        if update.signal == MarkerSignal::Hide {
            self.factory.hide(&mut self.scene, target);
        }
        self.apply_aggregate(update.aggregate);
        update
    }

    /// Stores the session's content and builds panels for markers found
    /// while it was loading. Markers lost in the meantime get a hidden panel.
    ///
    /// Later calls are ignored; the payload is fixed for the session.
    pub fn content_ready(&mut self, payload: Rc<ContentPayload>) {
        if self.payload.is_some() {
            log::debug!("content already delivered; ignoring");
            return;
        }
        for target in core::mem::take(&mut self.pending) {
            self.factory
                .ensure_content_for(&mut self.scene, target, &payload);
            if !self.tracker.is_visible(target) {
                self.factory.hide(&mut self.scene, target);
            }
        }
        self.payload = Some(payload);
    }

    /// Services due retries and composites every live compositor.
    pub fn tick(&mut self, now: HostTime) -> TickReport {
        let mut report = TickReport::default();
        if self.torn_down {
            return report;
        }

        for comp in self.compositors.values_mut() {
            if comp.poll_retry(&mut self.backend, now).is_some() {
                report.retries += 1;
            }
        }
        if let Some(payload) = &self.payload {
            let tracker = &self.tracker;
            report.panels_built =
                self.factory
                    .retry_deferred(&mut self.scene, payload, |t| tracker.is_visible(t));
        }

        for comp in self.compositors.values_mut() {
            match comp.tick(&mut self.backend) {
                TickOutcome::Composited => report.composited += 1,
                TickOutcome::Skipped(_) => report.skipped += 1,
                TickOutcome::Failed(_) => report.failed += 1,
            }
        }
        report
    }

    /// Releases every compositor. Later events and ticks are ignored.
    ///
    /// Returns how many compositors were released by this call.
    pub fn teardown(&mut self) -> usize {
        self.torn_down = true;
        let mut released = 0;
        for comp in self.compositors.values_mut() {
            if comp.release(&mut self.backend) {
                released += 1;
            }
        }
        if released > 0 {
            log::info!("released {released} compositors");
        }
        released
    }

    fn present(&mut self, target: TargetIndex) {
        match &self.payload {
            Some(payload) => {
                self.factory
                    .ensure_content_for(&mut self.scene, target, payload);
            }
            None => {
                log::debug!("content not ready; queueing marker {target}");
                self.pending.insert(target);
            }
        }
    }

    fn attach_compositor(&mut self, target: TargetIndex, now: HostTime) {
        let Some(marker) = self.markers.get(target) else {
            return;
        };
        let comp = self.compositors.entry(target).or_insert_with(|| {
            let asset = VideoAsset::for_target(marker, self.strategy);
            FrameCompositor::new(&self.backend, target, &asset, self.settings)
        });
        if comp.state() != CompositorState::Uninitialized || comp.retry_deadline().is_some() {
            return;
        }
        if let AttachOutcome::Failed(err) = comp.attach(&mut self.backend, now) {
            log::warn!("marker {target} shows no video this time: {err}");
        }
    }

    fn apply_aggregate(&mut self, change: AggregateChange) {
        match change {
            AggregateChange::BecameVisible => self.scene.set_overlay_visible(true),
            AggregateChange::BecameHidden => self.scene.set_overlay_visible(false),
            AggregateChange::Unchanged => {}
        }
    }

    /// The tracker's view of marker visibility.
    #[must_use]
    pub fn tracker(&self) -> &VisibilityTracker {
        &self.tracker
    }

    /// The panel factory.
    #[must_use]
    pub fn factory(&self) -> &ExtensionFactory<S::Handle> {
        &self.factory
    }

    /// The compositor of `target`, if one was attached.
    #[must_use]
    pub fn compositor(&self, target: TargetIndex) -> Option<&FrameCompositor<B>> {
        self.compositors.get(&target)
    }

    /// The session's rendering strategy.
    #[must_use]
    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// The session content, once delivered.
    #[must_use]
    pub fn payload(&self) -> Option<&Rc<ContentPayload>> {
        self.payload.as_ref()
    }

    /// The scene adapter.
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// The compositor backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the compositor backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
