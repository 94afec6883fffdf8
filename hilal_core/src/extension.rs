// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-marker auxiliary content, built once and toggled afterwards.
//!
//! [`ExtensionFactory`] owns the handle of every panel it has built, keyed by
//! [`TargetIndex`], and is the only writer of their visibility. Building goes
//! through the [`SceneGraph`] seam so the same lifecycle drives A-Frame
//! entities in the browser and recording fakes in tests.

use std::collections::{BTreeMap, BTreeSet};

use crate::content::ContentPayload;
use crate::error::SceneError;
use crate::marker::TargetIndex;
use crate::panel::{PanelLayout, PanelSpec};

/// Host scene operations needed to place auxiliary content.
pub trait SceneGraph {
    /// Handle to a built panel.
    type Handle;

    /// Builds `panel` under the tracked anchor of `target` and returns its
    /// handle. The new panel starts visible.
    ///
    /// Returns [`SceneError::AnchorMissing`] if the marker's anchor is not
    /// attached to the scene yet.
    fn attach_panel(
        &mut self,
        target: TargetIndex,
        panel: &PanelSpec,
    ) -> Result<Self::Handle, SceneError>;

    /// Shows or hides a built panel.
    fn set_visible(&mut self, handle: &Self::Handle, visible: bool);

    /// Shows or hides content shared by all markers.
    ///
    /// The default does nothing, for hosts without a shared overlay.
    fn set_overlay_visible(&mut self, visible: bool) {
        let _ = visible;
    }
}

/// Result of [`ExtensionFactory::ensure_content_for`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The panel was built now.
    Created,
    /// The panel already existed and is now shown.
    Shown,
    /// The panel could not be built yet; it will be retried.
    Deferred,
}

#[derive(Debug)]
struct Extension<H> {
    handle: H,
    shown: bool,
}

/// Builds and owns per-marker panels.
#[derive(Debug)]
pub struct ExtensionFactory<H> {
    layout: PanelLayout,
    built: BTreeMap<TargetIndex, Extension<H>>,
    deferred: BTreeSet<TargetIndex>,
}

impl<H> ExtensionFactory<H> {
    /// Creates a factory that lays panels out with `layout`.
    #[must_use]
    pub fn new(layout: PanelLayout) -> Self {
        Self {
            layout,
            built: BTreeMap::new(),
            deferred: BTreeSet::new(),
        }
    }

    /// Makes sure `target` has a visible panel built from `payload`.
    ///
    /// Builds the panel on the first successful call; every later call only
    /// flips the existing panel to shown.
    pub fn ensure_content_for<S>(
        &mut self,
        scene: &mut S,
        target: TargetIndex,
        payload: &ContentPayload,
    ) -> EnsureOutcome
    where
        S: SceneGraph<Handle = H>,
    {
        if let Some(ext) = self.built.get_mut(&target) {
            if !ext.shown {
                scene.set_visible(&ext.handle, true);
                ext.shown = true;
            }
            return EnsureOutcome::Shown;
        }

        let spec = PanelSpec::build(&self.layout, payload);
        match scene.attach_panel(target, &spec) {
            Ok(handle) => {
                log::info!("built content panel for marker {target}");
                self.deferred.remove(&target);
                self.built.insert(
                    target,
                    Extension {
                        handle,
                        shown: true,
                    },
                );
                EnsureOutcome::Created
            }
            Err(err) => {
                // Retries run every frame; only the first failure is loud.
                match (&err, self.deferred.insert(target)) {
                    (_, false) => log::debug!("{err}; still deferred"),
                    (SceneError::AnchorMissing(_), true) => {
                        log::warn!("{err}; deferring content panel");
                    }
                    (SceneError::Rejected { .. }, true) => {
                        log::error!("{err}; deferring content panel");
                    }
                }
                EnsureOutcome::Deferred
            }
        }
    }

    /// Shows the panel of `target`. Returns `false` if none is built.
    pub fn show<S>(&mut self, scene: &mut S, target: TargetIndex) -> bool
    where
        S: SceneGraph<Handle = H>,
    {
        self.set_shown(scene, target, true)
    }

    /// Hides the panel of `target`. Returns `false` if none is built.
    pub fn hide<S>(&mut self, scene: &mut S, target: TargetIndex) -> bool
    where
        S: SceneGraph<Handle = H>,
    {
        // A deferred build for a marker that left view waits for its next
        // found event.
        self.set_shown(scene, target, false)
    }

    fn set_shown<S>(&mut self, scene: &mut S, target: TargetIndex, shown: bool) -> bool
    where
        S: SceneGraph<Handle = H>,
    {
        let Some(ext) = self.built.get_mut(&target) else {
            return false;
        };
        if ext.shown != shown {
            scene.set_visible(&ext.handle, shown);
            ext.shown = shown;
        }
        true
    }

    /// Retries every deferred build whose marker `is_visible` reports in
    /// view. Returns how many panels were built.
    pub fn retry_deferred<S>(
        &mut self,
        scene: &mut S,
        payload: &ContentPayload,
        is_visible: impl Fn(TargetIndex) -> bool,
    ) -> usize
    where
        S: SceneGraph<Handle = H>,
    {
        let due: Vec<TargetIndex> = self
            .deferred
            .iter()
            .copied()
            .filter(|&t| is_visible(t))
            .collect();
        due.into_iter()
            .filter(|&t| self.ensure_content_for(scene, t, payload) == EnsureOutcome::Created)
            .count()
    }

    /// Returns `true` if a panel has been built for `target`.
    #[must_use]
    pub fn is_built(&self, target: TargetIndex) -> bool {
        self.built.contains_key(&target)
    }

    /// Number of panels built for `target` over the session: 0 or 1.
    #[must_use]
    pub fn created_count(&self, target: TargetIndex) -> usize {
        usize::from(self.is_built(target))
    }

    /// Returns `true` if `target` has a built panel that is shown.
    #[must_use]
    pub fn is_shown(&self, target: TargetIndex) -> bool {
        self.built.get(&target).is_some_and(|ext| ext.shown)
    }

    /// Returns `true` if a build for `target` is waiting to be retried.
    #[must_use]
    pub fn is_deferred(&self, target: TargetIndex) -> bool {
        self.deferred.contains(&target)
    }

    /// Returns the handle of the panel built for `target`.
    #[must_use]
    pub fn handle(&self, target: TargetIndex) -> Option<&H> {
        self.built.get(&target).map(|ext| &ext.handle)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;

    /// In-memory scene recording every call.
    #[derive(Debug, Default)]
    pub(crate) struct FakeScene {
        pub(crate) anchored: BTreeSet<TargetIndex>,
        pub(crate) attached: BTreeMap<TargetIndex, u32>,
        pub(crate) visible: BTreeMap<u32, bool>,
        pub(crate) visibility_calls: u32,
        pub(crate) overlay: Option<bool>,
        next: u32,
    }

    impl FakeScene {
        pub(crate) fn with_anchors(indices: &[u32]) -> Self {
            Self {
                anchored: indices.iter().map(|&i| TargetIndex(i)).collect(),
                ..Self::default()
            }
        }

        pub(crate) fn created(&self, target: u32) -> u32 {
            self.attached.get(&TargetIndex(target)).copied().unwrap_or(0)
        }
    }

    impl SceneGraph for FakeScene {
        type Handle = u32;

        fn attach_panel(
            &mut self,
            target: TargetIndex,
            panel: &PanelSpec,
        ) -> Result<u32, SceneError> {
            assert!(!panel.texts.is_empty(), "panel has text");
            if !self.anchored.contains(&target) {
                return Err(SceneError::AnchorMissing(target));
            }
            *self.attached.entry(target).or_default() += 1;
            self.next += 1;
            self.visible.insert(self.next, true);
            Ok(self.next)
        }

        fn set_visible(&mut self, handle: &u32, visible: bool) {
            self.visibility_calls += 1;
            self.visible.insert(*handle, visible);
        }

        fn set_overlay_visible(&mut self, visible: bool) {
            self.overlay = Some(visible);
        }
    }

    pub(crate) fn payload() -> ContentPayload {
        ContentPayload::fallback(NaiveDate::from_ymd_opt(2026, 10, 14).unwrap())
    }

    #[test]
    fn builds_once_then_toggles() {
        let mut scene = FakeScene::with_anchors(&[0]);
        let mut factory = ExtensionFactory::new(PanelLayout::default());
        let t = TargetIndex(0);
        let p = payload();

        assert_eq!(factory.ensure_content_for(&mut scene, t, &p), EnsureOutcome::Created);
        assert_eq!(factory.ensure_content_for(&mut scene, t, &p), EnsureOutcome::Shown);
        assert!(factory.hide(&mut scene, t));
        assert!(!factory.is_shown(t));
        assert!(factory.show(&mut scene, t));
        assert_eq!(factory.ensure_content_for(&mut scene, t, &p), EnsureOutcome::Shown);

        assert_eq!(scene.created(0), 1, "never rebuilt");
        assert_eq!(scene.visible.get(&1), Some(&true));
        // Only the hide and the show touched the scene.
        assert_eq!(scene.visibility_calls, 2);
    }

    #[test]
    fn toggling_without_a_panel_is_a_noop() {
        let mut scene = FakeScene::with_anchors(&[0]);
        let mut factory: ExtensionFactory<u32> = ExtensionFactory::new(PanelLayout::default());
        assert!(!factory.hide(&mut scene, TargetIndex(0)));
        assert!(!factory.show(&mut scene, TargetIndex(0)));
        assert_eq!(scene.visibility_calls, 0);
    }

    #[test]
    fn missing_anchor_defers_then_retries() {
        let mut scene = FakeScene::with_anchors(&[]);
        let mut factory = ExtensionFactory::new(PanelLayout::default());
        let t = TargetIndex(2);
        let p = payload();

        assert_eq!(factory.ensure_content_for(&mut scene, t, &p), EnsureOutcome::Deferred);
        assert!(factory.is_deferred(t));
        assert_eq!(factory.retry_deferred(&mut scene, &p, |_| true), 0);

        scene.anchored.insert(t);
        assert_eq!(factory.retry_deferred(&mut scene, &p, |_| false), 0, "not in view");
        assert_eq!(factory.retry_deferred(&mut scene, &p, |_| true), 1);
        assert!(factory.is_built(t));
        assert!(!factory.is_deferred(t));
        assert_eq!(factory.handle(t), Some(&1));
    }
}
