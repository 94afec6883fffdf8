// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Found/lost tracking for image markers.
//!
//! [`VisibilityTracker`] keeps two sets: the markers currently in view, and
//! every marker that has ever been in view this session. The first set drives
//! show/hide; the second makes creation happen exactly once per marker no
//! matter how often a marker flickers in and out of view.
//!
//! ```text
//!            found (first)            lost
//!   Unseen ───────────────► Visible ───────► Hidden
//!    signal: Create            ▲               │
//!                              └───────────────┘
//!                               found: signal Show
//! ```
//!
//! Each update also reports how the aggregate "any marker visible" flag
//! moved, for content shared by all markers.

use std::collections::BTreeSet;

use crate::marker::{MarkerConfig, TargetIndex};

/// What dependent per-marker content should do after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerSignal {
    /// First sighting: build the marker's content.
    Create,
    /// Seen before and back in view: show existing content.
    Show,
    /// Left the view: hide content.
    Hide,
    /// Duplicate event for a marker already in that state.
    None,
    /// The index is not in the marker configuration.
    Ignored,
}

/// Movement of the aggregate "any marker visible" flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateChange {
    /// The visible set went from empty to non-empty.
    BecameVisible,
    /// The visible set went from non-empty to empty.
    BecameHidden,
    /// No change.
    Unchanged,
}

/// Result of feeding one tracking event to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityUpdate {
    /// Marker the event was for.
    pub target: TargetIndex,
    /// Per-marker signal.
    pub signal: MarkerSignal,
    /// Aggregate flag movement.
    pub aggregate: AggregateChange,
}

/// Session-scoped visibility state for all declared markers.
#[derive(Clone, Debug)]
pub struct VisibilityTracker {
    known: BTreeSet<TargetIndex>,
    visible: BTreeSet<TargetIndex>,
    seen: BTreeSet<TargetIndex>,
}

impl VisibilityTracker {
    /// Creates a tracker for the markers declared in `config`.
    #[must_use]
    pub fn new(config: &MarkerConfig) -> Self {
        Self {
            known: config.iter().map(|t| t.target_index).collect(),
            visible: BTreeSet::new(),
            seen: BTreeSet::new(),
        }
    }

    /// Records that `target` entered the tracked view.
    pub fn on_target_found(&mut self, target: TargetIndex) -> VisibilityUpdate {
        if !self.known.contains(&target) {
            log::warn!("found event for undeclared marker {target}; ignoring");
            return self.unchanged(target, MarkerSignal::Ignored);
        }
        let was_any = self.any_visible();
        if !self.visible.insert(target) {
            return self.unchanged(target, MarkerSignal::None);
        }
        let signal = if self.seen.insert(target) {
            MarkerSignal::Create
        } else {
            MarkerSignal::Show
        };
        log::debug!("marker {target} found ({signal:?})");
        VisibilityUpdate {
            target,
            signal,
            aggregate: if was_any {
                AggregateChange::Unchanged
            } else {
                AggregateChange::BecameVisible
            },
        }
    }

    /// Records that `target` left the tracked view.
    pub fn on_target_lost(&mut self, target: TargetIndex) -> VisibilityUpdate {
        if !self.known.contains(&target) {
            log::warn!("lost event for undeclared marker {target}; ignoring");
            return self.unchanged(target, MarkerSignal::Ignored);
        }
        if !self.visible.remove(&target) {
            return self.unchanged(target, MarkerSignal::None);
        }
        log::debug!("marker {target} lost");
        VisibilityUpdate {
            target,
            signal: MarkerSignal::Hide,
            aggregate: if self.visible.is_empty() {
                AggregateChange::BecameHidden
            } else {
                AggregateChange::Unchanged
            },
        }
    }

    /// Returns `true` if `target` is currently in view.
    #[must_use]
    pub fn is_visible(&self, target: TargetIndex) -> bool {
        self.visible.contains(&target)
    }

    /// Returns `true` if any marker is currently in view.
    #[must_use]
    pub fn any_visible(&self) -> bool {
        !self.visible.is_empty()
    }

    /// Number of markers currently in view.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Returns `true` if `target` has been found at least once.
    #[must_use]
    pub fn has_been_seen(&self, target: TargetIndex) -> bool {
        self.seen.contains(&target)
    }

    /// Iterates markers currently in view, in index order.
    pub fn visible(&self) -> impl Iterator<Item = TargetIndex> + '_ {
        self.visible.iter().copied()
    }

    fn unchanged(&self, target: TargetIndex, signal: MarkerSignal) -> VisibilityUpdate {
        VisibilityUpdate {
            target,
            signal,
            aggregate: AggregateChange::Unchanged,
        }
    }
}
