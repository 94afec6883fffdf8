// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker identity and the marker-to-video configuration.
//!
//! [`TargetIndex`] is the tracking framework's index for one printed image
//! marker. [`MarkerConfig`] is the immutable, ordered set of markers declared
//! for a session, built once from the backend's marker-to-video mapping
//! before the scene is constructed.

use core::fmt;
use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ConfigError;

/// Index of a trackable image marker, assigned by the tracking configuration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct TargetIndex(pub u32);

impl fmt::Debug for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetIndex({})", self.0)
    }
}

impl fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One trackable marker and the video bound to it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MarkerTarget {
    /// Tracking index of the marker.
    #[serde(rename = "target_id")]
    pub target_index: TargetIndex,
    /// Key of the bound video in the asset pool (also its DOM id).
    #[serde(rename = "name")]
    pub video_id: String,
    /// WebM (VP9 with alpha) source, used on the native alpha-video path.
    #[serde(rename = "video_url")]
    pub video_url_primary: String,
    /// HEVC-with-alpha source, used on the software compositing path.
    #[serde(rename = "video_url_mov", default)]
    pub video_url_alternate: Option<String>,
}

/// The ordered, immutable marker set for a session.
#[derive(Clone, Debug, Default)]
pub struct MarkerConfig {
    targets: Vec<MarkerTarget>,
    by_index: BTreeMap<TargetIndex, usize>,
}

impl MarkerConfig {
    /// Builds a configuration, preserving the order of `targets`.
    ///
    /// Rejects duplicate target indices and empty video ids.
    pub fn new(targets: Vec<MarkerTarget>) -> Result<Self, ConfigError> {
        let mut by_index = BTreeMap::new();
        for (slot, target) in targets.iter().enumerate() {
            if target.video_id.is_empty() {
                return Err(ConfigError::EmptyVideoId(target.target_index));
            }
            if by_index.insert(target.target_index, slot).is_some() {
                return Err(ConfigError::DuplicateTarget(target.target_index));
            }
        }
        Ok(Self { targets, by_index })
    }

    /// Parses the backend's JSON rows (`[{target_id, name, video_url, video_url_mov}]`).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let targets: Vec<MarkerTarget> =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(format!("{e}")))?;
        Self::new(targets)
    }

    /// Returns `true` if `index` is a declared marker.
    #[must_use]
    pub fn contains(&self, index: TargetIndex) -> bool {
        self.by_index.contains_key(&index)
    }

    /// Returns the marker declared with `index`.
    #[must_use]
    pub fn get(&self, index: TargetIndex) -> Option<&MarkerTarget> {
        self.by_index.get(&index).map(|&slot| &self.targets[slot])
    }

    /// Iterates markers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerTarget> {
        self.targets.iter()
    }

    /// Number of declared markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if no marker is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn target(index: u32, video_id: &str) -> MarkerTarget {
    MarkerTarget {
        target_index: TargetIndex(index),
        video_id: video_id.into(),
        video_url_primary: format!("https://cdn.example/{video_id}.webm"),
        video_url_alternate: Some(format!("https://cdn.example/{video_id}.mov")),
    }
}
