// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Every error in this crate is handled at the boundary where it occurs:
//! tracking callbacks and the render loop never see a propagated error. The
//! types exist so those boundaries can log precisely and so tests can assert
//! on the failure that was absorbed.

use crate::marker::TargetIndex;

/// Invalid marker configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two entries share a `targetIndex`.
    #[error("duplicate marker target index {0}")]
    DuplicateTarget(TargetIndex),
    /// An entry has an empty video id.
    #[error("marker target {0} has an empty video id")]
    EmptyVideoId(TargetIndex),
    /// The configuration payload could not be parsed.
    #[error("malformed marker configuration: {0}")]
    Malformed(String),
}

/// Failure to place or address content in the host scene.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The marker is declared but its tracked anchor is not in the scene yet.
    #[error("no anchor in scene for marker {0}")]
    AnchorMissing(TargetIndex),
    /// The scene refused the panel for another reason.
    #[error("scene rejected panel for marker {target}: {reason}")]
    Rejected {
        /// Marker the panel was built for.
        target: TargetIndex,
        /// Host-provided description.
        reason: String,
    },
}

/// Failure inside the software compositing pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    /// Neither the configured nor the synthetic video element is available.
    #[error("video source {0:?} could not be resolved")]
    VideoUnavailable(String),
    /// No 2D drawing context could be created, even without color options.
    #[error("drawing context could not be created: {0}")]
    ContextUnavailable(String),
    /// The texture wrapping the drawing surface could not be created.
    #[error("texture could not be created: {0}")]
    TextureUnavailable(String),
    /// The marker's visual entity has no mesh to receive the material.
    #[error("marker {0} has no mesh to texture")]
    MeshMissing(TargetIndex),
    /// A single frame failed to decode or draw.
    #[error("frame draw failed: {0}")]
    Draw(String),
}

/// Failure fetching or decoding daily content.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// The content source could not be reached.
    #[error("content source unreachable: {0}")]
    Unreachable(String),
    /// The source answered with a non-success status.
    #[error("content source returned status {0}")]
    Status(u16),
    /// The payload did not have the expected shape.
    #[error("malformed content: {0}")]
    Malformed(String),
    /// The hadith collection is empty.
    #[error("hadith collection is empty")]
    EmptyCollection,
    /// The source did not answer before the deadline.
    #[error("content source did not answer within {0} ms")]
    TimedOut(u64),
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(format!("{err}"))
    }
}
