// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-device rendering strategy.
//!
//! WebKit-based browsers cannot sample an alpha-channel video directly as a
//! transparent texture, so on those devices every marker's video goes through
//! the [`FrameCompositor`](crate::compositor::FrameCompositor) instead of the
//! renderer's transparent-video shader. The choice is made once per session
//! from [`DeviceSignals`].

use crate::marker::MarkerTarget;

/// Platform signals read from `navigator`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    /// `navigator.userAgent`.
    pub user_agent: String,
    /// `navigator.platform`.
    pub platform: String,
    /// `navigator.maxTouchPoints`.
    pub max_touch_points: u32,
}

/// How a marker's alpha video reaches the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderStrategy {
    /// The renderer's transparent-video shader samples the `<video>` directly.
    NativeAlphaVideo,
    /// Frames are drawn to an off-screen canvas and republished as a texture.
    SoftwareCompositor,
}

const APPLE_AGENTS: [&str; 4] = ["iPad", "iPhone", "iPod", "Mac"];

impl RenderStrategy {
    /// Picks the strategy for the device described by `signals`.
    ///
    /// iPadOS reports a desktop `MacIntel` platform; a touch-capable
    /// `MacIntel` is treated as an iPad.
    #[must_use]
    pub fn detect(signals: &DeviceSignals) -> Self {
        let apple_agent = APPLE_AGENTS
            .iter()
            .any(|needle| signals.user_agent.contains(needle));
        let touch_mac = signals.platform == "MacIntel" && signals.max_touch_points > 1;
        if apple_agent || touch_mac {
            Self::SoftwareCompositor
        } else {
            Self::NativeAlphaVideo
        }
    }

    /// Returns `true` for the software compositing path.
    #[must_use]
    pub const fn needs_compositor(self) -> bool {
        matches!(self, Self::SoftwareCompositor)
    }
}

/// Everything needed to create the `<video>` element for one marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoAsset {
    /// DOM id, referenced as `#id` by the marker's visual entity.
    pub id: String,
    /// Source URL for this device.
    pub src: String,
    /// MIME type hint for the source.
    pub mime: &'static str,
    /// Request the wide-gamut `display-p3` color space on the element.
    pub wide_gamut: bool,
}

impl VideoAsset {
    /// WebM with VP9 alpha.
    pub const WEBM: &'static str = "video/webm";
    /// HEVC with alpha, as exported for Safari.
    pub const HEVC: &'static str = "video/mp4;codecs=hvc1";

    /// Chooses the source for `target` under `strategy`.
    ///
    /// The compositor path prefers the alternate HEVC source and falls back to
    /// the primary one when the marker has none.
    #[must_use]
    pub fn for_target(target: &MarkerTarget, strategy: RenderStrategy) -> Self {
        match (strategy, &target.video_url_alternate) {
            (RenderStrategy::SoftwareCompositor, Some(alt)) => Self {
                id: target.video_id.clone(),
                src: alt.clone(),
                mime: Self::HEVC,
                wide_gamut: true,
            },
            _ => Self {
                id: target.video_id.clone(),
                src: target.video_url_primary.clone(),
                mime: Self::WEBM,
                wide_gamut: false,
            },
        }
    }

    /// CSS selector for the element, as used by the entity markup.
    #[must_use]
    pub fn selector(&self) -> String {
        format!("#{}", self.id)
    }
}
