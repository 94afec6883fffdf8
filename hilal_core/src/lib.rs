// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marker-anchored AR content lifecycle and software alpha-video compositing.
//!
//! `hilal_core` holds the platform-independent half of a browser AR session:
//! printed image markers play an alpha video each, and every marker also
//! carries a panel with the day's hadith and the Hijri and Gregorian dates.
//! Everything that touches the browser sits behind a trait so the whole
//! lifecycle runs and is tested natively.
//!
//! # Architecture
//!
//! ```text
//!   tracking events (found / lost)
//!       │
//!       ▼
//!   Orchestrator ──► VisibilityTracker ──► MarkerSignal + AggregateChange
//!       │                                        │
//!       │         ┌──────────────────────────────┘
//!       │         ▼
//!       │   ExtensionFactory ──► SceneGraph::attach_panel / set_visible
//!       │         ▲
//!       │         └── Rc<ContentPayload> ◄── ContentCache (fetched once)
//!       │
//!       └─ render tick ──► FrameCompositor::tick ──► CompositorBackend
//! ```
//!
//! **[`visibility`]**: Found/lost state per marker, with create-once and
//! aggregate "any marker visible" transitions.
//!
//! **[`extension`]**: Builds each marker's panel once through the
//! [`SceneGraph`](extension::SceneGraph) seam and toggles it afterwards.
//!
//! **[`panel`]**: Typed panel layout and the [`PanelSpec`](panel::PanelSpec)
//! built from a payload.
//!
//! **[`content`]**: Hadith selection, Hijri/Gregorian formatting and the
//! memoizing [`ContentCache`](content::ContentCache).
//!
//! **[`compositor`]**: Per-marker video-to-texture pipeline for platforms
//! without native alpha-video textures.
//!
//! **[`orchestrator`]**: Routes tracking events and render ticks to all of
//! the above.
//!
//! **[`device`]**, **[`marker`]**, **[`config`]**, **[`time`]**,
//! **[`error`]**: Strategy detection, marker configuration, session
//! settings, the tick clock and error types.

pub mod compositor;
pub mod config;
pub mod content;
pub mod device;
pub mod error;
pub mod extension;
pub mod marker;
pub mod orchestrator;
pub mod panel;
pub mod time;
pub mod visibility;

pub use config::SessionConfig;
pub use orchestrator::{Orchestrator, TickReport};
