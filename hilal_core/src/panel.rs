// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed description of the hadith + calendar panel attached under a marker.
//!
//! A [`PanelSpec`] is pure data: what to draw and where, relative to the
//! marker anchor, in the renderer's scene units (the marker image is one unit
//! wide). Scene adapters translate it into host entities.

use core::fmt;

use kurbo::{Size, Vec2};

use crate::content::ContentPayload;

/// Position relative to the parent entity: an in-plane offset plus depth
/// along the marker normal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Placement {
    /// Offset in the marker plane (x right, y up).
    pub offset: Vec2,
    /// Offset along the marker normal (towards the camera is positive).
    pub depth: f64,
}

impl Placement {
    /// Creates a placement from three components.
    #[must_use]
    pub const fn new(x: f64, y: f64, depth: f64) -> Self {
        Self {
            offset: Vec2::new(x, y),
            depth,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.offset.x, self.offset.y, self.depth)
    }
}

/// Horizontal text anchoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Anchor at the left edge.
    Left,
    /// Anchor at the center.
    Center,
    /// Anchor at the right edge.
    Right,
}

impl TextAlign {
    /// Lower-case keyword, as used by text components.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Style of one text line, independent of its value.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    /// Position within the panel.
    pub placement: Placement,
    /// CSS color.
    pub color: &'static str,
    /// Anchoring.
    pub align: TextAlign,
    /// Uniform scale.
    pub scale: f64,
    /// Wrapping width in scene units; `None` for the component default.
    pub width: Option<f64>,
    /// Characters per line before wrapping; `None` for the component default.
    pub wrap_count: Option<u32>,
    /// Bitmap font URL; `None` for the component default.
    pub font: Option<&'static str>,
}

/// A positioned text line.
#[derive(Clone, Debug, PartialEq)]
pub struct TextSpec {
    /// Text to show.
    pub value: String,
    /// How to show it.
    pub style: TextStyle,
}

/// A flat colored rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneSpec {
    /// Width and height in scene units.
    pub size: Size,
    /// CSS color.
    pub color: &'static str,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Position within the panel.
    pub placement: Placement,
}

/// Geometry and styling for the panel, with defaults matching the printed
/// marker cards.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelLayout {
    /// Panel origin relative to the marker anchor. Default: `0 -0.8 0`, just
    /// below the video plane.
    pub placement: Placement,
    /// Readability backdrop. Default: 1 × 0.5 white at 0.85 opacity, slightly
    /// behind the text.
    pub background: PlaneSpec,
    /// Rule between hadith and calendar. Default: 0.9 × 0.005 light grey.
    pub divider: PlaneSpec,
    /// Arabic body.
    pub arabic: TextStyle,
    /// Local-language body.
    pub local: TextStyle,
    /// English body.
    pub english: TextStyle,
    /// `Source | Narrator` line, right-aligned in blue.
    pub attribution: TextStyle,
    /// Hijri date, bottom left.
    pub hijri: TextStyle,
    /// Gregorian date, bottom right.
    pub gregorian: TextStyle,
}

const LATIN_FONT: &str = "https://cdn.aframe.io/fonts/Exo2Bold.fnt";
const BODY_COLOR: &str = "#333333";

fn body(y: f64, scale: f64) -> TextStyle {
    TextStyle {
        placement: Placement::new(0.0, y, 0.0),
        color: BODY_COLOR,
        align: TextAlign::Center,
        scale,
        width: Some(0.9),
        wrap_count: Some(30),
        font: Some(LATIN_FONT),
    }
}

fn caption(x: f64, y: f64, align: TextAlign, color: &'static str, scale: f64) -> TextStyle {
    TextStyle {
        placement: Placement::new(x, y, 0.0),
        color,
        align,
        scale,
        width: None,
        wrap_count: None,
        font: None,
    }
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            placement: Placement::new(0.0, -0.8, 0.0),
            background: PlaneSpec {
                size: Size::new(1.0, 0.5),
                color: "#FFFFFF",
                opacity: 0.85,
                placement: Placement::new(0.0, 0.0, -0.01),
            },
            divider: PlaneSpec {
                size: Size::new(0.9, 0.005),
                color: "#DDDDDD",
                opacity: 1.0,
                placement: Placement::new(0.0, -0.1, 0.0),
            },
            // MSDF Latin fonts carry no Arabic glyphs; leave the font to the host.
            arabic: TextStyle {
                font: None,
                ..body(0.18, 0.5)
            },
            local: body(0.1, 0.45),
            english: body(0.02, 0.45),
            attribution: caption(0.3, -0.05, TextAlign::Right, "#1e88e5", 0.4),
            hijri: caption(-0.4, -0.15, TextAlign::Left, BODY_COLOR, 0.3),
            gregorian: caption(0.4, -0.15, TextAlign::Right, BODY_COLOR, 0.3),
        }
    }
}

/// Everything needed to build one marker's panel.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelSpec {
    /// Panel origin relative to the marker anchor.
    pub placement: Placement,
    /// Backdrop plane.
    pub background: PlaneSpec,
    /// Divider plane.
    pub divider: PlaneSpec,
    /// Text lines, back to front.
    pub texts: Vec<TextSpec>,
}

impl PanelSpec {
    /// Lays out `payload` using `layout`.
    ///
    /// Empty hadith bodies are skipped so a partially translated record does
    /// not leave a blank gap.
    #[must_use]
    pub fn build(layout: &PanelLayout, payload: &ContentPayload) -> Self {
        let hadith = &payload.hadith;
        let lines = [
            (&hadith.arabic_text, &layout.arabic),
            (&hadith.local_text, &layout.local),
            (&hadith.english_text, &layout.english),
        ];
        let mut texts: Vec<TextSpec> = lines
            .into_iter()
            .filter(|(value, _)| !value.is_empty())
            .map(|(value, style)| TextSpec {
                value: value.clone(),
                style: style.clone(),
            })
            .collect();
        texts.push(TextSpec {
            value: hadith.attribution(),
            style: layout.attribution.clone(),
        });
        texts.push(TextSpec {
            value: format!("Hijri: {}", payload.hijri_date_text),
            style: layout.hijri.clone(),
        });
        texts.push(TextSpec {
            value: format!("Gregorian: {}", payload.gregorian_date_text),
            style: layout.gregorian.clone(),
        });
        Self {
            placement: layout.placement,
            background: layout.background.clone(),
            divider: layout.divider.clone(),
            texts,
        }
    }
}
