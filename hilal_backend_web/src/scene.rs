// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A-Frame entities for the per-marker panels.
//!
//! Each [`PanelSpec`] becomes one `<a-entity>` under the marker's
//! `mindar-image-target` anchor, holding `<a-plane>` and `<a-text>` children.
//! Visibility is the entity's `visible` attribute, so toggling never touches
//! the children.

use std::collections::BTreeMap;

use hilal_core::error::SceneError;
use hilal_core::extension::SceneGraph;
use hilal_core::marker::TargetIndex;
use hilal_core::panel::{PanelSpec, PlaneSpec, TextSpec};
use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

use crate::describe;

/// Class toggled on the shared overlay while any marker is in view.
const SHOW_CLASS: &str = "show-animation";

/// [`SceneGraph`] over a live A-Frame document.
pub struct AframeScene {
    document: Document,
    anchors: BTreeMap<TargetIndex, Element>,
    overlay: Option<Element>,
}

impl core::fmt::Debug for AframeScene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AframeScene")
            .field("anchors", &self.anchors.keys().collect::<Vec<_>>())
            .field("overlay", &self.overlay.is_some())
            .finish_non_exhaustive()
    }
}

impl AframeScene {
    /// Creates a scene adapter for `document` with no anchors.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            anchors: BTreeMap::new(),
            overlay: None,
        }
    }

    /// Registers the tracked anchor entity of `target`.
    pub fn register_anchor(&mut self, target: TargetIndex, anchor: Element) {
        self.anchors.insert(target, anchor);
    }

    /// Uses `overlay` as the element shown while any marker is visible.
    pub fn set_overlay(&mut self, overlay: Element) {
        self.overlay = Some(overlay);
    }

    fn build(&self, panel: &PanelSpec) -> Result<Element, JsValue> {
        let root = self.document.create_element("a-entity")?;
        root.set_attribute("position", &panel.placement.to_string())?;
        root.set_attribute("class", "hilal-panel")?;
        let background = self.plane(&panel.background)?;
        root.append_child(&background)?;
        let divider = self.plane(&panel.divider)?;
        root.append_child(&divider)?;
        for text in &panel.texts {
            let line = self.text(text)?;
            root.append_child(&line)?;
        }
        root.set_attribute("visible", "true")?;
        Ok(root)
    }

    fn plane(&self, spec: &PlaneSpec) -> Result<Element, JsValue> {
        let el = self.document.create_element("a-plane")?;
        el.set_attribute("width", &spec.size.width.to_string())?;
        el.set_attribute("height", &spec.size.height.to_string())?;
        el.set_attribute("color", spec.color)?;
        el.set_attribute("opacity", &spec.opacity.to_string())?;
        el.set_attribute("position", &spec.placement.to_string())?;
        Ok(el)
    }

    fn text(&self, spec: &TextSpec) -> Result<Element, JsValue> {
        let style = &spec.style;
        let el = self.document.create_element("a-text")?;
        el.set_attribute("value", &spec.value)?;
        el.set_attribute("color", style.color)?;
        el.set_attribute("align", style.align.as_str())?;
        el.set_attribute("position", &style.placement.to_string())?;
        let s = style.scale;
        el.set_attribute("scale", &format!("{s} {s} {s}"))?;
        if let Some(width) = style.width {
            el.set_attribute("width", &width.to_string())?;
        }
        if let Some(wrap) = style.wrap_count {
            el.set_attribute("wrap-count", &wrap.to_string())?;
        }
        if let Some(font) = style.font {
            el.set_attribute("font", font)?;
        }
        Ok(el)
    }
}

impl SceneGraph for AframeScene {
    type Handle = Element;

    fn attach_panel(&mut self, target: TargetIndex, panel: &PanelSpec) -> Result<Element, SceneError> {
        let anchor = self
            .anchors
            .get(&target)
            .filter(|anchor| anchor.is_connected())
            .ok_or(SceneError::AnchorMissing(target))?;
        let rejected = |err: JsValue| SceneError::Rejected {
            target,
            reason: describe(&err),
        };
        let root = self.build(panel).map_err(rejected)?;
        anchor.append_child(&root).map_err(rejected)?;
        Ok(root)
    }

    fn set_visible(&mut self, handle: &Element, visible: bool) {
        let value = if visible { "true" } else { "false" };
        if let Err(err) = handle.set_attribute("visible", value) {
            log::error!("could not toggle panel: {}", describe(&err));
        }
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        let Some(overlay) = &self.overlay else {
            return;
        };
        if let Err(err) = overlay.class_list().toggle_with_force(SHOW_CLASS, visible) {
            log::error!("could not toggle overlay: {}", describe(&err));
        }
    }
}
