// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas-2D compositor backend.
//!
//! Frames are drawn into an off-screen `<canvas>` and republished through a
//! `THREE.CanvasTexture` bound to a `MeshBasicMaterial` on the marker's video
//! plane. `THREE` is the instance bundled with A-Frame, reached as a global.

use std::collections::BTreeMap;

use hilal_core::compositor::{
    BlendFactor, CompositorBackend, MaterialConfig, Playback, SurfaceCapabilities,
    SurfaceRequest, TextureConfig,
};
use hilal_core::error::CompositeError;
use hilal_core::marker::TargetIndex;
use js_sys::{Object, Reflect};
use kurbo::Rect;
use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlVideoElement};

use crate::describe;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = THREE)]
    type CanvasTexture;

    #[wasm_bindgen(catch, constructor, js_namespace = THREE)]
    fn new(canvas: &HtmlCanvasElement) -> Result<CanvasTexture, JsValue>;

    #[wasm_bindgen(method, setter = needsUpdate)]
    fn set_needs_update(this: &CanvasTexture, value: bool);

    #[wasm_bindgen(method)]
    fn dispose(this: &CanvasTexture);
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = THREE)]
    type MeshBasicMaterial;

    #[wasm_bindgen(catch, constructor, js_namespace = THREE)]
    fn new(params: &Object) -> Result<MeshBasicMaterial, JsValue>;
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = Element)]
    type AframeEntity;

    #[wasm_bindgen(method, js_name = getObject3D)]
    fn get_object_3d(this: &AframeEntity, kind: &str) -> JsValue;
}

fn three_constant(name: &str) -> Result<JsValue, JsValue> {
    let three = Reflect::get(&js_sys::global(), &JsValue::from_str("THREE"))?;
    let value = Reflect::get(&three, &JsValue::from_str(name))?;
    if value.is_undefined() {
        return Err(JsValue::from_str(&format!("THREE.{name} is undefined")));
    }
    Ok(value)
}

fn blend_constant(factor: BlendFactor) -> Result<JsValue, JsValue> {
    three_constant(match factor {
        BlendFactor::Zero => "ZeroFactor",
        BlendFactor::One => "OneFactor",
        BlendFactor::SrcAlpha => "SrcAlphaFactor",
        BlendFactor::OneMinusSrcAlpha => "OneMinusSrcAlphaFactor",
    })
}

fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(drop)
}

/// An off-screen canvas and its 2D context.
#[derive(Debug)]
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// The canvas element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

/// A `THREE.CanvasTexture` sampling a [`CanvasSurface`].
pub struct LiveTexture {
    texture: CanvasTexture,
}

impl core::fmt::Debug for LiveTexture {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LiveTexture").finish_non_exhaustive()
    }
}

impl Drop for LiveTexture {
    fn drop(&mut self) {
        self.texture.dispose();
    }
}

/// [`CompositorBackend`] over canvas 2D and three.js.
pub struct CanvasBackend {
    document: Document,
    meshes: BTreeMap<TargetIndex, Element>,
    capabilities: SurfaceCapabilities,
}

impl core::fmt::Debug for CanvasBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasBackend")
            .field("meshes", &self.meshes.keys().collect::<Vec<_>>())
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl CanvasBackend {
    /// Creates a backend for `document`, probing drawing capabilities once.
    #[must_use]
    pub fn new(document: Document) -> Self {
        let capabilities = probe(&document);
        log::debug!("canvas capabilities: {capabilities:?}");
        Self {
            document,
            meshes: BTreeMap::new(),
            capabilities,
        }
    }

    /// Registers the entity whose mesh shows the video of `target`.
    pub fn register_video_entity(&mut self, target: TargetIndex, entity: Element) {
        self.meshes.insert(target, entity);
    }
}

fn probe(document: &Document) -> SurfaceCapabilities {
    let wide_gamut = web_sys::window()
        .and_then(|w| w.match_media("(color-gamut: p3)").ok().flatten())
        .is_some_and(|query| query.matches());
    let filters = document
        .create_element("canvas")
        .ok()
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        .and_then(|canvas| canvas.get_context("2d").ok().flatten())
        .is_some_and(|ctx| Reflect::has(&ctx, &JsValue::from_str("filter")).unwrap_or(false));
    SurfaceCapabilities {
        wide_gamut,
        filters,
    }
}

fn context_options(request: &SurfaceRequest) -> Result<Object, JsValue> {
    let options = Object::new();
    set(&options, "alpha", &JsValue::TRUE)?;
    if let Some(color) = request.color {
        set(&options, "colorSpace", &JsValue::from_str(color.as_str()))?;
    }
    if request.will_read_frequently {
        set(&options, "willReadFrequently", &JsValue::TRUE)?;
    }
    Ok(options)
}

impl CompositorBackend for CanvasBackend {
    type Video = HtmlVideoElement;
    type Surface = CanvasSurface;
    type Texture = LiveTexture;

    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities
    }

    fn resolve_video(&mut self, selector: &str) -> Option<HtmlVideoElement> {
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlVideoElement>().ok())
    }

    fn synthetic_video(&mut self, src: &str) -> Result<HtmlVideoElement, CompositeError> {
        let unavailable = |err: JsValue| {
            CompositeError::VideoUnavailable(format!("{src}: {}", describe(&err)))
        };
        let video: HtmlVideoElement = self
            .document
            .create_element("video")
            .map_err(unavailable)?
            .unchecked_into();
        video.set_src(src);
        video.set_muted(true);
        video.set_loop(true);
        video.set_autoplay(true);
        video.set_cross_origin(Some("anonymous"));
        video.set_attribute("playsinline", "").map_err(unavailable)?;
        if let Ok(promise) = video.play() {
            wasm_bindgen_futures::spawn_local(async move {
                // Refused until the first user gesture.
                if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::debug!("synthetic video autoplay refused: {}", describe(&err));
                }
            });
        }
        Ok(video)
    }

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<CanvasSurface, CompositeError> {
        let unavailable = |err: JsValue| CompositeError::ContextUnavailable(describe(&err));
        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(unavailable)?
            .unchecked_into();
        canvas.set_width(request.size);
        canvas.set_height(request.size);

        let options = context_options(request).map_err(unavailable)?;
        let context = canvas
            .get_context_with_context_options("2d", &options)
            .map_err(unavailable)?
            .ok_or_else(|| CompositeError::ContextUnavailable("2d context refused".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| CompositeError::ContextUnavailable("not a 2d context".into()))?;
        if let Some(filter) = request.filter {
            set(&context, "filter", &JsValue::from_str(filter)).map_err(unavailable)?;
        }
        Ok(CanvasSurface { canvas, context })
    }

    fn create_texture(
        &mut self,
        surface: &CanvasSurface,
        config: &TextureConfig,
    ) -> Result<LiveTexture, CompositeError> {
        let unavailable = |err: JsValue| CompositeError::TextureUnavailable(describe(&err));
        let texture = CanvasTexture::new(&surface.canvas).map_err(unavailable)?;
        let configure = || -> Result<(), JsValue> {
            if config.linear_filter {
                let linear = three_constant("LinearFilter")?;
                set(&texture, "minFilter", &linear)?;
                set(&texture, "magFilter", &linear)?;
            }
            if config.srgb {
                // three.js r152 replaced `encoding` with `colorSpace`.
                match three_constant("sRGBEncoding") {
                    Ok(encoding) => set(&texture, "encoding", &encoding)?,
                    Err(_) => set(&texture, "colorSpace", &JsValue::from_str("srgb"))?,
                }
            }
            set(&texture, "format", &three_constant("RGBAFormat")?)?;
            set(
                &texture,
                "premultiplyAlpha",
                &JsValue::from_bool(config.premultiply_alpha),
            )
        };
        configure().map_err(unavailable)?;
        Ok(LiveTexture { texture })
    }

    fn apply_material(
        &mut self,
        target: TargetIndex,
        texture: &LiveTexture,
        config: &MaterialConfig,
    ) -> Result<(), CompositeError> {
        let mesh = self
            .meshes
            .get(&target)
            .map(|el| el.unchecked_ref::<AframeEntity>().get_object_3d("mesh"))
            .filter(|mesh| mesh.is_object())
            .ok_or(CompositeError::MeshMissing(target))?;

        let build = || -> Result<MeshBasicMaterial, JsValue> {
            let params = Object::new();
            set(&params, "map", &texture.texture)?;
            set(&params, "transparent", &JsValue::from_bool(config.transparent))?;
            set(
                &params,
                "alphaTest",
                &JsValue::from_f64(f64::from(config.alpha_test)),
            )?;
            set(&params, "blending", &three_constant("CustomBlending")?)?;
            set(&params, "blendSrc", &blend_constant(config.blend.src)?)?;
            set(&params, "blendDst", &blend_constant(config.blend.dst)?)?;
            set(&params, "blendSrcAlpha", &blend_constant(config.blend.src_alpha)?)?;
            set(&params, "blendDstAlpha", &blend_constant(config.blend.dst_alpha)?)?;
            MeshBasicMaterial::new(&params)
        };
        let material = build().map_err(|err| CompositeError::TextureUnavailable(describe(&err)))?;
        set(&mesh, "material", &material)
            .map_err(|err| CompositeError::TextureUnavailable(describe(&err)))
    }

    fn playback(&self, video: &HtmlVideoElement) -> Playback {
        if video.ended() {
            Playback::Ended
        } else if video.paused() {
            Playback::Paused
        } else {
            Playback::Playing
        }
    }

    fn clear(&mut self, surface: &mut CanvasSurface, area: Rect) {
        surface
            .context
            .clear_rect(area.x0, area.y0, area.width(), area.height());
    }

    fn draw(
        &mut self,
        surface: &mut CanvasSurface,
        video: &HtmlVideoElement,
        dest: Rect,
    ) -> Result<(), CompositeError> {
        let ctx = &surface.context;
        let draw_err = |err: JsValue| CompositeError::Draw(describe(&err));
        ctx.set_global_composite_operation("source-over")
            .map_err(draw_err)?;
        ctx.draw_image_with_html_video_element_and_dw_and_dh(
            video,
            dest.x0,
            dest.y0,
            dest.width(),
            dest.height(),
        )
        .map_err(draw_err)
    }

    fn mark_dirty(&mut self, texture: &mut LiveTexture) {
        texture.texture.set_needs_update(true);
    }

    fn release_video(&mut self, video: &mut HtmlVideoElement) {
        if let Err(err) = video.pause() {
            log::debug!("pause during release failed: {}", describe(&err));
        }
        if let Err(err) = video.remove_attribute("src") {
            log::debug!("detaching video source failed: {}", describe(&err));
        }
        video.load();
    }
}
