// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser AR demo: printed markers play alpha videos and show the day's
//! hadith with Hijri and Gregorian dates underneath.
//!
//! The page provides an `<a-scene mindar-image=...>` with
//! `#assets-container` and `#entity-container`, plus an optional
//! `.ar-extensions-container` overlay and an optional
//! `<script id="hilal-config" type="application/json">` override.
//!
//! Build with: `wasm-pack build --target web demos/web_ar`
//! Then serve `demos/web_ar/` and open `index.html`.

#![cfg_attr(
    not(target_arch = "wasm32"),
    allow(dead_code, reason = "this crate only runs in the browser")
)]

use std::cell::RefCell;
use std::rc::Rc;

use core::pin::pin;

use futures::future::{self, join_all};
use hilal_backend_web::{
    AframeScene, CanvasBackend, FetchCalendarSource, FetchHadithSource, RafLoop, WindowTimer,
    device_signals, fetch_text, init_logging, today,
};
use hilal_core::content::{ContentCache, Timer as _};
use hilal_core::device::{RenderStrategy, VideoAsset};
use hilal_core::marker::{MarkerConfig, MarkerTarget, TargetIndex};
use hilal_core::panel::PanelLayout;
use hilal_core::time::Duration;
use hilal_core::{Orchestrator, SessionConfig};
use js_sys::{Function, Promise};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, HtmlMediaElement, HtmlVideoElement,
};

type Session = Orchestrator<AframeScene, CanvasBackend>;

/// Width and height of the video plane, in marker widths.
const VIDEO_PLANE: (&str, &str) = ("1", "1.4");

fn js_error(err: impl core::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Entry point for the web AR demo.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() -> Result<(), JsValue> {
    init_logging(log::Level::Info);
    spawn_local(async {
        if let Err(err) = run().await {
            log::error!("AR session did not start: {err:?}");
        }
    });
    Ok(())
}

async fn run() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
    let document = window.document().ok_or_else(|| js_error("no document"))?;
    let config = page_config(&document);

    let rows = fetch_text(&config.markers_url).await.map_err(js_error)?;
    let markers = MarkerConfig::from_json(&rows).map_err(js_error)?;
    let strategy = RenderStrategy::detect(&device_signals());
    let date = today().ok_or_else(|| js_error("clock gave an invalid date"))?;

    let assets = required(&document, "#assets-container")?;
    let container = required(&document, "#entity-container")?;

    let mut scene = AframeScene::new(document.clone());
    if let Some(overlay) = document.query_selector(".ar-extensions-container")? {
        scene.set_overlay(overlay);
    }
    let mut backend = CanvasBackend::new(document.clone());

    let mut videos = Vec::with_capacity(markers.len());
    for target in markers.iter() {
        let video = video_element(&document, &VideoAsset::for_target(target, strategy))?;
        assets.append_child(&video)?;
        videos.push(video);
    }
    let timeout = config.content_timeout();
    join_all(videos.iter().map(|video| metadata_settled(video, timeout))).await;

    let mut anchors = Vec::with_capacity(markers.len());
    for target in markers.iter() {
        let asset = VideoAsset::for_target(target, strategy);
        let (anchor, plane) = target_entities(&document, target, &asset, strategy)?;
        container.append_child(&anchor)?;
        scene.register_anchor(target.target_index, anchor.clone());
        backend.register_video_entity(target.target_index, plane);
        anchors.push((target.target_index, anchor));
    }

    let session: Rc<RefCell<Session>> = Rc::new(RefCell::new(Orchestrator::new(
        markers,
        strategy,
        PanelLayout::default(),
        config.compositor(),
        scene,
        backend,
    )));
    for (target, anchor) in &anchors {
        bind_tracking(&session, *target, anchor)?;
    }

    let cache = ContentCache::new(
        date,
        Rc::new(FetchHadithSource::new(&config)),
        Rc::new(FetchCalendarSource::new(&config)),
        Rc::new(WindowTimer),
        timeout,
    );
    let content_session = Rc::clone(&session);
    spawn_local(async move {
        let payload = cache.get().await;
        content_session.borrow_mut().content_ready(payload);
    });

    let tick_session = Rc::clone(&session);
    let raf = RafLoop::new(move |now| {
        let report = tick_session.borrow_mut().tick(now);
        if report.panels_built > 0 {
            log::debug!("built {} deferred panels", report.panels_built);
        }
    });
    raf.start();

    bind_play_on_gesture(&document)?;
    bind_teardown(&window, &session, raf)?;
    Ok(())
}

fn page_config(document: &Document) -> SessionConfig {
    let Some(text) = document
        .get_element_by_id("hilal-config")
        .and_then(|el| el.text_content())
    else {
        return SessionConfig::web();
    };
    SessionConfig::from_json(&text).unwrap_or_else(|err| {
        log::warn!("{err}; using default session config");
        SessionConfig::web()
    })
}

fn required(document: &Document, selector: &str) -> Result<Element, JsValue> {
    document
        .query_selector(selector)?
        .ok_or_else(|| js_error(format!("page has no {selector}")))
}

fn video_element(document: &Document, asset: &VideoAsset) -> Result<HtmlVideoElement, JsValue> {
    let video: HtmlVideoElement = document.create_element("video")?.unchecked_into();
    video.set_id(&asset.id);
    video.set_src(&asset.src);
    video.set_muted(true);
    video.set_loop(true);
    video.set_autoplay(true);
    video.set_cross_origin(Some("anonymous"));
    video.set_attribute("type", asset.mime)?;
    video.set_attribute("playsinline", "true")?;
    video.set_attribute("webkit-playsinline", "true")?;
    if asset.wide_gamut {
        video.set_attribute("colorspace", "display-p3")?;
    }
    Ok(video)
}

/// Waits until `video` has loaded its metadata or failed to, giving up after
/// `timeout`.
async fn metadata_settled(video: &HtmlVideoElement, timeout: Duration) {
    if video.ready_state() >= HtmlMediaElement::HAVE_METADATA {
        return;
    }
    let settled = Promise::new(&mut |resolve: Function, _reject: Function| {
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        for event in ["loadedmetadata", "error"] {
            if let Err(err) = video.add_event_listener_with_callback_and_add_event_listener_options(
                event, &resolve, &options,
            ) {
                log::debug!("cannot watch {event} on {}: {err:?}", video.id());
            }
        }
    });
    let settled = pin!(JsFuture::from(settled));
    let timer = WindowTimer;
    let expired = timer.sleep(timeout);
    if let future::Either::Right(_) = future::select(settled, expired).await {
        log::warn!("video {} metadata did not load in time", video.id());
    }
}

/// Creates the tracked anchor of `target` and the plane its video plays on.
fn target_entities(
    document: &Document,
    target: &MarkerTarget,
    asset: &VideoAsset,
    strategy: RenderStrategy,
) -> Result<(Element, Element), JsValue> {
    let anchor = document.create_element("a-entity")?;
    anchor.set_attribute(
        "mindar-image-target",
        &format!("targetIndex: {}", target.target_index),
    )?;

    let plane = match strategy {
        // The compositor installs its own material on this plane's mesh.
        RenderStrategy::SoftwareCompositor => document.create_element("a-plane")?,
        RenderStrategy::NativeAlphaVideo => {
            let video = document.create_element("a-video")?;
            video.set_attribute(
                "material",
                &format!("shader: transparent-video; src: {}", asset.selector()),
            )?;
            for flag in ["autoplay", "loop", "muted", "playsinline"] {
                video.set_attribute(flag, "")?;
            }
            video.set_attribute("transparent", "true")?;
            video.set_attribute("crossorigin", "anonymous")?;
            video
        }
    };
    let (width, height) = VIDEO_PLANE;
    plane.set_attribute("width", width)?;
    plane.set_attribute("height", height)?;
    plane.set_attribute("position", "0 0 0")?;
    anchor.append_child(&plane)?;
    Ok((anchor, plane))
}

fn bind_tracking(
    session: &Rc<RefCell<Session>>,
    target: TargetIndex,
    anchor: &Element,
) -> Result<(), JsValue> {
    let found_session = Rc::clone(session);
    let found_cb = Closure::wrap(Box::new(move |_event: Event| {
        let now = hilal_backend_web::now();
        found_session.borrow_mut().on_target_found(target, now);
    }) as Box<dyn FnMut(_)>);
    anchor.add_event_listener_with_callback("targetFound", found_cb.as_ref().unchecked_ref())?;
    found_cb.forget();

    let lost_session = Rc::clone(session);
    let lost_cb = Closure::wrap(Box::new(move |_event: Event| {
        lost_session.borrow_mut().on_target_lost(target);
    }) as Box<dyn FnMut(_)>);
    anchor.add_event_listener_with_callback("targetLost", lost_cb.as_ref().unchecked_ref())?;
    lost_cb.forget();
    Ok(())
}

/// Plays every video on tap; iOS refuses autoplay before a user gesture.
fn bind_play_on_gesture(document: &Document) -> Result<(), JsValue> {
    let doc = document.clone();
    let play_cb = Closure::wrap(Box::new(move |_event: Event| {
        let Ok(videos) = doc.query_selector_all("video") else {
            return;
        };
        for i in 0..videos.length() {
            let Some(video) = videos
                .item(i)
                .and_then(|node| node.dyn_into::<HtmlVideoElement>().ok())
            else {
                continue;
            };
            if let Ok(promise) = video.play() {
                spawn_local(async move {
                    if let Err(err) = JsFuture::from(promise).await {
                        log::error!("video play error: {err:?}");
                    }
                });
            }
        }
    }) as Box<dyn FnMut(_)>);
    document.add_event_listener_with_callback("click", play_cb.as_ref().unchecked_ref())?;
    play_cb.forget();
    Ok(())
}

fn bind_teardown(
    window: &web_sys::Window,
    session: &Rc<RefCell<Session>>,
    raf: RafLoop,
) -> Result<(), JsValue> {
    let teardown_session = Rc::clone(session);
    let teardown_cb = Closure::wrap(Box::new(move |_event: Event| {
        raf.stop();
        teardown_session.borrow_mut().teardown();
    }) as Box<dyn FnMut(_)>);
    window.add_event_listener_with_callback("pagehide", teardown_cb.as_ref().unchecked_ref())?;
    teardown_cb.forget();
    Ok(())
}
