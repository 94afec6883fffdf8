// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `fetch`-based content sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use hilal_core::SessionConfig;
use hilal_core::content::{
    CalendarSource, HadithCollection, HadithSource, HijriReading, parse_calendar_response,
};
use hilal_core::error::ContentError;
use wasm_bindgen::JsCast as _;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::describe;

/// GETs `url` and returns the body text of a 2xx response.
pub async fn fetch_text(url: &str) -> Result<String, ContentError> {
    let unreachable = |err: wasm_bindgen::JsValue| ContentError::Unreachable(describe(&err));
    let window =
        web_sys::window().ok_or_else(|| ContentError::Unreachable("no window".into()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(unreachable)?
        .dyn_into()
        .map_err(|_| ContentError::Malformed("fetch did not yield a Response".into()))?;
    if !response.ok() {
        return Err(ContentError::Status(response.status()));
    }
    let text = JsFuture::from(response.text().map_err(unreachable)?)
        .await
        .map_err(unreachable)?;
    text.as_string()
        .ok_or_else(|| ContentError::Malformed("response body is not text".into()))
}

/// Loads the pre-generated hadith collection from a JSON file.
#[derive(Clone, Debug)]
pub struct FetchHadithSource {
    url: String,
}

impl FetchHadithSource {
    /// Reads the collection from `config.hadith_url`.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            url: config.hadith_url.clone(),
        }
    }
}

#[async_trait(?Send)]
impl HadithSource for FetchHadithSource {
    async fn fetch_collection(&self) -> Result<HadithCollection, ContentError> {
        let body = fetch_text(&self.url).await?;
        let collection = HadithCollection::from_json(&body)?;
        log::debug!("loaded {} hadith from {}", collection.len(), self.url);
        Ok(collection)
    }
}

/// Asks the Gregorian-to-Hijri conversion service for today's date.
#[derive(Clone, Debug)]
pub struct FetchCalendarSource {
    config: SessionConfig,
}

impl FetchCalendarSource {
    /// Queries `config.calendar_url`.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait(?Send)]
impl CalendarSource for FetchCalendarSource {
    async fn fetch_hijri(&self, date: NaiveDate) -> Result<HijriReading, ContentError> {
        let body = fetch_text(&self.config.calendar_request(date)).await?;
        parse_calendar_response(&body)
    }
}
