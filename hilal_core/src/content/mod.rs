// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Daily auxiliary content: one hadith plus today's Hijri and Gregorian dates.
//!
//! The content is the same for every marker and for the whole session, so it
//! is fetched once through [`ContentCache`] and shared as an
//! `Rc<ContentPayload>`. The two external sources are reached through the
//! [`HadithSource`] and [`CalendarSource`] traits; the web backend implements
//! them with `fetch`, tests implement them in memory. Each fetch races a
//! [`Timer`] so a source that never answers falls back instead of holding
//! content back for the session.

mod cache;
mod calendar;
mod hadith;

pub use cache::ContentCache;
pub use calendar::{
    HIJRI_MONTHS, HijriReading, ISLAMIC_DAYS, estimate_hijri, format_gregorian, format_hijri,
    islamic_day_name, parse_calendar_response, service_date,
};
pub use hadith::{HadithCollection, HadithEntry, HadithId, HadithRecord, HadithText, daily_index};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ContentError;
use crate::time::Duration;

/// Source of the pre-generated hadith collection.
#[async_trait(?Send)]
pub trait HadithSource {
    /// Loads the whole collection.
    async fn fetch_collection(&self) -> Result<HadithCollection, ContentError>;
}

/// Source of today's Hijri date.
#[async_trait(?Send)]
pub trait CalendarSource {
    /// Returns the Hijri reading for the Gregorian `date`.
    async fn fetch_hijri(&self, date: NaiveDate) -> Result<HijriReading, ContentError>;
}

/// Deadline source for content fetches.
#[async_trait(?Send)]
pub trait Timer {
    /// Completes once `delay` has elapsed. Dropping the future cancels the
    /// wait.
    async fn sleep(&self, delay: Duration);
}

/// The memoized content shown under every marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPayload {
    /// Formatted Hijri date line.
    pub hijri_date_text: String,
    /// Formatted Gregorian date line.
    pub gregorian_date_text: String,
    /// Today's hadith.
    pub hadith: HadithRecord,
}

impl ContentPayload {
    /// Combines both fetch results for `date`, substituting the fixed
    /// fallback for whichever part failed.
    #[must_use]
    pub fn assemble(
        date: NaiveDate,
        hadith: Result<HadithCollection, ContentError>,
        hijri: Result<HijriReading, ContentError>,
    ) -> Self {
        let hadith = match hadith {
            Ok(collection) => match collection.daily(date) {
                Some(entry) => entry.to_record(),
                None => {
                    log::warn!("{}; using fallback hadith", ContentError::EmptyCollection);
                    HadithRecord::fallback()
                }
            },
            Err(err) => {
                log::warn!("hadith fetch failed: {err}; using fallback hadith");
                HadithRecord::fallback()
            }
        };
        let hijri = hijri.unwrap_or_else(|err| {
            log::warn!("hijri calendar fetch failed: {err}; estimating");
            estimate_hijri(date)
        });
        Self {
            hijri_date_text: format_hijri(&hijri, date),
            gregorian_date_text: format_gregorian(date),
            hadith,
        }
    }

    /// The payload used when nothing could be fetched at all.
    #[must_use]
    pub fn fallback(date: NaiveDate) -> Self {
        Self {
            hijri_date_text: format_hijri(&estimate_hijri(date), date),
            gregorian_date_text: format_gregorian(date),
            hadith: HadithRecord::fallback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_failures_give_the_fallback_payload() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let assembled = ContentPayload::assemble(
            date,
            Err(ContentError::Unreachable("offline".into())),
            Err(ContentError::Status(503)),
        );
        assert_eq!(assembled, ContentPayload::fallback(date));
    }

    #[test]
    fn empty_collection_uses_fallback_hadith() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let hijri = HijriReading {
            day: "22".into(),
            month: "Rabi'ul Akhir".into(),
            year: "1448".into(),
            weekday: Some("Al Arba'a".into()),
        };
        let payload = ContentPayload::assemble(date, Ok(HadithCollection::default()), Ok(hijri));
        assert_eq!(payload.hadith, HadithRecord::fallback());
        assert_eq!(payload.hijri_date_text, "Al Arba'a, 22 Rabi'ul Akhir 1448 H");
    }
}
