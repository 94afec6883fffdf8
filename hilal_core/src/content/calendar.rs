// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hijri and Gregorian calendar readings.
//!
//! The Hijri date normally comes from a calendar service (`gToH`). When that
//! fails, [`estimate_hijri`] derives an approximate date from a known epoch,
//! which is good enough for a display line and never blocks the panel.

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Deserializer};

use crate::error::ContentError;

/// Hijri month names in order, Muharram first.
pub const HIJRI_MONTHS: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi'ul Awwal",
    "Rabi'ul Akhir",
    "Jumadal Ula",
    "Jumadal Akhira",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhul Qa'dah",
    "Dhul Hijjah",
];

/// Islamic day names, Sunday (Ahad) first.
pub const ISLAMIC_DAYS: [&str; 7] = [
    "Ahad",
    "Ithnayn",
    "Thulaathaa",
    "Arba'aa",
    "Khamees",
    "Jumu'ah",
    "Sabt",
];

/// A Hijri date ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HijriReading {
    /// Day of month.
    pub day: String,
    /// English month name.
    pub month: String,
    /// Year (AH).
    pub year: String,
    /// English weekday name, when the source provides one.
    pub weekday: Option<String>,
}

#[derive(Deserialize)]
struct CalendarResponse {
    #[serde(default = "ok_code")]
    code: u16,
    data: Option<CalendarData>,
}

fn ok_code() -> u16 {
    200
}

#[derive(Deserialize)]
struct CalendarData {
    hijri: HijriWire,
}

#[derive(Deserialize)]
struct HijriWire {
    #[serde(deserialize_with = "string_or_number")]
    day: String,
    month: NameWire,
    #[serde(deserialize_with = "string_or_number")]
    year: String,
    weekday: Option<NameWire>,
}

#[derive(Deserialize)]
struct NameWire {
    en: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }
    Ok(match Raw::deserialize(de)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Decodes a `gToH` response body (`{code, data: {hijri: {...}}}`).
pub fn parse_calendar_response(json: &str) -> Result<HijriReading, ContentError> {
    let response: CalendarResponse = serde_json::from_str(json)?;
    if response.code != 200 {
        return Err(ContentError::Status(response.code));
    }
    let hijri = response
        .data
        .ok_or_else(|| ContentError::Malformed("missing `data`".into()))?
        .hijri;
    Ok(HijriReading {
        day: hijri.day,
        month: hijri.month.en,
        year: hijri.year,
        weekday: hijri.weekday.map(|w| w.en),
    })
}

/// The `DD-MM-YYYY` form the calendar service expects as `?date=`.
#[must_use]
pub fn service_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Islamic day name for `date`'s weekday.
#[must_use]
pub fn islamic_day_name(date: NaiveDate) -> &'static str {
    ISLAMIC_DAYS[date.weekday().num_days_from_sunday() as usize]
}

/// Approximates the Hijri date for `date`.
///
/// Counts whole days from 1 Muharram 1445 (19 July 2023) using 354-day
/// years and 29.5-day months. Off by a day or two near month boundaries,
/// which is acceptable for a fallback line.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "day counts within a year are small and non-negative after rem_euclid"
)]
pub fn estimate_hijri(date: NaiveDate) -> HijriReading {
    const YEAR_DAYS: i64 = 354;
    let epoch = NaiveDate::from_ymd_opt(2023, 7, 19).unwrap_or(NaiveDate::MIN);
    let days = (date - epoch).num_days();
    let into_year = days.rem_euclid(YEAR_DAYS) as f64;
    let years = days.div_euclid(YEAR_DAYS);

    let month = ((into_year / 29.5).floor() as usize).min(11);
    let day = (into_year % 29.5).floor() as u32 + 1;

    HijriReading {
        day: day.to_string(),
        month: HIJRI_MONTHS[month].into(),
        year: (1445 + years).to_string(),
        weekday: Some(islamic_day_name(date).into()),
    }
}

/// `Khamees, 14 Rabi'ul Akhir 1448 H`.
///
/// Uses the reading's own weekday when present, else the Islamic day name of
/// `date`.
#[must_use]
pub fn format_hijri(reading: &HijriReading, date: NaiveDate) -> String {
    let weekday = reading
        .weekday
        .as_deref()
        .unwrap_or_else(|| islamic_day_name(date));
    format!(
        "{weekday}, {} {} {} H",
        reading.day, reading.month, reading.year
    )
}

/// `Wednesday, October 14, 2026`.
#[must_use]
pub fn format_gregorian(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn epoch_is_first_of_muharram() {
        let reading = estimate_hijri(ymd(2023, 7, 19));
        assert_eq!(reading.day, "1");
        assert_eq!(reading.month, "Muharram");
        assert_eq!(reading.year, "1445");
    }

    #[test]
    fn estimate_rolls_over_months_and_years() {
        assert_eq!(estimate_hijri(ymd(2023, 8, 18)).month, "Safar");
        let next_year = estimate_hijri(ymd(2023, 7, 19) + chrono::Days::new(354));
        assert_eq!(next_year.year, "1446");
        assert_eq!(next_year.day, "1");
    }

    #[test]
    fn estimate_before_epoch_stays_in_range() {
        let reading = estimate_hijri(ymd(2023, 7, 18));
        assert_eq!(reading.year, "1444");
        assert_eq!(reading.month, "Dhul Hijjah");
    }

    #[test]
    fn parses_service_response() {
        let json = r#"{"code":200,"status":"OK","data":{"hijri":{
            "date":"22-04-1448","day":"22","weekday":{"en":"Al Arba'a"},
            "month":{"number":4,"en":"Rabīʿ al-thānī"},"year":"1448"}}}"#;
        let reading = parse_calendar_response(json).unwrap();
        assert_eq!(reading.day, "22");
        assert_eq!(reading.year, "1448");
        assert_eq!(reading.weekday.as_deref(), Some("Al Arba'a"));
    }

    #[test]
    fn numeric_fields_are_accepted() {
        let json = r#"{"data":{"hijri":{"day":3,"month":{"en":"Rajab"},"year":1447}}}"#;
        let reading = parse_calendar_response(json).unwrap();
        assert_eq!(reading.day, "3");
        assert_eq!(reading.weekday, None);
    }

    #[test]
    fn error_codes_are_reported() {
        let json = r#"{"code":400,"data":null}"#;
        assert_eq!(parse_calendar_response(json), Err(ContentError::Status(400)));
    }

    #[test]
    fn formatting() {
        let date = ymd(2026, 10, 14);
        assert_eq!(format_gregorian(date), "Wednesday, October 14, 2026");
        assert_eq!(service_date(date), "14-10-2026");
        let reading = HijriReading {
            day: "22".into(),
            month: "Rabi'ul Akhir".into(),
            year: "1448".into(),
            weekday: None,
        };
        assert_eq!(format_hijri(&reading, date), "Arba'aa, 22 Rabi'ul Akhir 1448 H");
    }
}
