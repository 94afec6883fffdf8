// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pre-generated hadith collection and daily selection.

use chrono::{Datelike as _, NaiveDate};
use serde::Deserialize;

use crate::error::ContentError;

/// One display-ready hadith.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HadithRecord {
    /// Arabic body.
    pub arabic_text: String,
    /// Body in the local (Indonesian) translation.
    pub local_text: String,
    /// Body in English.
    pub english_text: String,
    /// Collection and number, e.g. `Sahih Bukhari, No. 1`.
    pub source_label: String,
    /// Narrator name.
    pub narrator_label: String,
}

impl HadithRecord {
    /// The hadith shown when the collection cannot be loaded.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            arabic_text: "إِنَّمَا الأَعْمَالُ بِالنِّيَّاتِ، وَإِنَّمَا لِكُلِّ امْرِئٍ مَا نَوَى".into(),
            local_text: "Sesungguhnya setiap amalan tergantung pada niatnya. Dan sesungguhnya \
                         setiap orang akan mendapatkan sesuai dengan yang diniatkannya."
                .into(),
            english_text: "The reward of deeds depends upon the intentions and every person \
                           will get the reward according to what he has intended."
                .into(),
            source_label: "Sahih Bukhari, No. 1".into(),
            narrator_label: "Umar bin Al-Khattab".into(),
        }
    }

    /// Single attribution line, `Source: … | Narrator: …`.
    #[must_use]
    pub fn attribution(&self) -> String {
        format!(
            "Source: {} | Narrator: {}",
            self.source_label, self.narrator_label
        )
    }
}

/// Record identifier; the generator writes `"{book}-{number}"` strings, older
/// datasets used bare numbers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HadithId {
    /// Numeric id.
    Number(u64),
    /// Textual id.
    Text(String),
}

/// Multilingual body as stored in the dataset.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HadithText {
    /// Arabic.
    #[serde(default)]
    pub arab: String,
    /// Indonesian.
    #[serde(default, rename = "id")]
    pub local: String,
    /// English.
    #[serde(default)]
    pub en: String,
}

/// One entry of the locally served `daily-hadith.json` collection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HadithEntry {
    /// Record id.
    pub id: HadithId,
    /// Book name.
    #[serde(default)]
    pub book: String,
    /// Source label.
    #[serde(default)]
    pub source: String,
    /// Narrator; the generator writes `N/A` when unknown.
    #[serde(default)]
    pub narrator: String,
    /// Body text.
    pub text: HadithText,
}

impl HadithEntry {
    /// Converts the stored entry into a display record.
    #[must_use]
    pub fn to_record(&self) -> HadithRecord {
        let source_label = if self.source.is_empty() {
            self.book.clone()
        } else {
            self.source.clone()
        };
        HadithRecord {
            arabic_text: self.text.arab.clone(),
            local_text: self.text.local.clone(),
            english_text: self.text.en.clone(),
            source_label,
            narrator_label: self.narrator.clone(),
        }
    }
}

/// The ordered hadith collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HadithCollection {
    entries: Vec<HadithEntry>,
}

impl HadithCollection {
    /// Wraps already-decoded entries.
    #[must_use]
    pub fn new(entries: Vec<HadithEntry>) -> Self {
        Self { entries }
    }

    /// Decodes the JSON array written by the dataset generator.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry for `date`, or `None` for an empty collection.
    #[must_use]
    pub fn daily(&self, date: NaiveDate) -> Option<&HadithEntry> {
        daily_index(date, self.entries.len()).map(|i| &self.entries[i])
    }
}

/// Index of the hadith shown on `date` in a collection of `len` entries.
///
/// `day_of_year mod len`, with January 1st as day 1.
#[must_use]
pub fn daily_index(date: NaiveDate, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(date.ordinal() as usize % len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: u64) -> HadithEntry {
        HadithEntry {
            id: HadithId::Number(n),
            book: "Muslim".into(),
            source: format!("Sahih Muslim, No. {n}"),
            narrator: "Abu Hurairah".into(),
            text: HadithText {
                arab: "عربي".into(),
                local: format!("teks {n}"),
                en: format!("text {n}"),
            },
        }
    }

    #[test]
    fn index_is_day_of_year_mod_len() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        // 2026-10-14 is day 287.
        assert_eq!(daily_index(date, 500), Some(287));
        assert_eq!(daily_index(date, 7), Some(287 % 7));
        assert_eq!(daily_index(date, 0), None);
        let jan1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(daily_index(jan1, 10), Some(1));
    }

    #[test]
    fn same_day_same_record_next_day_next_record() {
        let collection = HadithCollection::new((0..10).map(entry).collect());
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let first = collection.daily(today).unwrap().clone();
        assert_eq!(collection.daily(today), Some(&first));
        let tomorrow = today.succ_opt().unwrap();
        assert_ne!(collection.daily(tomorrow), Some(&first));
    }

    #[test]
    fn decodes_generator_output() {
        let json = r#"[{
            "id": "bukhari-12",
            "book": "Bukhari",
            "source": "HR. Bukhari, No. 12",
            "narrator": "N/A",
            "text": {"arab": "حَدَّثَنَا", "id": "Telah menceritakan", "en": "EN Translation: Telah menceritakan"}
        }]"#;
        let collection = HadithCollection::from_json(json).unwrap();
        assert_eq!(collection.len(), 1);
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let record = collection.daily(day).unwrap().to_record();
        assert_eq!(record.local_text, "Telah menceritakan");
        assert_eq!(
            record.attribution(),
            "Source: HR. Bukhari, No. 12 | Narrator: N/A"
        );
    }

    #[test]
    fn missing_source_uses_book() {
        let mut e = entry(1);
        e.source.clear();
        assert_eq!(e.to_record().source_label, "Muslim");
    }
}
