// Copyright 2026 the Hilal Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Once-per-session memoization of [`ContentPayload`].

use core::cell::RefCell;
use core::fmt;
use core::pin::pin;
use std::rc::Rc;

use chrono::NaiveDate;
use futures::FutureExt as _;
use futures::future::{self, Either, LocalBoxFuture, Shared};

use super::{CalendarSource, ContentPayload, HadithSource, Timer};
use crate::error::ContentError;
use crate::time::Duration;

type PendingPayload = Shared<LocalBoxFuture<'static, Rc<ContentPayload>>>;

enum Slot {
    Idle,
    Pending(PendingPayload),
    Resolved(Rc<ContentPayload>),
}

/// Lazily fetches the day's content once and hands the same payload to every
/// caller.
///
/// The first [`get`](Self::get) starts the hadith and calendar fetches side
/// by side. Callers arriving while they are in flight await the same shared
/// future, so no second fetch is ever issued; callers after resolution get
/// the stored `Rc` immediately. Failed fetches, and fetches still running
/// when the deadline passes, resolve to fallback content, so resolution
/// always happens.
pub struct ContentCache {
    date: NaiveDate,
    hadith: Rc<dyn HadithSource>,
    calendar: Rc<dyn CalendarSource>,
    timer: Rc<dyn Timer>,
    timeout: Duration,
    slot: RefCell<Slot>,
}

impl fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            Slot::Idle => "idle",
            Slot::Pending(_) => "pending",
            Slot::Resolved(_) => "resolved",
        };
        f.debug_struct("ContentCache")
            .field("date", &self.date)
            .field("timeout", &self.timeout)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl ContentCache {
    /// Creates an empty cache for the session day `date`. Each fetch gets
    /// `timeout` on `timer` before its fallback is used.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        hadith: Rc<dyn HadithSource>,
        calendar: Rc<dyn CalendarSource>,
        timer: Rc<dyn Timer>,
        timeout: Duration,
    ) -> Self {
        Self {
            date,
            hadith,
            calendar,
            timer,
            timeout,
            slot: RefCell::new(Slot::Idle),
        }
    }

    /// The session day the content is selected for.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Returns the payload, fetching it on first use.
    pub async fn get(&self) -> Rc<ContentPayload> {
        let pending = {
            let mut slot = self.slot.borrow_mut();
            match &mut *slot {
                Slot::Resolved(payload) => return Rc::clone(payload),
                Slot::Pending(fut) => fut.clone(),
                idle @ Slot::Idle => {
                    let fut = self.fetch().shared();
                    *idle = Slot::Pending(fut.clone());
                    fut
                }
            }
        };
        let payload = pending.await;
        *self.slot.borrow_mut() = Slot::Resolved(Rc::clone(&payload));
        payload
    }

    /// Returns the payload if it has already resolved.
    #[must_use]
    pub fn peek(&self) -> Option<Rc<ContentPayload>> {
        match &*self.slot.borrow() {
            Slot::Resolved(payload) => Some(Rc::clone(payload)),
            _ => None,
        }
    }

    fn fetch(&self) -> LocalBoxFuture<'static, Rc<ContentPayload>> {
        let hadith = Rc::clone(&self.hadith);
        let calendar = Rc::clone(&self.calendar);
        let timer = Rc::clone(&self.timer);
        let timeout = self.timeout;
        let date = self.date;
        async move {
            log::debug!("fetching daily content for {date}");
            let (collection, hijri) = futures::join!(
                within("hadith", hadith.fetch_collection(), &*timer, timeout),
                within("calendar", calendar.fetch_hijri(date), &*timer, timeout),
            );
            let payload = ContentPayload::assemble(date, collection, hijri);
            log::info!("daily content ready: {}", payload.hadith.source_label);
            Rc::new(payload)
        }
        .boxed_local()
    }
}

/// Runs `fetch` until it finishes or `timeout` elapses on `timer`.
async fn within<T>(
    part: &str,
    fetch: impl Future<Output = Result<T, ContentError>>,
    timer: &dyn Timer,
    timeout: Duration,
) -> Result<T, ContentError> {
    let fetch = pin!(fetch);
    match future::select(fetch, timer.sleep(timeout)).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => {
            let err = ContentError::TimedOut(timeout.micros() / 1000);
            log::warn!("{part} fetch: {err}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use async_trait::async_trait;
    use futures::channel::oneshot;
    use futures::executor::{LocalPool, block_on};
    use futures::task::LocalSpawnExt as _;

    use super::*;
    use crate::content::{
        HadithCollection, HadithEntry, HadithId, HadithRecord, HadithText, HijriReading,
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    fn collection(n: u64) -> HadithCollection {
        HadithCollection::new(
            (0..n)
                .map(|i| HadithEntry {
                    id: HadithId::Number(i),
                    book: "Bukhari".into(),
                    source: format!("Sahih Bukhari, No. {i}"),
                    narrator: "Aisha".into(),
                    text: HadithText {
                        arab: String::new(),
                        local: String::new(),
                        en: format!("hadith {i}"),
                    },
                })
                .collect(),
        )
    }

    /// Hadith source that blocks until its gate opens.
    struct GatedHadith {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
        calls: Cell<u32>,
    }

    #[async_trait(?Send)]
    impl HadithSource for GatedHadith {
        async fn fetch_collection(&self) -> Result<HadithCollection, ContentError> {
            self.calls.set(self.calls.get() + 1);
            let gate = self.gate.borrow_mut().take();
            if let Some(gate) = gate {
                gate.await
                    .map_err(|_| ContentError::Unreachable("gate dropped".into()))?;
            }
            Ok(collection(10))
        }
    }

    /// Hadith source whose request never answers.
    struct HungHadith;

    #[async_trait(?Send)]
    impl HadithSource for HungHadith {
        async fn fetch_collection(&self) -> Result<HadithCollection, ContentError> {
            future::pending().await
        }
    }

    /// Timer that fires when its gate opens, or never without one.
    #[derive(Default)]
    struct GatedTimer {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
        requested: Cell<Option<Duration>>,
    }

    impl GatedTimer {
        fn never() -> Rc<Self> {
            Rc::default()
        }

        fn gated(gate: oneshot::Receiver<()>) -> Rc<Self> {
            Rc::new(Self {
                gate: RefCell::new(Some(gate)),
                requested: Cell::new(None),
            })
        }
    }

    #[async_trait(?Send)]
    impl Timer for GatedTimer {
        async fn sleep(&self, delay: Duration) {
            self.requested.set(Some(delay));
            let gate = self.gate.borrow_mut().take();
            let fired = match gate {
                Some(gate) => gate.await.is_ok(),
                None => false,
            };
            if !fired {
                future::pending::<()>().await;
            }
        }
    }

    fn cache(
        hadith: Rc<dyn HadithSource>,
        calendar: Rc<dyn CalendarSource>,
        timer: Rc<GatedTimer>,
    ) -> ContentCache {
        ContentCache::new(today(), hadith, calendar, timer, Duration::from_millis(8000))
    }

    struct FixedCalendar {
        calls: Cell<u32>,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl CalendarSource for FixedCalendar {
        async fn fetch_hijri(&self, _date: NaiveDate) -> Result<HijriReading, ContentError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ContentError::Status(500));
            }
            Ok(HijriReading {
                day: "22".into(),
                month: "Rabi'ul Akhir".into(),
                year: "1448".into(),
                weekday: None,
            })
        }
    }

    fn sources(
        gate: Option<oneshot::Receiver<()>>,
        fail_calendar: bool,
    ) -> (Rc<GatedHadith>, Rc<FixedCalendar>) {
        (
            Rc::new(GatedHadith {
                gate: RefCell::new(gate),
                calls: Cell::new(0),
            }),
            Rc::new(FixedCalendar {
                calls: Cell::new(0),
                fail: fail_calendar,
            }),
        )
    }

    #[test]
    fn resolves_once_and_memoizes() {
        let (hadith, calendar) = sources(None, false);
        let cache = cache(hadith.clone(), calendar.clone(), GatedTimer::never());
        assert!(cache.peek().is_none());

        let first = block_on(cache.get());
        let second = block_on(cache.get());
        assert!(Rc::ptr_eq(&first, &second), "same payload object");
        assert_eq!(hadith.calls.get(), 1);
        assert_eq!(calendar.calls.get(), 1);
        // Day 287 of 2026, ten entries.
        assert_eq!(first.hadith.english_text, "hadith 7");
        assert_eq!(first.hijri_date_text, "Arba'aa, 22 Rabi'ul Akhir 1448 H");
        assert!(cache.peek().is_some());
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let (tx, rx) = oneshot::channel();
        let (hadith, calendar) = sources(Some(rx), false);
        let cache = Rc::new(cache(hadith.clone(), calendar.clone(), GatedTimer::never()));
        let results: Rc<RefCell<Vec<Rc<ContentPayload>>>> = Rc::default();

        let mut pool = LocalPool::new();
        let spawner = pool.spawner();
        for _ in 0..2 {
            let cache = Rc::clone(&cache);
            let results = Rc::clone(&results);
            spawner
                .spawn_local(async move {
                    let payload = cache.get().await;
                    results.borrow_mut().push(payload);
                })
                .unwrap();
        }

        pool.run_until_stalled();
        assert!(results.borrow().is_empty(), "fetch is still gated");
        assert!(cache.peek().is_none());
        // Both fetches were started together, not one after the other.
        assert_eq!(calendar.calls.get(), 1);

        tx.send(()).unwrap();
        pool.run_until_stalled();

        let results = results.borrow();
        assert_eq!(results.len(), 2);
        assert!(Rc::ptr_eq(&results[0], &results[1]));
        assert_eq!(hadith.calls.get(), 1, "no duplicate fetch");
        assert_eq!(calendar.calls.get(), 1, "no duplicate fetch");
    }

    #[test]
    fn failed_calendar_falls_back_to_estimate() {
        let (hadith, calendar) = sources(None, true);
        let cache = cache(hadith, calendar, GatedTimer::never());
        let payload = block_on(cache.get());
        assert!(payload.hijri_date_text.ends_with(" H"));
        assert_eq!(payload.gregorian_date_text, "Wednesday, October 14, 2026");
        assert_ne!(payload.hadith.source_label, "Sahih Bukhari, No. 1");
    }

    #[test]
    fn hung_source_falls_back_at_the_deadline() {
        let (fire, gate) = oneshot::channel();
        let timer = GatedTimer::gated(gate);
        let (_, calendar) = sources(None, false);
        let cache = Rc::new(cache(Rc::new(HungHadith), calendar, timer.clone()));
        let result: Rc<RefCell<Option<Rc<ContentPayload>>>> = Rc::default();

        let mut pool = LocalPool::new();
        {
            let cache = Rc::clone(&cache);
            let result = Rc::clone(&result);
            pool.spawner()
                .spawn_local(async move {
                    *result.borrow_mut() = Some(cache.get().await);
                })
                .unwrap();
        }

        pool.run_until_stalled();
        assert!(result.borrow().is_none(), "deadline not reached");
        assert_eq!(timer.requested.get(), Some(Duration::from_millis(8000)));

        fire.send(()).unwrap();
        pool.run_until_stalled();

        let payload = result.borrow().clone().unwrap();
        assert_eq!(payload.hadith, HadithRecord::fallback());
        // The calendar answered in time and is kept.
        assert_eq!(payload.hijri_date_text, "Arba'aa, 22 Rabi'ul Akhir 1448 H");
        assert!(cache.peek().is_some());
    }

    #[test]
    fn timely_answers_beat_an_expired_timer() {
        let (fire, gate) = oneshot::channel();
        fire.send(()).unwrap();
        let (hadith, calendar) = sources(None, false);
        let cache = cache(hadith, calendar, GatedTimer::gated(gate));
        let payload = block_on(cache.get());
        assert_eq!(payload.hadith.english_text, "hadith 7");
    }

    #[test]
    fn within_reports_the_deadline() {
        let (fire, gate) = oneshot::channel();
        fire.send(()).unwrap();
        let timer = GatedTimer::gated(gate);
        let result: Result<(), ContentError> = block_on(within(
            "calendar",
            future::pending(),
            &*timer,
            Duration::from_millis(1500),
        ));
        assert_eq!(result, Err(ContentError::TimedOut(1500)));
    }
}
