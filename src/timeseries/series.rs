//! Ordered, unique-keyed OHLC storage with pluggable point lookup.
//!
//! The entry storage is a timestamp-sorted vector behind a reader–writer
//! lock owned by the series: readers (`is_present`, `get`,
//! `get_with_offset`, `sorted_iter`) take the shared half, writers (`add`,
//! `delete_at`) take the exclusive half and serialize. The vector is held
//! through an `Arc`, so a reader's snapshot stays valid and unchanged while
//! writers copy-on-write underneath it — iteration always sees some
//! serialization of completed writes, never a torn bar.
//!
//! The [`LookupPolicy`] only decides how a timestamp resolves to a position
//! within the locked storage. `OrderedLookup` binary-searches and carries no
//! state of its own. `HashedLookup` adds a lazily hydrated
//! timestamp→position map behind its own lock; every mutation invalidates
//! it and the first reader after an invalidation rebuilds it.

use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashMap;

use crate::error::DataError;
use crate::num::Decimal;
use crate::timeseries::numeric::NumericSeries;
use crate::timeseries::{infer_intraday_minutes, OhlcBar, TimeFrame, VolumeUnit};

/// Anything stored in a sorted, timestamp-keyed sequence.
pub trait Stamped {
    fn stamp(&self) -> NaiveDateTime;
}

impl Stamped for OhlcBar {
    fn stamp(&self) -> NaiveDateTime {
        self.timestamp()
    }
}

/// Strategy for resolving a timestamp to a position in the sorted storage.
pub trait LookupPolicy: Default {
    /// Position of `ts` in `entries`, or `None` when absent.
    fn find_position<E: Stamped>(&self, entries: &[E], ts: NaiveDateTime) -> Option<usize>;

    /// Called after every successful mutation, while the storage lock is
    /// still held exclusively.
    fn invalidate(&self);
}

/// Binary search over the sorted storage. Zero state, always valid.
#[derive(Debug, Default, Clone)]
pub struct OrderedLookup;

impl LookupPolicy for OrderedLookup {
    fn find_position<E: Stamped>(&self, entries: &[E], ts: NaiveDateTime) -> Option<usize> {
        entries.binary_search_by_key(&ts, Stamped::stamp).ok()
    }

    fn invalidate(&self) {}
}

/// Lazily built timestamp→position index for O(1) point lookup.
#[derive(Debug, Default)]
pub struct HashedLookup {
    index: RwLock<Option<FxHashMap<NaiveDateTime, usize>>>,
}

impl Clone for HashedLookup {
    fn clone(&self) -> Self {
        // A clone starts un-hydrated; positions would be recomputed anyway.
        HashedLookup::default()
    }
}

impl LookupPolicy for HashedLookup {
    fn find_position<E: Stamped>(&self, entries: &[E], ts: NaiveDateTime) -> Option<usize> {
        {
            let guard = self.index.read().expect("lookup index poisoned");
            if let Some(map) = guard.as_ref() {
                return map.get(&ts).copied();
            }
        }
        // Stale index: rebuild under the exclusive half. The caller already
        // holds the storage lock, so `entries` cannot move underneath the
        // rebuild; another reader may have won the race, the double-check
        // keeps the rebuild single.
        let mut guard = self.index.write().expect("lookup index poisoned");
        let map = guard.get_or_insert_with(|| {
            entries
                .iter()
                .enumerate()
                .map(|(pos, e)| (e.stamp(), pos))
                .collect()
        });
        map.get(&ts).copied()
    }

    fn invalidate(&self) {
        *self.index.write().expect("lookup index poisoned") = None;
    }
}

/// Timestamp at which a date-keyed (EOD) bar is stored.
pub fn bar_time(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight exists")
}

pub struct OhlcSeries<P: LookupPolicy = OrderedLookup> {
    // Sorted storage; shared half for readers, exclusive half for writers.
    entries: RwLock<Arc<Vec<OhlcBar>>>,
    time_frame: TimeFrame,
    volume_unit: VolumeUnit,
    lookup: P,
    // Mode of inter-bar gaps, computed on first use, dropped on mutation.
    cached_minutes: RwLock<Option<u32>>,
}

impl<P: LookupPolicy> OhlcSeries<P> {
    pub fn new(time_frame: TimeFrame, volume_unit: VolumeUnit) -> Self {
        OhlcSeries {
            entries: RwLock::new(Arc::new(Vec::new())),
            time_frame,
            volume_unit,
            lookup: P::default(),
            cached_minutes: RwLock::new(None),
        }
    }

    /// Bulk construction. Unsorted input is sorted; duplicate timestamps and
    /// time-frame mismatches are hard errors.
    pub fn new_from_range<I>(
        time_frame: TimeFrame,
        volume_unit: VolumeUnit,
        bars: I,
    ) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = OhlcBar>,
    {
        let mut entries: Vec<OhlcBar> = bars.into_iter().collect();
        for bar in &entries {
            if bar.time_frame() != time_frame {
                return Err(DataError::TimeFrameMismatch {
                    bar: bar.time_frame(),
                    series: time_frame,
                });
            }
        }
        entries.sort_by_key(Stamped::stamp);
        for pair in entries.windows(2) {
            if pair[0].timestamp() == pair[1].timestamp() {
                return Err(DataError::DuplicateTimestamp(pair[0].timestamp()));
            }
        }
        Ok(OhlcSeries {
            entries: RwLock::new(Arc::new(entries)),
            time_frame,
            volume_unit,
            lookup: P::default(),
            cached_minutes: RwLock::new(None),
        })
    }

    pub fn time_frame(&self) -> TimeFrame {
        self.time_frame
    }

    pub fn volume_unit(&self) -> VolumeUnit {
        self.volume_unit
    }

    /// A stable view of the storage: cheap to take, unaffected by writers
    /// that run after it is taken.
    pub fn snapshot(&self) -> Arc<Vec<OhlcBar>> {
        Arc::clone(&self.entries.read().expect("series storage poisoned"))
    }

    pub fn num_entries(&self) -> usize {
        self.entries.read().expect("series storage poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .expect("series storage poisoned")
            .is_empty()
    }

    /// Drops derived caches; called with the storage lock held exclusively.
    fn touch(&self) {
        self.lookup.invalidate();
        *self.cached_minutes.write().expect("cache poisoned") = None;
    }

    /// Insert maintaining sorted order. Writers serialize on the storage
    /// lock; readers holding a snapshot are unaffected.
    pub fn add(&self, bar: OhlcBar) -> Result<(), DataError> {
        if bar.time_frame() != self.time_frame {
            return Err(DataError::TimeFrameMismatch {
                bar: bar.time_frame(),
                series: self.time_frame,
            });
        }
        let mut guard = self.entries.write().expect("series storage poisoned");
        let entries = Arc::make_mut(&mut guard);
        match entries.binary_search_by_key(&bar.timestamp(), Stamped::stamp) {
            Ok(_) => Err(DataError::DuplicateTimestamp(bar.timestamp())),
            Err(pos) => {
                entries.insert(pos, bar);
                self.touch();
                Ok(())
            }
        }
    }

    /// Remove the bar at `ts`. Absence is an error, not a no-op.
    pub fn delete_at(&self, ts: NaiveDateTime) -> Result<OhlcBar, DataError> {
        let mut guard = self.entries.write().expect("series storage poisoned");
        let entries = Arc::make_mut(&mut guard);
        match entries.binary_search_by_key(&ts, Stamped::stamp) {
            Ok(pos) => {
                let bar = entries.remove(pos);
                self.touch();
                Ok(bar)
            }
            Err(_) => Err(DataError::NotFound(ts.to_string())),
        }
    }

    pub fn first_entry(&self) -> Result<OhlcBar, DataError> {
        self.entries
            .read()
            .expect("series storage poisoned")
            .first()
            .copied()
            .ok_or_else(|| DataError::NotFound("series is empty".into()))
    }

    pub fn last_entry(&self) -> Result<OhlcBar, DataError> {
        self.entries
            .read()
            .expect("series storage poisoned")
            .last()
            .copied()
            .ok_or_else(|| DataError::NotFound("series is empty".into()))
    }

    pub fn first_timestamp(&self) -> Result<NaiveDateTime, DataError> {
        self.first_entry().map(|bar| bar.timestamp())
    }

    pub fn last_timestamp(&self) -> Result<NaiveDateTime, DataError> {
        self.last_entry().map(|bar| bar.timestamp())
    }

    pub fn first_date(&self) -> Result<NaiveDate, DataError> {
        self.first_entry().map(|bar| bar.date())
    }

    pub fn last_date(&self) -> Result<NaiveDate, DataError> {
        self.last_entry().map(|bar| bar.date())
    }

    pub fn is_present(&self, ts: NaiveDateTime) -> bool {
        let guard = self.entries.read().expect("series storage poisoned");
        self.lookup.find_position(guard.as_slice(), ts).is_some()
    }

    pub fn is_present_date(&self, date: NaiveDate) -> bool {
        self.is_present(bar_time(date))
    }

    pub fn get(&self, ts: NaiveDateTime) -> Result<OhlcBar, DataError> {
        let guard = self.entries.read().expect("series storage poisoned");
        self.lookup
            .find_position(guard.as_slice(), ts)
            .map(|pos| guard[pos])
            .ok_or_else(|| DataError::NotFound(ts.to_string()))
    }

    pub fn get_by_date(&self, date: NaiveDate) -> Result<OhlcBar, DataError> {
        self.get(bar_time(date))
    }

    /// Offset-relative access: a positive offset walks `offset` bars earlier
    /// in sorted order (into history), a negative offset walks later, zero is
    /// the base bar itself. Position and bar come from one shared-lock
    /// acquisition, and every lookup is bounds-checked.
    pub fn get_with_offset(&self, base: NaiveDateTime, offset: i64) -> Result<OhlcBar, DataError> {
        let guard = self.entries.read().expect("series storage poisoned");
        let pos = self
            .lookup
            .find_position(guard.as_slice(), base)
            .ok_or_else(|| DataError::NotFound(base.to_string()))?;
        let target = pos as i64 - offset;
        if target < 0 || target >= guard.len() as i64 {
            return Err(DataError::OffsetOutOfRange { base, offset });
        }
        Ok(guard[target as usize])
    }

    pub fn get_by_date_with_offset(
        &self,
        date: NaiveDate,
        offset: i64,
    ) -> Result<OhlcBar, DataError> {
        self.get_with_offset(bar_time(date), offset)
    }

    /// In-order iteration over a snapshot taken under the shared lock:
    /// writers running while the iterator is live do not affect it.
    pub fn sorted_iter(&self) -> impl Iterator<Item = OhlcBar> {
        let snapshot = self.snapshot();
        (0..snapshot.len()).map(move |i| snapshot[i])
    }

    /// New series of the same policy holding exactly the bars within the
    /// inclusive `[start, end]` range. A start before the series is an error;
    /// an end past the series just takes everything to the end.
    pub fn filter(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<OhlcSeries<P>, DataError> {
        let snapshot = self.snapshot();
        if let Some(first) = snapshot.first() {
            if start < first.timestamp() {
                return Err(DataError::RangeBeforeSeries {
                    start,
                    first: first.timestamp(),
                });
            }
        }
        let bars = snapshot
            .iter()
            .filter(|bar| bar.timestamp() >= start && bar.timestamp() <= end)
            .copied();
        OhlcSeries::new_from_range(self.time_frame, self.volume_unit, bars)
    }

    fn project(&self, f: impl Fn(&OhlcBar) -> Decimal) -> NumericSeries {
        let mut series = NumericSeries::new(self.time_frame);
        for bar in self.snapshot().iter() {
            series
                .add(bar.timestamp(), f(bar))
                .expect("projection preserves unique sorted timestamps");
        }
        series
    }

    pub fn close_series(&self) -> NumericSeries {
        self.project(OhlcBar::close)
    }

    pub fn open_series(&self) -> NumericSeries {
        self.project(OhlcBar::open)
    }

    pub fn high_series(&self) -> NumericSeries {
        self.project(OhlcBar::high)
    }

    pub fn low_series(&self) -> NumericSeries {
        self.project(OhlcBar::low)
    }

    /// Modal bar spacing in minutes. Only defined for intraday series; the
    /// first call computes, mutation invalidates.
    pub fn intraday_minutes_per_bar(&self) -> Result<u32, DataError> {
        if self.time_frame != TimeFrame::Intraday {
            return Err(DataError::WrongTimeFrame {
                expected: TimeFrame::Intraday,
                actual: self.time_frame,
            });
        }
        if let Some(minutes) = *self.cached_minutes.read().expect("cache poisoned") {
            return Ok(minutes);
        }
        let snapshot = self.snapshot();
        let minutes = infer_intraday_minutes(snapshot.iter().map(Stamped::stamp))?;
        *self.cached_minutes.write().expect("cache poisoned") = Some(minutes);
        Ok(minutes)
    }
}

impl<P: LookupPolicy + Clone> Clone for OhlcSeries<P> {
    fn clone(&self) -> Self {
        // Shares the storage Arc; the next writer on either side copies.
        OhlcSeries {
            entries: RwLock::new(self.snapshot()),
            time_frame: self.time_frame,
            volume_unit: self.volume_unit,
            lookup: self.lookup.clone(),
            cached_minutes: RwLock::new(*self.cached_minutes.read().expect("cache poisoned")),
        }
    }
}

impl<P: LookupPolicy> PartialEq for OhlcSeries<P> {
    fn eq(&self, other: &Self) -> bool {
        self.time_frame == other.time_frame
            && self.volume_unit == other.volume_unit
            && *self.snapshot() == *other.snapshot()
    }
}

impl<P: LookupPolicy> Eq for OhlcSeries<P> {}

impl<P: LookupPolicy + std::fmt::Debug> std::fmt::Debug for OhlcSeries<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OhlcSeries")
            .field("time_frame", &self.time_frame)
            .field("volume_unit", &self.volume_unit)
            .field("num_entries", &self.num_entries())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 4, d).unwrap()
    }

    fn bar(date: NaiveDate, close: &str) -> OhlcBar {
        let c = dec(close);
        OhlcBar::new(
            bar_time(date),
            c,
            c + dec("1"),
            c - dec("1"),
            c,
            dec("100"),
            TimeFrame::Daily,
        )
        .unwrap()
    }

    fn four_bar_series<P: LookupPolicy>() -> OhlcSeries<P> {
        // Closes 103, 106, 109, 111 on 2021-04-05..08.
        OhlcSeries::new_from_range(
            TimeFrame::Daily,
            VolumeUnit::Shares,
            vec![
                bar(day(5), "103.0"),
                bar(day(6), "106.0"),
                bar(day(7), "109.0"),
                bar(day(8), "111.0"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn add_maintains_order_and_presence() {
        let series = OhlcSeries::<OrderedLookup>::new(TimeFrame::Daily, VolumeUnit::Shares);
        for d in [7, 5, 8, 6] {
            let b = bar(day(d), "100");
            let before = series.num_entries();
            series.add(b).unwrap();
            assert_eq!(series.num_entries(), before + 1);
            assert!(series.is_present(b.timestamp()));
            assert!(series.first_timestamp().unwrap() <= b.timestamp());
            assert!(series.last_timestamp().unwrap() >= b.timestamp());
        }
        let stamps: Vec<_> = series.sorted_iter().map(|b| b.timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn duplicate_insert_is_an_error() {
        let series = four_bar_series::<OrderedLookup>();
        let err = series.add(bar(day(5), "99")).unwrap_err();
        assert!(matches!(err, DataError::DuplicateTimestamp(_)));
    }

    #[test]
    fn time_frame_mismatch_is_an_error() {
        let series = four_bar_series::<OrderedLookup>();
        let weekly = OhlcBar::new(
            bar_time(day(9)),
            dec("1"),
            dec("1"),
            dec("1"),
            dec("1"),
            Decimal::ZERO,
            TimeFrame::Weekly,
        )
        .unwrap();
        assert!(matches!(
            series.add(weekly),
            Err(DataError::TimeFrameMismatch { .. })
        ));
    }

    #[test]
    fn offset_walks_into_history() {
        let series = four_bar_series::<OrderedLookup>();
        let base = bar_time(day(8));
        assert_eq!(series.get_with_offset(base, 0).unwrap().close(), dec("111.0"));
        assert_eq!(series.get_with_offset(base, 1).unwrap().close(), dec("109.0"));
        assert_eq!(series.get_with_offset(base, 3).unwrap().close(), dec("103.0"));
        assert!(matches!(
            series.get_with_offset(base, 4),
            Err(DataError::OffsetOutOfRange { .. })
        ));
        // Negative offset walks forward in time.
        assert_eq!(
            series.get_with_offset(bar_time(day(5)), -1).unwrap().close(),
            dec("106.0")
        );
        assert!(matches!(
            series.get_with_offset(bar_time(day(9)), 0),
            Err(DataError::NotFound(_))
        ));
    }

    #[test]
    fn offset_zero_equals_get_and_offsets_decrease_in_time() {
        let series = four_bar_series::<OrderedLookup>();
        for b in series.sorted_iter() {
            assert_eq!(
                series.get_with_offset(b.timestamp(), 0).unwrap(),
                series.get(b.timestamp()).unwrap()
            );
        }
        let base = bar_time(day(8));
        for k in 1..=3 {
            let earlier = series.get_with_offset(base, k).unwrap().timestamp();
            let later = series.get_with_offset(base, k - 1).unwrap().timestamp();
            assert!(earlier < later);
        }
    }

    #[test]
    fn delete_requires_presence() {
        let series = four_bar_series::<HashedLookup>();
        // Warm the index, then invalidate it through a delete.
        assert!(series.is_present(bar_time(day(7))));
        series.delete_at(bar_time(day(7))).unwrap();
        assert!(!series.is_present(bar_time(day(7))));
        assert!(series.is_present(bar_time(day(6))));
        assert!(matches!(
            series.delete_at(bar_time(day(7))),
            Err(DataError::NotFound(_))
        ));
        assert_eq!(series.num_entries(), 3);
    }

    #[test]
    fn hashed_policy_agrees_with_ordered_policy() {
        let ordered = four_bar_series::<OrderedLookup>();
        let hashed = four_bar_series::<HashedLookup>();
        for d in 4..=9 {
            let ts = bar_time(day(d));
            assert_eq!(ordered.is_present(ts), hashed.is_present(ts));
            match (ordered.get(ts), hashed.get(ts)) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(_), Err(_)) => {}
                _ => panic!("policies disagree on {ts}"),
            }
        }
    }

    #[test]
    fn snapshot_is_stable_under_later_writes() {
        let series = four_bar_series::<HashedLookup>();
        let before = series.snapshot();
        series.add(bar(day(9), "115")).unwrap();
        series.delete_at(bar_time(day(5))).unwrap();
        // The earlier snapshot still sees the original four bars.
        assert_eq!(before.len(), 4);
        assert_eq!(before.first().unwrap().timestamp(), bar_time(day(5)));
        assert_eq!(series.num_entries(), 4);
        assert!(!series.is_present(bar_time(day(5))));
    }

    #[test]
    fn new_from_range_sorts_and_rejects_duplicates() {
        let sorted = OhlcSeries::<OrderedLookup>::new_from_range(
            TimeFrame::Daily,
            VolumeUnit::Shares,
            vec![bar(day(8), "111"), bar(day(5), "103"), bar(day(6), "106")],
        )
        .unwrap();
        assert_eq!(sorted.first_date().unwrap(), day(5));
        assert_eq!(sorted.last_date().unwrap(), day(8));

        let dup = OhlcSeries::<OrderedLookup>::new_from_range(
            TimeFrame::Daily,
            VolumeUnit::Shares,
            vec![bar(day(5), "103"), bar(day(5), "104")],
        );
        assert!(matches!(dup, Err(DataError::DuplicateTimestamp(_))));
    }

    #[test]
    fn filter_respects_lower_bound_precondition() {
        let series = four_bar_series::<OrderedLookup>();
        let filtered = series
            .filter(bar_time(day(6)), bar_time(day(30)))
            .unwrap();
        assert_eq!(filtered.num_entries(), 3);
        assert_eq!(filtered.first_date().unwrap(), day(6));

        assert!(matches!(
            series.filter(bar_time(day(1)), bar_time(day(6))),
            Err(DataError::RangeBeforeSeries { .. })
        ));
    }

    #[test]
    fn projections_preserve_order_and_frame() {
        let series = four_bar_series::<OrderedLookup>();
        let closes = series.close_series();
        assert_eq!(closes.num_entries(), 4);
        assert_eq!(closes.time_frame(), TimeFrame::Daily);
        assert_eq!(
            closes.get_value(bar_time(day(7)), 0).unwrap(),
            dec("109.0")
        );
    }

    #[test]
    fn intraday_minutes_requires_intraday_frame() {
        let series = four_bar_series::<OrderedLookup>();
        assert!(matches!(
            series.intraday_minutes_per_bar(),
            Err(DataError::WrongTimeFrame { .. })
        ));
    }

    #[test]
    fn intraday_minutes_cached_and_invalidated() {
        let mk = |h: u32, m: u32| {
            let ts = day(5).and_hms_opt(h, m, 0).unwrap();
            let c = dec("50");
            OhlcBar::new(ts, c, c, c, c, Decimal::ZERO, TimeFrame::Intraday).unwrap()
        };
        let series = OhlcSeries::<OrderedLookup>::new_from_range(
            TimeFrame::Intraday,
            VolumeUnit::Shares,
            vec![mk(9, 0), mk(10, 0), mk(11, 0), mk(12, 0), mk(14, 0), mk(15, 0)],
        )
        .unwrap();
        assert_eq!(series.intraday_minutes_per_bar().unwrap(), 60);
        // A new 30-minute bar flips the mode after invalidation.
        series.add(mk(15, 30)).unwrap();
        series.add(mk(16, 0)).unwrap();
        series.add(mk(16, 30)).unwrap();
        series.add(mk(17, 0)).unwrap();
        series.add(mk(17, 30)).unwrap();
        assert_eq!(series.intraday_minutes_per_bar().unwrap(), 30);
    }

    #[test]
    fn random_insertion_order_always_sorts() {
        use rand::seq::SliceRandom;
        let mut days: Vec<u32> = (1..=28).collect();
        let mut rng = rand::rng();
        for _ in 0..10 {
            days.shuffle(&mut rng);
            let series = OhlcSeries::<HashedLookup>::new(TimeFrame::Daily, VolumeUnit::Shares);
            for &d in &days {
                series.add(bar(day(d), "100")).unwrap();
            }
            assert_eq!(series.num_entries(), days.len());
            let stamps: Vec<_> = series.sorted_iter().map(|b| b.timestamp()).collect();
            assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn hashed_policy_survives_concurrent_insert_and_read() {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let per_thread = 200u32;
        // One bare shared series: the container itself provides the safety.
        let series = Arc::new(OhlcSeries::<HashedLookup>::new(
            TimeFrame::Intraday,
            VolumeUnit::Shares,
        ));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let series = Arc::clone(&series);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        // Unique minute per (thread, i) pair.
                        let minute = t as i64 * i64::from(per_thread) + i64::from(i);
                        let ts = bar_time(day(5)) + chrono::TimeDelta::minutes(minute);
                        let c = dec("100");
                        let b = OhlcBar::new(ts, c, c, c, c, Decimal::ZERO, TimeFrame::Intraday)
                            .unwrap();
                        series.add(b).unwrap();
                        // Interleaved reads race other threads' inserts and
                        // the index rebuild path.
                        assert!(series.is_present(ts));
                        assert_eq!(series.get(ts).unwrap().timestamp(), ts);
                        if i % 8 == 0 {
                            assert_eq!(series.get_with_offset(ts, 0).unwrap().timestamp(), ts);
                            let seen = series.sorted_iter().count();
                            assert!(seen >= i as usize);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(series.num_entries(), threads * per_thread as usize);
        for t in 0..threads {
            for i in 0..per_thread {
                let minute = t as i64 * i64::from(per_thread) + i64::from(i);
                let ts = bar_time(day(5)) + chrono::TimeDelta::minutes(minute);
                assert!(series.is_present(ts));
            }
        }
    }
}
