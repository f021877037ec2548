use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::models::{MonthKey, TimeSlot};

/// Availability per calendar month, filled at most once per key.
#[derive(Debug, Clone)]
pub struct AvailabilityCache {
    offset: FixedOffset,
    months: BTreeMap<MonthKey, Vec<TimeSlot>>,
}

impl AvailabilityCache {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            months: BTreeMap::new(),
        }
    }

    pub fn contains(&self, key: MonthKey) -> bool {
        self.months.contains_key(&key)
    }

    pub fn get(&self, key: MonthKey) -> Option<&[TimeSlot]> {
        self.months.get(&key).map(|v| v.as_slice())
    }

    /// Store a month's slots in start order. Slots that fall outside the month
    /// (in business-local time) are dropped. An existing entry is kept as is.
    pub fn insert(&mut self, key: MonthKey, mut slots: Vec<TimeSlot>) -> &[TimeSlot] {
        let offset = self.offset;
        self.months.entry(key).or_insert_with(|| {
            slots.retain(|s| key.contains(s.local_date(offset)));
            slots.sort_by_key(|s| s.start_at);
            slots
        })
    }

    pub fn clear(&mut self) {
        self.months.clear();
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Slots starting on `date`, earliest first. Empty when the month is not cached.
    pub fn slots_on(&self, date: NaiveDate) -> Vec<&TimeSlot> {
        let mut slots: Vec<&TimeSlot> = self
            .get(MonthKey::from_date(date))
            .unwrap_or_default()
            .iter()
            .filter(|s| s.local_date(self.offset) == date)
            .collect();
        slots.sort_by_key(|s| s.start_at);
        slots
    }

    /// Slots on `date` that still start after `now`. This is what the day offers
    /// for booking, and the only thing that makes a day selectable.
    pub fn upcoming_slots_on(&self, date: NaiveDate, now: DateTime<FixedOffset>) -> Vec<&TimeSlot> {
        let mut slots = self.slots_on(date);
        slots.retain(|s| s.start_at > now);
        slots
    }

    pub fn is_day_available(&self, date: NaiveDate, now: DateTime<FixedOffset>) -> bool {
        !self.upcoming_slots_on(date, now).is_empty()
    }
}
