use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::models::{MonthKey, TimeSlot};
use crate::services::cache::AvailabilityCache;
use crate::services::dates;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub available: bool,
    pub past: bool,
    pub today: bool,
    pub selected: bool,
}

/// One month of the date picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub month: MonthKey,
    pub title: String,
    /// Empty cells before the 1st in a Sunday-first week.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
    /// False while the month's availability has not been fetched yet.
    pub loaded: bool,
}

/// Slots of the selected day, as shown under the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySlots {
    NoDateSelected,
    NoSlots,
    Slots(Vec<TimeSlot>),
}

impl MonthGrid {
    /// `now` is in business-local time; a day is available only while it still
    /// has a slot starting after `now`.
    pub fn build(
        month: MonthKey,
        cache: &AvailabilityCache,
        now: DateTime<FixedOffset>,
        selected: Option<NaiveDate>,
    ) -> Self {
        let today = now.date_naive();
        let days = dates::days_in_month(month)
            .map(|date| CalendarDay {
                date,
                available: cache.is_day_available(date, now),
                past: date < today,
                today: date == today,
                selected: selected == Some(date),
            })
            .collect();

        Self {
            month,
            title: dates::format_month_title(month),
            leading_blanks: dates::leading_blank_days(month),
            days,
            loaded: cache.contains(month),
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn available_days(&self) -> impl Iterator<Item = &CalendarDay> {
        self.days.iter().filter(|d| d.available)
    }

    /// Rows of seven cells, Sunday first, padded with `None`.
    pub fn weeks(&self) -> Vec<[Option<&CalendarDay>; 7]> {
        let mut cells: Vec<Option<&CalendarDay>> = vec![None; self.leading_blanks as usize];
        cells.extend(self.days.iter().map(Some));
        cells
            .chunks(7)
            .map(|chunk| {
                let mut row = [None; 7];
                row[..chunk.len()].copy_from_slice(chunk);
                row
            })
            .collect()
    }

    /// Plain-text grid. Selectable days show their number, the selected day is
    /// bracketed, everything else is dotted out.
    pub fn render_text(&self) -> String {
        let mut out = format!("{:^28}\n", self.title);
        out.push_str(" Su  Mo  Tu  We  Th  Fr  Sa \n");
        for week in self.weeks() {
            for cell in week {
                let text = match cell {
                    None => "    ".to_string(),
                    Some(day) if day.selected => format!("[{:>2}]", day.date.format("%-d")),
                    Some(day) if day.available => format!(" {:>2} ", day.date.format("%-d")),
                    Some(_) => "  . ".to_string(),
                };
                out.push_str(&text);
            }
            out.push('\n');
        }
        if !self.loaded {
            out.push_str("Loading availability...\n");
        }
        out
    }
}
