//! Projects templates onto calendar months.
//!
//! Projection is pure: it reads a template and a month window and never
//! touches rotation state, so it is safe to call from display code as often
//! as needed.

use chrono::{Days, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::calendar::{self, YearMonth};
use crate::models::{Frequency, Occurrence, Template};

/// Dates in `window` on which `template` is due, ascending.
pub fn project_dates(template: &Template, window: YearMonth) -> Vec<NaiveDate> {
    if !template.is_active {
        return Vec::new();
    }

    let dates: BTreeSet<NaiveDate> = match &template.frequency {
        Frequency::Daily => every_day(window).collect(),
        Frequency::Weekly { days } => days
            .iter()
            .flat_map(|&wd| stepped(window, calendar::first_weekday_in(window, wd), 7))
            .collect(),
        Frequency::Biweekly { days, anchor } => days
            .iter()
            .flat_map(|&wd| {
                let start = calendar::first_weekday_in(window, wd)
                    .map(|first| anchored_start(first, *anchor));
                stepped(window, start, 14)
            })
            .collect(),
        Frequency::Monthly { day } => std::iter::once(calendar::clamp_day(window, *day)).collect(),
    };

    debug!(
        template_id = template.id,
        frequency = template.frequency.name(),
        window = %window,
        count = dates.len(),
        "projected template"
    );
    dates.into_iter().collect()
}

/// Same as [`project_dates`], tagged with the template id.
pub fn project(template: &Template, window: YearMonth) -> Vec<Occurrence> {
    project_dates(template, window)
        .into_iter()
        .map(|date| Occurrence { date, template_id: template.id })
        .collect()
}

/// Groups the occurrences of many templates by date.
pub fn aggregate<'a, I>(templates: I, window: YearMonth) -> BTreeMap<NaiveDate, Vec<&'a Template>>
where
    I: IntoIterator<Item = &'a Template>,
{
    let mut by_date: BTreeMap<NaiveDate, Vec<&'a Template>> = BTreeMap::new();
    for template in templates {
        for date in project_dates(template, window) {
            by_date.entry(date).or_default().push(template);
        }
    }
    by_date
}

/// Whether `template` projects onto `date`.
pub fn is_due_on(template: &Template, date: NaiveDate) -> bool {
    project_dates(template, YearMonth::of(date)).contains(&date)
}

fn every_day(window: YearMonth) -> impl Iterator<Item = NaiveDate> {
    window.first_day().iter_days().take(window.days() as usize)
}

fn stepped(window: YearMonth, start: Option<NaiveDate>, step: u64) -> Vec<NaiveDate> {
    let last = window.last_day();
    let mut out = Vec::new();
    let mut cursor = start;
    while let Some(date) = cursor.filter(|d| *d <= last) {
        out.push(date);
        cursor = date.checked_add_days(Days::new(step));
    }
    out
}

/// Shifts the first in-month match to an "on" week relative to `anchor`.
fn anchored_start(first: NaiveDate, anchor: Option<NaiveDate>) -> NaiveDate {
    let Some(anchor) = anchor else {
        return first;
    };
    let weeks = (first - calendar::week_start(anchor)).num_days().div_euclid(7);
    if weeks.rem_euclid(2) == 0 {
        first
    } else {
        first.checked_add_days(Days::new(7)).unwrap_or(first)
    }
}
