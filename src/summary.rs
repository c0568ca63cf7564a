use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::PetEstimate;

/// Mean PET rate over the estimates of one calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPet {
    pub date: NaiveDate,
    pub pet: f64,
    pub count: usize,
}

/// Collapse sub-daily estimates to one value per date, sorted by date.
///
/// Estimates are rates per day, so the mean over a date is that day's total.
pub fn daily_means<'a, I>(estimates: I) -> Vec<DailyPet>
where
    I: IntoIterator<Item = &'a PetEstimate>,
{
    let mut totals: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for estimate in estimates {
        let entry = totals.entry(estimate.timestamp.date()).or_insert((0., 0));
        entry.0 += estimate.pet;
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(date, (sum, count))| DailyPet {
            date,
            pet: sum / count as f64,
            count,
        })
        .collect()
}
