use super::SchedError;
use chrono::{Datelike, NaiveDate, Weekday};

/// Jour du calendrier tel que vu par le moteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DayInfo {
    pub day: u32,
    pub weekday: Weekday,
    pub holiday: bool,
}

impl DayInfo {
    /// Samedi, dimanche ou jour férié.
    pub fn is_weekend(&self) -> bool {
        self.holiday || matches!(self.weekday, Weekday::Sat | Weekday::Sun)
    }
}

/// Nombre de jours du mois, `None` si l'année ou le mois est invalide.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Construit l'horizon de planification (éventuellement tronqué).
pub(super) fn month_days(
    year: i32,
    month: u32,
    holidays: &[u32],
    limit: Option<u32>,
) -> Result<Vec<DayInfo>, SchedError> {
    let total = days_in_month(year, month).ok_or(SchedError::InvalidMonth { year, month })?;
    let last = limit.map_or(total, |l| l.min(total));

    (1..=last)
        .map(|day| {
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .ok_or(SchedError::InvalidMonth { year, month })?;
            Ok(DayInfo {
                day,
                weekday: date.weekday(),
                holiday: holidays.contains(&day),
            })
        })
        .collect()
}

/// Jour précédent/suivant sans sortir de `u32`.
pub(super) fn neighbours(day: u32) -> [Option<u32>; 2] {
    [day.checked_sub(1), day.checked_add(1)]
}
