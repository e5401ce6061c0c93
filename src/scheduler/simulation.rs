use super::util::{self, DayInfo};
use super::{day_order, slot_filler, Scheduler};
use crate::model::{DayPlan, StaffStatistics};
use chrono::Weekday;
use rand::Rng;
use std::collections::BTreeSet;

/// Journal de diagnostic borné ; au-delà de la capacité, les entrées sont
/// seulement comptées.
#[derive(Debug, Clone, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<String>,
    capacity: usize,
    dropped: usize,
}

impl DiagnosticLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            dropped: 0,
        }
    }

    pub fn push<S: Into<String>>(&mut self, entry: S) {
        if self.entries.len() < self.capacity {
            self.entries.push(entry.into());
        } else {
            self.dropped += 1;
        }
    }

    pub fn into_parts(self) -> (Vec<String>, usize) {
        (self.entries, self.dropped)
    }
}

/// État propre à une tentative : jours travaillés et compteurs par membre
/// (indexés comme `Scheduler::staff`), positions vides, journal.
#[derive(Debug, Clone)]
pub(crate) struct AttemptState {
    worked: Vec<BTreeSet<u32>>,
    pub stats: Vec<StaffStatistics>,
    pub unfilled: u32,
    pub log: DiagnosticLog,
}

impl AttemptState {
    pub fn new(staff_count: usize, log_capacity: usize) -> Self {
        Self {
            worked: vec![BTreeSet::new(); staff_count],
            stats: vec![StaffStatistics::default(); staff_count],
            unfilled: 0,
            log: DiagnosticLog::with_capacity(log_capacity),
        }
    }

    pub fn worked_on(&self, idx: usize, day: Option<u32>) -> bool {
        match day {
            Some(d) => self.worked.get(idx).is_some_and(|days| days.contains(&d)),
            None => false,
        }
    }

    /// Garde la veille ou le lendemain.
    pub fn worked_near(&self, idx: usize, day: u32) -> bool {
        util::neighbours(day).into_iter().any(|d| self.worked_on(idx, d))
    }

    /// Enregistre une garde effective.
    pub fn record(&mut self, idx: usize, info: &DayInfo) {
        self.worked[idx].insert(info.day);
        let stats = &mut self.stats[idx];
        stats.total += 1;
        if info.is_weekend() {
            stats.weekend += 1;
        } else {
            stats.weekday += 1;
        }
        match info.weekday {
            Weekday::Sat => stats.saturday += 1,
            Weekday::Sun => stats.sunday += 1,
            _ => {}
        }
    }
}

/// Issue d'une tentative complète.
#[derive(Debug, Clone)]
pub(crate) struct AttemptOutcome {
    pub days: Vec<DayPlan>,
    pub state: AttemptState,
    pub quota_deviation: u32,
}

/// Simule un mois complet : ordre des jours calculé une fois, puis
/// remplissage jour par jour sur un état partagé par la tentative.
pub(crate) fn run<R: Rng>(engine: &Scheduler, rng: &mut R) -> AttemptOutcome {
    let mut state = AttemptState::new(engine.staff.len(), engine.config.log_capacity);
    for note in &engine.notes {
        state.log.push(note.clone());
    }

    let order = day_order::plan(
        &engine.days,
        &engine.constraints,
        engine.config.randomize_day_order,
        rng,
    );

    let mut days = Vec::with_capacity(order.len());
    for info in &order {
        days.push(slot_filler::fill_day(engine, info, &mut state, &mut *rng));
    }
    days.sort_by_key(|p: &DayPlan| p.day);

    let quota_deviation = engine
        .staff
        .iter()
        .zip(&state.stats)
        .map(|(member, stats)| member.quota.abs_diff(stats.total))
        .sum();

    AttemptOutcome {
        days,
        state,
        quota_deviation,
    }
}
