use super::candidate;
use super::simulation::AttemptState;
use super::types::{Relaxation, SearchOptions};
use super::util::DayInfo;
use super::Scheduler;
use crate::model::{Assignment, ConstraintTarget, DayPlan, Tier};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Garde-fou de la phase d'équilibrage.
const MAX_BALANCE_ITERATIONS: usize = 256;

/// Remplit une journée en quatre phases : réservation des spécialités,
/// un senior, minimums par service, puis équilibrage vers l'objectif.
pub(crate) fn fill_day<R: Rng>(
    engine: &Scheduler,
    info: &DayInfo,
    state: &mut AttemptState,
    rng: &mut R,
) -> DayPlan {
    let pools = engine
        .services
        .iter()
        .map(|service| candidate::pool_size(engine, service, info))
        .collect();

    let mut filler = DayFiller {
        engine,
        info,
        state,
        rng,
        pools,
        today: HashSet::new(),
        senior_placed: false,
        assignments: Vec::new(),
    };

    filler.reserve_specialties();
    filler.place_senior();
    filler.fill_minimums();
    filler.balance_to_target();

    DayPlan {
        day: info.day,
        weekday: info.weekday,
        weekend: info.is_weekend(),
        holiday: info.holiday,
        assignments: filler.assignments,
    }
}

struct DayFiller<'a, R> {
    engine: &'a Scheduler,
    info: &'a DayInfo,
    state: &'a mut AttemptState,
    rng: &'a mut R,
    /// Vivier potentiel par service (même index que `engine.services`).
    pools: Vec<usize>,
    today: HashSet<usize>,
    senior_placed: bool,
    assignments: Vec<Assignment>,
}

impl<R: Rng> DayFiller<'_, R> {
    /// Phase 0 : chaque spécialité autorisée aujourd'hui doit être présente.
    fn reserve_specialties(&mut self) {
        let engine = self.engine;
        for constraint in &engine.constraints {
            let ConstraintTarget::Specialty(specialty) = &constraint.target else {
                continue;
            };
            let specialty = *specialty;
            if !constraint.allows(self.info.weekday) {
                continue;
            }
            let covered = self
                .today
                .iter()
                .any(|&idx| engine.staff[idx].specialty == Some(specialty));
            if covered {
                continue;
            }

            let opts = SearchOptions {
                force_specialty: Some(specialty),
                reserved: true,
                ..SearchOptions::default()
            };
            let mut placed = false;
            for si in self.by_difficulty() {
                if self.occupied(si) >= engine.services[si].capacity() {
                    continue;
                }
                if let Some(idx) = self.search(si, opts, &Relaxation::SOFT_LADDER) {
                    self.place(si, idx);
                    placed = true;
                    break;
                }
            }
            if !placed {
                let day = self.info.day;
                self.state
                    .log
                    .push(format!("day {day}: no {} carrier available", specialty.display_name()));
            }
        }
    }

    /// Phase 1 : un senior par jour, dans un service tiré au sort.
    fn place_senior(&mut self) {
        if self.senior_placed {
            return;
        }
        let engine = self.engine;
        let mut order: Vec<usize> = (0..engine.services.len()).collect();
        order.shuffle(&mut *self.rng);

        let opts = SearchOptions {
            force_tier: Some(Tier::Senior),
            ..SearchOptions::default()
        };
        for si in order {
            if self.occupied(si) >= engine.services[si].min_staff {
                continue;
            }
            if let Some(idx) = self.search(si, opts, &Relaxation::SOFT_LADDER) {
                self.place(si, idx);
                return;
            }
        }
    }

    /// Phase 2 : minimum de chaque service, les plus difficiles d'abord.
    fn fill_minimums(&mut self) {
        let engine = self.engine;
        for si in self.by_difficulty() {
            while self.occupied(si) < engine.services[si].min_staff {
                match self.search(si, self.base_options(), &Relaxation::FULL_LADDER) {
                    Some(idx) => self.place(si, idx),
                    None => self.leave_empty(si),
                }
            }
        }
    }

    /// Phase 3 : compléter jusqu'à l'objectif journalier, en privilégiant les
    /// services au plus grand vivier.
    fn balance_to_target(&mut self) {
        let engine = self.engine;
        let target = engine.config.daily_target;

        for _ in 0..MAX_BALANCE_ITERATIONS {
            if self.filled_total() >= target {
                return;
            }
            let mut open: Vec<usize> = (0..engine.services.len())
                .filter(|&si| self.occupied(si) < engine.services[si].capacity())
                .collect();
            if open.is_empty() {
                return;
            }
            open.sort_by_key(|&si| Reverse(self.pools[si]));

            let mut placed = false;
            for si in open {
                if let Some(idx) = self.search(si, self.base_options(), &Relaxation::SOFT_LADDER) {
                    self.place(si, idx);
                    placed = true;
                    break;
                }
            }
            if !placed {
                return;
            }
        }
    }

    fn base_options(&self) -> SearchOptions {
        SearchOptions {
            exclude_tier: self.senior_placed.then_some(Tier::Senior),
            ..SearchOptions::default()
        }
    }

    /// Essaie chaque profil de l'échelle dans l'ordre.
    fn search(&mut self, si: usize, base: SearchOptions, ladder: &[Relaxation]) -> Option<usize> {
        let engine = self.engine;
        let service = &engine.services[si];
        ladder.iter().find_map(|&relaxation| {
            candidate::best(
                engine,
                service,
                self.info,
                &self.today,
                &*self.state,
                base.with_relaxation(relaxation),
                &mut *self.rng,
            )
            .map(|c| c.staff)
        })
    }

    fn place(&mut self, si: usize, idx: usize) {
        let engine = self.engine;
        let member = &engine.staff[idx];
        let service = &engine.services[si];

        self.state.record(idx, self.info);
        self.today.insert(idx);
        if member.tier == Tier::Senior {
            self.senior_placed = true;
        }
        self.assignments.push(Assignment {
            day: self.info.day,
            service: service.id.clone(),
            staff: Some(member.into()),
            emergency: service.emergency,
        });
    }

    fn leave_empty(&mut self, si: usize) {
        let engine = self.engine;
        let service = &engine.services[si];
        self.state.unfilled += 1;
        self.state
            .log
            .push(format!("day {}: {} position left empty", self.info.day, service.name));
        self.assignments.push(Assignment {
            day: self.info.day,
            service: service.id.clone(),
            staff: None,
            emergency: service.emergency,
        });
    }

    /// Positions occupées (y compris vides) pour un service.
    fn occupied(&self, si: usize) -> u32 {
        let id = &self.engine.services[si].id;
        self.assignments.iter().filter(|a| &a.service == id).count() as u32
    }

    fn filled_total(&self) -> u32 {
        self.assignments.iter().filter(|a| !a.is_empty()).count() as u32
    }

    /// Services du plus difficile (vivier le plus petit) au plus facile.
    fn by_difficulty(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.pools.len()).collect();
        order.sort_by_key(|&si| self.pools[si]);
        order
    }
}
