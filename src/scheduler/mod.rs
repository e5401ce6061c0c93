mod candidate;
mod conflicts;
mod day_order;
mod roommates;
mod simulation;
mod slot_filler;
mod types;
mod util;

pub use types::{
    Conflict, ConflictKind, Relaxation, SchedError, ScheduleConfig, ScoreWeights, SearchOptions,
};
pub use util::days_in_month;

use crate::model::{
    AttemptSummary, ScheduleResult, Service, StaffId, StaffMember, UnitConstraint,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roommates::Roommates;
use util::DayInfo;

/// Scheduler : moteur de génération construit une fois par demande, à
/// partir d'une photo immuable du personnel actif, des services et des
/// contraintes.
#[derive(Debug)]
pub struct Scheduler {
    staff: Vec<StaffMember>,
    services: Vec<Service>,
    constraints: Vec<UnitConstraint>,
    config: ScheduleConfig,
    roommates: Roommates,
    days: Vec<DayInfo>,
    /// Remarques de construction, recopiées dans chaque journal.
    notes: Vec<String>,
}

impl Scheduler {
    pub fn new(
        staff: &[StaffMember],
        services: &[Service],
        constraints: &[UnitConstraint],
        config: ScheduleConfig,
    ) -> Result<Self, SchedError> {
        if config.max_attempts < 1 {
            return Err(SchedError::NoAttempts);
        }
        let days = util::month_days(config.year, config.month, &config.holidays, config.day_limit)?;

        let staff: Vec<StaffMember> = staff.iter().filter(|m| m.active).cloned().collect();
        let notes = services
            .iter()
            .filter(|s| s.max_staff < s.min_staff)
            .map(|s| {
                format!(
                    "service {}: max {} below min {}, capped at min",
                    s.name, s.max_staff, s.min_staff
                )
            })
            .collect();

        Ok(Self {
            roommates: Roommates::analyze(&staff),
            staff,
            services: services.to_vec(),
            constraints: constraints.to_vec(),
            config,
            days,
            notes,
        })
    }

    pub fn staff(&self) -> &[StaffMember] {
        &self.staff
    }
    pub fn services(&self) -> &[Service] {
        &self.services
    }
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Colocataires d'un membre (vide si chambre absente ou isolée).
    pub fn roommates_of(&self, id: &StaffId) -> Vec<&StaffMember> {
        self.staff
            .iter()
            .position(|m| &m.id == id)
            .map(|idx| self.roommates.of(idx).iter().map(|&m| &self.staff[m]).collect())
            .unwrap_or_default()
    }

    /// Génère avec une source aléatoire graine `config.seed`, ou issue de
    /// l'OS à défaut.
    pub fn generate(&self) -> ScheduleResult {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.generate_with_rng(&mut rng)
    }

    /// Lance `max_attempts` tentatives et garde la meilleure : moins de
    /// positions vides, puis plus faible écart total aux quotas.
    pub fn generate_with_rng<R: Rng>(&self, rng: &mut R) -> ScheduleResult {
        let mut best = simulation::run(self, &mut *rng);
        let mut chosen = 0;
        let mut summaries = vec![summarize(&best)];
        debug_log!(
            attempt = 0,
            unfilled = best.state.unfilled,
            deviation = best.quota_deviation,
            "attempt finished"
        );

        for attempt in 1..self.config.max_attempts as usize {
            let outcome = simulation::run(self, &mut *rng);
            let summary = summarize(&outcome);
            debug_log!(
                attempt,
                unfilled = summary.unfilled,
                deviation = summary.quota_deviation,
                "attempt finished"
            );
            summaries.push(summary);

            let current = (best.state.unfilled, best.quota_deviation);
            if (summary.unfilled, summary.quota_deviation) < current {
                best = outcome;
                chosen = attempt;
            }
        }
        debug_log!(chosen, unfilled = best.state.unfilled, "best attempt selected");

        self.build_result(chosen, best, summaries)
    }

    /// Une seule tentative, sans sélection.
    pub fn run_attempt<R: Rng>(&self, rng: &mut R) -> ScheduleResult {
        let outcome = simulation::run(self, rng);
        let summary = summarize(&outcome);
        self.build_result(0, outcome, vec![summary])
    }

    /// Vérifie un planning contre les règles dures.
    pub fn audit(&self, result: &ScheduleResult) -> Vec<Conflict> {
        conflicts::audit(self, result)
    }

    fn build_result(
        &self,
        chosen: usize,
        outcome: simulation::AttemptOutcome,
        attempts: Vec<AttemptSummary>,
    ) -> ScheduleResult {
        let simulation::AttemptOutcome {
            days,
            state,
            quota_deviation,
        } = outcome;
        let statistics = self
            .staff
            .iter()
            .zip(&state.stats)
            .map(|(m, s)| (m.id.clone(), *s))
            .collect();
        let unfilled = state.unfilled;
        let (log, log_dropped) = state.log.into_parts();

        ScheduleResult {
            year: self.config.year,
            month: self.config.month,
            days,
            unfilled,
            quota_deviation,
            chosen_attempt: chosen,
            attempts,
            log,
            log_dropped,
            statistics,
        }
    }
}

fn summarize(outcome: &simulation::AttemptOutcome) -> AttemptSummary {
    AttemptSummary {
        unfilled: outcome.state.unfilled,
        quota_deviation: outcome.quota_deviation,
    }
}

/// Point d'entrée unique : construit le moteur et génère le planning.
pub fn generate(
    staff: &[StaffMember],
    services: &[Service],
    constraints: &[UnitConstraint],
    config: &ScheduleConfig,
) -> Result<ScheduleResult, SchedError> {
    Ok(Scheduler::new(staff, services, constraints, config.clone())?.generate())
}
