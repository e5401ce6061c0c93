use super::simulation::AttemptState;
use super::types::SearchOptions;
use super::util::DayInfo;
use super::Scheduler;
use crate::model::{ConstraintTarget, Service, StaffMember, Tier};
use chrono::Weekday;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Candidat retenu pour une position, avec son score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub staff: usize,
    pub score: i64,
    tiebreak: u32,
}

/// Filtre et classe les candidats pour `service` le jour `info`, meilleur en
/// premier. Les égalités exactes de score sont départagées au hasard.
pub(crate) fn rank<R: Rng>(
    engine: &Scheduler,
    service: &Service,
    info: &DayInfo,
    today: &HashSet<usize>,
    state: &AttemptState,
    opts: SearchOptions,
    rng: &mut R,
) -> Vec<Candidate> {
    let floors = TierFloors::compute(engine, state);

    let mut out: Vec<Candidate> = engine
        .staff
        .iter()
        .enumerate()
        .filter(|(idx, member)| {
            passes_hard(engine, *idx, member, service, info, today, state, opts)
        })
        .filter(|(idx, member)| {
            !opts.relaxation.enforces_fairness()
                || passes_fairness(member, state.stats[*idx].total, &floors)
        })
        .map(|(idx, member)| Candidate {
            staff: idx,
            score: score(engine, idx, member, service, info, state, opts),
            tiebreak: rng.random(),
        })
        .collect();

    out.sort_by_key(|c| (Reverse(c.score), Reverse(c.tiebreak)));
    out
}

/// Meilleur candidat, s'il en existe un.
pub(crate) fn best<R: Rng>(
    engine: &Scheduler,
    service: &Service,
    info: &DayInfo,
    today: &HashSet<usize>,
    state: &AttemptState,
    opts: SearchOptions,
    rng: &mut R,
) -> Option<Candidate> {
    rank(engine, service, info, today, state, opts, rng).into_iter().next()
}

/// Éligibilité d'unité : les juniors sont polyvalents ; les autres doivent
/// figurer dans la liste du service et respecter les jours de leur unité
/// puis ceux de leur spécialité (qui ne fait que restreindre).
pub(crate) fn unit_eligible(
    engine: &Scheduler,
    member: &StaffMember,
    service: &Service,
    weekday: Weekday,
) -> bool {
    if member.tier == Tier::Junior {
        return true;
    }
    if !service.allowed_units.is_empty() && !service.allowed_units.contains(&member.unit) {
        return false;
    }

    let unit_ok = engine
        .constraints
        .iter()
        .filter(|c| matches!(&c.target, ConstraintTarget::Unit(u) if *u == member.unit))
        .all(|c| c.allows(weekday));
    if !unit_ok {
        return false;
    }

    match member.specialty {
        Some(specialty) => engine
            .constraints
            .iter()
            .filter(|c| c.target == ConstraintTarget::Specialty(specialty))
            .all(|c| c.allows(weekday)),
        None => true,
    }
}

/// Taille du vivier potentiel d'un service pour ce jour.
pub(crate) fn pool_size(engine: &Scheduler, service: &Service, info: &DayInfo) -> usize {
    engine
        .staff
        .iter()
        .filter(|m| !m.unavailable.contains(&info.day))
        .filter(|m| unit_eligible(engine, m, service, info.weekday))
        .count()
}

#[allow(clippy::too_many_arguments)]
fn passes_hard(
    engine: &Scheduler,
    idx: usize,
    member: &StaffMember,
    service: &Service,
    info: &DayInfo,
    today: &HashSet<usize>,
    state: &AttemptState,
    opts: SearchOptions,
) -> bool {
    let day = info.day;

    if opts.force_tier.is_some_and(|t| t != member.tier) {
        return false;
    }
    if opts.exclude_tier == Some(member.tier) {
        return false;
    }
    if opts.force_specialty.is_some() && member.specialty != opts.force_specialty {
        return false;
    }

    if today.contains(&idx) || member.unavailable.contains(&day) {
        return false;
    }

    // une garde par 24 h
    if state.worked_near(idx, day) {
        return false;
    }

    if !unit_eligible(engine, member, service, info.weekday) {
        return false;
    }

    let roommate_busy = engine
        .roommates
        .of(idx)
        .iter()
        .any(|&mate| {
            today.contains(&mate)
                || state.worked_on(mate, Some(day))
                || state.worked_near(mate, day)
        });
    if roommate_busy {
        return false;
    }

    let stats = &state.stats[idx];
    if stats.total >= member.quota {
        return false;
    }
    if info.is_weekend() && stats.weekend >= member.weekend_limit {
        return false;
    }

    let weekend_adjacent = match info.weekday {
        Weekday::Sat => state.worked_on(idx, day.checked_sub(2)),
        Weekday::Sun => state.worked_on(idx, day.checked_sub(3)),
        Weekday::Thu => {
            state.worked_on(idx, day.checked_add(2)) || state.worked_on(idx, day.checked_add(3))
        }
        _ => false,
    };
    if weekend_adjacent {
        return false;
    }

    if opts.relaxation.enforces_group_affinity() {
        if let Some(group) = service.group_preference() {
            if member.group.as_deref().map(str::trim) != Some(group) {
                return false;
            }
        }
    }

    true
}

/// Minimum de gardes par niveau, sur l'ensemble du personnel actif.
struct TierFloors {
    floors: [Option<u32>; 3],
}

impl TierFloors {
    fn compute(engine: &Scheduler, state: &AttemptState) -> Self {
        let mut floors = [None; 3];
        for (member, stats) in engine.staff.iter().zip(&state.stats) {
            let slot: &mut Option<u32> = &mut floors[usize::from(member.tier.level() - 1)];
            *slot = Some(slot.map_or(stats.total, |m| m.min(stats.total)));
        }
        Self { floors }
    }

    fn of(&self, tier: Tier) -> Option<u32> {
        self.floors[usize::from(tier.level() - 1)]
    }
}

fn passes_fairness(member: &StaffMember, total: u32, floors: &TierFloors) -> bool {
    // les juniors passent avant les intermédiaires
    if member.tier == Tier::Experienced {
        if let Some(junior_floor) = floors.of(Tier::Junior) {
            if total >= junior_floor {
                return false;
            }
        }
    }

    match floors.of(member.tier) {
        Some(floor) => total <= floor + 1,
        None => true,
    }
}

fn score(
    engine: &Scheduler,
    idx: usize,
    member: &StaffMember,
    service: &Service,
    info: &DayInfo,
    state: &AttemptState,
    opts: SearchOptions,
) -> i64 {
    let w = &engine.config.weights;
    let stats = &state.stats[idx];
    let mut score = 0i64;

    if opts.reserved && opts.force_specialty.is_some() && member.specialty == opts.force_specialty {
        score += w.reserved_specialty;
    }

    if let Some(specialty) = member.specialty {
        let allowed_today = engine
            .constraints
            .iter()
            .any(|c| c.target == ConstraintTarget::Specialty(specialty) && c.allows(info.weekday));
        if allowed_today {
            score += w.specialty_day;
        }
    }

    if member.requested.contains(&info.day) {
        score += w.requested_day;
    }

    if member.tier == Tier::Junior {
        score += w.junior;
    }

    score += w.quota_hunger * i64::from(member.quota.saturating_sub(stats.total));

    if info.is_weekend() {
        score -= w.weekend_load * i64::from(stats.weekend);
    }

    if engine.config.prevent_every_other_day && state.worked_on(idx, info.day.checked_sub(2)) {
        score -= w.every_other_day;
    }

    if let Some(group) = service.group_preference() {
        if member.group.as_deref().map(str::trim) == Some(group) {
            score += w.group_match;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Specialty, StaffMember, Unit, UnitConstraint};
    use crate::scheduler::types::{Relaxation, ScheduleConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // octobre 2025 : 1er = mercredi, 2 = jeudi, 4 = samedi, 5 = dimanche
    fn engine(
        staff: Vec<StaffMember>,
        services: Vec<Service>,
        constraints: Vec<UnitConstraint>,
    ) -> Scheduler {
        engine_with(staff, services, constraints, ScheduleConfig::new(2025, 10))
    }

    fn engine_with(
        staff: Vec<StaffMember>,
        services: Vec<Service>,
        constraints: Vec<UnitConstraint>,
        config: ScheduleConfig,
    ) -> Scheduler {
        Scheduler::new(&staff, &services, &constraints, config).unwrap()
    }

    fn nurse(name: &str, tier: Tier, unit: Unit) -> StaffMember {
        StaffMember::new(name, tier, unit, 10, 4)
    }

    fn day(engine: &Scheduler, d: u32) -> DayInfo {
        engine.days[(d - 1) as usize]
    }

    fn names(engine: &Scheduler, ranked: &[Candidate]) -> Vec<String> {
        ranked.iter().map(|c| engine.staff[c.staff].name.clone()).collect()
    }

    /// Classement pour le premier service, sans autre affectation du jour.
    fn rank_day(
        e: &Scheduler,
        d: u32,
        state: &AttemptState,
        opts: SearchOptions,
        rng: &mut StdRng,
    ) -> Vec<Candidate> {
        rank(e, &e.services[0], &day(e, d), &HashSet::new(), state, opts, rng)
    }

    fn loose() -> SearchOptions {
        SearchOptions::default().with_relaxation(Relaxation::Desperate)
    }

    #[test]
    fn adjacent_day_blocks_candidate() {
        let e = engine(
            vec![nurse("a", Tier::Junior, Unit::Medical), nurse("b", Tier::Junior, Unit::Medical)],
            vec![Service::new("ward", "Ward", 1, 1)],
            vec![],
        );
        let mut state = AttemptState::new(2, 10);
        state.record(0, &day(&e, 7));
        let mut rng = StdRng::seed_from_u64(3);

        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["b"]);
    }

    #[test]
    fn allow_list_and_unit_days_apply_to_non_juniors_only() {
        let mut service = Service::new("icu", "ICU", 1, 2);
        service.allowed_units = vec![Unit::Icu];
        let e = engine(
            vec![
                nurse("icu-nurse", Tier::Experienced, Unit::Icu),
                nurse("ward-nurse", Tier::Experienced, Unit::Medical),
                nurse("junior", Tier::Junior, Unit::Medical),
            ],
            vec![service],
            vec![UnitConstraint::new(ConstraintTarget::Unit(Unit::Icu), vec![Weekday::Mon])],
        );
        let state = AttemptState::new(3, 10);
        let mut rng = StdRng::seed_from_u64(3);

        // mercredi 1er : l'unité ICU n'est autorisée que le lundi
        let ranked = rank_day(&e, 1, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["junior"]);

        // lundi 6
        let ranked = rank_day(&e, 6, &state, loose(), &mut rng);
        let mut got = names(&e, &ranked);
        got.sort();
        assert_eq!(got, vec!["icu-nurse", "junior"]);
    }

    #[test]
    fn specialty_constraint_only_narrows_unit_constraint() {
        let mut carrier = nurse("carrier", Tier::Experienced, Unit::Surgery);
        carrier.specialty = Some(Specialty::Wound);
        let e = engine(
            vec![carrier],
            vec![Service::new("ward", "Ward", 1, 1)],
            vec![
                UnitConstraint::new(
                    ConstraintTarget::Unit(Unit::Surgery),
                    vec![Weekday::Mon, Weekday::Tue],
                ),
                UnitConstraint::new(
                    ConstraintTarget::Specialty(Specialty::Wound),
                    vec![Weekday::Tue, Weekday::Fri],
                ),
            ],
        );
        let service = &e.services[0];
        // lundi 6 : unité ok, spécialité non
        assert!(!unit_eligible(&e, &e.staff[0], service, day(&e, 6).weekday));
        // vendredi 3 : spécialité ok, unité non
        assert!(!unit_eligible(&e, &e.staff[0], service, day(&e, 3).weekday));
        // mardi 7 : les deux
        assert!(unit_eligible(&e, &e.staff[0], service, day(&e, 7).weekday));
    }

    #[test]
    fn roommate_on_neighbouring_day_blocks() {
        let mut a = nurse("a", Tier::Junior, Unit::Medical);
        let mut b = nurse("b", Tier::Junior, Unit::Medical);
        a.room = "3".into();
        b.room = "3".into();
        let e = engine(vec![a, b], vec![Service::new("ward", "Ward", 1, 2)], vec![]);
        let mut state = AttemptState::new(2, 10);
        state.record(0, &day(&e, 9));
        let mut rng = StdRng::seed_from_u64(3);

        for d in [8, 10] {
            let ranked = rank_day(&e, d, &state, loose(), &mut rng);
            assert!(ranked.is_empty(), "day {d}");
        }
        let ranked = rank_day(&e, 14, &state, loose(), &mut rng);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn thursday_shift_blocks_weekend_and_back() {
        let e = engine(
            vec![nurse("a", Tier::Junior, Unit::Medical)],
            vec![Service::new("ward", "Ward", 1, 1)],
            vec![],
        );
        let mut rng = StdRng::seed_from_u64(3);

        let mut state = AttemptState::new(1, 10);
        state.record(0, &day(&e, 2)); // jeudi
        assert!(rank_day(&e, 4, &state, loose(), &mut rng).is_empty());
        assert!(rank_day(&e, 5, &state, loose(), &mut rng).is_empty());

        let mut state = AttemptState::new(1, 10);
        state.record(0, &day(&e, 11)); // samedi
        assert!(rank_day(&e, 9, &state, loose(), &mut rng).is_empty());
    }

    #[test]
    fn weekend_limit_is_never_relaxed() {
        let mut a = nurse("a", Tier::Junior, Unit::Medical);
        a.weekend_limit = 1;
        let e = engine(vec![a], vec![Service::new("ward", "Ward", 1, 1)], vec![]);
        let mut state = AttemptState::new(1, 10);
        state.record(0, &day(&e, 4));
        let mut rng = StdRng::seed_from_u64(3);

        let deep = SearchOptions::default().with_relaxation(Relaxation::DeepDesperate);
        assert!(rank_day(&e, 11, &state, deep, &mut rng).is_empty());
        assert_eq!(rank_day(&e, 8, &state, deep, &mut rng).len(), 1);
    }

    #[test]
    fn group_affinity_relaxed_only_when_deep_desperate() {
        let mut service = Service::new("ward", "Ward", 1, 1);
        service.preferred_group = Some("A".into());
        let mut a = nurse("a", Tier::Junior, Unit::Medical);
        a.group = Some("B".into());
        let e = engine(vec![a], vec![service], vec![]);
        let state = AttemptState::new(1, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let info = day(&e, 8);

        assert!(rank_day(&e, info.day, &state, loose(), &mut rng).is_empty());
        let deep = SearchOptions::default().with_relaxation(Relaxation::DeepDesperate);
        assert_eq!(rank_day(&e, info.day, &state, deep, &mut rng).len(), 1);
    }

    #[test]
    fn juniors_catch_up_before_experienced_in_strict_mode() {
        let e = engine(
            vec![
                nurse("mid", Tier::Experienced, Unit::Medical),
                nurse("jr", Tier::Junior, Unit::Medical),
            ],
            vec![Service::new("ward", "Ward", 1, 1)],
            vec![],
        );
        let state = AttemptState::new(2, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let info = day(&e, 8);
        let mut today = HashSet::new();
        today.insert(1);

        let strict = SearchOptions::default();
        assert!(rank(&e, &e.services[0], &info, &today, &state, strict, &mut rng).is_empty());
        let ranked = rank(&e, &e.services[0], &info, &today, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["mid"]);
    }

    #[test]
    fn horizontal_spread_capped_at_one() {
        let e = engine(
            vec![nurse("a", Tier::Junior, Unit::Medical), nurse("b", Tier::Junior, Unit::Medical)],
            vec![Service::new("ward", "Ward", 1, 1)],
            vec![],
        );
        let mut state = AttemptState::new(2, 10);
        state.record(0, &day(&e, 1));
        state.record(0, &day(&e, 3));
        let mut today = HashSet::new();
        today.insert(1);
        let mut rng = StdRng::seed_from_u64(3);

        let strict = SearchOptions::default();
        let ranked = rank(&e, &e.services[0], &day(&e, 8), &today, &state, strict, &mut rng);
        assert!(ranked.is_empty());
    }

    #[test]
    fn quota_hunger_and_requests_drive_ordering() {
        let mut hungry = nurse("hungry", Tier::Junior, Unit::Medical);
        hungry.quota = 12;
        let mut asked = nurse("asked", Tier::Junior, Unit::Medical);
        asked.quota = 8;
        asked.requested.insert(8);
        let plain = nurse("plain", Tier::Junior, Unit::Medical);
        let services = vec![Service::new("ward", "Ward", 1, 3)];
        let e = engine(vec![hungry, asked, plain], services, vec![]);
        let state = AttemptState::new(3, 10);
        let mut rng = StdRng::seed_from_u64(9);

        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["asked", "hungry", "plain"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn forced_tier_and_specialty_filter() {
        let mut carrier = nurse("carrier", Tier::Experienced, Unit::Medical);
        carrier.specialty = Some(Specialty::Ecmo);
        let e = engine(
            vec![
                nurse("senior", Tier::Senior, Unit::Medical),
                carrier,
                nurse("jr", Tier::Junior, Unit::Medical),
            ],
            vec![Service::new("ward", "Ward", 1, 3)],
            vec![],
        );
        let state = AttemptState::new(3, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let info = day(&e, 8);

        let senior = SearchOptions { force_tier: Some(Tier::Senior), ..loose() };
        assert_eq!(names(&e, &rank_day(&e, info.day, &state, senior, &mut rng)), vec!["senior"]);

        let ecmo = SearchOptions {
            force_specialty: Some(Specialty::Ecmo),
            reserved: true,
            ..loose()
        };
        let ranked = rank_day(&e, info.day, &state, ecmo, &mut rng);
        assert_eq!(names(&e, &ranked), vec!["carrier"]);

        let no_senior = SearchOptions { exclude_tier: Some(Tier::Senior), ..loose() };
        assert_eq!(rank_day(&e, info.day, &state, no_senior, &mut rng).len(), 2);
    }
    #[test]
    fn every_other_day_penalty_only_when_enabled() {
        // a a déjà une garde : quota relevé pour égaliser la faim de quota
        let mut a = nurse("a", Tier::Junior, Unit::Medical);
        a.quota = 11;
        let staff = vec![a, nurse("b", Tier::Junior, Unit::Medical)];
        let services = vec![Service::new("ward", "Ward", 1, 2)];
        let mut rng = StdRng::seed_from_u64(5);

        let e = engine(staff.clone(), services.clone(), vec![]);
        let mut state = AttemptState::new(2, 10);
        state.record(0, &day(&e, 6));
        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(ranked[0].score, ranked[1].score);

        let mut config = ScheduleConfig::new(2025, 10);
        config.prevent_every_other_day = true;
        let e = engine_with(staff, services, vec![], config);
        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["b", "a"]);
        assert_eq!(ranked[0].score - ranked[1].score, e.config.weights.every_other_day);
    }

    #[test]
    fn weekend_load_lowers_rank_on_weekends_only() {
        let mut a = nurse("a", Tier::Junior, Unit::Medical);
        a.quota = 11;
        let e = engine(
            vec![a, nurse("b", Tier::Junior, Unit::Medical)],
            vec![Service::new("ward", "Ward", 1, 2)],
            vec![],
        );
        let mut state = AttemptState::new(2, 10);
        state.record(0, &day(&e, 4)); // samedi
        let mut rng = StdRng::seed_from_u64(5);

        // samedi 11
        let ranked = rank_day(&e, 11, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["b", "a"]);
        assert_eq!(ranked[0].score - ranked[1].score, e.config.weights.weekend_load);

        // mercredi 8
        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn matching_group_ranks_first_once_affinity_is_relaxed() {
        let mut service = Service::new("ward", "Ward", 1, 2);
        service.preferred_group = Some("A".into());
        let mut other = nurse("other", Tier::Junior, Unit::Medical);
        other.group = Some("B".into());
        let mut member = nurse("member", Tier::Junior, Unit::Medical);
        member.group = Some(" A ".into());
        let e = engine(vec![other, member], vec![service], vec![]);
        let state = AttemptState::new(2, 10);
        let mut rng = StdRng::seed_from_u64(5);

        let deep = SearchOptions::default().with_relaxation(Relaxation::DeepDesperate);
        let ranked = rank_day(&e, 8, &state, deep, &mut rng);
        assert_eq!(names(&e, &ranked), vec!["member", "other"]);
        assert_eq!(ranked[0].score - ranked[1].score, e.config.weights.group_match);
    }

    #[test]
    fn specialty_carrier_favoured_on_allowed_days() {
        let mut carrier = nurse("carrier", Tier::Junior, Unit::Medical);
        carrier.specialty = Some(Specialty::Ostomy);
        let e = engine(
            vec![nurse("plain", Tier::Junior, Unit::Medical), carrier],
            vec![Service::new("ward", "Ward", 1, 2)],
            vec![UnitConstraint::new(
                ConstraintTarget::Specialty(Specialty::Ostomy),
                vec![Weekday::Tue],
            )],
        );
        let state = AttemptState::new(2, 10);
        let mut rng = StdRng::seed_from_u64(5);

        // mardi 7
        let ranked = rank_day(&e, 7, &state, loose(), &mut rng);
        assert_eq!(names(&e, &ranked), vec!["carrier", "plain"]);
        assert_eq!(ranked[0].score - ranked[1].score, e.config.weights.specialty_day);

        // mercredi 8
        let ranked = rank_day(&e, 8, &state, loose(), &mut rng);
        assert_eq!(ranked[0].score, ranked[1].score);
    }

    #[test]
    fn junior_carrier_ignores_specialty_weekdays() {
        let mut junior = nurse("junior", Tier::Junior, Unit::Medical);
        junior.specialty = Some(Specialty::Transplant);
        let mut senior = nurse("senior", Tier::Senior, Unit::Medical);
        senior.specialty = Some(Specialty::Transplant);
        let e = engine(
            vec![junior, senior],
            vec![Service::new("ward", "Ward", 1, 2)],
            vec![UnitConstraint::new(
                ConstraintTarget::Specialty(Specialty::Transplant),
                vec![Weekday::Tue],
            )],
        );
        let service = &e.services[0];

        for d in [2, 3, 5, 7] {
            assert!(unit_eligible(&e, &e.staff[0], service, day(&e, d).weekday), "day {d}");
        }
        // le senior reste limité au mardi
        assert!(unit_eligible(&e, &e.staff[1], service, day(&e, 7).weekday));
        assert!(!unit_eligible(&e, &e.staff[1], service, day(&e, 2).weekday));
    }
}
