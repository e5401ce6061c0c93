use super::util::DayInfo;
use crate::model::{ConstraintTarget, SpecialtyPriority, UnitConstraint};
use chrono::Weekday;
use rand::seq::SliceRandom;
use rand::Rng;

const PRIMARY_ONLY_DAY: u32 = 1000;
const SECONDARY_DAY: u32 = 100;
const SATURDAY: u32 = 10;
const SUNDAY: u32 = 5;

/// Difficulté d'un jour : plus le vivier de candidats est étroit, plus le
/// score est élevé.
pub(crate) fn difficulty(info: &DayInfo, constraints: &[UnitConstraint]) -> u32 {
    let mut score = 0;

    for c in constraints {
        let ConstraintTarget::Specialty(specialty) = &c.target else {
            continue;
        };
        if !c.allows(info.weekday) {
            continue;
        }
        match specialty.priority() {
            SpecialtyPriority::Primary if c.weekdays.iter().all(|d| *d == info.weekday) => {
                score = score.max(PRIMARY_ONLY_DAY);
            }
            SpecialtyPriority::Primary => {}
            SpecialtyPriority::Secondary => score = score.max(SECONDARY_DAY),
        }
    }

    score
        + match info.weekday {
            Weekday::Sat => SATURDAY,
            Weekday::Sun => SUNDAY,
            _ if info.holiday => SUNDAY,
            _ => 0,
        }
}

/// Ordre de traitement des jours, les plus difficiles d'abord. Avec
/// `randomize`, seules les égalités sont tirées au sort.
pub(crate) fn plan<R: Rng>(
    days: &[DayInfo],
    constraints: &[UnitConstraint],
    randomize: bool,
    rng: &mut R,
) -> Vec<DayInfo> {
    let mut order = days.to_vec();
    if randomize {
        order.shuffle(rng);
    }
    order.sort_by_key(|d| std::cmp::Reverse(difficulty(d, constraints)));
    order
}
