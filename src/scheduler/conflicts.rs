use super::{Conflict, ConflictKind, Scheduler};
use crate::model::{ScheduleResult, StaffId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Revérifie un planning terminé contre les règles dures.
pub(super) fn audit(scheduler: &Scheduler, result: &ScheduleResult) -> Vec<Conflict> {
    let mut out = Vec::new();
    let index: HashMap<&StaffId, usize> = scheduler
        .staff
        .iter()
        .enumerate()
        .map(|(idx, m)| (&m.id, idx))
        .collect();

    let n = scheduler.staff.len();
    let mut worked: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); n];
    let mut totals = vec![0u32; n];
    let mut weekends = vec![0u32; n];

    for plan in &result.days {
        let mut seen = HashSet::new();
        for assignment in plan.filled() {
            let Some(&idx) = assignment.staff_id().and_then(|id| index.get(id)) else {
                continue;
            };
            if !seen.insert(idx) {
                out.push(Conflict {
                    kind: ConflictKind::DoubleAssignment,
                    day: Some(plan.day),
                    staff: vec![scheduler.staff[idx].id.clone()],
                    service: Some(assignment.service.clone()),
                });
            }
            worked[idx].insert(plan.day);
            totals[idx] += 1;
            if plan.weekend {
                weekends[idx] += 1;
            }
        }

        for service in &scheduler.services {
            let filled = plan.for_service(&service.id).filter(|a| !a.is_empty()).count();
            if filled > service.capacity() as usize {
                out.push(Conflict {
                    kind: ConflictKind::OverCapacity,
                    day: Some(plan.day),
                    staff: Vec::new(),
                    service: Some(service.id.clone()),
                });
            }
        }
    }

    for (idx, member) in scheduler.staff.iter().enumerate() {
        for &day in &worked[idx] {
            if day.checked_add(1).is_some_and(|next| worked[idx].contains(&next)) {
                out.push(Conflict {
                    kind: ConflictKind::ConsecutiveDays,
                    day: Some(day),
                    staff: vec![member.id.clone()],
                    service: None,
                });
            }
        }
        if totals[idx] > member.quota {
            out.push(Conflict {
                kind: ConflictKind::QuotaExceeded,
                day: None,
                staff: vec![member.id.clone()],
                service: None,
            });
        }
        if weekends[idx] > member.weekend_limit {
            out.push(Conflict {
                kind: ConflictKind::WeekendLimitExceeded,
                day: None,
                staff: vec![member.id.clone()],
                service: None,
            });
        }
    }

    for (_, members) in scheduler.roommates.shared_rooms() {
        for (pos, &a) in members.iter().enumerate() {
            for &b in members.iter().skip(pos + 1) {
                for &day in &worked[a] {
                    let clash = [day.checked_sub(1), Some(day), day.checked_add(1)]
                        .into_iter()
                        .flatten()
                        .any(|d| worked[b].contains(&d));
                    if clash {
                        out.push(Conflict {
                            kind: ConflictKind::RoommateClash,
                            day: Some(day),
                            staff: vec![
                                scheduler.staff[a].id.clone(),
                                scheduler.staff[b].id.clone(),
                            ],
                            service: None,
                        });
                    }
                }
            }
        }
    }

    out
}
