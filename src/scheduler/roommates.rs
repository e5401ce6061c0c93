use crate::model::StaffMember;
use std::collections::BTreeMap;

/// Colocations : pour chaque membre (par index), les autres membres
/// partageant la même chambre. Calculé une fois, en lecture seule ensuite.
#[derive(Debug, Clone, Default)]
pub(crate) struct Roommates {
    mates: Vec<Vec<usize>>,
    rooms: BTreeMap<String, Vec<usize>>,
}

impl Roommates {
    pub fn analyze(staff: &[StaffMember]) -> Self {
        let mut rooms: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, member) in staff.iter().enumerate() {
            let room = member.room.trim();
            if room.is_empty() {
                continue;
            }
            rooms.entry(room.to_string()).or_default().push(idx);
        }

        let mut mates = vec![Vec::new(); staff.len()];
        for members in rooms.values() {
            for &idx in members {
                mates[idx] = members.iter().copied().filter(|&m| m != idx).collect();
            }
        }
        rooms.retain(|_, members| members.len() > 1);

        Self { mates, rooms }
    }

    pub fn of(&self, idx: usize) -> &[usize] {
        self.mates.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Chambres partagées par au moins deux membres.
    pub fn shared_rooms(&self) -> impl Iterator<Item = (&str, &[usize])> + '_ {
        self.rooms.iter().map(|(room, members)| (room.as_str(), members.as_slice()))
    }
}
