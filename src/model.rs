use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifiant fort pour un membre du personnel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffId(String);

impl StaffId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifiant fort pour un service (type de créneau de garde)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Niveau d'ancienneté, ordonné du plus expérimenté au plus jeune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Senior,
    Experienced,
    Junior,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Senior, Tier::Experienced, Tier::Junior];

    /// Niveau numérique (1 = senior, 3 = junior).
    pub fn level(self) -> u8 {
        match self {
            Tier::Senior => 1,
            Tier::Experienced => 2,
            Tier::Junior => 3,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Tier::Senior),
            2 => Some(Tier::Experienced),
            3 => Some(Tier::Junior),
            _ => None,
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if let Ok(level) = raw.parse::<u8>() {
            return Tier::from_level(level).ok_or_else(|| format!("unknown tier level: {raw}"));
        }
        match raw.to_ascii_lowercase().as_str() {
            "senior" => Ok(Tier::Senior),
            "experienced" => Ok(Tier::Experienced),
            "junior" => Ok(Tier::Junior),
            _ => Err(format!("unknown tier: {raw}")),
        }
    }
}

/// Unité de rattachement. Les unités connues ont une étiquette stable,
/// les autres passent par `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Icu,
    Emergency,
    Surgery,
    Medical,
    Pediatrics,
    OperatingRoom,
    Dialysis,
    Other(String),
}

impl Unit {
    /// Étiquette utilisée dans les fichiers (JSON/CSV).
    pub fn tag(&self) -> &str {
        match self {
            Unit::Icu => "icu",
            Unit::Emergency => "emergency",
            Unit::Surgery => "surgery",
            Unit::Medical => "medical",
            Unit::Pediatrics => "pediatrics",
            Unit::OperatingRoom => "operating-room",
            Unit::Dialysis => "dialysis",
            Unit::Other(name) => name,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Unit::Icu => "Intensive care",
            Unit::Emergency => "Emergency",
            Unit::Surgery => "Surgery",
            Unit::Medical => "Internal medicine",
            Unit::Pediatrics => "Pediatrics",
            Unit::OperatingRoom => "Operating room",
            Unit::Dialysis => "Dialysis",
            Unit::Other(name) => name,
        }
    }
}

impl From<String> for Unit {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "icu" => Unit::Icu,
            "emergency" | "er" => Unit::Emergency,
            "surgery" => Unit::Surgery,
            "medical" => Unit::Medical,
            "pediatrics" => Unit::Pediatrics,
            "operating-room" | "or" => Unit::OperatingRoom,
            "dialysis" => Unit::Dialysis,
            _ => Unit::Other(raw.trim().to_string()),
        }
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.tag().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Priorité d'une spécialité pour l'ordonnancement des jours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialtyPriority {
    Primary,
    Secondary,
}

/// Compétence rare, restreinte à certains jours de la semaine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialty {
    Transplant,
    Wound,
    Ostomy,
    Ecmo,
}

impl Specialty {
    pub fn tag(self) -> &'static str {
        match self {
            Specialty::Transplant => "transplant",
            Specialty::Wound => "wound",
            Specialty::Ostomy => "ostomy",
            Specialty::Ecmo => "ecmo",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Specialty::Transplant => "Transplant coordination",
            Specialty::Wound => "Wound care",
            Specialty::Ostomy => "Ostomy care",
            Specialty::Ecmo => "ECMO",
        }
    }

    pub fn priority(self) -> SpecialtyPriority {
        match self {
            Specialty::Transplant => SpecialtyPriority::Primary,
            Specialty::Wound | Specialty::Ostomy | Specialty::Ecmo => SpecialtyPriority::Secondary,
        }
    }
}

impl FromStr for Specialty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transplant" => Ok(Specialty::Transplant),
            "wound" => Ok(Specialty::Wound),
            "ostomy" => Ok(Specialty::Ostomy),
            "ecmo" => Ok(Specialty::Ecmo),
            other => Err(format!("unknown specialty: {other}")),
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn default_true() -> bool {
    true
}

/// Membre du personnel soignant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub tier: Tier,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<Specialty>,
    /// Chambre partagée ; vide = aucun conflit de colocation.
    #[serde(default)]
    pub room: String,
    pub quota: u32,
    pub weekend_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unavailable: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub requested: BTreeSet<u32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl StaffMember {
    pub fn new<N: Into<String>>(
        name: N,
        tier: Tier,
        unit: Unit,
        quota: u32,
        weekend_limit: u32,
    ) -> Self {
        Self {
            id: StaffId::random(),
            name: name.into(),
            tier,
            unit,
            specialty: None,
            room: String::new(),
            quota,
            weekend_limit,
            group: None,
            unavailable: BTreeSet::new(),
            requested: BTreeSet::new(),
            active: true,
        }
    }
}

/// Service : catégorie de garde avec un effectif journalier min/max.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub min_staff: u32,
    pub max_staff: u32,
    /// Unités admises ; vide = ouvert à tous.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_units: Vec<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_group: Option<String>,
    #[serde(default)]
    pub emergency: bool,
}

impl Service {
    pub fn new<I: AsRef<str>, N: Into<String>>(
        id: I,
        name: N,
        min_staff: u32,
        max_staff: u32,
    ) -> Self {
        Self {
            id: ServiceId::new(id),
            name: name.into(),
            min_staff,
            max_staff,
            allowed_units: Vec::new(),
            preferred_group: None,
            emergency: false,
        }
    }

    /// Capacité effective : un max inférieur au min est ramené au min.
    pub fn capacity(&self) -> u32 {
        self.max_staff.max(self.min_staff)
    }

    /// Groupe préféré, `None` si absent ou "any".
    pub fn group_preference(&self) -> Option<&str> {
        self.preferred_group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("any"))
    }
}

/// Cible d'une contrainte de jours : une unité ou une spécialité.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ConstraintTarget {
    Unit(Unit),
    Specialty(Specialty),
}

/// Jours de la semaine autorisés pour une unité ou une spécialité.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConstraint {
    pub target: ConstraintTarget,
    pub weekdays: Vec<Weekday>,
}

impl UnitConstraint {
    pub fn new(target: ConstraintTarget, weekdays: Vec<Weekday>) -> Self {
        Self { target, weekdays }
    }

    /// Construit la liste depuis la numérotation 0 = dimanche .. 6 = samedi.
    pub fn from_day_numbers(target: ConstraintTarget, days: &[u8]) -> Self {
        let weekdays = days
            .iter()
            .filter(|d| **d < 7)
            .map(|d| weekday_from_sunday(*d))
            .collect();
        Self { target, weekdays }
    }

    pub fn allows(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(&weekday)
    }
}

fn weekday_from_sunday(n: u8) -> Weekday {
    match n {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Photo du membre au moment de l'affectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffSnapshot {
    pub id: StaffId,
    pub name: String,
    pub tier: Tier,
    pub unit: Unit,
}

impl From<&StaffMember> for StaffSnapshot {
    fn from(member: &StaffMember) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            tier: member.tier,
            unit: member.unit.clone(),
        }
    }
}

/// Affectation d'une position de garde. `staff == None` marque une position
/// restée vide (EMPTY), qui ne compte dans aucune statistique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub day: u32,
    pub service: ServiceId,
    pub staff: Option<StaffSnapshot>,
    #[serde(default)]
    pub emergency: bool,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.staff.is_none()
    }

    pub fn staff_id(&self) -> Option<&StaffId> {
        self.staff.as_ref().map(|s| &s.id)
    }
}

/// Planning d'une journée
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    pub weekday: Weekday,
    pub weekend: bool,
    #[serde(default)]
    pub holiday: bool,
    pub assignments: Vec<Assignment>,
}

impl DayPlan {
    pub fn filled(&self) -> impl Iterator<Item = &Assignment> + '_ {
        self.assignments.iter().filter(|a| !a.is_empty())
    }

    pub fn for_service<'a>(
        &'a self,
        service: &'a ServiceId,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.assignments.iter().filter(move |a| &a.service == service)
    }
}

/// Compteurs de gardes d'un membre sur le mois.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffStatistics {
    pub total: u32,
    pub weekday: u32,
    pub weekend: u32,
    pub saturday: u32,
    pub sunday: u32,
}

/// Résumé d'une tentative de simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub unfilled: u32,
    pub quota_deviation: u32,
}

/// Résultat complet d'une génération
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub year: i32,
    pub month: u32,
    pub days: Vec<DayPlan>,
    pub unfilled: u32,
    pub quota_deviation: u32,
    pub chosen_attempt: usize,
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
    #[serde(default)]
    pub log: Vec<String>,
    /// Entrées au-delà de la capacité du journal.
    #[serde(default)]
    pub log_dropped: usize,
    pub statistics: BTreeMap<StaffId, StaffStatistics>,
}

impl ScheduleResult {
    pub fn day(&self, day: u32) -> Option<&DayPlan> {
        self.days.iter().find(|p| p.day == day)
    }

    /// Jours travaillés par un membre, en ordre croissant.
    pub fn days_worked(&self, id: &StaffId) -> Vec<u32> {
        self.days
            .iter()
            .filter(|p| p.filled().any(|a| a.staff_id() == Some(id)))
            .map(|p| p.day)
            .collect()
    }
}
