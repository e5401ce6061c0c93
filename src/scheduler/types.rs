use crate::model::{ServiceId, Specialty, StaffId, Tier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pondérations du score des candidats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub reserved_specialty: i64,
    pub specialty_day: i64,
    pub requested_day: i64,
    pub junior: i64,
    /// Par garde restante avant le quota.
    pub quota_hunger: i64,
    /// Par garde de week-end déjà faite, les jours de week-end.
    pub weekend_load: i64,
    pub every_other_day: i64,
    pub group_match: i64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            reserved_specialty: 1000,
            specialty_day: 300,
            requested_day: 200,
            junior: 30,
            quota_hunger: 20,
            weekend_load: 40,
            every_other_day: 80,
            group_match: 50,
        }
    }
}

fn default_attempts() -> u32 {
    20
}

fn default_log_capacity() -> usize {
    500
}

/// Configuration d'une génération
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub year: i32,
    pub month: u32,
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub randomize_day_order: bool,
    #[serde(default)]
    pub prevent_every_other_day: bool,
    /// Effectif total visé par jour (0 = seulement les minimums).
    #[serde(default)]
    pub daily_target: u32,
    /// Jours fériés, comptés comme des jours de week-end.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holidays: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Tronque l'horizon aux N premiers jours du mois.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_limit: Option<u32>,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl ScheduleConfig {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            max_attempts: default_attempts(),
            randomize_day_order: false,
            prevent_every_other_day: false,
            daily_target: 0,
            holidays: Vec::new(),
            seed: None,
            day_limit: None,
            log_capacity: default_log_capacity(),
            weights: ScoreWeights::default(),
        }
    }
}

/// Profils de relâchement, du plus strict au plus permissif.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relaxation {
    Strict,
    /// Ignore l'équité verticale et horizontale.
    Desperate,
    /// Ignore en plus l'affinité de groupe.
    DeepDesperate,
}

impl Relaxation {
    pub const FULL_LADDER: [Relaxation; 3] = [
        Relaxation::Strict,
        Relaxation::Desperate,
        Relaxation::DeepDesperate,
    ];
    pub const SOFT_LADDER: [Relaxation; 2] = [Relaxation::Strict, Relaxation::Desperate];

    pub fn enforces_fairness(self) -> bool {
        self == Relaxation::Strict
    }

    pub fn enforces_group_affinity(self) -> bool {
        self < Relaxation::DeepDesperate
    }
}

/// Paramètres d'une recherche de candidat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub force_tier: Option<Tier>,
    pub exclude_tier: Option<Tier>,
    pub force_specialty: Option<Specialty>,
    /// Recherche d'une spécialité réservée (bonus de score).
    pub reserved: bool,
    pub relaxation: Relaxation,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            force_tier: None,
            exclude_tier: None,
            force_specialty: None,
            reserved: false,
            relaxation: Relaxation::Strict,
        }
    }
}

impl SearchOptions {
    pub fn with_relaxation(self, relaxation: Relaxation) -> Self {
        Self { relaxation, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ConsecutiveDays,
    DoubleAssignment,
    QuotaExceeded,
    WeekendLimitExceeded,
    RoommateClash,
    OverCapacity,
}

impl ConflictKind {
    pub fn label(&self) -> &'static str {
        match self {
            ConflictKind::ConsecutiveDays => "consecutive",
            ConflictKind::DoubleAssignment => "double",
            ConflictKind::QuotaExceeded => "quota",
            ConflictKind::WeekendLimitExceeded => "weekend",
            ConflictKind::RoommateClash => "roommate",
            ConflictKind::OverCapacity => "capacity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub day: Option<u32>,
    pub staff: Vec<StaffId>,
    pub service: Option<ServiceId>,
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("max_attempts must be at least 1")]
    NoAttempts,
    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
