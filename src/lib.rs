#![forbid(unsafe_code)]
//! Garde — moteur de planification mensuelle des gardes infirmières (sans BD).
//!
//! - Heuristique gloutonne randomisée, relancée N fois ; la meilleure
//!   tentative est conservée.
//! - Règles dures : repos de 24 h, quotas, jours de spécialité, colocations.
//! - Équité : quotas, week-ends, équilibre entre niveaux d'ancienneté.
//! - Stockage fichiers (JSON/CSV) en dehors du moteur.

/// `tracing::debug!` quand la feature `logging` est active, rien sinon.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        tracing::debug!($($arg)*);
    };
}

pub mod io;
pub mod model;
pub mod scheduler;
pub mod storage;

pub use model::{
    Assignment, AttemptSummary, ConstraintTarget, DayPlan, ScheduleResult, Service, ServiceId,
    Specialty, StaffId, StaffMember, StaffSnapshot, StaffStatistics, Tier, Unit, UnitConstraint,
};
pub use scheduler::{generate, Conflict, ConflictKind, SchedError, ScheduleConfig, Scheduler};
pub use storage::{JsonStorage, Storage, Workspace};
