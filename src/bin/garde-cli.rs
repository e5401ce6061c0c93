#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use garde::{
    io,
    model::{ConstraintTarget, Service, Specialty, Unit, UnitConstraint},
    scheduler::{ScheduleConfig, Scheduler},
    storage::{JsonStorage, Storage, Workspace},
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification des gardes (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON du workspace
    #[arg(long, global = true, default_value = "garde.json")]
    workspace: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Importer le personnel depuis un CSV (remplace la liste courante)
    ImportStaff {
        #[arg(long)]
        csv: String,
    },

    /// Ajouter ou remplacer un service
    AddService {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 1)]
        min: u32,
        #[arg(long, default_value_t = 1)]
        max: u32,
        /// liste "icu,emergency,..."
        #[arg(long)]
        units: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        emergency: bool,
    },

    /// Restreindre une unité ou une spécialité à certains jours
    AddConstraint {
        #[arg(long, conflicts_with = "specialty")]
        unit: Option<String>,
        #[arg(long)]
        specialty: Option<String>,
        /// liste "0,6" (0 = dimanche .. 6 = samedi)
        #[arg(long)]
        days: String,
    },

    /// Générer le planning du mois
    Generate {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        attempts: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        /// Effectif total visé par jour
        #[arg(long)]
        target: Option<u32>,
        #[arg(long)]
        randomize: bool,
        #[arg(long)]
        prevent_every_other_day: bool,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Afficher le dernier planning
    List,

    /// Compteurs par membre du dernier planning
    Stats {
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Vérifier le dernier planning
    Check {
        /// Export CSV des conflits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.workspace)?;
    let mut workspace = if storage.exists() {
        storage.load()?
    } else {
        let now = Utc::now();
        Workspace::new(ScheduleConfig::new(now.year(), now.month()))
    };

    let code = match cli.cmd {
        Commands::ImportStaff { csv } => {
            let staff = io::import_staff_csv(&csv)?;
            println!("{} staff member(s) imported", staff.len());
            workspace.staff = staff;
            storage.save(&workspace)?;
            0
        }
        Commands::AddService {
            id,
            name,
            min,
            max,
            units,
            group,
            emergency,
        } => {
            let mut service = Service::new(&id, name, min, max);
            service.allowed_units = split_list(units.as_deref())
                .map(|u| Unit::from(u.to_string()))
                .collect();
            service.preferred_group = group;
            service.emergency = emergency;
            workspace.services.retain(|s| s.id != service.id);
            workspace.services.push(service);
            storage.save(&workspace)?;
            0
        }
        Commands::AddConstraint { unit, specialty, days } => {
            let target = match (unit, specialty) {
                (Some(u), None) => ConstraintTarget::Unit(Unit::from(u)),
                (None, Some(s)) => {
                    let specialty = s.parse::<Specialty>().map_err(anyhow::Error::msg)?;
                    ConstraintTarget::Specialty(specialty)
                }
                _ => bail!("exactly one of --unit or --specialty is required"),
            };
            let numbers = split_list(Some(days.as_str()))
                .map(|d| d.parse::<u8>().with_context(|| format!("invalid weekday: {d}")))
                .collect::<Result<Vec<_>>>()?;
            if numbers.iter().any(|d| *d > 6) {
                bail!("weekdays range from 0 (Sunday) to 6 (Saturday)");
            }
            workspace
                .constraints
                .push(UnitConstraint::from_day_numbers(target, &numbers));
            storage.save(&workspace)?;
            0
        }
        Commands::Generate {
            year,
            month,
            attempts,
            seed,
            target,
            randomize,
            prevent_every_other_day,
            out_json,
            out_csv,
        } => {
            let config = &mut workspace.config;
            if let Some(y) = year {
                config.year = y;
            }
            if let Some(m) = month {
                config.month = m;
            }
            if let Some(a) = attempts {
                config.max_attempts = a;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if let Some(t) = target {
                config.daily_target = t;
            }
            config.randomize_day_order |= randomize;
            config.prevent_every_other_day |= prevent_every_other_day;

            if workspace.services.is_empty() {
                bail!("aucun service défini (voir add-service)");
            }
            let scheduler = Scheduler::new(
                &workspace.staff,
                &workspace.services,
                &workspace.constraints,
                workspace.config.clone(),
            )?;
            let result = scheduler.generate();
            println!(
                "{}-{:02}: {} unfilled position(s), quota deviation {} (attempt {}/{})",
                result.year,
                result.month,
                result.unfilled,
                result.quota_deviation,
                result.chosen_attempt + 1,
                result.attempts.len()
            );
            if let Some(path) = out_json {
                io::export_result_json(path, &result)?;
            }
            if let Some(path) = out_csv {
                io::export_schedule_csv(path, &result)?;
            }
            let code = if result.unfilled > 0 { 2 } else { 0 };
            workspace.last_result = Some(result);
            storage.save(&workspace)?;
            code
        }
        Commands::List => {
            let result = workspace.last_result.as_ref().context("no schedule generated yet")?;
            // impression compacte
            for plan in &result.days {
                let names: Vec<String> = plan
                    .assignments
                    .iter()
                    .map(|a| match &a.staff {
                        Some(s) => format!("{}:{}", a.service.as_str(), s.name),
                        None => format!("{}:EMPTY", a.service.as_str()),
                    })
                    .collect();
                println!("{:>2} {} | {}", plan.day, plan.weekday, names.join(", "));
            }
            0
        }
        Commands::Stats { out_csv } => {
            let result = workspace.last_result.as_ref().context("no schedule generated yet")?;
            for member in &workspace.staff {
                if let Some(stats) = result.statistics.get(&member.id) {
                    println!(
                        "{} | {}/{} | weekend {}/{}",
                        member.name, stats.total, member.quota, stats.weekend, member.weekend_limit
                    );
                }
            }
            if let Some(path) = out_csv {
                io::export_statistics_csv(path, &workspace.staff, result)?;
            }
            0
        }
        Commands::Check { report } => {
            let result = workspace.last_result.as_ref().context("no schedule generated yet")?;
            let scheduler = Scheduler::new(
                &workspace.staff,
                &workspace.services,
                &workspace.constraints,
                workspace.config.clone(),
            )?;
            let conflicts = scheduler.audit(result);
            if conflicts.is_empty() {
                println!("OK: no conflicts");
                0
            } else {
                eprintln!("Found {} conflict(s)", conflicts.len());
                if let Some(path) = report {
                    // CSV simple
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["kind", "day", "staff", "service"])?;
                    for c in &conflicts {
                        let day = c.day.map(|d| d.to_string()).unwrap_or_default();
                        let staff: Vec<&str> = c.staff.iter().map(|s| s.as_str()).collect();
                        w.write_record([
                            c.kind.label(),
                            day.as_str(),
                            staff.join(";").as_str(),
                            c.service.as_ref().map(|s| s.as_str()).unwrap_or(""),
                        ])?;
                    }
                    w.flush()?;
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            }
        }
    };

    std::process::exit(code);
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
