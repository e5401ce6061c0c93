use crate::model::{ScheduleResult, Specialty, StaffId, StaffMember, Tier, Unit};
use anyhow::{bail, Context};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Import du personnel depuis CSV, header :
/// `id,name,tier,unit[,specialty][,room][,quota][,weekend_limit]`
/// `[,group][,unavailable][,requested][,active]`
///
/// Les listes de jours sont séparées par `;` (ex. `3;10;24`). Un `id` vide
/// génère un identifiant aléatoire.
pub fn import_staff_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<StaffMember>> {
    let rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
    read_staff(rdr)
}

/// Même format que [`import_staff_csv`], depuis une chaîne.
pub fn parse_staff_csv(data: &str) -> anyhow::Result<Vec<StaffMember>> {
    let rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());
    read_staff(rdr)
}

fn read_staff<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<StaffMember>> {
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let member =
            parse_staff_row(&rec).with_context(|| format!("invalid staff row {}", line + 2))?;
        out.push(member);
    }
    Ok(out)
}

fn parse_staff_row(rec: &StringRecord) -> anyhow::Result<StaffMember> {
    let field = |i: usize| rec.get(i).map(str::trim).filter(|s| !s.is_empty());

    let name = field(1).context("missing name")?;
    let tier: Tier = field(2)
        .context("missing tier")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let unit = Unit::from(field(3).context("missing unit")?.to_string());

    let mut member = StaffMember::new(name, tier, unit, 0, 0);
    if let Some(id) = field(0) {
        member.id = StaffId::new(id);
    }
    if let Some(raw) = field(4) {
        member.specialty = Some(raw.parse::<Specialty>().map_err(anyhow::Error::msg)?);
    }
    if let Some(room) = field(5) {
        member.room = room.to_string();
    }
    if let Some(raw) = field(6) {
        member.quota = raw.parse().with_context(|| format!("invalid quota for {name}"))?;
    }
    if let Some(raw) = field(7) {
        member.weekend_limit = raw
            .parse()
            .with_context(|| format!("invalid weekend_limit for {name}"))?;
    }
    member.group = field(8).map(str::to_string);
    if let Some(raw) = field(9) {
        member.unavailable = parse_days(raw)
            .with_context(|| format!("invalid unavailable days for {name}"))?;
    }
    if let Some(raw) = field(10) {
        member.requested =
            parse_days(raw).with_context(|| format!("invalid requested days for {name}"))?;
    }
    if let Some(raw) = field(11) {
        member.active =
            parse_bool(raw).with_context(|| format!("invalid active value for {name}"))?;
    }
    Ok(member)
}

/// Jours du mois séparés par `;`. Les valeurs hors de 1..=31 sont ignorées ;
/// un jour absent du mois planifié (31 en avril) n'a simplement aucun effet.
fn parse_days(raw: &str) -> anyhow::Result<BTreeSet<u32>> {
    let mut days = BTreeSet::new();
    for chunk in raw.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        let day: u32 = chunk.parse().with_context(|| format!("invalid day: {chunk}"))?;
        if !(1..=31).contains(&day) {
            debug_log!(day, "day out of range ignored");
            continue;
        }
        days.insert(day);
    }
    Ok(days)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "oui" => Ok(true),
        "false" | "0" | "no" | "n" | "non" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

/// Export JSON du résultat (jolie mise en forme)
pub fn export_result_json<P: AsRef<Path>>(path: P, result: &ScheduleResult) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(result)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV du planning: header `day,weekday,service,staff_id,staff_name,tier,emergency`.
/// Les positions vides ont `staff_id` = `EMPTY`.
pub fn export_schedule_csv<P: AsRef<Path>>(path: P, result: &ScheduleResult) -> anyhow::Result<()> {
    let w = WriterBuilder::new().has_headers(true).from_path(path)?;
    write_schedule(w, result)
}

/// Même contenu que [`export_schedule_csv`], en mémoire.
pub fn schedule_csv_string(result: &ScheduleResult) -> anyhow::Result<String> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    write_rows(&mut w, result)?;
    let bytes = w.into_inner().map_err(|e| anyhow::anyhow!("flushing csv: {e}"))?;
    Ok(String::from_utf8(bytes)?)
}

fn write_schedule<W: std::io::Write>(
    mut w: csv::Writer<W>,
    result: &ScheduleResult,
) -> anyhow::Result<()> {
    write_rows(&mut w, result)?;
    w.flush()?;
    Ok(())
}

fn write_rows<W: std::io::Write>(
    w: &mut csv::Writer<W>,
    result: &ScheduleResult,
) -> anyhow::Result<()> {
    w.write_record(["day", "weekday", "service", "staff_id", "staff_name", "tier", "emergency"])?;
    let mut day_buf = itoa::Buffer::new();
    let mut tier_buf = itoa::Buffer::new();
    for plan in &result.days {
        let day = day_buf.format(plan.day).to_string();
        let weekday = plan.weekday.to_string();
        for a in &plan.assignments {
            let (id, name, tier) = match &a.staff {
                Some(s) => (s.id.as_str(), s.name.as_str(), tier_buf.format(s.tier.level())),
                None => ("EMPTY", "", ""),
            };
            w.write_record([
                day.as_str(),
                weekday.as_str(),
                a.service.as_str(),
                id,
                name,
                tier,
                if a.emergency { "yes" } else { "no" },
            ])?;
        }
    }
    Ok(())
}

/// Export CSV des compteurs: header `staff_id,name,quota,total,weekday,weekend,saturday,sunday`
pub fn export_statistics_csv<P: AsRef<Path>>(
    path: P,
    staff: &[StaffMember],
    result: &ScheduleResult,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "staff_id", "name", "quota", "total", "weekday", "weekend", "saturday", "sunday",
    ])?;
    for member in staff {
        let Some(stats) = result.statistics.get(&member.id) else {
            continue;
        };
        let numbers = [
            member.quota,
            stats.total,
            stats.weekday,
            stats.weekend,
            stats.saturday,
            stats.sunday,
        ]
        .map(|n| itoa::Buffer::new().format(n).to_string());
        let mut row = vec![member.id.as_str(), member.name.as_str()];
        row.extend(numbers.iter().map(String::as_str));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}
