//! Resolve command implementation.

use super::input::read_record;
use reconcile_protocol::{
    ConflictResolver, ConflictSignal, Record, ResolutionPlan, ResolverConfig,
};
use serde::Serialize;
use std::path::Path;

/// A resolution plan, as printed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    /// Winning side.
    pub winner: String,
    /// Type of the conflicting record.
    pub affected_type: String,
    /// What happened to the losing version.
    pub loser_fate: String,
    /// Human-readable summary.
    pub description: String,
    /// Record to re-save under the original id.
    pub resolved_record: Record,
    /// Conflict copies to create.
    pub extra_records: Vec<Record>,
}

impl From<ResolutionPlan> for PlanReport {
    fn from(plan: ResolutionPlan) -> Self {
        Self {
            winner: plan.winner.to_string(),
            affected_type: plan.affected_type,
            loser_fate: plan.loser_fate.to_string(),
            description: plan.description,
            resolved_record: plan.resolved_record,
            extra_records: plan.extra_records,
        }
    }
}

/// Runs the resolve command.
pub fn run(
    server: &Path,
    client: &Path,
    ancestor: Option<&Path>,
    config: ResolverConfig,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let signal = ConflictSignal::new(
        read_record(server)?,
        read_record(client)?,
        ancestor.map(read_record).transpose()?,
    );

    let plan = ConflictResolver::new(config).plan_signal(&signal)?;
    let report = PlanReport::from(plan);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report)?;
    }

    Ok(())
}

fn print_report(report: &PlanReport) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", report.description);
    println!();
    println!("Winner:        {}", report.winner);
    println!("Record type:   {}", report.affected_type);
    println!("Loser:         {}", report.loser_fate);
    println!();
    println!("Resolved record {}:", report.resolved_record.id());
    println!("{}", serde_json::to_string_pretty(report.resolved_record.fields())?);

    for extra in &report.extra_records {
        println!();
        println!("Conflict copy {}:", extra.id());
        println!("{}", serde_json::to_string_pretty(extra.fields())?);
    }

    Ok(())
}
