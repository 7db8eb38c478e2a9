use crate::cmd::{parse_id, resolve_client, Project};
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use onboard_core::risk::{NewRisk, Risk, RiskUpdate};
use onboard_core::types::{RiskLikelihood, RiskSeverity, RiskStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum RiskSubcommand {
    /// Record a risk against a client
    Add {
        client: String,
        title: String,
        /// low, medium, high, critical
        #[arg(long)]
        severity: RiskSeverity,
        /// low, medium, high
        #[arg(long)]
        likelihood: RiskLikelihood,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        mitigation: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// List a client's risks, highest priority first
    List { client: String },
    /// Re-rate a risk
    Rate {
        id: String,
        #[arg(long)]
        severity: Option<RiskSeverity>,
        #[arg(long)]
        likelihood: Option<RiskLikelihood>,
    },
    /// Set a risk's status (open, in_progress, mitigated, closed)
    Status { id: String, status: RiskStatus },
    Delete { id: String },
}

pub fn run(root: &Path, subcmd: RiskSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let db = &project.db;
    match subcmd {
        RiskSubcommand::Add {
            client,
            title,
            severity,
            likelihood,
            description,
            mitigation,
            assignee,
        } => {
            let c = resolve_client(db, &client)?;
            let risk = Risk::create(
                db,
                c.id,
                NewRisk {
                    title,
                    description,
                    severity,
                    likelihood,
                    status: None,
                    impact: None,
                    mitigation,
                    assignee,
                    due_date: None,
                },
            )?;
            print_risk(&risk, json)
        }
        RiskSubcommand::List { client } => {
            let c = resolve_client(db, &client)?;
            let risks = Risk::list_for_client(db, c.id)?;
            if json {
                let scored: Vec<_> = risks
                    .iter()
                    .map(|r| serde_json::json!({ "risk": r, "priority": r.priority() }))
                    .collect();
                return print_json(&scored);
            }
            if risks.is_empty() {
                println!("No risks for '{}'.", c.name);
                return Ok(());
            }
            let rows = risks
                .iter()
                .map(|r| {
                    let p = r.priority();
                    vec![
                        format!("{} ({})", p.level, p.score),
                        r.title.clone(),
                        r.severity.to_string(),
                        r.likelihood.to_string(),
                        r.status.to_string(),
                        or_dash(r.assignee.as_deref()),
                        r.id.to_string(),
                    ]
                })
                .collect();
            print_table(
                &["PRIORITY", "TITLE", "SEVERITY", "LIKELIHOOD", "STATUS", "ASSIGNEE", "ID"],
                rows,
            );
            Ok(())
        }
        RiskSubcommand::Rate {
            id,
            severity,
            likelihood,
        } => {
            let risk = Risk::update(
                db,
                parse_id(&id)?,
                RiskUpdate {
                    severity,
                    likelihood,
                    ..Default::default()
                },
            )?;
            print_risk(&risk, json)
        }
        RiskSubcommand::Status { id, status } => {
            let risk = Risk::update_status(db, parse_id(&id)?, status)?;
            print_risk(&risk, json)
        }
        RiskSubcommand::Delete { id } => {
            Risk::delete(db, parse_id(&id)?)?;
            if !json {
                println!("Deleted risk {id}");
            }
            Ok(())
        }
    }
}

fn print_risk(risk: &Risk, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(risk);
    }
    let p = risk.priority();
    println!(
        "{} [{}] priority {} ({})",
        risk.title, risk.status, p.level, p.score
    );
    println!("  id: {}", risk.id);
    Ok(())
}
