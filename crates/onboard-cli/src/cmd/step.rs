use crate::cmd::{parse_id, resolve_client, Project};
use crate::output::{or_dash, print_json, print_table};
use chrono::NaiveDate;
use clap::Subcommand;
use onboard_core::step::{NewStep, OnboardingStep, StepUpdate};
use onboard_core::types::StepStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum StepSubcommand {
    /// Append a step to a client's plan
    Add {
        client: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        start: Option<NaiveDate>,
        /// YYYY-MM-DD
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        assignee: Option<String>,
        /// Hide from the client-facing timeline
        #[arg(long)]
        internal: bool,
    },
    /// List a client's steps in plan order
    List { client: String },
    /// Change dates, title or assignee
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long = "order", value_name = "N")]
        order_index: Option<i64>,
    },
    /// Set a step's status (not_started, in_progress, completed, on_hold)
    Status { id: String, status: StepStatus },
    /// Delete one step
    Delete { id: String },
    /// Delete every step of a client
    Clear { client: String },
}

pub fn run(root: &Path, subcmd: StepSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let db = &project.db;
    match subcmd {
        StepSubcommand::Add {
            client,
            title,
            description,
            start,
            end,
            assignee,
            internal,
        } => {
            let c = resolve_client(db, &client)?;
            let step = OnboardingStep::create(
                db,
                c.id,
                NewStep {
                    title,
                    description,
                    start_date: start,
                    end_date: end,
                    assigned_to: assignee,
                    client_visible: Some(!internal),
                    ..Default::default()
                },
            )?;
            print_step(&step, json)
        }
        StepSubcommand::List { client } => {
            let c = resolve_client(db, &client)?;
            let steps = OnboardingStep::list_for_client(db, c.id)?;
            if json {
                return print_json(&steps);
            }
            if steps.is_empty() {
                println!("No steps for '{}'.", c.name);
                return Ok(());
            }
            let rows = steps
                .iter()
                .map(|s| {
                    vec![
                        s.order_index.to_string(),
                        s.title.clone(),
                        s.status.to_string(),
                        or_dash(s.start_date),
                        or_dash(s.end_date),
                        or_dash(s.assigned_to.as_deref()),
                        s.id.to_string(),
                    ]
                })
                .collect();
            print_table(
                &["#", "TITLE", "STATUS", "START", "END", "ASSIGNEE", "ID"],
                rows,
            );
            Ok(())
        }
        StepSubcommand::Update {
            id,
            title,
            start,
            end,
            assignee,
            order_index,
        } => {
            let step = OnboardingStep::update(
                db,
                parse_id(&id)?,
                StepUpdate {
                    title,
                    start_date: start.map(Some),
                    end_date: end.map(Some),
                    assigned_to: assignee.map(Some),
                    order_index,
                    ..Default::default()
                },
            )?;
            print_step(&step, json)
        }
        StepSubcommand::Status { id, status } => {
            let step = OnboardingStep::update_status(db, parse_id(&id)?, status)?;
            print_step(&step, json)
        }
        StepSubcommand::Delete { id } => {
            OnboardingStep::delete(db, parse_id(&id)?)?;
            if !json {
                println!("Deleted step {id}");
            }
            Ok(())
        }
        StepSubcommand::Clear { client } => {
            let c = resolve_client(db, &client)?;
            let removed = OnboardingStep::delete_all_for_client(db, c.id)?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))
            } else {
                println!("Removed {removed} step(s) from '{}'", c.name);
                Ok(())
            }
        }
    }
}

fn print_step(step: &OnboardingStep, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(step);
    }
    println!("{} [{}] {}", step.order_index, step.status, step.title);
    println!("  id: {}", step.id);
    Ok(())
}
