use crate::cmd::{resolve_client, Project};
use crate::output::{print_json, print_table};
use onboard_core::stats;
use std::path::Path;

pub fn run(root: &Path, client: Option<&str>, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let client_id = client
        .map(|key| resolve_client(&project.db, key).map(|c| c.id))
        .transpose()?;
    let d = stats::dashboard(&project.db, client_id, chrono::Utc::now())?;
    if json {
        return print_json(&d);
    }

    println!("Clients:              {}", d.client_count);
    println!(
        "Engagements:          {} (draft {}, sent {}, in progress {}, completed {}, on hold {})",
        d.engagements.total,
        d.engagements.draft,
        d.engagements.sent,
        d.engagements.in_progress,
        d.engagements.completed,
        d.engagements.on_hold
    );
    println!(
        "Steps:                {} (not started {}, in progress {}, completed {}, on hold {})",
        d.steps.total, d.steps.not_started, d.steps.in_progress, d.steps.completed, d.steps.on_hold
    );
    println!(
        "Risks:                {} (open {}, in progress {}, mitigated {}, closed {})",
        d.risks.total,
        d.risks.by_status.open,
        d.risks.by_status.in_progress,
        d.risks.by_status.mitigated,
        d.risks.by_status.closed
    );
    println!("Avg onboarding days:  {:.1}", d.average_onboarding_days);
    println!();

    let rows = d
        .monthly_growth
        .iter()
        .map(|m| {
            vec![
                m.month.clone(),
                m.client_count.to_string(),
                m.engagement_count.to_string(),
            ]
        })
        .collect();
    print_table(&["MONTH", "CLIENTS", "ENGAGEMENTS"], rows);
    Ok(())
}
