use crate::cmd::doc::read_file;
use crate::cmd::{parse_id, resolve_client, Project};
use crate::output::print_json;
use clap::Subcommand;
use onboard_core::deliverable::{ClientDeliverable, NewDeliverable};
use onboard_core::upload::FileUpload;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum DeliverableSubcommand {
    /// Upload a deliverable under a milestone
    Upload {
        client: String,
        file: PathBuf,
        #[arg(long)]
        milestone: String,
        #[arg(long)]
        title: String,
        /// Defaults to 1.0
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List a client's deliverables grouped by milestone
    List { client: String },
    /// Delete a deliverable and its stored file
    Delete { id: String },
}

pub fn run(root: &Path, subcmd: DeliverableSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let (db, store) = (&project.db, &project.store);
    match subcmd {
        DeliverableSubcommand::Upload {
            client,
            file,
            milestone,
            title,
            version,
            description,
        } => {
            let c = resolve_client(db, &client)?;
            let (name, data) = read_file(&file)?;
            let d = ClientDeliverable::upload(
                db,
                store,
                c.id,
                NewDeliverable {
                    milestone_name: milestone,
                    title,
                    description,
                    version,
                },
                FileUpload {
                    file_name: &name,
                    content_type: None,
                    data: &data,
                },
            )?;
            if json {
                return print_json(&d);
            }
            println!("Uploaded {} v{} to milestone '{}'", d.title, d.version, d.milestone_name);
            println!("  id: {}", d.id);
            Ok(())
        }
        DeliverableSubcommand::List { client } => {
            let c = resolve_client(db, &client)?;
            let groups = ClientDeliverable::grouped_for_client(db, c.id)?;
            if json {
                return print_json(&groups);
            }
            if groups.is_empty() {
                println!("No deliverables for '{}'.", c.name);
            }
            for g in &groups {
                println!("{}", g.milestone_name);
                for d in &g.deliverables {
                    println!("  {} v{}  {}  {}", d.title, d.version, d.file_name, d.id);
                }
            }
            Ok(())
        }
        DeliverableSubcommand::Delete { id } => {
            ClientDeliverable::delete(db, store, parse_id(&id)?)?;
            if !json {
                println!("Deleted deliverable {id}");
            }
            Ok(())
        }
    }
}
