use crate::cmd::{resolve_client, Project};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use onboard_core::cascade;
use onboard_core::client::{Client, ClientUpdate, NewClient};
use std::path::Path;

#[derive(Subcommand)]
pub enum ClientSubcommand {
    /// Register a new client
    Create {
        name: String,
        #[arg(long)]
        app_url: Option<String>,
        #[arg(long)]
        logo_url: Option<String>,
    },
    /// List clients by name
    List,
    /// Show one client (id or name)
    Show { client: String },
    /// Rename a client or change its links
    Update {
        client: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        app_url: Option<String>,
        #[arg(long)]
        logo_url: Option<String>,
    },
    /// Delete a client and everything that belongs to it
    Delete { client: String },
}

pub fn run(root: &Path, subcmd: ClientSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    match subcmd {
        ClientSubcommand::Create {
            name,
            app_url,
            logo_url,
        } => create(&project, name, app_url, logo_url, json),
        ClientSubcommand::List => list(&project, json),
        ClientSubcommand::Show { client } => show(&project, &client, json),
        ClientSubcommand::Update {
            client,
            name,
            app_url,
            logo_url,
        } => {
            let c = resolve_client(&project.db, &client)?;
            let updated = Client::update(
                &project.db,
                c.id,
                ClientUpdate {
                    name,
                    app_url,
                    logo_url,
                },
            )
            .with_context(|| format!("failed to update client '{}'", c.name))?;
            print_one(&updated, json)
        }
        ClientSubcommand::Delete { client } => delete(&project, &client, json),
    }
}

fn create(
    project: &Project,
    name: String,
    app_url: Option<String>,
    logo_url: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let client = Client::create(
        &project.db,
        NewClient {
            name,
            app_url,
            logo_url,
        },
    )?;
    if json {
        print_json(&client)
    } else {
        println!("Created client '{}' ({})", client.name, client.id);
        Ok(())
    }
}

fn list(project: &Project, json: bool) -> anyhow::Result<()> {
    let clients = Client::list(&project.db)?;
    if json {
        return print_json(&clients);
    }
    if clients.is_empty() {
        println!("No clients.");
        return Ok(());
    }
    let rows = clients
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.id.to_string(),
                or_dash(c.app_url.as_deref()),
                c.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "ID", "APP URL", "CREATED"], rows);
    Ok(())
}

fn show(project: &Project, key: &str, json: bool) -> anyhow::Result<()> {
    let client = resolve_client(&project.db, key)?;
    print_one(&client, json)
}

fn print_one(client: &Client, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(client);
    }
    println!("Name:     {}", client.name);
    println!("Id:       {}", client.id);
    println!("App URL:  {}", or_dash(client.app_url.as_deref()));
    println!("Logo URL: {}", or_dash(client.logo_url.as_deref()));
    println!("Created:  {}", client.created_at.to_rfc3339());
    Ok(())
}

fn delete(project: &Project, key: &str, json: bool) -> anyhow::Result<()> {
    let client = resolve_client(&project.db, key)?;
    let report = cascade::delete_client(
        &project.db,
        &project.store,
        client.id,
        project.config.cascade.policy,
    )
    .with_context(|| format!("failed to delete client '{}'", client.name))?;
    if json {
        return print_json(&report);
    }
    println!("Deleted client '{}'", client.name);
    println!(
        "  documents: {}  objects: {} removed, {} failed",
        report.documents_removed, report.objects_removed, report.objects_failed
    );
    println!(
        "  risks: {}  deliverables: {}  signature requests: {}",
        report.risks_removed, report.deliverables_removed, report.signature_requests_removed
    );
    Ok(())
}
