use crate::cmd::{parse_id, resolve_client, Project};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use onboard_core::document::{ClientDocument, UniversalDocument};
use onboard_core::types::DocumentType;
use onboard_core::upload::FileUpload;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum DocSubcommand {
    /// Upload a SOW or kickoff file for a client
    Upload {
        client: String,
        file: PathBuf,
        /// sow or kickoff_material
        #[arg(long = "type", value_name = "TYPE", default_value = "sow")]
        document_type: DocumentType,
    },
    /// List a client's documents, newest first
    List {
        client: String,
        #[arg(long = "type", value_name = "TYPE")]
        document_type: Option<DocumentType>,
    },
    /// Delete a client document and its stored file
    Delete { id: String },
    /// Upload a resource shared across all clients
    Share {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List shared resources
    Shared,
    /// Delete a shared resource
    Unshare { id: String },
}

pub fn run(root: &Path, subcmd: DocSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let (db, store) = (&project.db, &project.store);
    match subcmd {
        DocSubcommand::Upload {
            client,
            file,
            document_type,
        } => {
            let c = resolve_client(db, &client)?;
            let (name, data) = read_file(&file)?;
            let doc = ClientDocument::upload(
                db,
                store,
                c.id,
                document_type,
                FileUpload {
                    file_name: &name,
                    content_type: None,
                    data: &data,
                },
            )?;
            if json {
                return print_json(&doc);
            }
            println!("Uploaded {} ({} bytes) as {}", doc.file_name, doc.file_size, doc.document_type);
            println!("  id:  {}", doc.id);
            println!("  url: {}", doc.public_url(store));
            Ok(())
        }
        DocSubcommand::List {
            client,
            document_type,
        } => {
            let c = resolve_client(db, &client)?;
            let docs = ClientDocument::list_for_client(db, c.id, document_type)?;
            if json {
                return print_json(&docs);
            }
            let rows = docs
                .iter()
                .map(|d| {
                    vec![
                        d.file_name.clone(),
                        d.document_type.to_string(),
                        d.file_size.to_string(),
                        d.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
                        d.id.to_string(),
                    ]
                })
                .collect();
            print_table(&["FILE", "TYPE", "BYTES", "UPLOADED", "ID"], rows);
            Ok(())
        }
        DocSubcommand::Delete { id } => {
            ClientDocument::delete(db, store, parse_id(&id)?)?;
            if !json {
                println!("Deleted document {id}");
            }
            Ok(())
        }
        DocSubcommand::Share {
            file,
            title,
            description,
        } => {
            let (name, data) = read_file(&file)?;
            let doc = UniversalDocument::upload(
                db,
                store,
                title.as_deref(),
                description.as_deref(),
                FileUpload {
                    file_name: &name,
                    content_type: None,
                    data: &data,
                },
            )?;
            if json {
                return print_json(&doc);
            }
            println!("Shared '{}' ({})", doc.title, doc.id);
            Ok(())
        }
        DocSubcommand::Shared => {
            let docs = UniversalDocument::list(db)?;
            if json {
                return print_json(&docs);
            }
            let rows = docs
                .iter()
                .map(|d| vec![d.title.clone(), d.file_name.clone(), d.id.to_string()])
                .collect();
            print_table(&["TITLE", "FILE", "ID"], rows);
            Ok(())
        }
        DocSubcommand::Unshare { id } => {
            UniversalDocument::delete(db, store, parse_id(&id)?)?;
            if !json {
                println!("Deleted shared document {id}");
            }
            Ok(())
        }
    }
}

/// File name and contents of a local file to upload.
pub(crate) fn read_file(path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok((name, data))
}
