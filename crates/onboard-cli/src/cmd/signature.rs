use crate::cmd::{parse_id, resolve_client, Project};
use crate::output::{or_dash, print_json, print_table};
use clap::Subcommand;
use onboard_core::signature::{NewSignatureRequest, SignatureRequest};
use onboard_core::types::SignatureStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum SignatureSubcommand {
    /// Create a signature request (no mail is sent; prints the signing link)
    Create {
        client: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        sow: Option<String>,
        #[arg(long)]
        nda: Option<String>,
    },
    /// List a client's signature requests
    List { client: String },
    /// Set a request's status (draft, sent, viewed, signed, declined, voided)
    Status { id: String, status: SignatureStatus },
    /// Drop the SOW reference from a request
    DetachSow { id: String },
    /// Drop the NDA reference from a request
    DetachNda { id: String },
}

pub fn run(root: &Path, subcmd: SignatureSubcommand, json: bool) -> anyhow::Result<()> {
    let project = Project::open(root)?;
    let db = &project.db;
    let request = match subcmd {
        SignatureSubcommand::Create {
            client,
            name,
            email,
            sow,
            nda,
        } => {
            let c = resolve_client(db, &client)?;
            let req = SignatureRequest::create(
                db,
                c.id,
                NewSignatureRequest {
                    sow_document_id: sow.as_deref().map(parse_id).transpose()?,
                    nda_document_id: nda.as_deref().map(parse_id).transpose()?,
                    recipient_name: name,
                    recipient_email: email,
                },
            )?;
            if !json {
                println!("Signing link: {}", project.config.signing.link_for(req.id));
            }
            req
        }
        SignatureSubcommand::List { client } => {
            let c = resolve_client(db, &client)?;
            let list = SignatureRequest::list_for_client(db, c.id)?;
            if json {
                return print_json(&list);
            }
            let rows = list
                .iter()
                .map(|r| {
                    vec![
                        r.recipient_name.clone(),
                        r.recipient_email.clone(),
                        r.status.to_string(),
                        or_dash(r.sent_at.map(|t| t.format("%Y-%m-%d"))),
                        or_dash(r.signed_at.map(|t| t.format("%Y-%m-%d"))),
                        r.id.to_string(),
                    ]
                })
                .collect();
            print_table(&["RECIPIENT", "EMAIL", "STATUS", "SENT", "SIGNED", "ID"], rows);
            return Ok(());
        }
        SignatureSubcommand::Status { id, status } => {
            SignatureRequest::update_status(db, parse_id(&id)?, status)?
        }
        SignatureSubcommand::DetachSow { id } => SignatureRequest::detach_sow(db, parse_id(&id)?)?,
        SignatureSubcommand::DetachNda { id } => SignatureRequest::detach_nda(db, parse_id(&id)?)?,
    };
    if json {
        return print_json(&request);
    }
    println!(
        "{} <{}> [{}]",
        request.recipient_name, request.recipient_email, request.status
    );
    println!("  id:  {}", request.id);
    println!("  sow: {}", or_dash(request.sow_document_id));
    println!("  nda: {}", or_dash(request.nda_document_id));
    Ok(())
}
