use std::collections::VecDeque;

use uuid::Uuid;

use event_certs::config::Config;
use event_certs::infra::{AuditAction, AuditQueryFilters};
use event_certs::server::{connect_backends, AppState};
use event_certs::{EventId, RegistrationId, TemplateId};

fn print_help() {
    eprintln!(
        "\
event-certs-admin

USAGE:
  event-certs-admin <command> [options]

COMMANDS:
  migrate                         Run database migrations
  issue                           Issue certificates for an ended event
  verify                          Look up a certificate code
  list                            List certificates of an event
  orphans                         List stored artifacts with no certificate record

COMMON OPTIONS:
  --database-url <url>            (defaults to env DATABASE_URL; postgres:// or sqlite:)

issue OPTIONS:
  --event-id <uuid>               (required)
  --template-id <uuid>            (optional) Template owned by the event
  --participant <uuid>            (optional, repeatable) Restrict to these registrations

verify OPTIONS:
  --code <CERT-...>               (required)

list OPTIONS:
  --event-id <uuid>               (required)

orphans OPTIONS:
  --event-id <uuid>               (optional)
  --limit <n>                     (default: 100)

ENV:
  Storage and converter settings are read as by the server
  (STORAGE_BACKEND, STORAGE_LOCAL_ROOT, CONVERTER_BINARY, ...).
"
    );
}

fn take_value(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<String> {
    args.pop_front()
        .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
}

fn take_uuid(args: &mut VecDeque<String>, flag: &str) -> anyhow::Result<Uuid> {
    let raw = take_value(args, flag)?;
    Uuid::parse_str(&raw).map_err(|e| anyhow::anyhow!("invalid {flag} {raw:?}: {e}"))
}

/// Server configuration with authentication switched off; the CLI acts as
/// the operator.
fn load_config(database_url: Option<String>) -> anyhow::Result<Config> {
    let config = Config::from_lookup(|key| match key {
        "AUTH_MODE" => Some("disabled".to_string()),
        "DATABASE_URL" => database_url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok()),
        _ => std::env::var(key).ok(),
    })?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    let mut database_url: Option<String> = None;
    let mut event_id: Option<Uuid> = None;
    let mut template_id: Option<Uuid> = None;
    let mut participants: Vec<RegistrationId> = Vec::new();
    let mut code: Option<String> = None;
    let mut limit: i64 = 100;

    while let Some(arg) = args.pop_front() {
        match arg.as_str() {
            "--database-url" => database_url = Some(take_value(&mut args, "--database-url")?),
            "--event-id" if command != "migrate" && command != "verify" => {
                event_id = Some(take_uuid(&mut args, "--event-id")?)
            }
            "--template-id" if command == "issue" => {
                template_id = Some(take_uuid(&mut args, "--template-id")?)
            }
            "--participant" if command == "issue" => participants.push(RegistrationId::from_uuid(
                take_uuid(&mut args, "--participant")?,
            )),
            "--code" if command == "verify" => code = Some(take_value(&mut args, "--code")?),
            "--limit" if command == "orphans" => limit = take_value(&mut args, "--limit")?.parse()?,
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unexpected argument for {command}: {other}"),
        }
    }

    let config = load_config(database_url)?;

    match command.as_str() {
        "migrate" => {
            connect_backends(&config.database_url, 5, true).await?;
            println!("ok: migrations applied");
            Ok(())
        }
        "issue" => {
            let event_id = EventId::from_uuid(
                event_id.ok_or_else(|| anyhow::anyhow!("--event-id is required"))?,
            );
            let state = AppState::from_config(&config).await?;

            let only = (!participants.is_empty()).then_some(participants.as_slice());
            let report = state
                .ledger
                .issue_all(event_id, only, template_id.map(TemplateId::from_uuid), None)
                .await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            eprintln!(
                "ok: generated={} skipped={} failed={} total={}",
                report.generated,
                report.skipped,
                report.errors.len(),
                report.total
            );
            Ok(())
        }
        "verify" => {
            let code = code.ok_or_else(|| anyhow::anyhow!("--code is required"))?;
            let state = AppState::from_config(&config).await?;

            match state.lookup.verify(&code).await {
                Ok(verified) => {
                    println!("{}", serde_json::to_string_pretty(&verified)?);
                    Ok(())
                }
                Err(event_certs::CertificateError::NotFound) => {
                    anyhow::bail!("certificate not found: {code}")
                }
                Err(e) => Err(e.into()),
            }
        }
        "list" => {
            let event_id = EventId::from_uuid(
                event_id.ok_or_else(|| anyhow::anyhow!("--event-id is required"))?,
            );
            let backends =
                connect_backends(&config.database_url, 5, config.migrate_on_startup).await?;

            let certificates = backends.certificates.list_for_event(event_id).await?;
            for cert in &certificates {
                println!(
                    "{}\t{}\t{}\t{}",
                    cert.code,
                    cert.registration_id,
                    cert.issued_at.to_rfc3339(),
                    cert.artifact_url
                );
            }
            eprintln!("ok: {} certificate(s)", certificates.len());
            Ok(())
        }
        "orphans" => {
            let backends =
                connect_backends(&config.database_url, 5, config.migrate_on_startup).await?;

            let filters = AuditQueryFilters {
                action: Some(AuditAction::ArtifactOrphaned),
                event_id: event_id.map(EventId::from_uuid),
                failures_only: false,
            };
            let entries = backends.audit.query(filters, limit).await?;
            for entry in &entries {
                let details = entry
                    .details
                    .as_ref()
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.timestamp.to_rfc3339(),
                    entry
                        .event_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    entry.error_message.as_deref().unwrap_or(""),
                    details
                );
            }
            eprintln!("ok: {} orphaned artifact(s)", entries.len());
            Ok(())
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {other}")
        }
    }
}
