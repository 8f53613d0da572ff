//! Command-line entry point for vault-mcp.
//!
//! This binary is a thin wrapper around [`vault_tools::ToolSurface`] and its
//! supporting crates — it exists for operators to register, inspect, and
//! audit credentials from a terminal, not to replace the agent-facing tool
//! surface itself.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use vault_audit::AuditLog;
use vault_browser_automation::CdpBrowserAdapter;
use vault_contract::{LoginSelectors, ServiceType, VaultConfig};
use vault_gateway::{run_entry_gateway, PendingEntryRegistry, DEFAULT_ENTRY_TIMEOUT};
use vault_store::CredentialStore;
use vault_tools::ToolSurface;

#[derive(Debug, Parser)]
#[command(name = "vault-mcp", about = "Local credential broker for AI agents", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new credential through the out-of-process entry form.
    Add {
        site_id: String,
        #[arg(long, value_enum)]
        service_type: CliServiceType,
        #[arg(long)]
        login_url: Option<String>,
        #[arg(long, requires_all = ["password_selector", "submit_selector"])]
        email_selector: Option<String>,
        #[arg(long)]
        password_selector: Option<String>,
        #[arg(long)]
        submit_selector: Option<String>,
    },
    /// List every registered credential's metadata.
    List,
    /// Remove a credential permanently.
    Remove { site_id: String },
    /// Print the audit trail, optionally filtered to one site, and verify
    /// its hash chain.
    Audit { site_id: Option<String> },
    /// Run the loopback gateway in the foreground: the entry form plus the
    /// JSON submit and admin endpoints.
    Serve {
        #[arg(long, env = "VAULT_GATEWAY_PORT")]
        port: Option<u16>,
    },
    /// Run the loopback gateway in the foreground and print the admin
    /// endpoints a human can browse to manage credentials directly.
    Dashboard {
        #[arg(long, env = "VAULT_GATEWAY_PORT")]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliServiceType {
    WebLogin,
    ApiKey,
}

impl From<CliServiceType> for ServiceType {
    fn from(value: CliServiceType) -> Self {
        match value {
            CliServiceType::WebLogin => ServiceType::WebLogin,
            CliServiceType::ApiKey => ServiceType::ApiKey,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = VaultConfig::from_env();

    match cli.command {
        Command::Add {
            site_id,
            service_type,
            login_url,
            email_selector,
            password_selector,
            submit_selector,
        } => {
            run_add(
                &config,
                site_id,
                service_type.into(),
                login_url,
                email_selector,
                password_selector,
                submit_selector,
            )
            .await
        }
        Command::List => run_list(&config).await,
        Command::Remove { site_id } => run_remove(&config, site_id).await,
        Command::Audit { site_id } => run_audit(&config, site_id).await,
        Command::Serve { port } => run_serve(&config, port).await,
        Command::Dashboard { port } => run_dashboard(&config, port).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_add(
    config: &VaultConfig,
    site_id: String,
    service_type: ServiceType,
    login_url: Option<String>,
    email_selector: Option<String>,
    password_selector: Option<String>,
    submit_selector: Option<String>,
) -> Result<()> {
    let selectors = match (email_selector, password_selector, submit_selector) {
        (Some(email_selector), Some(password_selector), Some(submit_selector)) => {
            Some(LoginSelectors {
                email_selector,
                password_selector,
                submit_selector,
            })
        }
        (None, None, None) => None,
        _ => bail!("--email-selector, --password-selector, and --submit-selector must be given together"),
    };

    let store = Arc::new(
        CredentialStore::init(&config.data_dir)
            .await
            .context("failed to open credential store")?,
    );
    let audit = Arc::new(
        AuditLog::init(&config.data_dir)
            .await
            .context("failed to open audit log")?,
    );
    let pending = Arc::new(PendingEntryRegistry::new());
    let browser = Arc::new(CdpBrowserAdapter::new(config.cdp_url.clone()));
    let surface = ToolSurface::new(
        Arc::clone(&store),
        Arc::clone(&audit),
        browser,
        Arc::clone(&pending),
        config.gateway_port,
        "vault-cli",
    );

    // The gateway has to be reachable for the handshake below to resolve, so
    // run it for the lifetime of this command rather than requiring a
    // separate `serve` process.
    tokio::spawn(run_entry_gateway(config.gateway_port, store, audit, pending));

    let metadata = surface
        .add(
            &site_id,
            service_type,
            login_url,
            selectors,
            DEFAULT_ENTRY_TIMEOUT,
            |url| println!("Open this URL to finish adding the credential:\n  {url}"),
        )
        .await
        .context("failed to add credential")?;

    println!("Added credential '{}' ({})", metadata.site_id, metadata.service_type);
    Ok(())
}

async fn run_list(config: &VaultConfig) -> Result<()> {
    let store = CredentialStore::init(&config.data_dir)
        .await
        .context("failed to open credential store")?;
    let credentials = store.list().await;
    if credentials.is_empty() {
        println!("No credentials registered.");
        return Ok(());
    }
    for credential in credentials {
        println!(
            "{:<32} {:<10} {}",
            credential.site_id,
            credential.service_type.to_string(),
            if credential.active { "active" } else { "inactive" },
        );
    }
    Ok(())
}

async fn run_remove(config: &VaultConfig, site_id: String) -> Result<()> {
    let store = CredentialStore::init(&config.data_dir)
        .await
        .context("failed to open credential store")?;
    store
        .remove(&site_id)
        .await
        .with_context(|| format!("failed to remove '{site_id}'"))?;
    println!("Removed credential '{site_id}'");
    Ok(())
}

async fn run_audit(config: &VaultConfig, site_id: Option<String>) -> Result<()> {
    let log = AuditLog::init(&config.data_dir)
        .await
        .context("failed to open audit log")?;
    let entries = log
        .entries(site_id.as_deref())
        .await
        .context("failed to read audit log")?;
    for entry in &entries {
        println!(
            "{} {:<20} site={:<24} {}",
            entry.timestamp.to_rfc3339(),
            entry.action.to_string(),
            entry.site_id.as_deref().unwrap_or("-"),
            entry.result.message,
        );
    }
    let verification = log.verify_chain().await.context("failed to verify audit chain")?;
    if !verification.valid {
        bail!(
            "audit chain integrity check failed at entry {} of {} — the log may have been tampered with",
            verification.broken_at.unwrap_or(verification.total),
            verification.total,
        );
    }
    Ok(())
}

async fn run_serve(config: &VaultConfig, port: Option<u16>) -> Result<()> {
    let store = Arc::new(
        CredentialStore::init(&config.data_dir)
            .await
            .context("failed to open credential store")?,
    );
    let audit = Arc::new(
        AuditLog::init(&config.data_dir)
            .await
            .context("failed to open audit log")?,
    );
    let pending = Arc::new(PendingEntryRegistry::new());
    let port = port.unwrap_or(config.gateway_port);
    run_entry_gateway(port, store, audit, pending).await
}

async fn run_dashboard(config: &VaultConfig, port: Option<u16>) -> Result<()> {
    let store = Arc::new(
        CredentialStore::init(&config.data_dir)
            .await
            .context("failed to open credential store")?,
    );
    let audit = Arc::new(
        AuditLog::init(&config.data_dir)
            .await
            .context("failed to open audit log")?,
    );
    let pending = Arc::new(PendingEntryRegistry::new());
    let port = port.unwrap_or(config.gateway_port);
    println!("Dashboard listening on http://127.0.0.1:{port}");
    println!("  GET    /api/credentials       list every credential's metadata");
    println!("  PATCH  /api/credentials/{{site}} toggle a credential active/inactive");
    println!("  DELETE /api/credentials/{{site}} remove a credential");
    println!("  GET    /api/audit              read the audit trail");
    run_entry_gateway(port, store, audit, pending).await
}
