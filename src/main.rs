//! Queueboard - routing queue dashboard for the command line
//!
//! Fetches queue configuration from the lead-routing API, prints
//! per-queue / per-rep statistics, and edits queue membership with
//! an audit trail.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (configuration, fetch, mutation, I/O)

mod analysis;
mod api;
mod audit;
mod cli;
mod config;
mod gateway;
mod models;
mod report;

use analysis::{Aggregator, FilterOptions, StatsFilter};
use anyhow::{anyhow, bail, Context, Result};
use api::{RoutingApi, RoutingClient};
use audit::{AuditFilter, AuditLog};
use cli::{
    parse_selection, Args, AssignArgs, AuditArgs, Command, OutputFormat, SetOrderArgs,
    SetWeightArgs, StatsArgs, UnassignArgs,
};
use config::{Config, CONFIG_FILE};
use gateway::{MutationGateway, WeightChange};
use indicatif::{ProgressBar, ProgressStyle};
use models::{QueuePage, SizeBucket};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("Queueboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args.command);

    if let Err(e) = run(&args, &config).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .queueboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the API URL, workspaces, and audit log.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

async fn run(args: &Args, config: &Config) -> Result<()> {
    match &args.command {
        Command::Stats(stats) => handle_stats(config, stats, args.quiet).await,
        Command::Filters => handle_filters(config, args.quiet).await,
        Command::SetWeight(set) => handle_set_weight(config, set, args.quiet).await,
        Command::SetOrder(set) => handle_set_order(config, set).await,
        Command::Unassign(unassign) => handle_unassign(config, unassign).await,
        Command::Assign(assign) => handle_assign(config, assign, args.quiet).await,
        Command::Audit(audit) => handle_audit(config, audit).await,
        Command::InitConfig => handle_init_config(),
    }
}

fn build_client(config: &Config) -> Result<RoutingClient> {
    let api_config = config.api_config()?;
    debug!(
        "Routing API: {} (timeout {}s)",
        api_config.base_url, api_config.timeout_seconds
    );
    RoutingClient::new(api_config).context("Failed to create routing API client")
}

fn build_gateway(config: &Config, client: RoutingClient) -> MutationGateway<RoutingClient, AuditLog> {
    let audit = AuditLog::from_path(config.audit.log_path.clone());
    match audit {
        AuditLog::Disabled => debug!("No audit log configured; weight updates will not be recorded"),
        AuditLog::File(ref log) => debug!("Audit log: {}", log.path().display()),
    }
    MutationGateway::new(client, audit, config.actor())
}

/// Fetch the queue snapshot behind a spinner.
async fn fetch_snapshot<A: RoutingApi>(api: &A, quiet: bool) -> Result<QueuePage> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Fetching queues...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let result = api.fetch_queues().await;
    spinner.finish_and_clear();

    result.context("Failed to fetch queues")
}

fn aggregator(config: &Config) -> Aggregator {
    let aggregator = Aggregator::new(config.workspace_directory());
    match config.api.admin_base_url {
        Some(ref url) => aggregator.with_admin_base_url(url.clone()),
        None => aggregator,
    }
}

/// Turn CLI filter selections into a [`StatsFilter`]; "All" means no filter.
fn stats_filter(config: &Config, args: &StatsArgs) -> Result<StatsFilter> {
    let workspace = args
        .workspace
        .as_deref()
        .or(Some(config.general.default_workspace.as_str()));

    let size = parse_selection(args.size.as_deref())
        .map(|s| s.parse::<SizeBucket>())
        .transpose()
        .map_err(|e| anyhow!(e))?;

    Ok(StatsFilter {
        workspace: parse_selection(workspace),
        rep: parse_selection(args.rep.as_deref()),
        size,
    })
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("✅ Report saved to: {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

async fn handle_stats(config: &Config, args: &StatsArgs, quiet: bool) -> Result<()> {
    let filter = stats_filter(config, args)?;
    let client = build_client(config)?;
    let page = fetch_snapshot(&client, quiet).await?;

    let aggregator = aggregator(config);
    if let Some(ref ws) = filter.workspace {
        let known = page
            .elements
            .iter()
            .any(|q| aggregator.workspaces().label(&q.workspace_id) == ws.as_str());
        if !known {
            warn!("No queues in workspace '{}'", ws);
        }
    }

    let stats = aggregator.aggregate(&page.elements, &filter);
    info!(
        "Aggregated {} queues, {} reps",
        stats.total_queues, stats.total_reps
    );

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&stats, &filter)?,
        OutputFormat::Markdown => {
            let sort = report::MemberSort {
                key: args.sort_by,
                descending: args.descending,
            };
            report::generate_markdown_report(&stats, &filter, args.section, sort)
        }
    };

    emit(&output, args.output.as_deref())
}

async fn handle_filters(config: &Config, quiet: bool) -> Result<()> {
    let client = build_client(config)?;
    let page = fetch_snapshot(&client, quiet).await?;

    let options = FilterOptions::from_queues(&page.elements, &config.workspace_directory());
    println!("{}", report::generate_filters_markdown(&options));
    Ok(())
}

async fn handle_set_weight(config: &Config, args: &SetWeightArgs, quiet: bool) -> Result<()> {
    let client = build_client(config)?;

    let (queue_name, rep_name) = match (&args.queue_name, &args.rep_name) {
        (Some(queue), Some(rep)) => (queue.clone(), rep.clone()),
        _ => {
            let page = fetch_snapshot(&client, quiet).await?;
            resolve_names(&page, args)
        }
    };
    let gateway = build_gateway(config, client);

    let change = WeightChange {
        queue_id: args.queue_id.clone(),
        member_ids: args.member_ids.clone(),
        weight: args.weight,
        queue_name,
        rep_name,
    };
    gateway.set_weight(&change).await?;

    println!(
        "✅ Updated weight to {} for {} in {}",
        change.weight, change.rep_name, change.queue_name
    );
    Ok(())
}

/// Queue and rep names for the audit row, falling back to the raw ids.
fn resolve_names(page: &QueuePage, args: &SetWeightArgs) -> (String, String) {
    let queue = page.find_queue(&args.queue_id);
    if queue.is_none() {
        warn!("Queue {} not found in snapshot", args.queue_id);
    }

    let queue_name = args
        .queue_name
        .clone()
        .or_else(|| queue.map(|q| q.name.clone()))
        .unwrap_or_else(|| args.queue_id.clone());

    let rep_name = args.rep_name.clone().unwrap_or_else(|| {
        args.member_ids
            .iter()
            .map(|id| {
                queue
                    .and_then(|q| q.member(id))
                    .map_or(id.as_str(), |m| m.name.as_str())
            })
            .collect::<Vec<_>>()
            .join(", ")
    });

    (queue_name, rep_name)
}

async fn handle_set_order(config: &Config, args: &SetOrderArgs) -> Result<()> {
    let gateway = build_gateway(config, build_client(config)?);
    gateway
        .set_order(&args.queue_id, &args.member_id, args.order)
        .await?;
    println!("ℹ️  Order changes are not applied by the routing service; nothing was sent.");
    Ok(())
}

async fn handle_unassign(config: &Config, args: &UnassignArgs) -> Result<()> {
    let gateway = build_gateway(config, build_client(config)?);
    gateway.unassign(&args.queue_id, &args.member_ids).await?;
    println!(
        "✅ Removed {} member(s) from queue {}",
        args.member_ids.len(),
        args.queue_id
    );
    Ok(())
}

async fn handle_assign(config: &Config, args: &AssignArgs, quiet: bool) -> Result<()> {
    let client = build_client(config)?;

    if args.reps.is_empty() {
        let gateway = build_gateway(config, client);
        gateway
            .assign(&args.queue_id, &args.member_ids, args.weight)
            .await?;
        println!(
            "✅ Added {} member(s) to queue {}{}",
            args.member_ids.len(),
            args.queue_id,
            weight_suffix(args.weight)
        );
        return Ok(());
    }

    let page = fetch_snapshot(&client, quiet).await?;
    let plan = RepAssignment::plan(&page, &args.queue_id, &args.reps);
    let gateway = build_gateway(config, client);

    for rep in &plan.already_assigned {
        warn!("{} is already in queue {}; skipping", rep, args.queue_id);
    }
    for rep in &plan.unknown {
        warn!("No rep named '{}' in any queue", rep);
    }
    if plan.targets.is_empty() && plan.unknown.is_empty() {
        bail!("Every selected rep is already in queue {}", args.queue_id);
    }

    // One call per rep so a failure names the rep it belongs to
    let mut added = Vec::new();
    let mut failed = plan.unknown.clone();
    for (rep, member_id) in &plan.targets {
        debug!("Resolved rep '{}' to member id {}", rep, member_id);
        match gateway
            .assign(&args.queue_id, std::slice::from_ref(member_id), args.weight)
            .await
        {
            Ok(()) => added.push(rep.as_str()),
            Err(e) => {
                warn!("Failed to add {}: {}", rep, e);
                failed.push(rep.clone());
            }
        }
    }

    if !added.is_empty() {
        println!(
            "✅ Added {} rep(s) to queue {}{}: {}",
            added.len(),
            args.queue_id,
            weight_suffix(args.weight),
            added.join(", ")
        );
    }
    if !failed.is_empty() {
        bail!("Failed to add some reps: {}", failed.join(", "));
    }
    Ok(())
}

fn weight_suffix(weight: Option<u32>) -> String {
    weight.map_or_else(String::new, |w| format!(" with weight {}", w))
}

/// Rep names for `assign --rep`, resolved against a snapshot.
#[derive(Debug, Default, PartialEq, Eq)]
struct RepAssignment {
    /// (rep name, member id) pairs to add.
    targets: Vec<(String, String)>,
    /// Reps already in the target queue.
    already_assigned: Vec<String>,
    /// Reps with no member id anywhere in the snapshot.
    unknown: Vec<String>,
}

impl RepAssignment {
    fn plan(page: &QueuePage, queue_id: &str, reps: &[String]) -> Self {
        let target = page.find_queue(queue_id);
        if target.is_none() {
            warn!("Queue {} not found in snapshot", queue_id);
        }

        let mut plan = RepAssignment::default();
        for rep in reps {
            if plan.targets.iter().any(|(name, _)| name == rep) {
                continue;
            }
            if target.map_or(false, |q| q.members.iter().any(|m| &m.name == rep)) {
                plan.already_assigned.push(rep.clone());
                continue;
            }
            match page.member_id_for_rep(rep) {
                Some(id) => plan.targets.push((rep.clone(), id.to_string())),
                None => plan.unknown.push(rep.clone()),
            }
        }
        plan
    }
}

async fn handle_audit(config: &Config, args: &AuditArgs) -> Result<()> {
    let log = AuditLog::from_path(config.audit.log_path.clone());
    let filter = AuditFilter {
        date: args.date,
        action: args.action,
        user: parse_selection(args.user.as_deref()),
    };

    let entries = log
        .read(&filter)
        .await
        .context("Set audit.log_path in the config or pass --audit-log")?;

    let output = match args.format {
        OutputFormat::Json => report::generate_audit_json(&entries)?,
        OutputFormat::Markdown => report::generate_audit_markdown(&entries),
    };
    println!("{}", output);
    Ok(())
}
