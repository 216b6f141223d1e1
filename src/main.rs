use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use payroll_dashboard::{
    AppState, Config,
    models::{EmployeeId, ImportJob, Period},
    services::HttpGateway,
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "payroll-dashboard")]
#[command(about = "Headless client for the payroll reporting dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the overview and the panel of one period
    Dashboard {
        /// Period to show instead of the default one
        #[arg(long)]
        period: Option<String>,
    },
    /// Browse the employee directory
    Employees {
        /// Name or personnel number filter
        #[arg(long, short)]
        search: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Show the payroll history of this employee
        #[arg(long)]
        select: Option<i64>,
    },
    /// List recent imports
    Imports,
    /// Upload a payroll CSV export
    Upload { file: PathBuf },
}

// Controllers assume single-threaded cooperative scheduling.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("payroll_dashboard=debug")),
        )
        .init();

    let cli = Cli::parse();

    // ─── Config ───────────────────────────────────────────────────────────────
    let config = Config::from_env()?;
    info!(api = %config.api_base_url, "using reporting API");

    // ─── Session ──────────────────────────────────────────────────────────────
    let gateway = HttpGateway::new(&config)?;
    if let Some((username, password)) = config.credentials() {
        let user = gateway.login(username, password).await?;
        info!(user = %user.username, role = %user.role, "logged in");
    }

    let state = AppState::new(Arc::new(gateway), config);

    match cli.command {
        Command::Dashboard { period } => show_dashboard(&state, period).await,
        Command::Employees {
            search,
            page,
            select,
        } => show_employees(&state, search, page, select).await,
        Command::Imports => show_imports(&state).await,
        Command::Upload { file } => upload(&state, file).await,
    }
}

async fn show_dashboard(state: &AppState, period: Option<String>) -> Result<()> {
    let dashboard = state.dashboard();
    let mut rx = dashboard.subscribe();
    rx.wait_for(|s| s.is_idle()).await?;

    if let Some(period) = period {
        dashboard.select_period(Period::new(period))?;
        rx.wait_for(|s| s.is_idle()).await?;
    }

    let snapshot = dashboard.state();
    if let Some(e) = snapshot.global.error.as_ref().or(snapshot.period_phase.error.as_ref()) {
        bail!("dashboard could not be loaded: {e}");
    }
    let Some(view) = snapshot.ready() else {
        warn!("no payroll data imported yet");
        return Ok(());
    };

    let kpis = &view.panel.kpis;
    println!("Period           {}", view.panel.period);
    println!("Employees        {}", kpis.employee_count);
    println!("Total cost       {}", kpis.total_cost);
    println!("Total gross      {}", kpis.total_gross);
    println!("Employer SV      {}", kpis.total_sv_ag);
    println!("Reimbursements   {}", kpis.total_reimbursements());
    println!(
        "Last import      {}",
        kpis.last_import_status.as_deref().unwrap_or("-")
    );

    println!("\nTop employees");
    for item in &view.panel.top.items {
        println!(
            "  {:<10} {:<30} {}",
            item.external_id,
            format!("{} {}", item.first_name, item.last_name),
            item.total_cost
        );
    }

    println!("\nMonthly total cost");
    for row in snapshot.monthly_chronological() {
        println!("  {}  {:>4} employees  {}", row.period, row.employee_count, row.total_cost);
    }
    Ok(())
}

async fn show_employees(
    state: &AppState,
    search: Option<String>,
    page: u32,
    select: Option<i64>,
) -> Result<()> {
    let directory = state.directory();
    let mut rx = directory.subscribe();
    rx.wait_for(|s| s.is_idle()).await?;

    if let Some(search) = search {
        directory.set_query(search.clone());
        rx.wait_for(|s| s.settled_query == search && s.is_idle())
            .await?;
    }
    if page > 1 {
        directory.set_page(page);
        rx.wait_for(|s| s.is_idle()).await?;
    }
    if let Some(id) = select {
        directory.select(EmployeeId(id));
    }

    let snapshot = directory.state();
    if let Some(e) = &snapshot.error {
        bail!("employees could not be loaded: {e}");
    }

    println!(
        "Page {}/{} ({} matches)",
        snapshot.page,
        snapshot.page_count(),
        snapshot.total
    );
    for e in snapshot.employees.iter().flatten() {
        let marker = if snapshot.selected == Some(e.id) { '>' } else { ' ' };
        println!("{marker} {:>6}  {:<10} {}", e.id.0, e.external_id, e.display_name());
    }

    let detail = directory
        .detail()
        .subscribe()
        .wait_for(|d| d.is_idle())
        .await?
        .clone();
    if let Some(e) = detail.error {
        bail!("payroll history could not be loaded: {e}");
    }
    if let Some(history) = detail.history {
        println!("\nPayroll history of {}", history.employee.display_name());
        for record in history.chronological() {
            println!(
                "  {}  gross {}  net {}  total cost {} {}",
                record.period,
                record.gross_amount,
                record.net_amount,
                record.total_cost,
                record.currency
            );
        }
    }
    Ok(())
}

async fn show_imports(state: &AppState) -> Result<()> {
    let imports = state.imports();
    imports.subscribe().wait_for(|s| s.is_idle()).await?;

    let snapshot = imports.state();
    if let Some(e) = &snapshot.history.error {
        bail!("import history could not be loaded: {e}");
    }
    print_jobs(&snapshot.jobs.unwrap_or_default());
    Ok(())
}

async fn upload(state: &AppState, file: PathBuf) -> Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("upload path has no file name")?
        .to_string();
    let contents = tokio::fs::read(&file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let imports = state.imports();
    let done = imports.upload(&filename, contents).await?;
    println!(
        "Import started: {} ({}) -> {}",
        done.filename,
        done.period.as_ref().map(Period::as_str).unwrap_or("-"),
        done.status
    );

    imports.subscribe().wait_for(|s| s.is_idle()).await?;
    print_jobs(&imports.state().jobs.unwrap_or_default());
    Ok(())
}

fn print_jobs(jobs: &[ImportJob]) {
    if jobs.is_empty() {
        println!("No imports yet.");
        return;
    }
    for job in jobs {
        println!(
            "{:>6}  {:<40} {:<8} {}",
            job.id,
            job.filename,
            job.period.as_ref().map(Period::as_str).unwrap_or("-"),
            job.status
        );
    }
}
