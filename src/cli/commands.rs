use clap::{Parser, Subcommand};
use rusqlite::Connection;
use crate::config::Config;
use crate::db::DbConnection;
use crate::models::{Deal, Role, Specification, StageCode, StagePhase};
use crate::repo::{ClientRepo, DealRepo, HistoryRepo, ProfileRepo};
use crate::services::{notify_transition, ExchangeRateService, HttpMailer, HttpRateSource};
use crate::workflow::{ChangeOutcome, ChangerError, SqliteTransitionApplier, StatusChanger};
use crate::cli::dashboard::{render_dashboard, DashboardData};
use crate::cli::output::{
    deal_row_json, format_board, format_deal_summary, format_deal_table, format_history, format_stage_registry,
    history_entry_json, DealSummary,
};
use crate::cli::error::{user_error, validate_email, validate_id, validate_non_empty, validate_price, validate_quantity};
use crate::utils::format_timestamp;
use std::path::PathBuf;
use anyhow::{Context, Result};

#[derive(Parser)]
#[command(name = "bao")]
#[command(about = "BAO Flow - deal tracking and status workflow for packaging trade operations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Client management commands
    Clients {
        #[command(subcommand)]
        subcommand: ClientCommands,
    },
    /// Add a new deal
    Add {
        /// Deal title
        #[arg(required = true)]
        title: Vec<String>,
        /// Client ID
        #[arg(long)]
        client: Option<String>,
        /// Initial stage (defaults to M01)
        #[arg(long)]
        stage: Option<String>,
        /// Product name
        #[arg(long)]
        product: Option<String>,
        /// Material
        #[arg(long)]
        material: Option<String>,
        /// Dimensions (e.g., "120x80x40mm")
        #[arg(long)]
        dimensions: Option<String>,
        /// Order quantity
        #[arg(long)]
        quantity: Option<i64>,
    },
    /// Record a quote for a deal
    Quote {
        /// Deal ID
        deal_id: String,
        /// Unit price in USD
        unit_price_usd: f64,
        /// Quantity
        quantity: i64,
    },
    /// List deals
    List {
        /// Only deals at this stage (e.g., M08)
        #[arg(long)]
        stage: Option<String>,
        /// Only deals in this phase (sales, contract, factory, settlement, logistics, closed)
        #[arg(long)]
        view: Option<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show deal details, latest quote and history
    Show {
        /// Deal ID
        deal_id: String,
    },
    /// Move a deal to a new stage
    Status {
        /// Deal ID
        deal_id: String,
        /// Target stage (M01 through M25)
        stage: String,
        /// History note (defaults to "Status changed to <label>")
        #[arg(long)]
        note: Option<String>,
    },
    /// Show status history of a deal
    History {
        /// Deal ID
        deal_id: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// List the stage registry
    Stages {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Show deals grouped by phase
    Board,
    /// Look up the USD/JPY exchange rate
    Rate {
        /// Rate to use when the lookup fails (overrides rates.fallback)
        #[arg(long)]
        fallback: Option<f64>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// User profile commands
    Profile {
        #[command(subcommand)]
        subcommand: ProfileCommands,
    },
    /// Write the HTML dashboard
    Dashboard {
        /// Output file (defaults to bao-dashboard.html)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Add a new client
    Add {
        /// Contact name
        name: String,
        /// Company name
        #[arg(long)]
        company: Option<String>,
        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },
    /// List clients
    List {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create or update a profile
    Set {
        email: String,
        display_name: String,
        /// admin, sales, factory, logistics or viewer
        role: String,
    },
    /// Show a profile (defaults to user.email)
    Show {
        email: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            // --help and --version are not errors
            if e.use_stderr() {
                std::process::exit(1);
            }
            return Ok(());
        }
    };

    handle_command(cli)
}

fn handle_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Clients { subcommand } => handle_clients(subcommand),
        Commands::Add { title, client, stage, product, material, dimensions, quantity } => {
            let spec = Specification { deal_id: 0, product, material, dimensions, quantity };
            handle_deal_add(title, client, stage, spec)
        }
        Commands::Quote { deal_id, unit_price_usd, quantity } => handle_quote(deal_id, unit_price_usd, quantity),
        Commands::List { stage, view, json } => handle_deal_list(stage, view, json),
        Commands::Show { deal_id } => handle_deal_show(deal_id),
        Commands::Status { deal_id, stage, note } => handle_status(deal_id, stage, note),
        Commands::History { deal_id, json } => handle_history(deal_id, json),
        Commands::Stages { json } => handle_stages(json),
        Commands::Board => handle_board(),
        Commands::Rate { fallback, json } => handle_rate(fallback, json),
        Commands::Profile { subcommand } => handle_profile(subcommand),
        Commands::Dashboard { output } => handle_dashboard(output),
    }
}

fn parse_stage_arg(raw: &str) -> StageCode {
    raw.parse::<StageCode>().unwrap_or_else(|e: String| user_error(&e))
}

fn parse_deal_id(raw: &str) -> i64 {
    validate_id(raw, "deal").unwrap_or_else(|e| user_error(&e))
}

fn load_deal(conn: &Connection, deal_id: i64) -> Result<Deal> {
    match DealRepo::get_by_id(conn, deal_id)? {
        Some(deal) => Ok(deal),
        None => user_error(&format!("Deal {} not found", deal_id)),
    }
}

fn handle_clients(cmd: ClientCommands) -> Result<()> {
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    match cmd {
        ClientCommands::Add { name, company, email } => {
            if let Err(e) = validate_non_empty(&name, "Client name") {
                user_error(&e);
            }
            if let Some(ref email) = email {
                if let Err(e) = validate_email(email) {
                    user_error(&e);
                }
            }
            let client = ClientRepo::create(&conn, name.trim(), company.as_deref(), email.as_deref())
                .context("Failed to create client")?;
            println!(
                "Created client {}: {}",
                client.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                client.display_name()
            );
            Ok(())
        }
        ClientCommands::List { json } => {
            let clients = ClientRepo::list(&conn).context("Failed to list clients")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&clients)?);
            } else if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<6} {:<30} {:<30} {:<30}", "ID", "Name", "Company", "Email");
                println!("{}", "-".repeat(96));
                for client in clients {
                    println!(
                        "{:<6} {:<30} {:<30} {:<30}",
                        client.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
                        client.name,
                        client.company.as_deref().unwrap_or("-"),
                        client.email.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(())
        }
    }
}

fn handle_deal_add(title: Vec<String>, client: Option<String>, stage: Option<String>, mut spec: Specification) -> Result<()> {
    let title = title.join(" ");
    if let Err(e) = validate_non_empty(&title, "Deal title") {
        user_error(&e);
    }
    let stage = stage.as_deref().map(parse_stage_arg).unwrap_or(StageCode::INITIAL);
    if let Some(quantity) = spec.quantity {
        if let Err(e) = validate_quantity(quantity) {
            user_error(&e);
        }
    }

    let config = Config::load()?;
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    let client_id = match client {
        Some(raw) => {
            let id = validate_id(&raw, "client").unwrap_or_else(|e| user_error(&e));
            if ClientRepo::get_by_id(&conn, id)?.is_none() {
                user_error(&format!("Client {} not found", id));
            }
            Some(id)
        }
        None => None,
    };

    let deal = DealRepo::create(&conn, title.trim(), client_id, stage, config.user_email())
        .context("Failed to create deal")?;
    let deal_id = deal.id.unwrap_or_default();
    spec.deal_id = deal_id;
    if !spec.is_empty() {
        DealRepo::set_specification(&conn, &spec).context("Failed to save specification")?;
    }

    println!("Created deal {}: {} ({} {})", deal_id, deal.title, stage, stage.label());
    Ok(())
}

fn handle_quote(deal_id: String, unit_price_usd: f64, quantity: i64) -> Result<()> {
    let deal_id = parse_deal_id(&deal_id);
    if let Err(e) = validate_price(unit_price_usd) {
        user_error(&e);
    }
    if let Err(e) = validate_quantity(quantity) {
        user_error(&e);
    }

    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;
    load_deal(&conn, deal_id)?;

    let quote = DealRepo::add_quote(&conn, deal_id, unit_price_usd, quantity)
        .context("Failed to save quote")?;
    println!(
        "Quoted deal {}: {} x {} = {}",
        deal_id,
        crate::utils::format_usd(quote.unit_price_usd),
        quote.quantity,
        crate::utils::format_usd(quote.total_usd())
    );
    Ok(())
}

fn handle_deal_list(stage: Option<String>, view: Option<String>, json: bool) -> Result<()> {
    let stage = stage.as_deref().map(parse_stage_arg);
    let phase = view.as_deref().map(|v| {
        StagePhase::from_str(v).unwrap_or_else(|| {
            user_error(&format!(
                "Invalid view: '{}'. View must be one of: {}.",
                v,
                StagePhase::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
            ))
        })
    });

    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;
    let rows: Vec<_> = DealRepo::list_rows(&conn)
        .context("Failed to list deals")?
        .into_iter()
        .filter(|row| stage.map_or(true, |s| row.deal.current_stage.code() == Some(s)))
        .filter(|row| phase.map_or(true, |p| row.deal.current_stage.phase() == Some(p)))
        .collect();

    if json {
        let json_rows: Vec<serde_json::Value> = rows.iter().map(deal_row_json).collect();
        println!("{}", serde_json::to_string_pretty(&json_rows)?);
    } else {
        print!("{}", format_deal_table(&rows));
    }
    Ok(())
}

fn handle_deal_show(deal_id: String) -> Result<()> {
    let deal_id = parse_deal_id(&deal_id);
    let config = Config::load()?;
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    let deal = load_deal(&conn, deal_id)?;
    let client = match deal.client_id {
        Some(id) => ClientRepo::get_by_id(&conn, id)?,
        None => None,
    };
    let specification = DealRepo::get_specification(&conn, deal_id)?;
    let quote = DealRepo::latest_quote(&conn, deal_id)?;
    let history = HistoryRepo::get_by_deal(&conn, deal_id)?;

    let rate = if quote.is_some() {
        let service = ExchangeRateService::new(HttpRateSource::new(config.rates_url()), config.rate_ttl_secs());
        Some(service.get_exchange_rate_with_fallback(&conn, config.fallback_rate()))
    } else {
        None
    };

    print!("{}", format_deal_summary(&DealSummary {
        deal: &deal,
        client: client.as_ref(),
        specification: specification.as_ref(),
        quote: quote.as_ref(),
        rate: rate.as_ref(),
        history: &history,
    }));
    Ok(())
}

fn handle_status(deal_id: String, stage: String, note: Option<String>) -> Result<()> {
    let deal_id = parse_deal_id(&deal_id);
    let new_stage = parse_stage_arg(&stage);

    let config = Config::load()?;
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;
    let deal = load_deal(&conn, deal_id)?;

    let actor = config.user_email().map(str::to_string);
    let mut changer = StatusChanger::new(deal_id, deal.current_stage.clone());
    let mut applier = SqliteTransitionApplier::new(&conn, actor.clone());

    match changer.change(&mut applier, new_stage, note.as_deref()) {
        Ok(ChangeOutcome::Applied { entry, .. }) => {
            let from = entry
                .previous_stage
                .as_ref()
                .map(|s| format!("{} ({})", s.as_stored(), s.label()))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "Deal {}: {} -> {} ({})",
                deal_id,
                from,
                entry.new_stage.as_stored(),
                entry.new_stage.label()
            );

            if let Some(settings) = config.email() {
                let mailer = HttpMailer::from_settings(&settings);
                let actor_name = actor.as_deref().map(|email| ProfileRepo::display_name_for(&conn, email));
                notify_transition(&mailer, &settings.notify, &deal, &entry, actor_name.as_deref());
            }
            Ok(())
        }
        Ok(ChangeOutcome::Failed { error, retry }) => {
            eprintln!("Error: {}", error);
            eprintln!("Deal {} is unchanged. Retry with: bao status {} {}", deal_id, deal_id, retry);
            std::process::exit(1);
        }
        Err(ChangerError::Unchanged(code)) => {
            println!("Deal {} is already at {} ({})", deal_id, code, code.label());
            Ok(())
        }
        Err(e) => user_error(&e.to_string()),
    }
}

fn handle_history(deal_id: String, json: bool) -> Result<()> {
    let deal_id = parse_deal_id(&deal_id);
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;
    load_deal(&conn, deal_id)?;

    let entries = HistoryRepo::get_by_deal(&conn, deal_id)
        .context("Failed to load history")?;
    if json {
        let json_entries: Vec<serde_json::Value> = entries.iter().map(history_entry_json).collect();
        println!("{}", serde_json::to_string_pretty(&json_entries)?);
    } else {
        print!("{}", format_history(&entries));
    }
    Ok(())
}

fn handle_stages(json: bool) -> Result<()> {
    if json {
        let stages: Vec<serde_json::Value> = StageCode::ALL.iter().map(|code| {
            let style = code.style();
            serde_json::json!({
                "code": code.as_str(),
                "label": code.label(),
                "phase": code.phase().as_str(),
                "color": style.color,
                "hex": style.hex,
                "weight": style.weight,
            })
        }).collect();
        println!("{}", serde_json::to_string_pretty(&stages)?);
    } else {
        print!("{}", format_stage_registry());
    }
    Ok(())
}

fn handle_board() -> Result<()> {
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;
    let rows = DealRepo::list_rows(&conn).context("Failed to list deals")?;
    print!("{}", format_board(&rows));
    Ok(())
}

fn handle_rate(fallback: Option<f64>, json: bool) -> Result<()> {
    if let Some(value) = fallback {
        if !(value.is_finite() && value > 0.0) {
            user_error(&format!("Invalid fallback rate: {}. Rate must be positive.", value));
        }
    }
    let config = Config::load()?;
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    let service = ExchangeRateService::new(HttpRateSource::new(config.rates_url()), config.rate_ttl_secs());
    let rate = service.get_exchange_rate_with_fallback(&conn, fallback.unwrap_or_else(|| config.fallback_rate()));

    if json {
        println!("{}", serde_json::to_string_pretty(&rate)?);
    } else {
        println!("{}/{} {:.2} ({})", rate.base, rate.quote, rate.rate, rate.source);
    }
    Ok(())
}

fn handle_profile(cmd: ProfileCommands) -> Result<()> {
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    match cmd {
        ProfileCommands::Set { email, display_name, role } => {
            if let Err(e) = validate_email(&email) {
                user_error(&e);
            }
            if let Err(e) = validate_non_empty(&display_name, "Display name") {
                user_error(&e);
            }
            let role = Role::from_str(&role.to_lowercase()).unwrap_or_else(|| {
                user_error(&format!(
                    "Invalid role: '{}'. Role must be one of: admin, sales, factory, logistics, viewer.",
                    role
                ))
            });
            let profile = ProfileRepo::upsert(&conn, email.trim(), display_name.trim(), role)?;
            println!("Saved profile {} ({}, {})", profile.email, profile.display_name, profile.role.as_str());
            Ok(())
        }
        ProfileCommands::Show { email } => {
            let email = match email {
                Some(email) => email,
                None => Config::load()?
                    .user_email()
                    .map(str::to_string)
                    .unwrap_or_else(|| user_error("No email given and user.email is not set in ~/.bao/rc")),
            };
            match ProfileRepo::get_by_email(&conn, &email)? {
                Some(profile) => {
                    println!("Email:    {}", profile.email);
                    println!("Name:     {}", profile.display_name);
                    println!("Role:     {}", profile.role.as_str());
                    println!("Modified: {}", format_timestamp(profile.modified_ts));
                    Ok(())
                }
                None => user_error(&format!("Profile {} not found", email)),
            }
        }
    }
}

fn handle_dashboard(output: Option<PathBuf>) -> Result<()> {
    let path = output.unwrap_or_else(|| PathBuf::from("bao-dashboard.html"));
    let conn = DbConnection::connect()
        .context("Failed to connect to database")?;

    let data = DashboardData::collect(&conn, chrono::Utc::now().timestamp())?;
    let html = render_dashboard(&data);
    std::fs::write(&path, html)
        .with_context(|| format!("Failed to write dashboard: {}", path.display()))?;
    println!("Wrote dashboard to {}", path.display());
    Ok(())
}
