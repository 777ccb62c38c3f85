//! stockroom_cli - scanning and portal client
//!
//! ```bash
//! stockroom_cli login dep1 --password pass1
//! stockroom_cli lookup BC-00M0001
//! stockroom_cli record BC-00M0001 out --quantity 2
//! stockroom_cli history show
//! stockroom_cli barcodes --output labels.pdf
//! stockroom_cli portal list --role query
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use stockroom_types::{MaterialDto, PortalRole, RecordKind};

use stockroom::client::{ClientError, HistoryEntry, ScanClient, TransactionHistory};
use stockroom::export::{barcode_sheet, BarcodeLabel};
use stockroom::portal::{route_login, LoginOutcome, PageViewCounter, Roster};
use stockroom::ClientConfig;

#[derive(Parser)]
#[command(name = "stockroom_cli")]
#[command(version)]
#[command(about = "Inventory scanning client and account portal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Direction {
    In,
    Out,
}

impl From<Direction> for RecordKind {
    fn from(d: Direction) -> Self {
        match d {
            Direction::In => RecordKind::In,
            Direction::Out => RecordKind::Out,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the token
    Login {
        username: String,
        #[arg(long, env = "STOCKROOM_PASSWORD")]
        password: String,
    },

    /// Manage the stored token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Look up a material by barcode
    Lookup { barcode: String },

    /// Scan a barcode and record a movement
    Record {
        barcode: String,
        #[arg(value_enum)]
        direction: Direction,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
        /// Operator name shown in the history
        #[arg(long)]
        operator: Option<String>,
    },

    /// Local transaction history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// List materials
    Materials {
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Write a printable Code128 sheet of the materials
    Barcodes {
        #[arg(short, long, default_value = "barcodes.pdf")]
        output: PathBuf,
        #[arg(short, long)]
        category: Option<String>,
        /// CJK font embedded in the sheet
        #[arg(long, env = "STOCKROOM_FONT_PATH")]
        font: Option<PathBuf>,
    },

    /// Account portal
    Portal {
        #[command(subcommand)]
        action: PortalAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a token obtained elsewhere
    Set { token: String },
    /// Forget the stored token
    Clear,
}

#[derive(Subcommand)]
enum HistoryAction {
    Show,
    Clear,
}

#[derive(Subcommand)]
enum PortalAction {
    /// Show the account grid
    List {
        /// all, admin, user or query
        #[arg(short, long, default_value = "all")]
        role: String,
    },
    /// Resolve where a username lands
    Login { username: String },
    /// Show the page view counter
    Views,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &ClientConfig) -> anyhow::Result<()> {
    match command {
        Commands::Login { username, password } => {
            let mut client = ScanClient::new(config)?;
            client.login(&username, &password).await?;
            println!("{} Logged in as {}", "OK".green(), username.bold());
        }
        Commands::Token { action } => {
            let mut client = ScanClient::new(config)?;
            match action {
                TokenAction::Set { token } => {
                    client.set_token(token.trim())?;
                    println!("{} Token stored", "OK".green());
                }
                TokenAction::Clear => {
                    client.forget_token();
                    println!("{} Token cleared", "OK".green());
                }
            }
        }
        Commands::Lookup { barcode } => {
            let mut client = ScanClient::new(config)?;
            let material = expired_hint(client.material_by_barcode(&barcode).await)?;
            print_material(&material);
        }
        Commands::Record {
            barcode,
            direction,
            quantity,
            operator,
        } => cmd_record(config, &barcode, direction.into(), quantity, operator).await?,
        Commands::History { action } => {
            let mut history = TransactionHistory::load(&config.history_file);
            match action {
                HistoryAction::Show => print_history(&history),
                HistoryAction::Clear => {
                    history.clear()?;
                    println!("{} History cleared", "OK".green());
                }
            }
        }
        Commands::Materials { category } => {
            let mut client = ScanClient::new(config)?;
            let materials = expired_hint(client.list_materials(category.as_deref()).await)?;
            if materials.is_empty() {
                println!("{}", "No materials".dimmed());
            }
            for m in &materials {
                let stock = if m.is_low_stock() {
                    m.current_stock.to_string().red().to_string()
                } else {
                    m.current_stock.to_string()
                };
                println!(
                    "{:<8} {:<24} {:>6} {:<6} {}",
                    m.item_id.cyan(),
                    m.name,
                    stock,
                    m.unit,
                    m.barcode.as_deref().unwrap_or("-").dimmed()
                );
            }
        }
        Commands::Barcodes {
            output,
            category,
            font,
        } => {
            let mut client = ScanClient::new(config)?;
            let materials = expired_hint(client.list_materials(category.as_deref()).await)?;
            let labels: Vec<BarcodeLabel> = materials.iter().map(BarcodeLabel::from).collect();
            let sheet = barcode_sheet(&labels, font.as_deref())?;
            std::fs::write(&output, &sheet.pdf)?;
            println!(
                "{} {} barcodes written to {}",
                "OK".green(),
                sheet.generated,
                output.display()
            );
            if sheet.skipped > 0 {
                println!(
                    "{} {} materials without a usable barcode were skipped",
                    "WARN".yellow(),
                    sheet.skipped
                );
            }
        }
        Commands::Portal { action } => cmd_portal(config, action)?,
    }
    Ok(())
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_record(
    config: &ClientConfig,
    barcode: &str,
    kind: RecordKind,
    quantity: i64,
    operator: Option<String>,
) -> anyhow::Result<()> {
    let mut client = ScanClient::new(config)?;
    let material = expired_hint(client.material_by_barcode(barcode).await)?;
    print_material(&material);

    let response = expired_hint(client.submit_record(Some(&material), kind, quantity).await)?;
    let verb = match kind {
        RecordKind::In => "Stocked in".green(),
        RecordKind::Out => "Issued".yellow(),
    };
    println!(
        "{} {} {} {}, stock now {}",
        verb,
        response.record.quantity,
        response.material.unit,
        response.material.name.bold(),
        response.material.current_stock
    );

    let mut history = TransactionHistory::load(&config.history_file);
    history.push(HistoryEntry::from_response(&response, operator.as_deref()))?;
    Ok(())
}

fn cmd_portal(config: &ClientConfig, action: PortalAction) -> anyhow::Result<()> {
    let roster = Roster::load(config.roster_path.as_deref())?;
    match action {
        PortalAction::List { role } => {
            let views = PageViewCounter::new(&config.state_file).record_view()?;
            let accounts = roster.filter(Some(role.as_str()))?;
            for account in &accounts {
                let role = match account.role {
                    PortalRole::Admin => account.role.as_str().red(),
                    PortalRole::User => account.role.as_str().green(),
                    PortalRole::Query => account.role.as_str().blue(),
                };
                println!(
                    "{:<10} {:<6} {:<18} {}",
                    account.username.bold(),
                    role,
                    account.label,
                    account.page.dimmed()
                );
            }
            println!("{}", format!("{} accounts, {} views", accounts.len(), views).dimmed());
        }
        PortalAction::Login { username } => match route_login(&roster, &username) {
            LoginOutcome::UnknownUser => anyhow::bail!("user {} does not exist", username.trim()),
            LoginOutcome::AdminSection(account) => {
                println!("{} {} opens the password management section", "ADMIN".red(), account.username);
            }
            LoginOutcome::Navigate(page) => println!("{} {}", "->".green(), page),
        },
        PortalAction::Views => {
            println!("{}", PageViewCounter::new(&config.state_file).current());
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn expired_hint<T>(result: Result<T, ClientError>) -> anyhow::Result<T> {
    result.map_err(|e| match e {
        ClientError::AuthExpired | ClientError::NoToken => {
            anyhow::anyhow!("{} (run `stockroom_cli login`)", e)
        }
        other => other.into(),
    })
}

fn print_material(m: &MaterialDto) {
    println!(
        "{} {}  [{}]  stock {} {}",
        m.item_id.cyan(),
        m.name.bold(),
        m.category,
        m.current_stock,
        m.unit
    );
}

fn print_history(history: &TransactionHistory) {
    if history.is_empty() {
        println!("{}", "No transactions yet".dimmed());
        return;
    }
    for entry in history.entries() {
        let kind = match entry.kind {
            RecordKind::In => "IN ".green(),
            RecordKind::Out => "OUT".yellow(),
        };
        println!(
            "{} {} {:<8} {:<20} x{:<4} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            kind,
            entry.item_id,
            entry.name,
            entry.quantity,
            entry.operator
        );
    }
}
