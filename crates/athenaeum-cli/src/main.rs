//! Athenaeum CLI - library circulation and events desk

mod console;
mod desk;
mod menu;
mod render;

use athenaeum_core::commands::catalog::ItemType;
use athenaeum_core::commands::donation::NewDonation;
use athenaeum_core::commands::members::MemberStatus;
use athenaeum_core::commands::provision::{self, NewEvent, NewMember};
use athenaeum_core::config::Config;
use athenaeum_core::security::Authentication;
use athenaeum_core::storage::Database;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use desk::Desk;
use render::{Flow, OutputFormat, Reporter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser)]
#[command(name = "athenaeum")]
#[command(author, version, about = "Library circulation and events desk", long_about = None)]
struct Cli {
    /// Run a single operation; without one the interactive menu starts
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database file (defaults to ATHENAEUM_DATABASE, then configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Start the interactive menu
    Menu,

    /// Search the catalog by title
    FindItem {
        /// Part of the title, case-insensitive
        title: String,
    },

    /// Borrow an item
    Borrow {
        #[arg(short, long)]
        member: i64,
        #[arg(short, long)]
        item: i64,
    },

    /// Return a borrowed item
    Return {
        /// Borrowing ID
        borrowing_id: i64,
    },

    /// Donate an item to the library
    Donate {
        #[arg(short, long)]
        member: i64,
        #[arg(short, long)]
        title: String,
        /// One of: Print Book, Online Book, Magazine, Journal, CD, Record
        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: ItemType,
        #[arg(long)]
        genre: Option<String>,
        /// Publication date (YYYY-MM-DD)
        #[arg(long)]
        published: Option<NaiveDate>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        reference_only: bool,
        /// Donate even if the ISBN is already in the catalog
        #[arg(short, long)]
        yes: bool,
    },

    /// Search events by name
    FindEvent {
        /// Part of the event name
        name: String,
    },

    /// Register for an event
    Register {
        #[arg(short, long)]
        member: i64,
        #[arg(short, long)]
        event: i64,
    },

    /// Cancel an event registration
    Cancel {
        #[arg(short, long)]
        member: i64,
        #[arg(short, long)]
        event: i64,
    },

    /// List a member's event registrations
    Registrations {
        #[arg(short, long)]
        member: i64,
    },

    /// Volunteer at an event
    Volunteer {
        #[arg(short, long)]
        member: i64,
        #[arg(short, long)]
        event: i64,
        #[arg(short, long)]
        role: String,
    },

    /// Ask a librarian a question
    Ask {
        #[arg(short, long)]
        member: i64,
        question: String,
    },

    /// Show a member's fines
    Fines {
        #[arg(short, long)]
        member: i64,
    },

    /// Pay a member's fines (requires the admin code)
    PayFine {
        #[arg(short, long)]
        member: i64,
        /// Skip the payment confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Admin views (require the admin code)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Create reference records
    Provision {
        #[command(subcommand)]
        action: ProvisionAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Dump every table (first 100 rows each)
    Dump,
    /// Show every row of one table
    Table { name: String },
    /// Report events whose attendee count differs from registrations
    CheckAttendance,
}

#[derive(Subcommand)]
enum ProvisionAction {
    /// Add a member
    Member {
        first_name: String,
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        inactive: bool,
    },
    /// Change a member's status
    SetStatus {
        #[arg(short, long)]
        member: i64,
        /// active or inactive
        #[arg(long, value_parser = parse_member_status)]
        status: MemberStatus,
    },
    /// Add a catalog item
    Item {
        title: String,
        #[arg(long = "type", value_parser = parse_item_type)]
        item_type: ItemType,
        #[arg(long)]
        isbn: Option<String>,
        #[arg(long)]
        reference_only: bool,
    },
    /// Add an author, optionally crediting them on an item
    Author {
        first_name: String,
        last_name: String,
        #[arg(long)]
        item: Option<i64>,
    },
    /// Add a social room
    Room {
        name: String,
        #[arg(long, default_value_t = 0)]
        capacity: i64,
    },
    /// Add an event
    Event {
        name: String,
        /// Event date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        room: i64,
        #[arg(long)]
        capacity: i64,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        audience: Option<String>,
    },
    /// Add a staff member
    Staff {
        first_name: String,
        last_name: String,
        #[arg(long)]
        position: String,
    },
    /// Record the fine owed on an open borrowing
    AssessFine {
        #[arg(short, long)]
        borrowing: i64,
        #[arg(short, long)]
        amount: f64,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show the configuration file path
    Path,
}

fn parse_item_type(value: &str) -> Result<ItemType, String> {
    value.parse().map_err(|e: athenaeum_core::Error| e.to_string())
}

fn parse_member_status(value: &str) -> Result<MemberStatus, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active" => Ok(MemberStatus::Active),
        "inactive" => Ok(MemberStatus::Inactive),
        _ => Err(format!("Invalid status '{}'. Use active or inactive", value)),
    }
}

fn exit_code(flow: Flow) -> ExitCode {
    match flow {
        Flow::Done => ExitCode::SUCCESS,
        Flow::Rejected => ExitCode::from(1),
        Flow::Fatal => ExitCode::from(2),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    // Initialize tracing; stdout is kept for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("athenaeum=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let reporter = Reporter::new(cli.format, cli.quiet);

    let command = match cli.command {
        Some(Commands::Config { action }) => {
            cmd_config(action, cli.quiet)?;
            return Ok(ExitCode::SUCCESS);
        }
        other => other,
    };

    let config = Config::load()?;
    let db = Database::new(config.database_config(cli.database.as_deref())).await?;
    info!(path = %db.path().display(), "Database ready");

    let mut desk = Desk::new(&db, reporter, config.access.max_attempts);
    let result = dispatch(&mut desk, command).await;

    db.close().await;
    Ok(exit_code(result?))
}

async fn dispatch(desk: &mut Desk<'_>, command: Option<Commands>) -> anyhow::Result<Flow> {
    let flow = match command {
        None | Some(Commands::Menu) => menu::run(desk).await?,

        Some(Commands::Init) => cmd_init(desk).await?,

        Some(Commands::FindItem { title }) => desk.find_items(&title).await,

        Some(Commands::Borrow { member, item }) => desk.borrow(member, item).await,

        Some(Commands::Return { borrowing_id }) => desk.return_item(borrowing_id).await,

        Some(Commands::Donate {
            member,
            title,
            item_type,
            genre,
            published,
            location,
            isbn,
            reference_only,
            yes,
        }) => {
            let donation = NewDonation {
                title,
                item_type,
                genre,
                publication_date: published,
                location,
                isbn,
                reference_only,
            };
            desk.donate(member, &donation, yes).await?
        }

        Some(Commands::FindEvent { name }) => desk.find_events(&name).await,

        Some(Commands::Register { member, event }) => desk.register(member, event).await,

        Some(Commands::Cancel { member, event }) => desk.cancel(member, event).await,

        Some(Commands::Registrations { member }) => desk.registrations(member).await,

        Some(Commands::Volunteer { member, event, role }) => {
            desk.volunteer(member, event, &role).await
        }

        Some(Commands::Ask { member, question }) => desk.ask(member, &question).await,

        Some(Commands::Fines { member }) => desk.fines(member).await,

        Some(Commands::PayFine { member, yes }) => desk.pay_fine(member, yes).await?,

        Some(Commands::Admin { action }) => cmd_admin(desk, action).await?,

        Some(Commands::Provision { action }) => cmd_provision(desk, action).await,

        // Handled before the database is opened
        Some(Commands::Config { .. }) => Flow::Done,
    };
    Ok(flow)
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_init(desk: &Desk<'_>) -> anyhow::Result<Flow> {
    let status = desk.db().migration_status().await?;
    desk.reporter().note(format!(
        "Database ready at {} (schema version {})",
        desk.db().path().display(),
        status.current_version
    ));
    Ok(Flow::Done)
}

async fn cmd_admin(desk: &mut Desk<'_>, action: AdminAction) -> anyhow::Result<Flow> {
    match desk.authenticate()? {
        Ok(Authentication::Granted) => {}
        Ok(denied) => return Ok(desk.reporter().report::<()>(denied.require_granted(), |_| {})),
        Err(err) => return Ok(desk.reporter().report::<()>(Err(err), |_| {})),
    }

    Ok(match action {
        AdminAction::Dump => desk.dump().await,
        AdminAction::Table { name } => desk.table(&name).await,
        AdminAction::CheckAttendance => desk.check_attendance().await,
    })
}

async fn cmd_provision(desk: &Desk<'_>, action: ProvisionAction) -> Flow {
    let db = desk.db();
    let reporter = desk.reporter();

    match action {
        ProvisionAction::Member {
            first_name,
            last_name,
            email,
            inactive,
        } => {
            let mut member = NewMember::new(first_name, last_name);
            if let Some(email) = email {
                member = member.with_email(email);
            }
            if inactive {
                member = member.inactive();
            }
            reporter.report(provision::add_member(db, &member).await, |id| {
                println!("Created member {}", id)
            })
        }
        ProvisionAction::SetStatus { member, status } => {
            reporter.report(provision::set_member_status(db, member, status).await, |_| {
                println!("Member {} is now {}", member, status.as_str())
            })
        }
        ProvisionAction::Item {
            title,
            item_type,
            isbn,
            reference_only,
        } => reporter.report(
            provision::add_item(db, &title, item_type, isbn.as_deref(), reference_only).await,
            |id| println!("Created item {}", id),
        ),
        ProvisionAction::Author {
            first_name,
            last_name,
            item,
        } => {
            let result = match provision::add_author(db, &first_name, &last_name).await {
                Ok(author_id) => match item {
                    Some(item_id) => provision::link_author(db, item_id, author_id)
                        .await
                        .map(|_| author_id),
                    None => Ok(author_id),
                },
                Err(err) => Err(err),
            };
            reporter.report(result, |id| println!("Created author {}", id))
        }
        ProvisionAction::Room { name, capacity } => {
            reporter.report(provision::add_room(db, &name, capacity).await, |id| {
                println!("Created room {}", id)
            })
        }
        ProvisionAction::Event {
            name,
            date,
            room,
            capacity,
            time,
            description,
            audience,
        } => {
            let event = NewEvent {
                name,
                date,
                time,
                social_room_id: room,
                max_capacity: capacity,
                description,
                recommended_audience: audience,
            };
            reporter.report(provision::add_event(db, &event).await, |id| {
                println!("Created event {}", id)
            })
        }
        ProvisionAction::Staff {
            first_name,
            last_name,
            position,
        } => reporter.report(
            provision::add_staff(db, &first_name, &last_name, &position).await,
            |id| println!("Created staff member {}", id),
        ),
        ProvisionAction::AssessFine { borrowing, amount } => {
            reporter.report(provision::assess_fine(db, borrowing, amount).await, |_| {
                println!("Borrowing {} will be fined ${:.2} on return", borrowing, amount)
            })
        }
    }
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
