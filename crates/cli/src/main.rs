//! Txprop CLI - runs member/log join scenarios against a SQLite file and
//! reports which records survived.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::info;

use txprop_core::application::{Boundary, MemberService, ServiceBoundaries, TransactionManager};
use txprop_core::domain::{Log, Member, Propagation};
use txprop_core::error::AppError;
use txprop_infra_sqlite::{
    create_pool, run_migrations, SqliteLogRepository, SqliteMemberRepository,
    SqliteResourceProvider, DEFAULT_MAX_CONNECTIONS,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.txprop/members.db";

#[derive(Parser)]
#[command(name = "txprop")]
#[command(about = "Transaction propagation scenario runner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file
    #[arg(long, env = "TXPROP_DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    /// Pool size (RequiresNew needs two connections per nesting level)
    #[arg(long, env = "TXPROP_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    /// Log output format: pretty | json
    #[arg(long, env = "TXPROP_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a member and a log entry under the given boundaries
    Join {
        /// Username (also used as the log message)
        #[arg(short, long)]
        username: String,

        /// Recover from a failing log save instead of propagating it
        #[arg(long)]
        recover: bool,

        /// Boundary declared on the service
        #[arg(long, value_enum, default_value = "required")]
        service: BoundaryArg,

        /// Boundary declared on the member repository
        #[arg(long, value_enum, default_value = "required")]
        member: BoundaryArg,

        /// Boundary declared on the log repository
        ///
        /// With `requires-new` the log is written on a second SQLite
        /// connection. SQLite has a single writer, so once the member has
        /// been written by the suspended outer transaction the log write is
        /// refused with a write conflict (use `--recover` to keep the member).
        #[arg(long, value_enum, default_value = "required")]
        log: BoundaryArg,
    },

    /// Show whether member and log records exist for a username
    Find {
        #[arg(short, long)]
        username: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BoundaryArg {
    Off,
    Required,
    /// Independent transaction; cannot write after the suspended one has
    RequiresNew,
    Mandatory,
    Never,
}

impl From<BoundaryArg> for Boundary {
    fn from(arg: BoundaryArg) -> Self {
        match arg {
            BoundaryArg::Off => Boundary::NonTransactional,
            BoundaryArg::Required => Propagation::Required.into(),
            BoundaryArg::RequiresNew => Propagation::RequiresNew.into(),
            BoundaryArg::Mandatory => Propagation::Mandatory.into(),
            BoundaryArg::Never => Propagation::Never.into(),
        }
    }
}

#[derive(Serialize)]
struct Report {
    username: String,
    outcome: String,
    member: Option<Member>,
    log: Option<Log>,
}

#[derive(Tabled)]
struct RecordRow {
    record: &'static str,
    key: String,
    present: String,
}

fn describe(result: &std::result::Result<(), AppError>) -> String {
    match result {
        Ok(()) => "ok".to_string(),
        Err(e) if e.is_unexpected_rollback() => "unexpected rollback".to_string(),
        Err(e) => e.to_string(),
    }
}

fn print_report(report: &Report, succeeded: bool, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let outcome = if succeeded {
        format!("✓ {}", report.outcome).green().bold()
    } else {
        format!("✗ {}", report.outcome).red().bold()
    };
    println!("{}", outcome);
    println!();

    let present = |found: bool| (if found { "yes".green() } else { "no".yellow() }).to_string();
    let rows = vec![
        RecordRow {
            record: "member",
            key: report.username.clone(),
            present: present(report.member.is_some()),
        },
        RecordRow {
            record: "log",
            key: report.username.clone(),
            present: present(report.log.is_some()),
        },
    ];
    println!("{}", Table::new(rows));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_format)?;
    info!("Txprop v{} starting...", VERSION);

    let db_path = shellexpand::tilde(&cli.db_path).into_owned();
    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    info!(db_path = %db_path, "Initializing database...");
    let pool = create_pool(&db_path, cli.max_connections)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    let tx_manager = Arc::new(TransactionManager::new(SqliteResourceProvider::new(pool)));

    let (username, boundaries, recover) = match cli.command {
        Commands::Join {
            username,
            recover,
            service,
            member,
            log,
        } => (
            username,
            Some(ServiceBoundaries {
                service: service.into(),
                member_repository: member.into(),
                log_repository: log.into(),
            }),
            recover,
        ),
        Commands::Find { username } => (username, None, false),
    };

    let service = MemberService::new(
        Arc::clone(&tx_manager),
        Arc::new(SqliteMemberRepository::new()),
        Arc::new(SqliteLogRepository::new()),
        boundaries.unwrap_or_default(),
    );

    let mut scope = tx_manager.scope();
    let result = match boundaries {
        Some(b) => {
            info!(
                service = %b.service,
                member_repository = %b.member_repository,
                log_repository = %b.log_repository,
                recover,
                "Running join scenario"
            );
            if recover {
                service.join_v2(&mut scope, &username).await
            } else {
                service.join_v1(&mut scope, &username).await
            }
        }
        None => Ok(()),
    };

    let report = Report {
        outcome: describe(&result),
        member: service.find_member(&mut scope, &username).await?,
        log: service.find_log(&mut scope, &username).await?,
        username,
    };
    print_report(&report, result.is_ok(), cli.json)?;

    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
