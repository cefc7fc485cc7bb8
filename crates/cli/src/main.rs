use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use ibtool_client::{protocol, TwsClient, TwsConfig};
use ibtool_core::{ClientEvent, Connectable, ErrorEvent, ErrorObservable};
use ibtool_migrate::{migrate_tree, FixerEngine, MigrateError};

/// Exit status for usage problems (bad or missing arguments).
const EXIT_USAGE: u8 = 1;
/// Exit status when the migration source does not exist.
const EXIT_SOURCE_MISSING: u8 = 2;

#[derive(Parser)]
#[command(name = "ibtool")]
#[command(about = "Gateway client verification harnesses and source-tree migration")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a source tree and run the fixer engine over every .py file in the copy
    Migrate {
        /// Tree to migrate
        source: PathBuf,

        /// Destination; deleted first if it already exists
        destination: PathBuf,

        /// Print the fixer chain before running
        #[arg(long)]
        list_fixers: bool,
    },

    /// Exercise the full client surface, optionally including a live connect
    Demo {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Skip the live network connect (env: absent, empty, or "0" means live)
        #[arg(
            long,
            env = "IBTOOL_DEMO_DRY_RUN",
            value_parser = clap::builder::FalseyValueParser::new()
        )]
        dry_run: bool,
    },

    /// Construct a client and print its connection parameters
    Smoke {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Args)]
struct ConnectionArgs {
    /// TOML file with connection settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gateway host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Gateway port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Client id (overrides the config file)
    #[arg(long)]
    client_id: Option<i32>,
}

impl ConnectionArgs {
    fn resolve(&self) -> Result<TwsConfig> {
        let mut config = match &self.config {
            Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
            None => TwsConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(client_id) = self.client_id {
            config.client_id = client_id;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // Usage problems exit 1; --help/--version print and exit clean.
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Migrate {
            source,
            destination,
            list_fixers,
        } => run_migrate(&source, &destination, list_fixers),
        Commands::Demo {
            connection,
            dry_run,
        } => report(run_demo(DemoOptions { connection, dry_run }).await),
        Commands::Smoke { connection } => report(run_smoke(&connection)),
    }
}

fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run_migrate(source: &Path, destination: &Path, list_fixers: bool) -> ExitCode {
    let engine = FixerEngine::with_default_fixers();
    if list_fixers {
        println!("Fixers (in order): {}", engine.fixer_names().join(", "));
    }

    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        "Starting migration"
    );

    match migrate_tree(source, destination, &engine) {
        Ok(report) => {
            for failure in &report.failures {
                println!(
                    "ERROR while refactoring {}: {}",
                    failure.path.display(),
                    failure.error
                );
            }
            println!("done. failures={}", report.failure_count());
            // The exit status carries the count; 8-bit statuses cap at 255.
            ExitCode::from(report.failure_count().min(255) as u8)
        }
        Err(err @ MigrateError::SourceNotFound(_)) => {
            eprintln!("Error: {}", err);
            ExitCode::from(EXIT_SOURCE_MISSING)
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

struct DemoOptions {
    connection: ConnectionArgs,
    dry_run: bool,
}

async fn run_demo(options: DemoOptions) -> Result<()> {
    let config = options.connection.resolve()?;
    println!("dry_run = {}", options.dry_run);

    let mut client = TwsClient::new(config);
    println!(
        "Created client: {}:{} clientId={}",
        client.host(),
        client.port(),
        client.client_id()
    );

    match client.error_observer() {
        Some(observer) => {
            observer.register(Box::new(|event: &ErrorEvent| {
                println!(
                    "ERROR handler called: {:?} {} {}",
                    event.req_id, event.code, event.message
                );
            }));
            println!("Registered error handler");
        }
        None => println!("Client does not expose error observation"),
    }

    println!(
        "messageTypeNames count: {}",
        protocol::message_type_names().len()
    );

    if options.dry_run {
        println!("Dry-run: skipping network connect.");
    } else {
        println!("Live mode: attempting connect() (may fail if no gateway is running).");
        match client.connect().await {
            Ok(server) => {
                println!("connect() returned: {:?}", ClientEvent::Connected(server));
                client.disconnect().await;
            }
            Err(err) => println!("connect() failed: {}", err),
        }
    }

    println!("Demo finished.");
    Ok(())
}

fn run_smoke(connection: &ConnectionArgs) -> Result<()> {
    let config = connection.resolve()?;
    let mut client = TwsClient::new(config);
    println!(
        "Created client with host,port,clientId: {} {} {}",
        client.host(),
        client.port(),
        client.client_id()
    );
    println!(
        "Capabilities: connectable=true error_observable={}",
        client.error_observer().is_some()
    );
    Ok(())
}
