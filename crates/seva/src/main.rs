use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use seva::client::Client;
use seva::error::SevaError;
use seva::output::{self, OutputMode};
use seva::types::{ALL, CreateIssueParams, ListFilters};

#[derive(Parser)]
#[command(name = "seva", about = "Civic issue reporting service and client")]
struct Cli {
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, default_value_t = false, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long, env = "SEVA_HOST", default_value = "127.0.0.1")]
        host: String,
        #[arg(long, env = "SEVA_PORT", default_value_t = 5000)]
        port: u16,
        #[command(subcommand)]
        subcmd: Option<ServeSubcommand>,
    },
    /// Report a new issue
    Report {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lng: Option<String>,
        #[arg(long, default_value = "")]
        photo: String,
    },
    List {
        #[arg(long, default_value = ALL)]
        status: String,
        /// Only issues reported within this many days
        #[arg(long, default_value = ALL, allow_hyphen_values = true)]
        date: String,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Move an issue to a new status
    Update {
        id: u64,
        #[arg(long)]
        status: String,
    },
    History {
        id: u64,
    },
}

#[derive(Subcommand)]
enum ServeSubcommand {
    /// Check whether a service is reachable at SEVA_URL
    Status,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(err: SevaError, mode: OutputMode) -> ! {
    output::print_error(&err, mode);
    process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Serve { host, port, subcmd } => match subcmd {
            Some(ServeSubcommand::Status) => {
                let client = Client::new();
                match client.check_reachable() {
                    Ok(()) => {
                        println!("service reachable at {}", client.base_url());
                        process::exit(0);
                    }
                    Err(e) => {
                        eprintln!("service unreachable: {e}");
                        process::exit(1);
                    }
                }
            }
            None => {
                let rt = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => fail(
                        SevaError::Internal(format!("failed to create tokio runtime: {e}")),
                        mode,
                    ),
                };
                if let Err(e) = rt.block_on(seva::daemon::start(&host, port)) {
                    fail(e, mode);
                }
            }
        },

        Commands::Report {
            title,
            description,
            lat,
            lng,
            photo,
        } => {
            let client = Client::new();
            let params = CreateIssueParams {
                title,
                description,
                lat: lat.map(Value::String),
                lng: lng.map(Value::String),
                photo,
            };
            match client.create_issue(&params) {
                Ok(created) => output::print_created(&created, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::List {
            status,
            date,
            search,
        } => {
            let client = Client::new();
            let filters = ListFilters {
                status,
                date,
                search,
            };
            match client.list_issues(&filters) {
                Ok(issues) => output::print_issue_list(&issues, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::Update { id, status } => {
            let client = Client::new();
            match client.update_status(id, &status) {
                Ok(issue) => output::print_issue(&issue, mode),
                Err(e) => fail(e, mode),
            }
        }

        Commands::History { id } => {
            let client = Client::new();
            match client.find_issue(id) {
                Ok(issue) => output::print_history(&issue, mode),
                Err(e) => fail(e, mode),
            }
        }
    }
}
