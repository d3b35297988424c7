mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{exit_code_for, Context};
use edgectl_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "edgectl",
    version,
    about = "Push, diff, validate and activate CDN service configuration versions"
)]
struct Cli {
    /// Path to the desired-state config file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// API key (otherwise read from ./api_key or ~/.config/edgectl/remote.json).
    #[arg(
        short = 'K',
        long,
        env = "EDGECTL_API_KEY",
        hide_env_values = true,
        global = true
    )]
    api_key: Option<String>,

    /// Base URL of the configuration API.
    #[arg(long, env = "EDGECTL_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Answer yes to every prompt; required outside a terminal.
    #[arg(short = 'y', long, default_value_t = false, global = true)]
    assume_yes: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, alias = "debug", default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Push local config changes into new versions and offer to activate them.
    Push {
        /// Push every service declared in the config file.
        #[arg(short, long, default_value_t = false)]
        all: bool,
        /// Show what would change without activating anything.
        #[arg(short, long, default_value_t = false)]
        noop: bool,
        /// Services to push, by name or ID.
        services: Vec<String>,
    },
    /// Inspect, validate, and activate service versions.
    #[command(subcommand)]
    Version(VersionCommand),
    /// Inspect services.
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Manage dictionaries and their items.
    #[command(subcommand)]
    Dictionary(DictionaryCommand),
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum VersionCommand {
    /// List the versions of a service.
    List {
        /// Service name or ID.
        service: String,
    },
    /// Run remote validation for a version.
    Validate {
        /// Service name or ID.
        service: String,
        version: u32,
    },
    /// Validate a version, show its diff, and activate it.
    Activate {
        /// Service name or ID.
        service: String,
        version: u32,
        /// Show the diff without activating.
        #[arg(short, long, default_value_t = false)]
        noop: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ServiceCommand {
    /// List all services on the account.
    List,
}

#[derive(Debug, Subcommand)]
enum DictionaryCommand {
    /// List dictionaries on the active version of a service.
    List {
        /// Service name or ID.
        service: String,
    },
    /// Add or replace a dictionary item.
    ItemAdd {
        service: String,
        dictionary: String,
        key: String,
        value: String,
    },
    /// Remove a dictionary item.
    ItemRm {
        service: String,
        dictionary: String,
        key: String,
    },
    /// List the items of a dictionary.
    ItemLs {
        service: String,
        dictionary: String,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("EDGECTL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cancel = install_signal_handler();

    let ctx = Context {
        config_path: cli.config,
        api_key: cli.api_key,
        endpoint: cli.endpoint,
        assume_yes: cli.assume_yes,
        json: cli.json,
        cancel,
    };

    let result = match cli.command {
        Commands::Push {
            all,
            noop,
            services,
        } => commands::push::run(&ctx, all, noop, &services),
        Commands::Version(VersionCommand::List { service }) => {
            commands::version::list(&ctx, &service)
        }
        Commands::Version(VersionCommand::Validate { service, version }) => {
            commands::version::validate(&ctx, &service, version)
        }
        Commands::Version(VersionCommand::Activate {
            service,
            version,
            noop,
        }) => commands::version::activate(&ctx, &service, version, noop),
        Commands::Service(ServiceCommand::List) => commands::service::list(&ctx),
        Commands::Dictionary(DictionaryCommand::List { service }) => {
            commands::dictionary::list(&ctx, &service)
        }
        Commands::Dictionary(DictionaryCommand::ItemAdd {
            service,
            dictionary,
            key,
            value,
        }) => commands::dictionary::item_add(&ctx, &service, &dictionary, &key, &value),
        Commands::Dictionary(DictionaryCommand::ItemRm {
            service,
            dictionary,
            key,
        }) => commands::dictionary::item_rm(&ctx, &service, &dictionary, &key),
        Commands::Dictionary(DictionaryCommand::ItemLs {
            service,
            dictionary,
        }) => commands::dictionary::item_ls(&ctx, &service, &dictionary),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
