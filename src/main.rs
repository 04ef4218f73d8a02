/// The Big IDEA:
/// Some folders in a vault are noise. Attachment folders, asset folders,
/// `_archive` folders: they are needed on disk but clutter the file explorer.
/// Deleting or moving them is not an option, so instead the explorer is told
/// to collapse every folder whose name matches a rule, and the same rules can
/// be mirrored into the vault's ignore list so search skips them as well.
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use hide_folders::utils;

#[derive(Parser)]
#[command(name = "hide-folders")]
#[command(about = "Hide folders in a vault's file explorer by name pattern")]
struct Cli {
    /// Vault root (defaults to the vault containing the current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Show debug logs and detailed status output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default settings for this vault
    Init,
    /// List the configured rules
    List,
    /// Add a rule (e.g. "attachments", "startsWith::_", "endsWith::.assets")
    Add {
        /// The rule to add
        rule: String,
    },
    /// Remove a rule
    Remove {
        /// The rule to remove
        rule: String,
    },
    /// Replace all rules with the lines of a file ("-" reads stdin)
    SetRules {
        /// One rule per line
        file: String,
    },
    /// Append rules read from a file
    Import {
        /// The file to import from
        file: String,
        /// Format of the file: text, json, yaml or toml
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Export the settings
    Export {
        /// The file to write
        file: String,
        /// Output format: json, yaml or toml
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Flip between hiding and showing the configured folders
    Toggle,
    /// Change individual settings
    Set {
        /// Hide (true) or show (false) the configured folders
        #[arg(long)]
        hidden: Option<bool>,
        /// Match folder names case-insensitively
        #[arg(long)]
        case_insensitive: Option<bool>,
        /// Mirror the rules into the vault's ignore list
        #[arg(long)]
        ignore_list: Option<bool>,
    },
    /// Print the selector a rule compiles to
    Selector {
        /// The rule to compile
        rule: String,
    },
    /// Print the ignore-list entry a rule compiles to
    Regex {
        /// The rule to compile
        rule: String,
    },
    /// Show which folders the rules hide
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Bring the vault's ignore list in line with the settings
    SyncIgnore {
        /// Remove the mirrored entries instead
        #[arg(long)]
        disable: bool,
    },
    /// Check the configured rules for mistakes
    Validate,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if let Err(e) = subscriber.try_init() {
        eprintln!("Failed to init tracing subscriber: {e}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let vault = cli.vault.as_deref();

    match cli.command {
        Commands::Init => utils::initialize_vault(vault),
        Commands::List => utils::list_rules(vault),
        Commands::Add { rule } => utils::add_rule(vault, &rule),
        Commands::Remove { rule } => utils::remove_rule(vault, &rule),
        Commands::SetRules { file } => utils::set_rules(vault, &file),
        Commands::Import { file, format } => utils::import_rules(vault, &file, &format),
        Commands::Export { file, format } => utils::export_settings(vault, &file, &format),
        Commands::Toggle => utils::toggle(vault),
        Commands::Set {
            hidden,
            case_insensitive,
            ignore_list,
        } => utils::set_options(vault, hidden, case_insensitive, ignore_list),
        Commands::Selector { rule } => utils::print_selector(vault, &rule),
        Commands::Regex { rule } => utils::print_regex(vault, &rule),
        Commands::Status { json } => utils::show_status(vault, cli.verbose, json),
        Commands::SyncIgnore { disable } => utils::sync_ignore(vault, disable),
        Commands::Validate => utils::validate(vault),
    }
}
