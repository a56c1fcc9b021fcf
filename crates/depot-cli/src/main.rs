//! Depot CLI - repository and packages manager for branched binary packages

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod client;
mod commands;
mod config;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "depot")]
#[command(author = "Depot Contributors")]
#[command(version)]
#[command(about = "Repository and packages manager for branched binary packages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config path (default: ~/.config/depot/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the repository and packages server
    Server {
        /// Repositories root directory
        root: PathBuf,

        /// Enable debug mode
        #[arg(short, long)]
        debug: bool,

        /// Notify the supervisor about successful start
        #[arg(short, long)]
        notify: bool,
    },

    /// Manage branches on the server
    Branch {
        #[command(subcommand)]
        command: BranchCommands,
    },

    /// Manage packages in a branch
    Pkg {
        /// Branch name
        branch: String,

        #[command(subcommand)]
        command: PkgCommands,
    },

    /// Upgrade the remote server (for development purposes only)
    Upgrade,
}

#[derive(Subcommand)]
enum BranchCommands {
    /// Create a new branch
    Mk {
        /// Branch name
        name: String,
    },

    /// List branches
    Ls,
}

#[derive(Subcommand)]
enum PkgCommands {
    /// List all packages in the branch
    Ls,

    /// Download a package
    Get {
        /// Package file name to download
        package: String,
    },

    /// Publish packages
    Put {
        /// Package files to publish
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove packages by file name or package name
    Rm {
        /// Names to remove
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Server {
            ref root,
            debug,
            notify,
        } => commands::server::run(config_path, root, debug, notify).await,

        Commands::Branch { ref command } => match command {
            BranchCommands::Mk { name } => commands::branch::create(config_path, name).await,
            BranchCommands::Ls => commands::branch::list(config_path).await,
        },

        Commands::Pkg {
            ref branch,
            ref command,
        } => match command {
            PkgCommands::Ls => commands::pkg::list(config_path, branch).await,
            PkgCommands::Get { package } => commands::pkg::get(config_path, branch, package).await,
            PkgCommands::Put { files } => commands::pkg::put(config_path, branch, files).await,
            PkgCommands::Rm { names } => commands::pkg::remove(config_path, branch, names).await,
        },

        Commands::Upgrade => commands::upgrade::run(config_path).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{}", miette::Report::new(err));
        std::process::exit(code);
    }
    Ok(())
}
