//! git-vfs - read and write files in git repositories by locator
//!
//! # Usage
//! ```bash
//! git-vfs read git@github.com:org/docs.git/guide/intro.md
//! echo "hello" | git-vfs write git@github.com:org/docs.git/hello.md
//! git-vfs commit git@github.com:org/docs.git -m "add hello" --author-email me@example.com
//! git-vfs blame git@github.com:org/docs.git/hello.md --start 1 --end 10
//! ```

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_vfs::{Config, Credential, Identity, VfsContext, git::split_locator};

/// Virtual file storage backed by git repositories
#[derive(Parser)]
#[command(name = "git-vfs")]
#[command(about = "Read and write files in git repositories by locator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding repository mirrors (overrides the config file)
    #[arg(long, global = true)]
    mirror_root: Option<PathBuf>,

    /// Minimum seconds between refreshes of one mirror
    #[arg(long, global = true)]
    cooldown_secs: Option<u64>,

    /// SSH key to use for a user and host, as USER@HOST=PATH (repeatable)
    #[arg(long = "ssh-key", value_name = "USER@HOST=PATH", global = true)]
    ssh_keys: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a file to stdout
    Read { locator: String },
    /// Replace a file with stdin and stage it
    Write { locator: String },
    /// Delete files and stage the removals
    Delete {
        #[arg(required = true)]
        locators: Vec<String>,
    },
    /// Commit all pending changes and push
    Commit {
        locator: String,
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        author_name: Option<String>,
        #[arg(long)]
        author_email: Option<String>,
    },
    /// Check whether a file exists at HEAD
    Exists { locator: String },
    /// Create a local branch (no-op if it exists)
    Branch { locator: String, name: String },
    /// Print per-line authorship as JSON
    Blame {
        locator: String,
        /// First line of the range whose authors are listed
        #[arg(long)]
        start: Option<usize>,
        /// Last line of the range whose authors are listed
        #[arg(long)]
        end: Option<usize>,
    },
    /// Print the local mirror directory of a repository
    MirrorDir { locator: String },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(root) = &cli.mirror_root {
        config = config.with_mirror_root(root);
    }
    if let Some(secs) = cli.cooldown_secs {
        config = config.with_pull_cooldown(Duration::from_secs(secs));
    }
    Ok(config)
}

fn register_ssh_keys(ctx: &VfsContext, specs: &[String]) -> anyhow::Result<()> {
    for spec in specs {
        let (user_host, path) = spec
            .split_once('=')
            .with_context(|| format!("--ssh-key {} is not USER@HOST=PATH", spec))?;
        let (user, host) = user_host
            .split_once('@')
            .with_context(|| format!("--ssh-key {} is not USER@HOST=PATH", spec))?;
        ctx.register_credential(user, host, Credential::ssh_key(user, path))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = VfsContext::new(load_config(&cli)?);
    register_ssh_keys(&ctx, &cli.ssh_keys)?;

    match cli.command {
        Commands::Read { locator } => {
            let content = ctx.read_file(&locator)?;
            std::io::stdout().write_all(&content)?;
        }
        Commands::Write { locator } => {
            let mut content = Vec::new();
            std::io::stdin().read_to_end(&mut content)?;
            ctx.write_file(&locator, &content)?;
        }
        Commands::Delete { locators } => {
            ctx.delete_files(&locators)?;
        }
        Commands::Commit {
            locator,
            message,
            author_name,
            author_email,
        } => {
            let defaults = ctx.config().default_author.clone();
            let author = Identity::new(
                author_name.unwrap_or(defaults.name),
                author_email.unwrap_or(defaults.email),
            );
            ctx.open(&locator)?.commit_and_push(&message, &author)?;
        }
        Commands::Exists { locator } => {
            let exists = ctx.exists(&locator)?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }
        Commands::Branch { locator, name } => {
            ctx.open(&locator)?.create_branch(&name)?;
        }
        Commands::Blame { locator, start, end } => {
            let index = ctx.authorship(&locator)?;
            let output = match (start, end) {
                (None, None) => serde_json::to_string_pretty(&index)?,
                (start, end) => {
                    let authors = index.authors_in_range(start.unwrap_or(1), end.unwrap_or(index.len()));
                    serde_json::to_string_pretty(&authors)?
                }
            };
            println!("{}", output);
        }
        Commands::MirrorDir { locator } => {
            let (address, _) = split_locator(&locator);
            if address.is_empty() {
                bail!("{} contains no repository address", locator);
            }
            println!("{}", ctx.resolver().mirror_dir(address)?.display());
        }
    }

    Ok(())
}
