//! Read one JSON document from stdin and run an iRODS catalog operation.
//!
//! Usage:
//!   echo '{"collection": "/zone/home/u", "data_object": "f.txt", "directory": "/tmp", "file": "f.txt"}' | baton put --checksum
//!   echo '{"avus": [{"a": "project", "v": "alpha"}]}' | baton metaquery --zone zone

use anyhow::{Context, Result};
use baton::logging::{self, LogLevel};
use baton::ops::{self, GetArgs, MetaQueryArgs, PutArgs};
use baton::{
    EmptyFilterPolicy, IcommandsConnector, MetaOperation, RawDocument, Session,
    environment_file_path, load_account,
};
use clap::{Parser, Subcommand};
use std::io::{Write, stdin, stdout};

#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(about = "Run iRODS catalog operations described by a JSON document on stdin")]
struct Cli {
    /// Default log level; RUST_LOG directives refine it.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file or directory tree.
    Put {
        /// Register a server-side checksum.
        #[arg(long)]
        checksum: bool,
        /// Verify the checksum after transfer.
        #[arg(long)]
        verify: bool,
        /// Overwrite an existing data object.
        #[arg(long)]
        force: bool,
    },
    /// Download a data object or collection.
    Get {
        #[arg(long)]
        verify: bool,
        #[arg(long)]
        force: bool,
    },
    /// Change access for each entry of `access`.
    Chmod {
        /// Apply collection access changes recursively.
        #[arg(long)]
        recurse: bool,
    },
    /// Add or remove each AVU of `avus`.
    Metamod {
        #[arg(long, value_enum)]
        operation: MetaOperation,
    },
    /// Find collections and data objects matching every AVU of `avus`.
    Metaquery {
        #[arg(long)]
        zone: String,
        /// Query collections.
        #[arg(long)]
        collection: bool,
        /// Query data objects.
        #[arg(long)]
        object: bool,
        /// Behaviour when `avus` is empty.
        #[arg(long, value_enum, default_value_t = EmptyFilterPolicy::MatchAll)]
        empty_filter: EmptyFilterPolicy,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    let document = RawDocument::read_from(stdin().lock()).context("reading input document")?;
    let env_file = environment_file_path();
    let account = load_account(&env_file)?;
    let session = Session::open(&IcommandsConnector::from_env(), account)
        .context("connecting to iRODS")?;

    match cli.command {
        Command::Put {
            checksum,
            verify,
            force,
        } => ops::put(
            &session,
            &document,
            PutArgs {
                checksum,
                verify,
                force,
            },
        )?,
        Command::Get { verify, force } => {
            ops::get(&session, &document, GetArgs { verify, force })?
        }
        Command::Chmod { recurse } => ops::chmod(&session, &document, recurse)?,
        Command::Metamod { operation } => {
            ops::metamod(&session, &document, operation)?;
        }
        Command::Metaquery {
            zone,
            collection,
            object,
            empty_filter,
        } => {
            let args = MetaQueryArgs {
                zone,
                collections: collection,
                objects: object,
                empty_filter,
            };
            let results = ops::metaquery(&session, &document, &args)?;
            let mut out = stdout().lock();
            serde_json::to_writer(&mut out, &results).context("writing query results")?;
            writeln!(out)?;
        }
    }
    Ok(())
}
