//! scull CLI Client
//!
//! Command-line interface for interacting with a scull server.

use std::io::Write;

use clap::{Parser, Subcommand};
use scull::device::{OpenMode, Whence};
use scull::network::Client;

/// scull CLI
#[derive(Parser, Debug)]
#[command(name = "scull-cli")]
#[command(about = "CLI for scull devices")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a string at an offset
    Write {
        /// Device minor number
        minor: u32,

        /// The data to write
        data: String,

        /// Offset to write at
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Empty the device first
        #[arg(short, long)]
        truncate: bool,
    },

    /// Read bytes from an offset
    Read {
        /// Device minor number
        minor: u32,

        /// Offset to read from
        #[arg(short, long, default_value = "0")]
        offset: u64,

        /// Number of bytes
        #[arg(short, long, default_value = "4000")]
        count: u32,
    },

    /// Dump a device from the start until end of data
    Cat {
        /// Device minor number
        minor: u32,
    },

    /// Empty a device
    Trim {
        /// Device minor number
        minor: u32,
    },

    /// Show device layout
    Stat {
        /// Device minor number
        minor: u32,
    },

    /// Set the default geometry adopted by devices on their next trim
    Defaults {
        /// Bytes per quantum
        #[arg(short, long)]
        quantum: usize,

        /// Quanta per qset node
        #[arg(short = 's', long)]
        qset: usize,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> scull::Result<()> {
    let mut client = Client::connect(&args.server)?;

    match args.command {
        Commands::Write { minor, data, offset, truncate } => {
            client.open(minor, OpenMode::read_write().truncate(truncate))?;
            client.seek(to_offset(offset)?, Whence::Set)?;
            client.write_all(data.as_bytes())?;
            println!("wrote {} bytes", data.len());
        }
        Commands::Read { minor, offset, count } => {
            client.open(minor, OpenMode::read_only())?;
            client.seek(to_offset(offset)?, Whence::Set)?;
            let data = client.read(count)?;
            std::io::stdout().write_all(&data)?;
        }
        Commands::Cat { minor } => {
            client.open(minor, OpenMode::read_only())?;
            let data = client.read_to_end(64 * 1024)?;
            std::io::stdout().write_all(&data)?;
        }
        Commands::Trim { minor } => {
            client.open(minor, OpenMode::write_only())?;
            println!("trimmed scull{}", minor);
        }
        Commands::Stat { minor } => {
            print!("{}", client.stat(minor)?);
        }
        Commands::Defaults { quantum, qset } => {
            client.set_defaults(quantum, qset)?;
            println!("defaults: quantum {}, qset {}", quantum, qset);
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    client.release().or_else(|e| match e {
        scull::ScullError::NotOpen => Ok(()),
        other => Err(other),
    })
}

fn to_offset(offset: u64) -> scull::Result<i64> {
    i64::try_from(offset)
        .map_err(|_| scull::ScullError::InvalidArgument(format!("offset {} too large", offset)))
}
