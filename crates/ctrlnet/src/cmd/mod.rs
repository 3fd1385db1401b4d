use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod project;
pub mod receive;
pub mod send;
pub mod version;

/// How long the command loops block before re-checking for Ctrl-C.
pub(crate) const WAKE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receive commands on a UDP link and execute them.
    Receive(ReceiveArgs),
    /// Serve the projector power-status line protocol over TCP.
    Project(ProjectArgs),
    /// Send a single message.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Receive(args) => receive::run(args, format),
        Command::Project(args) => project::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Remote address the link sends to.
    #[arg(long, env = "CTRLNET_ADDRESS", default_value = "127.0.0.1")]
    pub address: String,
    /// Remote port the link sends to.
    #[arg(long, env = "CTRLNET_REMOTE_PORT", default_value_t = 12345)]
    pub remote_port: u16,
    /// Local port to receive on.
    #[arg(long, env = "CTRLNET_LOCAL_PORT", default_value_t = 500)]
    pub local_port: u16,
    /// Mailbox capacity.
    #[arg(long, default_value_t = ctrlnet_link::MAX_DATA_SIZE)]
    pub capacity: usize,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Skip the pause after SoftReset and ShowScene.
    #[arg(long)]
    pub no_settle: bool,
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// TCP port to listen on.
    #[arg(long, env = "CTRLNET_PORT", default_value_t = 12345)]
    pub port: u16,
    /// Exit after handling N lines.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message text.
    pub message: String,
    /// Remote address.
    #[arg(long, env = "CTRLNET_ADDRESS", default_value = "127.0.0.1")]
    pub address: String,
    /// Remote port.
    #[arg(long, env = "CTRLNET_REMOTE_PORT", default_value_t = 12345)]
    pub port: u16,
    /// Local UDP port to send from. Zero picks an ephemeral port.
    #[arg(long, default_value_t = 0, conflicts_with = "tcp")]
    pub local_port: u16,
    /// Connect over TCP and send the message as one CR LF line.
    #[arg(long)]
    pub tcp: bool,
    /// Wait for one response and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
