use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ctrlnet_command::{ConsoleActions, Dispatcher, DEFAULT_SETTLE_TIME};
use ctrlnet_link::{Link, LinkConfig};
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, ReceiveArgs, WAKE_INTERVAL};
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let config = LinkConfig::new(args.address, args.remote_port)
        .with_local_port(args.local_port)
        .with_capacity(args.capacity);
    let link = Link::open(config).map_err(|err| link_error("bind failed", err))?;
    let local = link
        .local_addr()
        .map_err(|err| link_error("bind failed", err))?;
    info!(%local, "listening for commands");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let settle = if args.no_settle {
        Duration::ZERO
    } else {
        DEFAULT_SETTLE_TIME
    };
    let mut dispatcher = Dispatcher::new(ConsoleActions::with_settle_time(settle));
    let notifications = link.subscribe();
    let remote = format!("{}:{}", link.address(), link.port());
    let mut received = 0usize;

    while running.load(Ordering::SeqCst) {
        notifications.wait_timeout(WAKE_INTERVAL);

        while let Some(message) = link.pop().map_err(|err| link_error("receive failed", err))? {
            print_message(&message, &remote, format);
            dispatcher.dispatch(&message);
            received = received.saturating_add(1);

            if args.count.is_some_and(|count| received >= count) {
                link.dispose();
                return Ok(SUCCESS);
            }
        }

        if !link.is_receiving() {
            if let Some(fault) = link.error() {
                warn!(%fault, "receive loop stopped, re-arming");
                link.set_enabled(true)
                    .map_err(|err| link_error("re-arm failed", err))?;
            }
        }
    }

    link.dispose();
    Ok(SUCCESS)
}
