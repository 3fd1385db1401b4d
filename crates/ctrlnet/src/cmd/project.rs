use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ctrlnet_command::projector_reply;
use ctrlnet_link::{Link, LinkConfig};
use ctrlnet_transport::TcpLineListener;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, ProjectArgs, WAKE_INTERVAL};
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Serve one client at a time, answering power queries until the client
/// goes away, then accept the next.
pub fn run(args: ProjectArgs, format: OutputFormat) -> CliResult<i32> {
    let listener =
        TcpLineListener::bind(args.port).map_err(|err| transport_error("bind failed", err))?;
    info!(local = %listener.local_addr(), "projector listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut handled = 0usize;

    while running.load(Ordering::SeqCst) {
        let transport = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let peer = transport.peer_addr().to_string();
        info!(%peer, "client connected");

        let link = Link::stream(transport, LinkConfig::default())
            .map_err(|err| link_error("link setup failed", err))?;
        let notifications = link.subscribe();

        while running.load(Ordering::SeqCst) {
            notifications.wait_timeout(WAKE_INTERVAL);

            // Sampled before draining so lines queued just ahead of the
            // disconnect are still answered.
            let stopped = !link.is_receiving();

            while let Some(line) = link.pop().map_err(|err| link_error("receive failed", err))? {
                print_message(&line, &peer, format);
                if let Some(reply) = projector_reply(&line) {
                    link.send(reply)
                        .map_err(|err| link_error("send failed", err))?;
                    if let Some(fault) = link.error() {
                        warn!(%fault, "failed to answer client");
                    }
                }

                handled = handled.saturating_add(1);
                if args.count.is_some_and(|count| handled >= count) {
                    link.dispose();
                    return Ok(SUCCESS);
                }
            }

            if stopped {
                match link.error() {
                    Some(fault) => info!(%peer, %fault, "client disconnected"),
                    None => info!(%peer, "client disconnected"),
                }
                break;
            }
        }

        link.dispose();
    }

    Ok(SUCCESS)
}
