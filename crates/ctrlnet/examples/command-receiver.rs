//! Minimal command receiver. Binds a UDP link and dispatches every
//! received command until interrupted.
//!
//! Run with:
//!   cargo run --example command-receiver
//!
//! In another terminal:
//!   cargo run --features cli -- send --port 5500 ShowScene,3

use std::time::Duration;

use ctrlnet::command::{ConsoleActions, Dispatcher};
use ctrlnet::link::{Link, LinkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let link = Link::open(LinkConfig::new("127.0.0.1", 12345).with_local_port(5500))?;
    eprintln!("Listening on {}", link.local_addr()?);

    let notifications = link.subscribe();
    let mut dispatcher = Dispatcher::new(ConsoleActions::new());

    loop {
        if !notifications.wait_timeout(Duration::from_secs(1)) {
            if let Some(fault) = link.error() {
                eprintln!("Link fault: {fault}");
                break;
            }
            continue;
        }

        while let Some(message) = link.pop()? {
            match dispatcher.dispatch(&message) {
                Some(command) => eprintln!("Executed {command}"),
                None => eprintln!("Ignored {}", String::from_utf8_lossy(&message)),
            }
        }
    }

    link.dispose();
    Ok(())
}
