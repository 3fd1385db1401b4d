use std::time::Duration;

use bytes::BytesMut;
use ctrlnet_frame::encode_line;
use ctrlnet_link::{Link, LinkConfig};
use ctrlnet_transport::{is_poll_tick, TcpTransport, Transport};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    io_error, link_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT,
};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    if args.tcp {
        send_tcp(&args, wait_timeout, format)
    } else {
        send_udp(&args, wait_timeout, format)
    }
}

fn send_udp(args: &SendArgs, wait_timeout: Duration, format: OutputFormat) -> CliResult<i32> {
    let config = LinkConfig::new(args.address.clone(), args.port).with_local_port(args.local_port);
    let link = Link::open(config).map_err(|err| link_error("bind failed", err))?;
    let notifications = link.subscribe();

    link.send(args.message.as_bytes())
        .map_err(|err| link_error("send failed", err))?;
    if let Some(fault) = link.error() {
        return Err(CliError::new(FAILURE, format!("send failed: {fault}")));
    }

    if args.wait {
        let remote = format!("{}:{}", link.address(), link.port());
        let reply = match link.pop().map_err(|err| link_error("receive failed", err))? {
            Some(reply) => Some(reply),
            None if notifications.wait_timeout(wait_timeout) => link
                .pop()
                .map_err(|err| link_error("receive failed", err))?,
            None => None,
        };
        match reply {
            Some(reply) => print_message(&reply, &remote, format),
            None => return Err(wait_timed_out(wait_timeout)),
        }
    }

    link.dispose();
    Ok(SUCCESS)
}

/// Stream replies are read raw: the projector answers without a line
/// terminator.
fn send_tcp(args: &SendArgs, wait_timeout: Duration, format: OutputFormat) -> CliResult<i32> {
    let transport = TcpTransport::connect(&args.address, args.port)
        .map_err(|err| transport_error("connect failed", err))?;

    let mut line = BytesMut::with_capacity(args.message.len() + 2);
    encode_line(args.message.as_bytes(), &mut line);
    transport
        .send(&line)
        .map_err(|err| io_error("send failed", err))?;

    if args.wait {
        transport
            .set_poll_interval(Some(wait_timeout))
            .map_err(|err| transport_error("receive failed", err))?;
        let mut buf = vec![0u8; 4096];
        let read = match transport.recv(&mut buf) {
            Ok(read) => read,
            Err(err) if is_poll_tick(&err) => return Err(wait_timed_out(wait_timeout)),
            Err(err) => return Err(io_error("receive failed", err)),
        };
        let peer = transport.peer_addr().to_string();
        print_message(&buf[..read], &peer, format);
    }

    transport.close();
    Ok(SUCCESS)
}

fn wait_timed_out(timeout: Duration) -> CliError {
    CliError::new(
        TIMEOUT,
        format!("no response within {}ms", timeout.as_millis()),
    )
}
