use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use bytes::Bytes;
use ctrlnet_frame::{FrameConfig, FrameError, LineFramer};
use ctrlnet_transport::{is_poll_tick, TcpTransport, Transport, TransportKind, UdpTransport};
use tracing::dispatcher::{self, DefaultGuard};
use tracing::span::Entered;
use tracing::{debug, error, info, info_span, warn, Dispatch, Span};

use crate::config::LinkConfig;
use crate::error::{Direction, LinkError, LinkFault, Result};
use crate::mailbox::Mailbox;
use crate::signal::{DataSignal, Notifications};

const RECEIVE_WORKER_NAME: &str = "ctrlnet-rx";

/// How received bytes are turned into messages.
#[derive(Debug)]
pub enum Framing {
    /// Each receive is one complete message.
    Datagram,
    /// Receives are re-assembled into terminated lines.
    Lines(LineFramer),
}

impl Framing {
    /// CR LF line framing.
    pub fn lines() -> Self {
        Framing::Lines(LineFramer::new())
    }

    /// Line framing with explicit configuration.
    pub fn lines_with_config(config: FrameConfig) -> Result<Self> {
        Ok(Framing::Lines(LineFramer::with_config(config)?))
    }

    /// The framing a transport of `kind` needs.
    pub fn for_kind(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Datagram => Framing::Datagram,
            TransportKind::Stream => Framing::lines(),
        }
    }

    /// Messages completed by `bytes`, plus the framing fault that ended
    /// extraction early, if any. Lines completed ahead of the fault are kept.
    fn extract(&mut self, bytes: &[u8]) -> (Vec<Bytes>, Option<FrameError>) {
        match self {
            Framing::Datagram if bytes.is_empty() => (Vec::new(), None),
            Framing::Datagram => (vec![Bytes::copy_from_slice(bytes)], None),
            Framing::Lines(framer) => {
                let mut lines = Vec::new();
                for line in framer.feed(bytes) {
                    match line {
                        Ok(line) => lines.push(line),
                        Err(err) => return (lines, Some(err)),
                    }
                }
                (lines, None)
            }
        }
    }

    fn reset(&mut self) {
        if let Framing::Lines(framer) = self {
            framer.clear();
        }
    }
}

/// A send/receive session with one remote endpoint.
///
/// Construction arms a receive loop on a worker thread that keeps running
/// while the link is enabled. Completed messages are queued in a bounded
/// mailbox and announced through [`Link::subscribe`]; the consumer fetches
/// them with [`Link::pop`].
///
/// Dropping the link disposes it.
pub struct Link<T: Transport> {
    inner: Arc<Inner<T>>,
}

struct Inner<T: Transport> {
    address: String,
    port: u16,
    enabled: AtomicBool,
    disposed: AtomicBool,
    state: Mutex<LinkState<T>>,
    mailbox: Mailbox,
    signal: DataSignal,
    recv_buffer_size: usize,
    dispatch: Dispatch,
    span: Span,
}

/// Routes events to the link's subscriber inside its span.
struct LogScope<'a> {
    _entered: Entered<'a>,
    _dispatch: DefaultGuard,
}

struct LinkState<T> {
    transport: Option<Arc<T>>,
    framing: Framing,
    receive_pending: bool,
    send_pending: bool,
    last_error: Option<LinkFault>,
}

struct Completion {
    queued: bool,
    rearm: bool,
}

impl Completion {
    const STOP: Completion = Completion {
        queued: false,
        rearm: false,
    };
}

impl Link<UdpTransport> {
    /// Bind a datagram link to `config.local_port`, sending to
    /// `config.address:config.remote_port`.
    ///
    /// Fails with [`LinkError::Transport`] when the local port cannot be bound.
    pub fn open(config: LinkConfig) -> Result<Self> {
        let transport =
            UdpTransport::bind(&config.address, config.remote_port, config.local_port)?;
        Self::with_transport(transport, Framing::Datagram, config)
    }
}

impl Link<TcpTransport> {
    /// Run a CR LF line link over a connected stream.
    ///
    /// The remote endpoint is taken from the stream; `config` supplies the
    /// enabled state, capacity and poll settings.
    pub fn stream(transport: TcpTransport, config: LinkConfig) -> Result<Self> {
        let peer = transport.peer_addr();
        let config = LinkConfig {
            address: peer.ip().to_string(),
            remote_port: peer.port(),
            ..config
        };
        Self::with_transport(transport, Framing::lines(), config)
    }
}

impl<T: Transport> Link<T> {
    /// Build a link around an already bound transport.
    pub fn with_transport(transport: T, framing: Framing, config: LinkConfig) -> Result<Self> {
        transport.set_poll_interval(Some(config.poll_interval))?;

        let dispatch = config
            .dispatch
            .clone()
            .unwrap_or_else(|| dispatcher::get_default(Dispatch::clone));
        let span = dispatcher::with_default(&dispatch, || {
            let span = info_span!(
                "link",
                remote = %format_args!("{}:{}", config.address, config.remote_port),
                transport = transport.transport_name(),
            );
            span.in_scope(|| {
                info!(
                    address = %config.address,
                    remote_port = config.remote_port,
                    capacity = config.capacity,
                    enabled = config.enabled,
                    "link started"
                );
            });
            span
        });

        let inner = Arc::new(Inner {
            address: config.address,
            port: config.remote_port,
            enabled: AtomicBool::new(config.enabled),
            disposed: AtomicBool::new(false),
            state: Mutex::new(LinkState {
                transport: Some(Arc::new(transport)),
                framing,
                receive_pending: false,
                send_pending: false,
                last_error: None,
            }),
            mailbox: Mailbox::new(config.capacity),
            signal: DataSignal::default(),
            recv_buffer_size: config.recv_buffer_size.max(1),
            dispatch,
            span,
        });

        let link = Self { inner };
        {
            let mut state = link.inner.lock_state();
            Inner::arm_receive(&link.inner, &mut state)?;
        }
        Ok(link)
    }

    /// Remote address messages are sent to.
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Remote port messages are sent to.
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let transport = self
            .inner
            .lock_state()
            .transport
            .clone()
            .ok_or(LinkError::Disposed)?;
        transport.local_addr().map_err(Into::into)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Gate inbound queuing and outbound sends.
    ///
    /// Enabling re-arms the receive loop when no receive is pending and
    /// clears a recorded fault once the new receive is armed.
    /// Disabling does not cancel an in-flight receive: its result is
    /// discarded if the link is still disabled when it completes.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.ensure_live()?;
        let previous = self.inner.enabled.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            let _scope = self.inner.scope();
            info!(enabled, "link enabled state changed");
        }

        if enabled {
            let mut state = self.inner.lock_state();
            Inner::arm_receive(&self.inner, &mut state)?;
        }
        Ok(())
    }

    /// Most recent send or receive failure, cleared by the next success.
    pub fn error(&self) -> Option<LinkFault> {
        self.inner.lock_state().last_error.clone()
    }

    /// Whether a receive is currently outstanding.
    pub fn is_receiving(&self) -> bool {
        self.inner.lock_state().receive_pending
    }

    pub fn has_data(&self) -> bool {
        !self.inner.mailbox.is_empty()
    }

    /// Number of messages waiting in the mailbox.
    pub fn queued(&self) -> usize {
        self.inner.mailbox.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Observe data arrival. The signal carries no payload; use [`Link::pop`].
    pub fn subscribe(&self) -> Notifications {
        self.inner.signal.subscribe()
    }

    /// Transmit one message.
    ///
    /// Skipped silently while disabled. Transport failures are recorded in
    /// [`Link::error`] and leave the link usable.
    pub fn send(&self, message: &[u8]) -> Result<()> {
        self.ensure_live()?;
        let _scope = self.inner.scope();
        if !self.is_enabled() {
            debug!(size = message.len(), "link disabled, skipping send");
            return Ok(());
        }

        let transport = {
            let mut state = self.inner.lock_state();
            let transport = state.transport.clone().ok_or(LinkError::Disposed)?;
            if state.send_pending {
                warn!("send started while another send is in flight");
            }
            state.send_pending = true;
            transport
        };

        let result = transport.send(message);

        let mut state = self.inner.lock_state();
        if state.transport.is_none() {
            debug!("send completed after dispose");
            return Ok(());
        }
        state.send_pending = false;
        match result {
            Ok(()) => {
                debug!(size = message.len(), "message sent");
                state.last_error = None;
            }
            Err(err) => {
                error!(error = %err, "error sending message");
                state.last_error = Some(LinkFault::io(Direction::Send, &err));
            }
        }
        Ok(())
    }

    /// Remove and return the oldest queued message.
    ///
    /// Returns `None` while disabled or when nothing is queued.
    pub fn pop(&self) -> Result<Option<Bytes>> {
        self.ensure_live()?;
        if !self.is_enabled() {
            return Ok(None);
        }
        Ok(self.inner.mailbox.pop())
    }

    /// Release the transport and drop queued messages. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _scope = self.inner.scope();
        info!("cleaning up network resources");

        {
            let mut state = self.inner.lock_state();
            state.receive_pending = false;
            state.send_pending = false;
            if let Some(transport) = state.transport.take() {
                transport.close();
            }
            state.framing.reset();
            self.inner.mailbox.clear();
        }
        self.inner.signal.close();
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(LinkError::Disposed);
        }
        Ok(())
    }
}

impl<T: Transport> Drop for Link<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Transport> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("address", &self.inner.address)
            .field("port", &self.inner.port)
            .field("enabled", &self.is_enabled())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T: Transport> Inner<T> {
    fn scope(&self) -> LogScope<'_> {
        let dispatch = dispatcher::set_default(&self.dispatch);
        LogScope {
            _entered: self.span.enter(),
            _dispatch: dispatch,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LinkState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a receive worker unless one is pending. Caller holds the state lock.
    fn arm_receive(inner: &Arc<Self>, state: &mut LinkState<T>) -> Result<()> {
        if state.receive_pending
            || state.transport.is_none()
            || !inner.enabled.load(Ordering::Acquire)
            || inner.disposed.load(Ordering::Acquire)
        {
            return Ok(());
        }

        state.receive_pending = true;
        let worker = Arc::clone(inner);
        let spawned = thread::Builder::new()
            .name(RECEIVE_WORKER_NAME.to_string())
            .spawn(move || worker.receive_loop());

        match spawned {
            Ok(_) => {
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                let _scope = inner.scope();
                error!(error = %err, "cannot receive");
                state.receive_pending = false;
                state.last_error = Some(LinkFault::io(Direction::Receive, &err));
                Err(LinkError::SpawnWorker(err))
            }
        }
    }

    fn receive_loop(self: Arc<Self>) {
        let _scope = self.scope();
        debug!("receive loop armed");

        let mut buf = vec![0u8; self.recv_buffer_size];
        loop {
            let transport = {
                let state = self.lock_state();
                match (&state.transport, state.receive_pending) {
                    (Some(transport), true) => Arc::clone(transport),
                    _ => break,
                }
            };

            let result = transport.recv(&mut buf);
            if matches!(&result, Err(err) if is_poll_tick(err)) {
                continue;
            }

            let completion = self.complete_receive(result, &buf);
            if completion.queued && !self.disposed.load(Ordering::Acquire) {
                self.signal.raise();
            }
            if !completion.rearm {
                break;
            }
        }
        debug!("receive loop stopped");
    }

    fn complete_receive(&self, result: std::io::Result<usize>, buf: &[u8]) -> Completion {
        let mut state = self.lock_state();
        if state.transport.is_none() || !state.receive_pending {
            debug!("receive completed after dispose");
            return Completion::STOP;
        }

        let read = match result {
            Ok(read) => read,
            Err(err) => {
                error!(error = %err, "error receiving from transport");
                state.last_error = Some(LinkFault::io(Direction::Receive, &err));
                state.receive_pending = false;
                return Completion::STOP;
            }
        };

        let (messages, fault) = state.framing.extract(&buf[..read]);

        let mut queued = false;
        if self.enabled.load(Ordering::Acquire) {
            for message in messages {
                self.mailbox.push(message);
                queued = true;
            }
        } else if !messages.is_empty() {
            debug!(dropped = messages.len(), "link disabled, discarding received messages");
        }

        if let Some(err) = fault {
            error!(error = %err, "error framing received bytes");
            state.last_error = Some(LinkFault::frame(&err));
            state.receive_pending = false;
            return Completion {
                queued,
                rearm: false,
            };
        }

        state.last_error = None;
        let rearm = self.enabled.load(Ordering::Acquire) && !self.disposed.load(Ordering::Acquire);
        state.receive_pending = rearm;
        Completion { queued, rearm }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, ErrorKind};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
    use std::time::{Duration, Instant};

    use ctrlnet_transport::TransportError;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    struct Shared {
        script: Mutex<Receiver<io::Result<Vec<u8>>>>,
        sent: Mutex<Vec<Vec<u8>>>,
        fail_send: AtomicBool,
        closes: AtomicUsize,
        poll: Mutex<Duration>,
    }

    /// In-memory transport whose receive completions are fed by the test.
    struct ScriptedTransport {
        shared: Arc<Shared>,
        kind: TransportKind,
    }

    struct Script {
        feed: Sender<io::Result<Vec<u8>>>,
        shared: Arc<Shared>,
    }

    impl Script {
        fn deliver(&self, bytes: &[u8]) {
            self.feed.send(Ok(bytes.to_vec())).unwrap();
        }

        fn fail(&self, kind: ErrorKind) {
            self.feed
                .send(Err(io::Error::new(kind, "scripted failure")))
                .unwrap();
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.shared.sent.lock().unwrap().clone()
        }
    }

    fn scripted(kind: TransportKind) -> (ScriptedTransport, Script) {
        let (feed, script) = mpsc::channel();
        let shared = Arc::new(Shared {
            script: Mutex::new(script),
            sent: Mutex::new(Vec::new()),
            fail_send: AtomicBool::new(false),
            closes: AtomicUsize::new(0),
            poll: Mutex::new(Duration::from_millis(5)),
        });
        (
            ScriptedTransport {
                shared: Arc::clone(&shared),
                kind,
            },
            Script { feed, shared },
        )
    }

    impl Transport for ScriptedTransport {
        fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
            let poll = *self.shared.poll.lock().unwrap();
            match self.shared.script.lock().unwrap().recv_timeout(poll) {
                Ok(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Ok(Err(err)) => Err(err),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    Err(io::Error::from(ErrorKind::WouldBlock))
                }
            }
        }

        fn send(&self, payload: &[u8]) -> io::Result<()> {
            if self.shared.fail_send.load(Ordering::SeqCst) {
                return Err(io::Error::new(ErrorKind::ConnectionRefused, "no route"));
            }
            self.shared.sent.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        fn close(&self) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn set_poll_interval(
            &self,
            interval: Option<Duration>,
        ) -> ctrlnet_transport::Result<()> {
            if let Some(interval) = interval {
                *self.shared.poll.lock().unwrap() = interval;
            }
            Ok(())
        }

        fn local_addr(&self) -> ctrlnet_transport::Result<SocketAddr> {
            Ok(SocketAddr::from(([127, 0, 0, 1], 4000)))
        }

        fn kind(&self) -> TransportKind {
            self.kind
        }
    }

    fn config() -> LinkConfig {
        LinkConfig::new("127.0.0.1", 12345).with_poll_interval(Duration::from_millis(5))
    }

    fn datagram_link(config: LinkConfig) -> (Link<ScriptedTransport>, Script) {
        let (transport, script) = scripted(TransportKind::Datagram);
        let link = Link::with_transport(transport, Framing::Datagram, config)
            .expect("link should start");
        (link, script)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let start = Instant::now();
        while !condition() {
            assert!(start.elapsed() < WAIT, "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn drain(link: &Link<ScriptedTransport>) -> Vec<Bytes> {
        std::iter::from_fn(|| link.pop().expect("pop should succeed")).collect()
    }

    #[test]
    fn construction_arms_receive_when_enabled() {
        let (link, _script) = datagram_link(config());
        assert!(link.is_enabled());
        assert!(link.is_receiving());
        assert_eq!(link.address(), "127.0.0.1");
        assert_eq!(link.port(), 12345);
        assert_eq!(link.local_addr().unwrap().port(), 4000);
    }

    #[test]
    fn construction_disabled_does_not_arm() {
        let (link, _script) = datagram_link(config().with_enabled(false));
        assert!(!link.is_enabled());
        assert!(!link.is_receiving());
    }

    #[test]
    fn datagrams_popped_in_fifo_order() {
        let (link, script) = datagram_link(config());
        for name in ["Start", "ShowScene,7", "Stop"] {
            script.deliver(name.as_bytes());
        }

        wait_until(|| link.queued() == 3);
        assert!(link.has_data());
        assert_eq!(
            drain(&link),
            vec![
                Bytes::from_static(b"Start"),
                Bytes::from_static(b"ShowScene,7"),
                Bytes::from_static(b"Stop"),
            ]
        );
        assert!(!link.has_data());
        assert_eq!(link.pop().unwrap(), None);
    }

    #[test]
    fn notification_precedes_pop() {
        let (link, script) = datagram_link(config());
        let notifications = link.subscribe();

        script.deliver(b"GetContent");
        assert!(notifications.wait_timeout(WAIT));
        assert_eq!(link.pop().unwrap(), Some(Bytes::from_static(b"GetContent")));
    }

    #[test]
    fn stream_link_reassembles_lines() {
        let (transport, script) = scripted(TransportKind::Stream);
        let link = Link::with_transport(transport, Framing::lines(), config()).unwrap();
        let notifications = link.subscribe();

        script.deliver(b"AB");
        script.deliver(b"CD\r\nX\r\nY\r\n");
        wait_until(|| link.queued() == 3);
        assert!(notifications.try_wait());
        assert_eq!(
            drain(&link),
            vec![
                Bytes::from_static(b"ABCD"),
                Bytes::from_static(b"X"),
                Bytes::from_static(b"Y"),
            ]
        );
    }

    #[test]
    fn empty_datagram_is_ignored() {
        let (link, script) = datagram_link(config());
        script.deliver(b"");
        script.deliver(b"Stop");
        wait_until(|| link.queued() == 1);
        assert_eq!(link.pop().unwrap(), Some(Bytes::from_static(b"Stop")));
    }

    #[test]
    fn overflow_trims_from_tail() {
        let (link, script) = datagram_link(config().with_capacity(2));
        let notifications = link.subscribe();
        script.deliver(b"first");
        script.deliver(b"second");
        wait_until(|| link.queued() == 2);
        while notifications.try_wait() {}

        // The third message is pushed, then trimmed off the back.
        script.deliver(b"third");
        assert!(notifications.wait_timeout(WAIT));
        assert_eq!(link.queued(), 2);

        assert_eq!(
            drain(&link),
            vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")]
        );
    }

    #[test]
    fn disabled_link_discards_inbound_and_skips_send() {
        let (link, script) = datagram_link(config());
        link.set_enabled(false).unwrap();

        // The in-flight receive still completes, but nothing is queued and
        // the loop is not re-armed.
        script.deliver(b"dropped");
        wait_until(|| !link.is_receiving());
        assert!(!link.has_data());
        assert_eq!(link.pop().unwrap(), None);

        link.send(b"PWR=1").unwrap();
        assert!(script.sent().is_empty());

        link.set_enabled(true).unwrap();
        assert!(link.is_receiving());
        script.deliver(b"kept");
        wait_until(|| link.queued() == 1);
        assert_eq!(drain(&link), vec![Bytes::from_static(b"kept")]);
    }

    #[test]
    fn pop_returns_none_while_disabled() {
        let (link, script) = datagram_link(config());
        script.deliver(b"Start");
        wait_until(|| link.queued() == 1);

        link.set_enabled(false).unwrap();
        assert_eq!(link.pop().unwrap(), None);
        assert!(link.has_data());
    }

    #[test]
    fn send_transmits_while_enabled() {
        let (link, script) = datagram_link(config());
        link.send(b"SoftReset").unwrap();
        assert_eq!(script.sent(), vec![b"SoftReset".to_vec()]);
        assert!(link.error().is_none());
    }

    #[test]
    fn send_failure_is_recorded_and_not_fatal() {
        let (link, script) = datagram_link(config());
        script.shared.fail_send.store(true, Ordering::SeqCst);

        link.send(b"Start").expect("send failures are not returned");
        let fault = link.error().expect("send failure should be recorded");
        assert_eq!(fault.direction, Direction::Send);
        assert_eq!(fault.kind, ErrorKind::ConnectionRefused);

        script.shared.fail_send.store(false, Ordering::SeqCst);
        link.send(b"Start").unwrap();
        assert!(link.error().is_none());
        assert_eq!(script.sent(), vec![b"Start".to_vec()]);
    }

    #[test]
    fn receive_failure_stops_loop_until_reenabled() {
        let (link, script) = datagram_link(config());
        script.fail(ErrorKind::ConnectionReset);

        wait_until(|| link.error().is_some());
        let fault = link.error().unwrap();
        assert_eq!(fault.direction, Direction::Receive);
        assert_eq!(fault.kind, ErrorKind::ConnectionReset);
        assert!(!link.is_receiving());
        assert!(link.is_enabled());

        // Re-enabling re-arms the loop and clears the fault.
        link.set_enabled(true).unwrap();
        assert!(link.is_receiving());
        assert!(link.error().is_none());

        script.deliver(b"DebugOn");
        wait_until(|| link.queued() == 1);
        assert_eq!(link.pop().unwrap(), Some(Bytes::from_static(b"DebugOn")));
    }

    /// Counts error events; everything else is accepted and ignored.
    #[derive(Default)]
    struct ErrorCounter {
        errors: Arc<AtomicUsize>,
        next_id: AtomicUsize,
    }

    impl tracing::Subscriber for ErrorCounter {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(self.next_id.fetch_add(1, Ordering::SeqCst) as u64 + 1)
        }

        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

        fn event(&self, event: &tracing::Event<'_>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn enter(&self, _: &tracing::span::Id) {}

        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn worker_logs_to_injected_dispatch() {
        let counter = ErrorCounter::default();
        let errors = Arc::clone(&counter.errors);
        let (link, script) = datagram_link(config().with_dispatch(Dispatch::new(counter)));

        script.fail(ErrorKind::ConnectionReset);
        wait_until(|| link.error().is_some());
        wait_until(|| errors.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn receive_failure_leaves_dispose_callable() {
        let (link, script) = datagram_link(config());
        script.fail(ErrorKind::Other);
        wait_until(|| link.error().is_some());

        link.dispose();
        assert!(link.is_disposed());
    }

    #[test]
    fn unterminated_overflow_is_a_receive_fault() {
        let (transport, script) = scripted(TransportKind::Stream);
        let framing = Framing::lines_with_config(FrameConfig {
            max_line_len: 4,
            ..FrameConfig::default()
        })
        .unwrap();
        let link = Link::with_transport(transport, framing, config()).unwrap();

        script.deliver(b"0123456789");
        wait_until(|| link.error().is_some());
        assert_eq!(link.error().unwrap().kind, ErrorKind::InvalidData);
        assert!(!link.is_receiving());
    }

    #[test]
    fn lines_ahead_of_overflow_are_still_queued() {
        let (transport, script) = scripted(TransportKind::Stream);
        let framing = Framing::lines_with_config(FrameConfig {
            max_line_len: 4,
            ..FrameConfig::default()
        })
        .unwrap();
        let link = Link::with_transport(transport, framing, config()).unwrap();
        let notifications = link.subscribe();

        script.deliver(b"ok\r\n0123456789");
        wait_until(|| link.error().is_some());
        assert_eq!(link.queued(), 1);
        assert_eq!(link.error().unwrap().kind, ErrorKind::InvalidData);
        assert!(!link.is_receiving());
        assert!(notifications.wait_timeout(WAIT));
        assert_eq!(link.pop().unwrap(), Some(Bytes::from_static(b"ok")));
    }

    #[test]
    fn dispose_is_idempotent() {
        let (link, script) = datagram_link(config());
        script.deliver(b"Start");
        wait_until(|| link.queued() == 1);

        link.dispose();
        link.dispose();

        assert!(link.is_disposed());
        assert!(!link.is_receiving());
        assert!(!link.has_data());
        assert_eq!(script.shared.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn operations_after_dispose_fail() {
        let (link, script) = datagram_link(config());
        link.dispose();

        assert!(matches!(link.pop(), Err(LinkError::Disposed)));
        assert!(matches!(link.send(b"Stop"), Err(LinkError::Disposed)));
        assert!(matches!(link.set_enabled(true), Err(LinkError::Disposed)));
        assert!(matches!(link.local_addr(), Err(LinkError::Disposed)));
        assert!(script.sent().is_empty());
        assert!(link.is_enabled());
        assert!(link.error().is_none());
    }

    #[test]
    fn completion_after_dispose_is_ignored() {
        let (link, script) = datagram_link(config());
        let notifications = link.subscribe();
        link.dispose();

        script.deliver(b"late");
        thread::sleep(Duration::from_millis(30));
        assert!(!link.has_data());
        assert!(!notifications.try_wait());
    }

    #[test]
    fn dispose_releases_waiting_consumers() {
        let (link, _script) = datagram_link(config());
        let notifications = link.subscribe();
        let waiter = thread::spawn(move || notifications.wait());

        link.dispose();
        assert!(!waiter.join().unwrap());
    }

    #[test]
    fn drop_disposes_transport() {
        let (link, script) = datagram_link(config());
        drop(link);
        assert_eq!(script.shared.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn udp_link_receives_datagrams() {
        let link = Link::open(config().with_local_port(0)).expect("link should bind");
        let port = link.local_addr().unwrap().port();
        let notifications = link.subscribe();

        let sender = UdpTransport::bind("127.0.0.1", port, 0).unwrap();
        sender.send(b"ShowScene,3").unwrap();

        assert!(notifications.wait_timeout(WAIT));
        assert_eq!(link.pop().unwrap(), Some(Bytes::from_static(b"ShowScene,3")));
    }

    #[test]
    fn udp_link_bind_conflict_fails_construction() {
        let first = Link::open(config()).unwrap();
        let port = first.local_addr().unwrap().port();

        let result = Link::open(config().with_local_port(port));
        assert!(matches!(
            result,
            Err(LinkError::Transport(TransportError::Bind { .. }))
        ));
    }
}
