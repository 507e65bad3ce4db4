//! WebSocket client for the Bitso market data feed
//!
//! One connection is served by two tasks. The reader owns the read half,
//! decodes frames and pushes events into a bounded queue without ever
//! waiting on it. The writer owns the write half: keep-alives, subscribe
//! requests routed from callers, and the close handshake. Every fatal
//! condition funnels into [`Link::disconnect`], which runs teardown once.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::core::{BookCode, Channel, Error, FeedConfig, FeedEvent, Result};
use crate::feeds::disconnect::{DisconnectGuard, DisconnectState};
use crate::feeds::message::{self, Inbound, SubscribeRequest};

const MIN_KEEPALIVE: Duration = Duration::from_millis(1);

/// Teardown phases broadcast to the reader and writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Signal {
    Run,
    /// Writer sends the close frame and stops
    Shutdown,
    /// Transport is being dropped; pending reads and writes are abandoned
    Close,
}

async fn reached(signal: &mut watch::Receiver<Signal>, phase: Signal) {
    let _ = signal.wait_for(|s| *s >= phase).await;
}

/// Frame queued for the writer, acknowledged once written
struct Outbound {
    frame: String,
    ack: oneshot::Sender<Result<()>>,
}

/// Completion signals of the two tasks; a sender is dropped when its task ends
struct TaskExits {
    reader: oneshot::Receiver<()>,
    writer: oneshot::Receiver<()>,
}

/// A live connection and its disconnect coordinator
struct Link {
    guard: DisconnectGuard,
    signal: watch::Sender<Signal>,
    commands: mpsc::UnboundedSender<Outbound>,
    events: Mutex<Option<mpsc::Sender<FeedEvent>>>,
    exits: Mutex<Option<TaskExits>>,
    grace: Duration,
}

impl Link {
    /// Schedule teardown. Only the first caller has any effect.
    fn disconnect(self: &Arc<Self>, reason: &str) {
        if !self.guard.begin() {
            debug!("disconnect ({}) ignored, already {:?}", reason, self.guard.state());
            return;
        }

        info!("disconnecting: {}", reason);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let link = self.clone();
                handle.spawn(async move { link.teardown().await });
            }
            Err(_) => {
                // No runtime left to drive the handshake; tasks die with the runtime
                error!("no runtime available, skipping clean disconnect");
                self.signal.send_replace(Signal::Close);
                self.guard.finish();
                self.notify_disconnected();
            }
        }
    }

    async fn teardown(&self) {
        let exits = self.exits.lock().take();

        self.signal.send_replace(Signal::Shutdown);

        if let Some(mut exits) = exits {
            let flushed = tokio::time::timeout(self.grace, &mut exits.writer)
                .await
                .is_ok();
            if !flushed {
                warn!("close frame not written within {:?}", self.grace);
            }

            self.signal.send_replace(Signal::Close);

            let _ = exits.reader.await;
            if !flushed {
                let _ = exits.writer.await;
            }
        } else {
            self.signal.send_replace(Signal::Close);
        }

        self.guard.finish();
        debug!("transport closed");

        self.notify_disconnected();
    }

    /// Best-effort terminal event; dropping our sender closes the queue
    fn notify_disconnected(&self) {
        let events = self.events.lock().take();
        if let Some(events) = events {
            if events.try_send(FeedEvent::Disconnected).is_err() {
                warn!("feed queue full, Disconnected notification dropped");
            }
        }
    }
}

/// Push without waiting. A full queue means the consumer is too slow.
fn push(events: &mpsc::Sender<FeedEvent>, event: FeedEvent) -> Result<()> {
    events.try_send(event).map_err(|e| match e {
        TrySendError::Full(_) => Error::QueueOverflow {
            capacity: events.max_capacity(),
        },
        TrySendError::Closed(_) => Error::NotConnected,
    })
}

struct Reader<S> {
    link: Arc<Link>,
    stream: SplitStream<WebSocketStream<S>>,
    events: mpsc::Sender<FeedEvent>,
    signal: watch::Receiver<Signal>,
    _exit: oneshot::Sender<()>,
}

impl<S> Reader<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(mut self) {
        let failure = loop {
            let next = tokio::select! {
                biased;
                _ = reached(&mut self.signal, Signal::Close) => break None,
                next = self.stream.next() => next,
            };

            let result = match next {
                Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.dispatch(text),
                    Err(e) => Err(Error::Framing(format!("binary frame is not utf-8: {}", e))),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("peer closed the connection: {:?}", frame);
                    Err(Error::NotConnected)
                }
                Some(Ok(_)) => Ok(()),
                Some(Err(e)) => {
                    error!("read: {}", e);
                    Err(Error::NotConnected)
                }
                None => {
                    info!("transport ended");
                    Err(Error::NotConnected)
                }
            };

            if let Err(err) = result {
                break Some(err);
            }
        };

        if let Some(err) = failure {
            if err.is_fatal() {
                error!("reader stopped: {}", err);
            } else {
                warn!("reader stopped: {}", err);
            }
            self.link.disconnect(&err.to_string());
        }
    }

    fn dispatch(&self, text: &str) -> Result<()> {
        match message::decode(text)? {
            Inbound::KeepAlive => Ok(()),
            Inbound::Ack { channel, response } => {
                info!(
                    "{} subscription ok ({})",
                    channel,
                    response.as_deref().unwrap_or("-")
                );
                Ok(())
            }
            Inbound::Event(event) => push(&self.events, event),
        }
    }
}

enum Step {
    Shutdown,
    Command(Option<Outbound>),
    KeepAlive,
}

struct Writer<S> {
    link: Arc<Link>,
    sink: SplitSink<WebSocketStream<S>, Message>,
    commands: mpsc::UnboundedReceiver<Outbound>,
    signal: watch::Receiver<Signal>,
    keepalive: Duration,
    _exit: oneshot::Sender<()>,
}

impl<S> Writer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.keepalive, self.keepalive);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let failure = loop {
            let step = tokio::select! {
                biased;
                _ = reached(&mut self.signal, Signal::Shutdown) => Step::Shutdown,
                cmd = self.commands.recv() => Step::Command(cmd),
                _ = ticker.tick() => Step::KeepAlive,
            };

            match step {
                Step::Shutdown => {
                    info!("quit, attempting clean disconnect");
                    let close = Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "".into(),
                    }));
                    if let Err(e) = self.write(close).await {
                        warn!("write close: {}", e);
                    }
                    break None;
                }
                Step::Command(Some(Outbound { frame, ack })) => {
                    debug!("send: {}", frame);
                    let result = self.write(Message::text(frame)).await;
                    let failed = result.is_err();
                    let _ = ack.send(result);
                    if failed {
                        break Some(Error::Write("subscribe frame not written".to_string()));
                    }
                }
                Step::Command(None) => break None,
                Step::KeepAlive => {
                    if let Err(err) = self.write(Message::text(message::keepalive_frame())).await {
                        break Some(err);
                    }
                }
            }
        };

        if let Some(err) = failure {
            error!("writer stopped: {}", err);
            self.link.disconnect(&err.to_string());
        }
    }

    /// Write one frame; abandoned if the transport is closed meanwhile
    async fn write(&mut self, msg: Message) -> Result<()> {
        tokio::select! {
            biased;
            result = self.sink.send(msg) => result.map_err(|e| Error::Write(e.to_string())),
            _ = reached(&mut self.signal, Signal::Close) => {
                Err(Error::Write("transport closed".to_string()))
            }
        }
    }
}

/// Streaming market data feed
///
/// ```no_run
/// # async fn demo() -> bitso_feed::Result<()> {
/// use bitso_feed::{BookCode, Channel, FeedConfig, FeedEvent, WsFeed};
///
/// let feed = WsFeed::new(FeedConfig::default());
/// let mut events = feed.connect().await?;
/// feed.subscribe(BookCode::BTC_MXN, Channel::Orders).await?;
///
/// while let Some(event) = events.recv().await {
///     if event == FeedEvent::Disconnected {
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct WsFeed {
    config: FeedConfig,
    link: RwLock<Option<Arc<Link>>>,
}

impl WsFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            link: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Dial the configured endpoint and start streaming.
    ///
    /// Returns the consumer end of the delivery queue. No retry on failure.
    pub async fn connect(&self) -> Result<mpsc::Receiver<FeedEvent>> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let url = Url::parse(&self.config.endpoint)
            .map_err(|e| Error::Dial(format!("invalid endpoint {}: {}", self.config.endpoint, e)))?;

        info!("connecting to {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Dial(e.to_string()))?;

        info!("connected!");

        self.attach(ws_stream)
    }

    /// Start streaming over an already established WebSocket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach<S>(&self, ws_stream: WebSocketStream<S>) -> Result<mpsc::Receiver<FeedEvent>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut slot = self.link.write();
        if slot.as_ref().is_some_and(|link| link.guard.is_running()) {
            return Err(Error::AlreadyConnected);
        }

        let (events_tx, events_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        // A zero period would panic the writer's ticker
        let keepalive = self.config.keepalive_interval().max(MIN_KEEPALIVE);
        let (signal_tx, _) = watch::channel(Signal::Run);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (reader_exit_tx, reader_exit_rx) = oneshot::channel();
        let (writer_exit_tx, writer_exit_rx) = oneshot::channel();

        let link = Arc::new(Link {
            guard: DisconnectGuard::new(),
            signal: signal_tx,
            commands: commands_tx,
            events: Mutex::new(Some(events_tx.clone())),
            exits: Mutex::new(Some(TaskExits {
                reader: reader_exit_rx,
                writer: writer_exit_rx,
            })),
            grace: self.config.close_grace(),
        });

        let (sink, stream) = ws_stream.split();

        let reader = Reader {
            link: link.clone(),
            stream,
            events: events_tx,
            signal: link.signal.subscribe(),
            _exit: reader_exit_tx,
        };
        let writer = Writer {
            link: link.clone(),
            sink,
            commands: commands_rx,
            signal: link.signal.subscribe(),
            keepalive,
            _exit: writer_exit_tx,
        };

        tokio::spawn(reader.run());
        tokio::spawn(writer.run());

        *slot = Some(link);
        Ok(events_rx)
    }

    /// Subscribe `book` to `channel`; the frame goes through the writer task.
    pub async fn subscribe(&self, book: BookCode, channel: Channel) -> Result<()> {
        let link = self.live_link().ok_or(Error::NotConnected)?;

        let frame = SubscribeRequest::new(book, channel).to_frame()?;
        let (ack_tx, ack_rx) = oneshot::channel();

        link.commands
            .send(Outbound { frame, ack: ack_tx })
            .map_err(|_| Error::NotConnected)?;

        // Writer gone before handling the frame
        ack_rx.await.map_err(|_| Error::NotConnected)?
    }

    /// Schedule teardown of the live connection. Idempotent; does not wait.
    pub fn disconnect(&self) {
        let link = self.link.read().clone();
        match link {
            Some(link) => link.disconnect("requested by caller"),
            None => debug!("disconnect without a connection"),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.live_link().is_some()
    }

    /// Lifecycle of the most recent connection, if any
    pub fn state(&self) -> Option<DisconnectState> {
        self.link.read().as_ref().map(|link| link.guard.state())
    }

    fn live_link(&self) -> Option<Arc<Link>> {
        self.link
            .read()
            .as_ref()
            .filter(|link| link.guard.is_running())
            .cloned()
    }
}

impl Drop for WsFeed {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.disconnect("feed dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Side;
    use rust_decimal::Decimal;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{DuplexStream, ReadBuf};
    use tokio_tungstenite::tungstenite::protocol::Role;

    type Peer = WebSocketStream<DuplexStream>;

    fn test_config() -> FeedConfig {
        FeedConfig {
            queue_capacity: 8,
            keepalive_interval_ms: 60_000,
            close_grace_ms: 200,
            ..FeedConfig::default()
        }
    }

    async fn stub_pair(config: FeedConfig) -> (WsFeed, mpsc::Receiver<FeedEvent>, Peer) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

        let feed = WsFeed::new(config);
        let events = feed.attach(client).unwrap();
        (feed, events, server)
    }

    async fn send(peer: &mut Peer, frame: &str) {
        peer.send(Message::text(frame.to_string())).await.unwrap();
    }

    async fn next_event(events: &mut mpsc::Receiver<FeedEvent>) -> Option<FeedEvent> {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for a feed event")
    }

    async fn next_frame(peer: &mut Peer) -> Message {
        tokio::time::timeout(Duration::from_secs(5), peer.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("peer stream ended")
            .expect("peer read failed")
    }

    /// Drain the peer until the client drops the transport; returns close frames seen
    async fn count_closes(peer: &mut Peer) -> usize {
        let mut closes = 0;
        loop {
            match tokio::time::timeout(Duration::from_secs(5), peer.next()).await {
                Ok(Some(Ok(msg))) if msg.is_close() => closes += 1,
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(_))) | Ok(None) => return closes,
                Err(_) => panic!("transport never closed"),
            }
        }
    }

    async fn wait_closed(feed: &WsFeed) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while feed.state() != Some(DisconnectState::Closed) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("feed never reached Closed");
    }

    fn trades_frame(id: i64) -> String {
        format!(
            r#"{{"type":"trades","book":"btc_mxn","sequence":{id},"payload":[{{"i":{id},"a":"1","r":"2","v":"2","t":1,"mo":"m","to":"t"}}]}}"#
        )
    }

    #[tokio::test]
    async fn test_keepalive_ack_then_snapshot() {
        let (feed, mut events, mut peer) = stub_pair(test_config()).await;

        send(&mut peer, r#"{"type":"ka"}"#).await;
        send(&mut peer, r#"{"type":"orders","action":"subscribe"}"#).await;
        send(
            &mut peer,
            r#"{"type":"orders","book":"btc_mxn","sequence":1,"payload":{"bids":[],"asks":[]}}"#,
        )
        .await;

        let Some(FeedEvent::OrderBook(snapshot)) = next_event(&mut events).await else {
            panic!("expected an order book snapshot");
        };
        assert_eq!(snapshot.book, BookCode::BTC_MXN);
        assert_eq!(snapshot.sequence, Some(1));
        assert!(snapshot.bids.is_empty());
        assert!(snapshot.asks.is_empty());
        assert!(events.try_recv().is_err());

        feed.disconnect();
        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
    }

    #[tokio::test]
    async fn test_trades_frame() {
        let (_feed, mut events, mut peer) = stub_pair(test_config()).await;

        send(
            &mut peer,
            r#"{"type":"trades","book":"eth_btc","payload":[{"i":1,"a":"0.5","r":"100","v":"50","t":0,"mo":"m1","to":"t1"}]}"#,
        )
        .await;

        let Some(FeedEvent::Trades(batch)) = next_event(&mut events).await else {
            panic!("expected a trade batch");
        };
        assert_eq!(batch.book, BookCode::ETH_BTC);
        assert_eq!(batch.trades.len(), 1);
        let trade = &batch.trades[0];
        assert_eq!(trade.amount, "0.5".parse::<Decimal>().unwrap());
        assert_eq!(trade.rate, Decimal::from(100));
        assert_eq!(trade.value, Decimal::from(50));
        assert_eq!(trade.side, Side::Buy);
    }

    #[tokio::test]
    async fn test_events_keep_frame_order() {
        let (_feed, mut events, mut peer) = stub_pair(test_config()).await;

        for id in 1..=6 {
            send(&mut peer, &trades_frame(id)).await;
            if id % 2 == 0 {
                send(&mut peer, r#"{"type":"ka"}"#).await;
            }
        }

        for expected in 1..=6 {
            let Some(FeedEvent::Trades(batch)) = next_event(&mut events).await else {
                panic!("expected trades");
            };
            assert_eq!(batch.sequence, Some(expected));
            assert_eq!(batch.trades[0].id, expected);
        }
    }

    #[tokio::test]
    async fn test_subscribe_before_connect() {
        let feed = WsFeed::new(test_config());
        let err = feed
            .subscribe(BookCode::BTC_MXN, Channel::Orders)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(!feed.is_connected());
        assert_eq!(feed.state(), None);
    }

    #[tokio::test]
    async fn test_subscribe_writes_one_frame() {
        let (feed, _events, mut peer) = stub_pair(test_config()).await;

        feed.subscribe(BookCode::XRP_MXN, Channel::Trades).await.unwrap();

        let frame = next_frame(&mut peer).await;
        assert_eq!(
            frame.to_text().unwrap(),
            r#"{"action":"subscribe","book":"xrp_mxn","type":"trades"}"#
        );

        feed.disconnect();
        // Only the close frame follows
        assert!(next_frame(&mut peer).await.is_close());
    }

    #[tokio::test]
    async fn test_malformed_payload_disconnects() {
        let (feed, mut events, mut peer) = stub_pair(test_config()).await;

        send(&mut peer, r#"{"type":"orders","book":"btc_mxn","payload":{"bids":"nope"}}"#).await;

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
        assert_eq!(feed.state(), Some(DisconnectState::Closed));
        assert_eq!(count_closes(&mut peer).await, 1);

        let err = feed
            .subscribe(BookCode::BTC_MXN, Channel::Orders)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_unexpected_channel_disconnects() {
        let (_feed, mut events, mut peer) = stub_pair(test_config()).await;

        send(&mut peer, r#"{"type":"diff-orders","book":"btc_mxn","payload":[]}"#).await;

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_full_queue_fails_fast() {
        let config = FeedConfig {
            queue_capacity: 2,
            ..test_config()
        };
        let (feed, mut events, mut peer) = stub_pair(config).await;

        for id in 1..=3 {
            send(&mut peer, &trades_frame(id)).await;
        }

        wait_closed(&feed).await;

        // Queue was still full when teardown ended: the notification was dropped
        for expected in 1..=2 {
            let Some(FeedEvent::Trades(batch)) = next_event(&mut events).await else {
                panic!("expected trades");
            };
            assert_eq!(batch.trades[0].id, expected);
        }
        assert_eq!(next_event(&mut events).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_disconnects_converge() {
        let (feed, mut events, mut peer) = stub_pair(test_config()).await;
        let feed = Arc::new(feed);

        let callers: Vec<_> = (0..10)
            .map(|_| {
                let feed = feed.clone();
                tokio::spawn(async move { feed.disconnect() })
            })
            .collect();
        for caller in callers {
            caller.await.unwrap();
        }

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
        assert_eq!(count_closes(&mut peer).await, 1);

        feed.disconnect();
        assert_eq!(feed.state(), Some(DisconnectState::Closed));
    }

    #[tokio::test]
    async fn test_peer_hangup_disconnects() {
        let (feed, mut events, peer) = stub_pair(test_config()).await;

        drop(peer);

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
        assert!(!feed.is_connected());
    }

    #[tokio::test]
    async fn test_attach_twice_rejected() {
        let (feed, _events, _peer) = stub_pair(test_config()).await;

        let (client_io, _server_io) = tokio::io::duplex(1024);
        let second = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        assert!(matches!(feed.attach(second), Err(Error::AlreadyConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_every_interval() {
        let config = FeedConfig {
            keepalive_interval_ms: 1000,
            ..test_config()
        };
        let (_feed, _events, mut peer) = stub_pair(config).await;

        let started = Instant::now();
        for _ in 0..2 {
            let frame = next_frame(&mut peer).await;
            assert!(frame.is_text());
            assert!(!frame.to_text().unwrap().is_empty());
        }
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    /// Transport whose reads never complete and whose writes always fail
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Pending
        }
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn broken_feed(config: FeedConfig) -> (WsFeed, mpsc::Receiver<FeedEvent>) {
        let ws = WebSocketStream::from_raw_socket(BrokenPipe, Role::Client, None).await;
        let feed = WsFeed::new(config);
        let events = feed.attach(ws).unwrap();
        (feed, events)
    }

    #[tokio::test]
    async fn test_subscribe_write_failure_disconnects() {
        let (feed, mut events) = broken_feed(test_config()).await;

        let result = feed.subscribe(BookCode::BTC_MXN, Channel::Trades).await;
        assert!(matches!(result, Err(Error::Write(_))), "got {:?}", result);

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
        wait_closed(&feed).await;
        assert!(!feed.is_connected());
    }

    #[tokio::test]
    async fn test_keepalive_write_failure_disconnects() {
        let config = FeedConfig {
            keepalive_interval_ms: 50,
            ..test_config()
        };
        let (feed, mut events) = broken_feed(config).await;

        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        assert_eq!(next_event(&mut events).await, None);
        wait_closed(&feed).await;
        assert!(matches!(
            feed.subscribe(BookCode::BTC_MXN, Channel::Orders).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_zero_keepalive_interval_is_clamped() {
        let config = FeedConfig {
            keepalive_interval_ms: 0,
            ..test_config()
        };
        let (feed, mut events, mut peer) = stub_pair(config).await;

        feed.subscribe(BookCode::BTC_MXN, Channel::Orders).await.unwrap();
        assert_eq!(feed.state(), Some(DisconnectState::Running));

        // Keep-alives flood in; the subscribe frame is among them
        let mut seen = false;
        for _ in 0..1000 {
            let frame = next_frame(&mut peer).await;
            if frame.to_text().unwrap().contains("subscribe") {
                seen = true;
                break;
            }
        }
        assert!(seen, "subscribe frame never written");

        feed.disconnect();
        assert_eq!(next_event(&mut events).await, Some(FeedEvent::Disconnected));
        wait_closed(&feed).await;
    }

    #[test]
    fn test_disconnect_without_runtime_notifies() {
        let (events_tx, mut events_rx) = mpsc::channel(4);
        let (signal, _) = watch::channel(Signal::Run);
        let (commands, _commands_rx) = mpsc::unbounded_channel();
        let link = Arc::new(Link {
            guard: DisconnectGuard::new(),
            signal,
            commands,
            events: Mutex::new(Some(events_tx)),
            exits: Mutex::new(None),
            grace: Duration::from_millis(10),
        });

        link.disconnect("runtime gone");
        link.disconnect("again");

        assert_eq!(link.guard.state(), DisconnectState::Closed);
        assert_eq!(events_rx.try_recv(), Ok(FeedEvent::Disconnected));
        assert_eq!(
            events_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        );
    }

    #[tokio::test]
    async fn test_dial_failure() {
        let feed = WsFeed::new(FeedConfig {
            endpoint: "ws://127.0.0.1:1".to_string(),
            ..test_config()
        });
        assert!(matches!(feed.connect().await, Err(Error::Dial(_))));
        assert!(!feed.is_connected());
    }
}
