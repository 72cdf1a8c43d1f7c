//! The controller session: one owned connection plus its reader and writer
//! tasks.
//!
//! A new `connect` fully retires the previous connection (cancel both tasks,
//! wait for them) before dialing. Reader and writer share a per-connection
//! `CancellationToken` that is a child of the session's shutdown token.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use conduit_rpc::{HandlerTable, ProtocolContext, handle_message};
use futures::future::BoxFuture;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::buffer::FragmentBuffer;
use crate::config::{FailurePolicy, SessionConfig};
use crate::errors::SessionError;
use crate::outbox::{OUTBOX_CAPACITY, Outbox};
use crate::state::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for a retired connection's tasks to stop.
const RETIRE_TIMEOUT: Duration = Duration::from_secs(2);

struct LiveConnection {
    generation: u64,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

struct Inner {
    config: SessionConfig,
    ctx: ProtocolContext,
    table: HandlerTable,
    outbox: Arc<Outbox>,
    state: watch::Sender<ConnectionState>,
    live: Mutex<Option<LiveConnection>>,
    generation: AtomicU64,
    reconnect_scheduled: AtomicBool,
    shutdown: CancellationToken,
}

/// Owned controller session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a disconnected session.
    ///
    /// `outbox` is the same sink the host's dispatcher emits events into.
    pub fn new(
        config: SessionConfig,
        ctx: ProtocolContext,
        table: HandlerTable,
        outbox: Arc<Outbox>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                ctx,
                table,
                outbox,
                state,
                live: Mutex::new(None),
                generation: AtomicU64::new(0),
                reconnect_scheduled: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Open the connection, retiring any previous one first.
    ///
    /// Fails fast with [`SessionError::MissingOrigin`] when no origin is
    /// configured. Handshake failure or timeout is also reported to the
    /// failure policy, exactly like losing an open connection.
    pub async fn connect(&self) -> Result<(), SessionError> {
        connect(Arc::clone(&self.inner)).await
    }

    /// Retire the live connection and disable reconnects for good.
    ///
    /// Frames already queued (e.g. a final lifecycle event) are flushed
    /// before the close frame.
    pub async fn shutdown(&self) {
        info!("shutting down controller session");
        self.inner.shutdown.cancel();
        let previous = self.inner.live.lock().await.take();
        if let Some(conn) = previous {
            retire(conn).await;
        }
        self.inner.outbox.detach_all();
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// The outbound queue shared with the host.
    pub fn outbox(&self) -> Arc<Outbox> {
        Arc::clone(&self.inner.outbox)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.inner.config.url)
            .field("policy", &self.inner.config.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "connection state changed");
        }
    }

    fn fail_connect(self: &Arc<Self>, err: SessionError) -> SessionError {
        warn!(url = %self.config.url, error = %err, "failed to connect to controller");
        self.on_connection_lost();
        err
    }

    fn on_connection_lost(self: &Arc<Self>) {
        self.set_state(ConnectionState::Disconnected);
        if self.shutdown.is_cancelled() {
            return;
        }
        match self.config.policy {
            FailurePolicy::Strict => {
                error!("controller connection lost in strict mode, stopping host");
                self.ctx.host.shutdown();
            }
            FailurePolicy::Lenient => self.schedule_reconnect(),
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        if self.reconnect_scheduled.swap(true, Ordering::SeqCst) {
            debug!("reconnect already scheduled");
            return;
        }

        let inner = Arc::clone(self);
        let delay = self.config.reconnect_delay;
        info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "scheduling reconnect");

        let _ = tokio::spawn(async move {
            tokio::select! {
                () = inner.shutdown.cancelled() => {
                    inner.reconnect_scheduled.store(false, Ordering::SeqCst);
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }
            inner.reconnect_scheduled.store(false, Ordering::SeqCst);
            counter!("conduit_reconnects_total").increment(1);
            if let Err(e) = connect(inner).await {
                debug!(error = %e, "reconnect attempt failed");
            }
        });
    }

    /// Dispatch one complete text message. The buffer lock is held until the
    /// response is queued, so messages on one connection are handled in order.
    async fn on_text(&self, buffer: &Mutex<FragmentBuffer>, text: &str) {
        let mut buffer = buffer.lock().await;
        let Some(text) = buffer.push(text, true) else {
            return;
        };
        if let Some(response) = handle_message(&text, &self.table, &self.ctx).await {
            self.outbox.send_response(&response).await;
        }
    }
}

fn connect(inner: Arc<Inner>) -> BoxFuture<'static, Result<(), SessionError>> {
    Box::pin(async move {
        if inner.shutdown.is_cancelled() {
            return Err(SessionError::ShutDown);
        }
        let Some(origin) = inner.config.origin.clone() else {
            error!("origin is not configured, refusing to connect");
            return Err(SessionError::MissingOrigin);
        };

        let mut live = inner.live.lock().await;
        if let Some(previous) = live.take() {
            inner.outbox.detach(previous.generation);
            retire(previous).await;
        }

        let request = build_request(&inner.config.url, &inner.config.token, &origin)?;

        inner.set_state(ConnectionState::Connecting);
        info!(url = %inner.config.url, "connecting to controller");

        let timeout = inner.config.connect_timeout;
        let ws = match tokio::time::timeout(timeout, connect_async(request)).await {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                drop(live);
                return Err(inner.fail_connect(SessionError::Connect(e)));
            }
            Err(_elapsed) => {
                drop(live);
                return Err(inner.fail_connect(SessionError::Timeout(timeout)));
            }
        };

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = inner.shutdown.child_token();
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        let (ws_tx, ws_rx) = ws.split();

        inner.outbox.attach(generation, tx);
        inner.ctx.store.reconcile_begin();
        inner.set_state(ConnectionState::Connected);
        counter!("conduit_connections_total").increment(1);
        info!(generation, "connected to controller");

        let writer = tokio::spawn(write_loop(ws_tx, rx, cancel.clone()));
        let reader = tokio::spawn(read_loop(
            Arc::clone(&inner),
            ws_rx,
            cancel.clone(),
            generation,
        ));

        *live = Some(LiveConnection {
            generation,
            cancel,
            reader,
            writer,
        });
        Ok(())
    })
}

fn build_request(url: &str, token: &str, origin: &str) -> Result<Request, SessionError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;

    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| SessionError::InvalidRequest(format!("authorization header: {e}")))?;
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| SessionError::InvalidRequest(format!("origin header: {e}")))?;

    let headers = request.headers_mut();
    let _ = headers.insert(header::AUTHORIZATION, bearer);
    let _ = headers.insert(header::ORIGIN, origin);
    Ok(request)
}

async fn retire(conn: LiveConnection) {
    debug!(generation = conn.generation, "retiring connection");
    conn.cancel.cancel();

    let aborts = [conn.reader.abort_handle(), conn.writer.abort_handle()];
    let joined = futures::future::join_all([conn.reader, conn.writer]);
    if tokio::time::timeout(RETIRE_TIMEOUT, joined).await.is_err() {
        warn!(generation = conn.generation, "connection tasks did not stop in time, aborting");
        for handle in aborts {
            handle.abort();
        }
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    mut ws_rx: SplitStream<WsStream>,
    cancel: CancellationToken,
    generation: u64,
) {
    let buffer = Mutex::new(FragmentBuffer::new());

    let lost = loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break false,
            frame = ws_rx.next() => frame,
        };

        match frame {
            None => {
                info!(generation, "controller stream ended");
                break true;
            }
            Some(Err(e)) => {
                warn!(generation, error = %e, "controller connection error");
                break true;
            }
            // tungstenite joins continuation frames, so each Text is terminal
            Some(Ok(Message::Text(text))) => inner.on_text(&buffer, text.as_str()).await,
            Some(Ok(Message::Close(reason))) => {
                info!(generation, ?reason, "controller closed the connection");
                break true;
            }
            Some(Ok(_)) => {}
        }
    };

    if lost {
        counter!("conduit_disconnects_total").increment(1);
        inner.outbox.detach(generation);
        cancel.cancel();
        inner.on_connection_lost();
    }
}

async fn write_loop(
    mut ws_tx: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            text = rx.recv() => {
                let Some(text) = text else { break };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    debug!(error = %e, "write failed, stopping writer");
                    return;
                }
            }
        }
    }

    // flush what was queued before the cancel, then close
    while let Ok(text) = rx.try_recv() {
        if ws_tx.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
    let _ = ws_tx.close().await;
}
