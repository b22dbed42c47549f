//! WebSocket transport and its receive/send loops.
//!
//! # Loops
//!
//! `start` spawns two tokio tasks that share one socket and one
//! [`ShutdownCoordinator`]:
//!
//! - the receive loop reads frames, reassembles messages and writes them to
//!   the channel's inbound side, waiting while the application is behind
//! - the send loop reads [`SendMessage`]s from the outbound side, writes each
//!   as one frame and resolves its completion
//!
//! Whichever loop ends first triggers the coordinator so the other one
//! follows. A third task joins both, completes the inbound side with the
//! terminal fault (if any) and resolves [`Running`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};
use uuid::Uuid;

use crate::channel::{Channel, TransportConnection};
use crate::error::{Error, Result, SharedError};
use crate::protocol::{CloseStatus, FrameKind, SendMessage, SendOutcome};

use super::Running;
use super::Transport;
use super::endpoint::resolve_url;
use super::options::TransportOptions;
use super::reassembly::FragmentAccumulator;
use super::shutdown::ShutdownCoordinator;
use super::socket::{SocketState, WebSocketConnection};
use super::tungstenite_socket::TungsteniteSocket;

// ============================================================================
// Types
// ============================================================================

/// Result of one loop task.
type LoopResult = std::result::Result<(), SharedError>;

// ============================================================================
// WebSocketsTransport
// ============================================================================

/// Transport that carries channel messages over a WebSocket.
///
/// A transport is started once and stopped once; `stop` may be called any
/// number of times.
///
/// # Example
///
/// ```ignore
/// use ws_transport::{Transport, WebSocketsTransport, channel::duplex};
///
/// let transport = WebSocketsTransport::new();
/// let (transport_end, application_end) = duplex(16)?;
///
/// transport.start("http://localhost:5000/chat", transport_end).await?;
/// application_end.send("hello").await?.outcome().await;
/// let reply = application_end.receive().await;
///
/// transport.stop().await?;
/// ```
pub struct WebSocketsTransport<S = TungsteniteSocket> {
    /// Identifies this transport in logs.
    id: Uuid,
    /// Socket shared with the loops.
    socket: Arc<S>,
    /// Shared signal and close handshake.
    shutdown: ShutdownCoordinator<S>,
    options: TransportOptions,
    /// Set by the first `start`.
    started: AtomicBool,
    /// Aggregate completion of both loops.
    running: Mutex<Running>,
}

// ============================================================================
// WebSocketsTransport - Constructors
// ============================================================================

impl WebSocketsTransport<TungsteniteSocket> {
    /// Creates a transport with default options.
    #[must_use]
    pub fn new() -> Self {
        let options = TransportOptions::default();
        let socket = TungsteniteSocket::new(options.headers.clone());
        Self::build(socket, options)
    }

    /// Creates a transport with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn with_options(options: TransportOptions) -> Result<Self> {
        options.validate()?;
        let socket = TungsteniteSocket::new(options.headers.clone());
        Ok(Self::build(socket, options))
    }
}

impl Default for WebSocketsTransport<TungsteniteSocket> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WebSocketConnection> WebSocketsTransport<S> {
    /// Creates a transport over a custom socket implementation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn with_socket(socket: S, options: TransportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(socket, options))
    }

    fn build(socket: S, options: TransportOptions) -> Self {
        let socket = Arc::new(socket);
        let shutdown = ShutdownCoordinator::new(Arc::clone(&socket), options.close_timeout());
        Self {
            id: Uuid::new_v4(),
            socket,
            shutdown,
            options,
            started: AtomicBool::new(false),
            running: Mutex::new(idle()),
        }
    }

    /// Returns the identifier used in this transport's log events.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the socket's current state.
    #[inline]
    #[must_use]
    pub fn socket_state(&self) -> SocketState {
        self.socket.state()
    }

    /// Returns the transport options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }
}

// ============================================================================
// Transport
// ============================================================================

#[async_trait]
impl<S: WebSocketConnection> Transport for WebSocketsTransport<S> {
    async fn start(&self, url: &str, application: TransportConnection) -> Result<()> {
        info!(transport_id = %self.id, "Starting transport");

        let url = resolve_url(url)?;

        if self.shutdown.is_triggered() {
            return Err(Error::invalid_state("transport has been stopped"));
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::invalid_state("transport already started"));
        }

        self.socket.connect(&url, self.shutdown.token()).await?;
        info!(transport_id = %self.id, %url, "WebSocket connected");

        let receive = tokio::spawn(
            Self::receive_loop(
                Arc::clone(&self.socket),
                application.output().clone(),
                self.shutdown.clone(),
                self.options.receive_buffer_size,
                self.options.max_message_size,
            )
            .instrument(info_span!("receive_loop", transport_id = %self.id)),
        );

        let send = tokio::spawn(
            Self::send_loop(
                Arc::clone(&self.socket),
                application.input().clone(),
                self.shutdown.clone(),
                self.options.message_type,
            )
            .instrument(info_span!("send_loop", transport_id = %self.id)),
        );

        let continuation = tokio::spawn(Self::complete_application(
            self.id,
            send,
            receive,
            application.output().clone(),
        ));

        *self.running.lock() = async move {
            match continuation.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Arc::new(Error::from(e))),
            }
        }
        .boxed()
        .shared();

        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        info!(transport_id = %self.id, "Transport is stopping");

        self.shutdown.request_close().await;
        self.shutdown.trigger();

        let running = self.running.lock().clone();
        if let Err(e) = running.await {
            // Already delivered to the application through the inbound side.
            debug!(transport_id = %self.id, error = %e, "Transport loops ended with a fault");
        }

        self.socket.release().await;

        info!(transport_id = %self.id, "Transport stopped");
        Ok(())
    }

    fn running(&self) -> Running {
        self.running.lock().clone()
    }
}

// ============================================================================
// WebSocketsTransport - Loops
// ============================================================================

impl<S: WebSocketConnection> WebSocketsTransport<S> {
    /// Joins both loops and hands the terminal fault to the application.
    async fn complete_application(
        id: Uuid,
        send: JoinHandle<LoopResult>,
        receive: JoinHandle<LoopResult>,
        output: Channel<Vec<u8>>,
    ) -> LoopResult {
        let (send, receive) = tokio::join!(send, receive);
        let outcome = flatten(send).and(flatten(receive));

        match &outcome {
            Ok(()) => info!(transport_id = %id, "Transport loops finished"),
            Err(e) => warn!(transport_id = %id, error = %e, "Transport loops finished with a fault"),
        }

        output.try_complete(outcome.as_ref().err().cloned());
        outcome
    }

    async fn receive_loop(
        socket: Arc<S>,
        output: Channel<Vec<u8>>,
        shutdown: ShutdownCoordinator<S>,
        buffer_size: usize,
        max_message_size: Option<usize>,
    ) -> LoopResult {
        info!("Starting receive loop");

        let result = match Self::receive_messages(
            socket.as_ref(),
            &output,
            shutdown.token(),
            buffer_size,
            max_message_size,
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(Error::Canceled) => {
                debug!("Receive loop canceled");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Receive loop failed");
                Err(Arc::new(e))
            }
        };

        info!("Receive loop stopped");
        shutdown.trigger();
        result
    }

    async fn receive_messages(
        socket: &S,
        output: &Channel<Vec<u8>>,
        cancel: &CancellationToken,
        buffer_size: usize,
        max_message_size: Option<usize>,
    ) -> Result<()> {
        let mut buffer = vec![0u8; buffer_size];
        let mut accumulator = FragmentAccumulator::new(max_message_size);

        while !cancel.is_cancelled() {
            loop {
                let frame = socket.receive_frame(&mut buffer, cancel).await?;

                if frame.is_close() {
                    let status = frame.close_status.unwrap_or(CloseStatus::Empty);
                    info!(
                        %status,
                        description = frame.close_description.as_deref().unwrap_or_default(),
                        "WebSocket closed by the server"
                    );

                    let fault = (!status.is_normal()).then(|| Arc::new(Error::abnormal_close(status)));
                    output.try_complete(fault);
                    return Ok(());
                }

                trace!(
                    kind = %frame.kind,
                    size = frame.count,
                    end_of_message = frame.end_of_message,
                    "Message received"
                );

                accumulator.push(&buffer[..frame.count])?;
                if frame.end_of_message {
                    break;
                }
            }

            let fragments = accumulator.fragment_count();
            let mut message = accumulator.take();
            debug!(size = message.len(), fragments, "Passing message to application");

            loop {
                if !output.wait_to_write(cancel).await? {
                    debug!("Application no longer accepts messages");
                    return Ok(());
                }
                match output.try_write(message) {
                    Ok(()) => break,
                    Err(rejected) => message = rejected,
                }
            }
        }

        Ok(())
    }

    async fn send_loop(
        socket: Arc<S>,
        input: Channel<SendMessage>,
        shutdown: ShutdownCoordinator<S>,
        message_type: FrameKind,
    ) -> LoopResult {
        info!("Starting the send loop");

        let result = match Self::send_messages(socket.as_ref(), &input, &shutdown, message_type).await {
            Err(e) if e.is_canceled() => {
                debug!("Send loop canceled");
                Ok(())
            }
            other => other,
        };

        // Nothing reads the outbound side from here on.
        input.try_complete(None);
        let abandoned = input.drain();
        if !abandoned.is_empty() {
            debug!(count = abandoned.len(), "Canceling messages left in the outbound queue");
            for message in abandoned {
                message.resolve(SendOutcome::Canceled);
            }
        }

        info!("Send loop stopped");
        shutdown.trigger();
        result
    }

    async fn send_messages(
        socket: &S,
        input: &Channel<SendMessage>,
        shutdown: &ShutdownCoordinator<S>,
        message_type: FrameKind,
    ) -> LoopResult {
        let cancel = shutdown.token();

        while input.wait_to_read(cancel).await.map_err(Arc::new)? {
            while let Some(message) = input.try_read() {
                debug!(size = message.len(), "Received message from application");

                match socket
                    .send_frame(message.payload(), message_type, true, cancel)
                    .await
                {
                    Ok(()) => {
                        message.resolve(SendOutcome::Succeeded);
                    }
                    Err(Error::Canceled) => {
                        info!("Sending a message canceled");
                        message.resolve(SendOutcome::Canceled);
                        shutdown.request_close().await;
                        return Err(Arc::new(Error::Canceled));
                    }
                    Err(e) => {
                        error!(error = %e, "Error while sending a message");
                        let fault = Arc::new(e);
                        message.resolve(SendOutcome::Faulted(Arc::clone(&fault)));
                        shutdown.request_close().await;
                        return Err(fault);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Aggregate completion of a transport whose loops never ran.
fn idle() -> Running {
    future::ready(Ok(())).boxed().shared()
}

/// Collapses a loop's join result into its outcome.
fn flatten(joined: std::result::Result<LoopResult, tokio::task::JoinError>) -> LoopResult {
    joined.map_err(|e| Arc::new(Error::from(e)))?
}

// ============================================================================
// Tests
// ============================================================================
