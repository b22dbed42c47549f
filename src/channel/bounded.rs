//! Bounded FIFO channel with readiness waits and one-shot completion.
//!
//! Both the transport and the application hold clones of the same
//! [`Channel`]. Producers wait for room with [`Channel::wait_to_write`] and
//! push with [`Channel::try_write`]; consumers wait for items with
//! [`Channel::wait_to_read`] and pop with [`Channel::try_read`]. Completing
//! the channel stops further writes while letting readers drain what is
//! already queued.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, SharedError};

// ============================================================================
// Types
// ============================================================================

/// Queue contents plus completion flag.
struct State<T> {
    queue: VecDeque<T>,
    completed: bool,
    error: Option<SharedError>,
}

/// State shared by all clones of a channel.
struct Inner<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    /// Woken when an item is queued or the channel completes.
    readable: Notify,
    /// Woken when an item is dequeued or the channel completes.
    writable: Notify,
}

// ============================================================================
// Channel
// ============================================================================

/// Bounded multi-producer multi-consumer queue.
///
/// Cloning yields another handle to the same queue.
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.inner.capacity)
            .field("len", &state.queue.len())
            .field("completed", &state.completed)
            .finish()
    }
}

// ============================================================================
// Channel - Constructor
// ============================================================================

impl<T> Channel<T> {
    /// Creates a channel holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("channel capacity must be non-zero"));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::with_capacity(capacity),
                    completed: false,
                    error: None,
                }),
                capacity,
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        })
    }
}

// ============================================================================
// Channel - Inspection
// ============================================================================

impl<T> Channel<T> {
    /// Returns the maximum number of queued items.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the number of queued items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().queue.is_empty()
    }

    /// Returns `true` once the channel has been completed.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().completed
    }

    /// Returns how the channel was completed, or `None` if it is still open.
    #[must_use]
    pub fn completion(&self) -> Option<std::result::Result<(), SharedError>> {
        let state = self.inner.state.lock();
        if !state.completed {
            return None;
        }
        Some(match &state.error {
            Some(err) => Err(Arc::clone(err)),
            None => Ok(()),
        })
    }
}

// ============================================================================
// Channel - Reading
// ============================================================================

impl<T> Channel<T> {
    /// Waits until an item is available.
    ///
    /// Returns `Ok(false)` once the channel is completed and drained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if `cancel` fires first.
    pub async fn wait_to_read(&self, cancel: &CancellationToken) -> Result<bool> {
        self.wait_readable(Some(cancel)).await
    }

    /// Dequeues the oldest item, if any.
    pub fn try_read(&self) -> Option<T> {
        let item = self.inner.state.lock().queue.pop_front();
        if item.is_some() {
            self.inner.writable.notify_waiters();
        }
        item
    }

    /// Reads the next item, waiting for one if necessary.
    ///
    /// Returns `Ok(None)` when the channel completed cleanly and is drained.
    ///
    /// # Errors
    ///
    /// Returns the completion error once the queue is drained.
    pub async fn read(&self) -> std::result::Result<Option<T>, SharedError> {
        loop {
            if let Some(item) = self.try_read() {
                return Ok(Some(item));
            }

            match self.wait_readable(None).await {
                Ok(true) => continue,
                Ok(false) | Err(_) => {
                    return match self.completion() {
                        Some(Err(err)) => Err(err),
                        _ => Ok(None),
                    };
                }
            }
        }
    }

    /// Removes and returns every queued item.
    pub fn drain(&self) -> Vec<T> {
        let items: Vec<T> = self.inner.state.lock().queue.drain(..).collect();
        if !items.is_empty() {
            self.inner.writable.notify_waiters();
        }
        items
    }

    async fn wait_readable(&self, cancel: Option<&CancellationToken>) -> Result<bool> {
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Canceled);
            }

            let notified = self.inner.readable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock();
                if !state.queue.is_empty() {
                    return Ok(true);
                }
                if state.completed {
                    return Ok(false);
                }
            }

            match cancel {
                Some(cancel) => tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Canceled),
                    () = &mut notified => {}
                },
                None => notified.await,
            }
        }
    }
}

// ============================================================================
// Channel - Writing
// ============================================================================

impl<T> Channel<T> {
    /// Waits until there is room for an item.
    ///
    /// Returns `Ok(false)` once the channel is completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if `cancel` fires first.
    pub async fn wait_to_write(&self, cancel: &CancellationToken) -> Result<bool> {
        self.wait_writable(Some(cancel)).await
    }

    /// Queues an item if there is room.
    ///
    /// # Errors
    ///
    /// Hands the item back when the channel is full or completed.
    pub fn try_write(&self, item: T) -> std::result::Result<(), T> {
        {
            let mut state = self.inner.state.lock();
            if state.completed || state.queue.len() >= self.inner.capacity {
                return Err(item);
            }
            state.queue.push_back(item);
        }
        self.inner.readable.notify_waiters();
        Ok(())
    }

    /// Queues an item, waiting for room if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the channel completes first.
    pub async fn write(&self, mut item: T) -> Result<()> {
        loop {
            if !self.wait_writable(None).await? {
                return Err(Error::ChannelClosed);
            }
            match self.try_write(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }
        }
    }

    /// Marks the channel complete, optionally with a fault.
    ///
    /// Only the first call has an effect; later calls return `false`.
    pub fn try_complete(&self, error: Option<SharedError>) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.completed {
                return false;
            }
            state.completed = true;
            state.error = error;
        }
        self.inner.readable.notify_waiters();
        self.inner.writable.notify_waiters();
        true
    }

    async fn wait_writable(&self, cancel: Option<&CancellationToken>) -> Result<bool> {
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Canceled);
            }

            let notified = self.inner.writable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.lock();
                if state.completed {
                    return Ok(false);
                }
                if state.queue.len() < self.inner.capacity {
                    return Ok(true);
                }
            }

            match cancel {
                Some(cancel) => tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Canceled),
                    () = &mut notified => {}
                },
                None => notified.await,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
