/*!
Request-scoped contexts.

A `Context` is an immutable chain of bindings. Deriving a context with a value
or a cancellation signal gives a child that points back at its parent, the way
`Logger` prefixes point back at their parents, so contexts are cheap to clone
and safe to hand to other threads.
*/

use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{self, Poll};
use std::thread;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use futures::task::AtomicWaker;

use crate::error::ContextError;
use crate::logger::Logger;

/**
A key for values carried by a `Context`.

Values are looked up by the type of their key, so a key type that's private to
a module can't be read or overwritten by code outside of it.
*/
pub trait Key: 'static {
    type Value: Send + Sync + 'static;
}

/**
A request-scoped context.

Contexts carry typed values, an optional deadline, and can be cancelled.
They're derived from a parent and never change once they've been created.
*/
#[derive(Clone)]
pub struct Context {
    inner: Arc<Node>,
}

struct Node {
    parent: Option<Context>,
    kind: Kind,
}

enum Kind {
    Background,
    Value {
        key: TypeId,
        value: Box<dyn Any + Send + Sync>,
    },
    Cancel {
        state: Arc<CancelState>,
        deadline: Option<Instant>,
    },
}

struct CancelState {
    cancelled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<()>>>,
    signal: Shared<oneshot::Receiver<()>>,
}

/**
Cancels the context it was created with, along with everything derived from it.

Dropping the handle doesn't cancel the context.
*/
#[derive(Clone)]
#[must_use = "a context can only be cancelled through its handle"]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

/**
A future that completes when a context is cancelled or its deadline passes.

The first time the future is polled before its deadline it starts a thread
that sleeps until the deadline and then wakes the task.
*/
pub struct Done {
    // Keeps the senders alive so an unreachable context doesn't look cancelled
    _states: Vec<Arc<CancelState>>,
    signals: Vec<Shared<oneshot::Receiver<()>>>,
    deadline: Option<Instant>,
    timer: Option<Arc<AtomicWaker>>,
}

impl Context {
    /// An empty context that's never cancelled.
    pub fn background() -> Self {
        Context {
            inner: Arc::new(Node {
                parent: None,
                kind: Kind::Background,
            }),
        }
    }

    fn child(&self, kind: Kind) -> Self {
        Context {
            inner: Arc::new(Node {
                parent: Some(self.clone()),
                kind,
            }),
        }
    }

    fn ancestors(&self) -> impl Iterator<Item = &Node> {
        let mut next = Some(&*self.inner);

        std::iter::from_fn(move || {
            let node = next?;
            next = node.parent.as_ref().map(|parent| &*parent.inner);

            Some(node)
        })
    }

    /// Derive a context that carries `value` under the key `K`.
    pub fn with_value<K>(&self, value: K::Value) -> Self
    where
        K: Key,
    {
        self.child(Kind::Value {
            key: TypeId::of::<K>(),
            value: Box::new(value),
        })
    }

    /// The value bound to `K` closest to this context, if any.
    pub fn value<K>(&self) -> Option<&K::Value>
    where
        K: Key,
    {
        let key = TypeId::of::<K>();

        self.ancestors().find_map(|node| match node.kind {
            Kind::Value {
                key: node_key,
                ref value,
            } if node_key == key => value.downcast_ref::<K::Value>(),
            _ => None,
        })
    }

    /// Derive a context that's cancelled when the returned handle is.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        self.cancellable(None)
    }

    /**
    Derive a context that's done once `deadline` has passed.

    If this context already has an earlier deadline then that one still applies.
    */
    pub fn with_deadline(&self, deadline: Instant) -> (Self, CancelHandle) {
        self.cancellable(Some(deadline))
    }

    pub fn with_timeout(&self, timeout: Duration) -> (Self, CancelHandle) {
        self.with_deadline(Instant::now() + timeout)
    }

    fn cancellable(&self, deadline: Option<Instant>) -> (Self, CancelHandle) {
        let (sender, receiver) = oneshot::channel();

        let state = Arc::new(CancelState {
            cancelled: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            signal: receiver.shared(),
        });

        let ctxt = self.child(Kind::Cancel {
            state: state.clone(),
            deadline,
        });

        (ctxt, CancelHandle { state })
    }

    /// The earliest deadline of this context and its parents.
    pub fn deadline(&self) -> Option<Instant> {
        self.ancestors()
            .filter_map(|node| match node.kind {
                Kind::Cancel { deadline, .. } => deadline,
                _ => None,
            })
            .min()
    }

    /**
    Why this context is done, or `None` if it isn't.

    Cancellation of this context or any parent is reported as `Canceled`, an
    expired deadline as `DeadlineExceeded`. The closest reason wins.
    */
    pub fn err(&self) -> Option<ContextError> {
        let now = Instant::now();

        self.ancestors().find_map(|node| match node.kind {
            Kind::Cancel { ref state, .. } if state.cancelled.load(Ordering::Acquire) => {
                Some(ContextError::Canceled)
            }
            Kind::Cancel {
                deadline: Some(deadline),
                ..
            } if deadline <= now => Some(ContextError::DeadlineExceeded),
            _ => None,
        })
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /**
    A future that completes once this context is done.

    A context that can't be cancelled gives a future that never completes.
    */
    pub fn done(&self) -> Done {
        let states: Vec<Arc<CancelState>> = self
            .ancestors()
            .filter_map(|node| match node.kind {
                Kind::Cancel { ref state, .. } => Some(state.clone()),
                _ => None,
            })
            .collect();

        Done {
            signals: states.iter().map(|state| state.signal.clone()).collect(),
            _states: states,
            deadline: self.deadline(),
            timer: None,
        }
    }
}

impl Drop for Node {
    // Unlink uniquely owned parents in a loop so dropping a deep chain doesn't recurse
    fn drop(&mut self) {
        let mut next = self.parent.take();

        while let Some(parent) = next {
            match Arc::try_unwrap(parent.inner) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline())
            .field("err", &self.err())
            .finish()
    }
}

impl CancelHandle {
    /// Cancel the context. Cancelling more than once has no further effect.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        let sender = self
            .state
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(sender) = sender {
            // The receiver lives as long as the state, so this can't fail
            let _ = sender.send(());
        }

        trace!("context cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Future for Done {
    type Output = ContextError;

    fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context) -> Poll<Self::Output> {
        for signal in self.signals.iter_mut() {
            if signal.poll_unpin(cx).is_ready() {
                return Poll::Ready(ContextError::Canceled);
            }
        }

        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => return Poll::Pending,
        };

        if deadline <= Instant::now() {
            return Poll::Ready(ContextError::DeadlineExceeded);
        }

        if let Some(ref waker) = self.timer {
            waker.register(cx.waker());
            return Poll::Pending;
        }

        let waker = Arc::new(AtomicWaker::new());
        waker.register(cx.waker());

        let timer = waker.clone();
        thread::spawn(move || {
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
            timer.wake();
        });

        self.timer = Some(waker);
        Poll::Pending
    }
}

// The key loggers are attached to contexts under. It's private to this module
struct LoggerKey;

impl Key for LoggerKey {
    type Value = Logger;
}

impl Logger {
    /**
    Derive a context that carries this logger.

    Code called with the returned context can get the logger back with
    `Logger::from_context` without it being passed explicitly.
    */
    pub fn attach(&self, ctxt: &Context) -> Context {
        ctxt.with_value::<LoggerKey>(self.clone())
    }

    /**
    The logger attached to `ctxt`.

    If no logger has been attached then a new logger without a prefix is
    returned, so the result can always be logged to.
    */
    pub fn from_context(ctxt: &Context) -> Logger {
        ctxt.value::<LoggerKey>()
            .cloned()
            .unwrap_or_else(Logger::new)
    }
}
