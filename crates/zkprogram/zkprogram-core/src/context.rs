//! Reentrant stack-based context channels
//!
//! A [`ContextStack`] holds one "current" payload for a single concern (snark
//! mode, proof declarations, constraint logging, ...). Frames are pushed with
//! [`ContextStack::enter`] and popped with [`ContextStack::leave`]; popping any
//! frame other than the most recent one is a [`ContextError::ContextConflict`].
//! That check is what surfaces operations which were started but never awaited:
//! their frames interleave with the frames of the next operation.
//!
//! Process-wide channels are declared with `thread_local!` and accessed through
//! a [`Channel`] handle, which also provides the async scoped helper. Executors
//! must not resume a suspended compile or prove on a different thread.
//!
//! A scoped frame whose owner is dropped while newer frames sit above it (an
//! abandoned future, for instance) is removed from the middle of the stack and
//! recorded as abandoned. The next `leave` on that channel reports the
//! abandonment as a [`ContextError::ContextConflict`].

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::thread::LocalKey;

use crate::errors::{CallSite, ContextError};

/// Token returned by `enter`, required by `leave`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextId {
    id: u64,
    site: CallSite,
}

impl ContextId {
    /// Where the frame was entered
    pub fn site(&self) -> CallSite {
        self.site
    }
}

#[derive(Debug)]
struct Frame<T> {
    payload: T,
    id: ContextId,
}

/// A stack of payload frames with strict enter/leave discipline
#[derive(Debug)]
pub struct ContextStack<T> {
    name: &'static str,
    allows_nesting: bool,
    default: Option<T>,
    frames: RefCell<Vec<Frame<T>>>,
    next_id: Cell<u64>,
    abandoned: Cell<Option<CallSite>>,
}

impl<T: Clone> ContextStack<T> {
    /// Create a channel that allows nesting and has no default payload
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            allows_nesting: true,
            default: None,
            frames: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            abandoned: Cell::new(None),
        }
    }

    /// Create a channel whose `get` falls back to `default` when no frame is active
    pub fn with_default(name: &'static str, default: T) -> Self {
        Self {
            default: Some(default),
            ..Self::new(name)
        }
    }

    /// Forbid entering while another frame is active
    pub fn non_nesting(mut self) -> Self {
        self.allows_nesting = false;
        self
    }

    /// Channel name used in diagnostics
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of active frames
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether at least one frame is active
    pub fn has(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    /// Push a frame and return its token
    #[track_caller]
    pub fn enter(&self, payload: T) -> Result<ContextId, ContextError> {
        self.enter_at(payload, CallSite::caller())
    }

    fn enter_at(&self, payload: T, site: CallSite) -> Result<ContextId, ContextError> {
        let mut frames = self.frames.borrow_mut();
        if !self.allows_nesting {
            if let Some(top) = frames.last() {
                tracing::debug!(channel = self.name, "refusing nested enter");
                return Err(ContextError::ContextConflict {
                    channel: self.name,
                    reason: "cannot enter a nested frame on a channel that does not allow nesting",
                    entered_at: site,
                    top_at: top.id.site,
                });
            }
        }
        let id = ContextId {
            id: self.next_id.get(),
            site,
        };
        self.next_id.set(id.id + 1);
        frames.push(Frame { payload, id });
        Ok(id)
    }

    /// Pop the frame identified by `id`, which must be the top frame
    pub fn leave(&self, id: ContextId) -> Result<T, ContextError> {
        let mut frames = self.frames.borrow_mut();
        let top_at = match frames.last() {
            None => {
                return Err(ContextError::ContextConflict {
                    channel: self.name,
                    reason: "leave called but no frame is active",
                    entered_at: id.site,
                    top_at: CallSite::unknown(),
                })
            }
            Some(top) if top.id == id => None,
            Some(top) => Some(top.id.site),
        };
        if let Some(top_at) = top_at {
            tracing::debug!(channel = self.name, %top_at, entered_at = %id.site, "leave out of order");
            return Err(ContextError::ContextConflict {
                channel: self.name,
                reason: "the frame being left is not the most recently entered one",
                entered_at: id.site,
                top_at,
            });
        }
        let payload = frames
            .pop()
            .map(|frame| frame.payload)
            .ok_or(ContextError::EmptyContext { channel: self.name })?;
        if let Some(abandoned_at) = self.abandoned.take() {
            tracing::debug!(channel = self.name, %abandoned_at, "frame abandoned below this one");
            return Err(ContextError::ContextConflict {
                channel: self.name,
                reason: "a frame entered before this one was abandoned while this one was active",
                entered_at: abandoned_at,
                top_at: id.site,
            });
        }
        Ok(payload)
    }

    /// Drop the frame identified by `id` wherever it is. Removing a frame
    /// that is not on top marks the channel so the next `leave` fails.
    fn release(&self, id: ContextId) {
        let mut frames = self.frames.borrow_mut();
        let Some(position) = frames.iter().rposition(|frame| frame.id == id) else {
            return;
        };
        if position + 1 == frames.len() {
            frames.pop();
            return;
        }
        tracing::warn!(
            channel = self.name,
            entered_at = %id.site,
            above = frames.len() - position - 1,
            "context frame abandoned below active frames"
        );
        frames.remove(position);
        if self.abandoned.get().is_none() {
            self.abandoned.set(Some(id.site));
        }
    }

    /// Payload of the top frame, or the default payload
    pub fn get(&self) -> Result<T, ContextError> {
        match self.frames.borrow().last() {
            Some(frame) => Ok(frame.payload.clone()),
            None => self
                .default
                .clone()
                .ok_or(ContextError::EmptyContext { channel: self.name }),
        }
    }

    /// Mutate the top frame in place
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ContextError> {
        let mut frames = self.frames.borrow_mut();
        match frames.last_mut() {
            Some(frame) => Ok(f(&mut frame.payload)),
            None => Err(ContextError::EmptyContext { channel: self.name }),
        }
    }

    /// Run `f` inside a fresh frame, leaving it on every exit path.
    /// Returns the result of `f` together with the frame's final payload.
    #[track_caller]
    pub fn run_with<R>(&self, payload: T, f: impl FnOnce() -> R) -> Result<(R, T), ContextError> {
        let id = self.enter(payload)?;
        let mut guard = StackGuard {
            stack: self,
            id: Some(id),
        };
        let result = f();
        let payload = guard.finish()?;
        Ok((result, payload))
    }
}

struct StackGuard<'a, T: Clone> {
    stack: &'a ContextStack<T>,
    id: Option<ContextId>,
}

impl<T: Clone> StackGuard<'_, T> {
    fn finish(&mut self) -> Result<T, ContextError> {
        match self.id.take() {
            Some(id) => self.stack.leave(id),
            None => Err(ContextError::EmptyContext {
                channel: self.stack.name,
            }),
        }
    }
}

impl<T: Clone> Drop for StackGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            tracing::warn!(channel = self.stack.name, "releasing context frame during unwind");
            self.stack.release(id);
        }
    }
}

/// Handle to a thread-local [`ContextStack`]
pub struct Channel<T: 'static>(&'static LocalKey<ContextStack<T>>);

impl<T: 'static> Clone for Channel<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> Copy for Channel<T> {}

impl<T: Clone + 'static> Channel<T> {
    pub const fn new(key: &'static LocalKey<ContextStack<T>>) -> Self {
        Self(key)
    }

    #[track_caller]
    pub fn enter(self, payload: T) -> Result<ContextId, ContextError> {
        let site = CallSite::caller();
        self.0.with(|stack| stack.enter_at(payload, site))
    }

    pub fn leave(self, id: ContextId) -> Result<T, ContextError> {
        self.0.with(|stack| stack.leave(id))
    }

    pub fn get(self) -> Result<T, ContextError> {
        self.0.with(|stack| stack.get())
    }

    pub fn has(self) -> bool {
        self.0.with(|stack| stack.has())
    }

    pub fn depth(self) -> usize {
        self.0.with(|stack| stack.depth())
    }

    pub fn update<R>(self, f: impl FnOnce(&mut T) -> R) -> Result<R, ContextError> {
        self.0.with(|stack| stack.update(f))
    }

    #[track_caller]
    pub fn run_with<R>(self, payload: T, f: impl FnOnce() -> R) -> Result<(R, T), ContextError> {
        let id = self.enter(payload)?;
        let mut guard = ChannelGuard {
            channel: self,
            id: Some(id),
        };
        let result = f();
        let payload = guard.finish()?;
        Ok((result, payload))
    }

    /// Async variant of [`Channel::run_with`]. The frame stays pushed across
    /// every suspension point of `f` and is released even if the future is
    /// dropped before completion.
    #[track_caller]
    pub fn run_with_async<R, Fut>(
        self,
        payload: T,
        f: impl FnOnce() -> Fut,
    ) -> impl Future<Output = Result<(R, T), ContextError>>
    where
        Fut: Future<Output = R>,
    {
        // the frame is pushed eagerly; the guard travels with the future so
        // dropping it unpolled still releases the frame
        let guard = self.enter(payload).map(|id| ChannelGuard {
            channel: self,
            id: Some(id),
        });
        async move {
            let mut guard = guard?;
            let result = f().await;
            let payload = guard.finish()?;
            Ok((result, payload))
        }
    }
}

struct ChannelGuard<T: Clone + 'static> {
    channel: Channel<T>,
    id: Option<ContextId>,
}

impl<T: Clone + 'static> ChannelGuard<T> {
    fn finish(&mut self) -> Result<T, ContextError> {
        match self.id.take() {
            Some(id) => self.channel.leave(id),
            None => Err(ContextError::EmptyContext {
                channel: self.channel.0.with(|stack| stack.name),
            }),
        }
    }
}

impl<T: Clone + 'static> Drop for ChannelGuard<T> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            tracing::warn!("releasing context frame during unwind");
            self.channel.0.with(|stack| stack.release(id));
        }
    }
}
