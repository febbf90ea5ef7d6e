//! Load/mutate/commit session over a [`StateAccess`]
//!
//! A [`State`] loads lazily, hands out a mutable working copy and writes it
//! back only when the handler reports a difference from what was loaded.

use crate::access::StateAccess;
use crate::error::{StateError, StateResult};
use crate::handler::StateHandler;
use ocmsync_blob::Digest;
use std::fmt;

/// Whether a state may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Writes with pending changes fail
    ReadOnly,
    /// Writes are passed to the backend
    #[default]
    ReadWrite,
}

/// Result of a commit request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The backend received new bytes
    Updated,
    /// Nothing differed; the backend was not called
    NoOp,
}

impl CommitOutcome {
    /// Check if the backend was written
    #[inline]
    #[must_use]
    pub const fn is_updated(self) -> bool {
        matches!(self, Self::Updated)
    }
}

struct Original<O> {
    object: O,
    data: Vec<u8>,
}

struct Loaded<O> {
    original: Option<Original<O>>,
    current: O,
}

/// Session pairing a backend with an encode/decode strategy
///
/// # Invariants
/// - `original` is what the backend held at load or last successful write
/// - a failed write leaves `original` and `current` untouched
pub struct State<A, H: StateHandler> {
    mode: AccessMode,
    access: A,
    handler: H,
    loaded: Option<Loaded<H::Object>>,
}

impl<A: fmt::Debug, H: StateHandler + fmt::Debug> fmt::Debug for State<A, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("mode", &self.mode)
            .field("access", &self.access)
            .field("handler", &self.handler)
            .field("loaded", &self.loaded.is_some())
            .finish()
    }
}

fn load<A: StateAccess, H: StateHandler>(
    access: &A,
    handler: &H,
) -> StateResult<Loaded<H::Object>> {
    match access.get() {
        Ok(blob) => {
            let object = handler.decode(blob.data())?;
            tracing::debug!("Loaded state {}", blob.digest());
            Ok(Loaded {
                current: object.clone(),
                original: Some(Original {
                    object,
                    data: blob.data().to_vec(),
                }),
            })
        }
        Err(e) if e.is_not_found() => {
            tracing::debug!("No persisted state, starting from initial value");
            Ok(Loaded {
                original: None,
                current: handler.initial(),
            })
        }
        Err(e) => Err(e),
    }
}

fn ensure_loaded<'a, A: StateAccess, H: StateHandler>(
    slot: &'a mut Option<Loaded<H::Object>>,
    access: &A,
    handler: &H,
) -> StateResult<&'a mut Loaded<H::Object>> {
    let loaded = match slot.take() {
        Some(loaded) => loaded,
        None => load(access, handler)?,
    };
    Ok(slot.insert(loaded))
}

impl<A: StateAccess, H: StateHandler> State<A, H> {
    /// Create session; nothing is loaded until first access
    #[must_use]
    pub fn new(mode: AccessMode, access: A, handler: H) -> Self {
        Self {
            mode,
            access,
            handler,
            loaded: None,
        }
    }

    /// Access mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Underlying backend
    #[inline]
    #[must_use]
    pub fn access(&self) -> &A {
        &self.access
    }

    /// Encode/decode strategy
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Current value, loading it on first use
    ///
    /// # Errors
    /// Returns any backend or decode error other than not-found
    pub fn read(&mut self) -> StateResult<&H::Object> {
        let loaded = ensure_loaded(&mut self.loaded, &self.access, &self.handler)?;
        Ok(&loaded.current)
    }

    /// Mutable current value, loading it on first use
    ///
    /// # Errors
    /// Same as [`State::read`]
    pub fn get_mut(&mut self) -> StateResult<&mut H::Object> {
        let loaded = ensure_loaded(&mut self.loaded, &self.access, &self.handler)?;
        Ok(&mut loaded.current)
    }

    /// Value as last loaded or written, `None` if nothing is persisted
    #[must_use]
    pub fn original(&self) -> Option<&H::Object> {
        self.loaded
            .as_ref()
            .and_then(|l| l.original.as_ref())
            .map(|o| &o.object)
    }

    /// Bytes as last loaded or written
    #[must_use]
    pub fn original_blob(&self) -> Option<&[u8]> {
        self.loaded
            .as_ref()
            .and_then(|l| l.original.as_ref())
            .map(|o| o.data.as_slice())
    }

    /// Whether a write would reach the backend
    ///
    /// An unloaded state has no pending change. A loaded state with nothing
    /// persisted always has one.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        match &self.loaded {
            None => false,
            Some(Loaded { original: None, .. }) => true,
            Some(Loaded {
                original: Some(original),
                current,
            }) => !self.handler.equivalent(&original.object, current),
        }
    }

    /// Persist the current value if it differs from the original
    ///
    /// # Errors
    /// - [`StateError::ReadOnly`] if a change is pending in read-only mode
    /// - any encode or backend error; the cache is then left as it was
    pub fn write(&mut self) -> StateResult<CommitOutcome> {
        let loaded = ensure_loaded(&mut self.loaded, &self.access, &self.handler)?;
        let data = self.handler.encode(&mut loaded.current)?;

        if let Some(original) = &loaded.original {
            if self.handler.equivalent(&original.object, &loaded.current) {
                tracing::debug!("State unchanged, skipping write");
                return Ok(CommitOutcome::NoOp);
            }
        }
        if self.mode == AccessMode::ReadOnly {
            return Err(StateError::ReadOnly);
        }

        self.access.put(&data)?;
        tracing::debug!("Stored state ({} bytes)", data.len());
        loaded.original = Some(Original {
            object: loaded.current.clone(),
            data,
        });
        Ok(CommitOutcome::Updated)
    }

    /// Alias of [`State::write`]
    ///
    /// # Errors
    /// Same as [`State::write`]
    pub fn update(&mut self) -> StateResult<CommitOutcome> {
        self.write()
    }

    /// Drop cached values and reload from the backend
    ///
    /// Uncommitted changes are discarded.
    ///
    /// # Errors
    /// Same as [`State::read`]
    pub fn refresh(&mut self) -> StateResult<()> {
        self.loaded = None;
        ensure_loaded(&mut self.loaded, &self.access, &self.handler)?;
        Ok(())
    }

    /// Digest of the persisted state as reported by the backend
    #[must_use]
    pub fn digest(&self) -> Option<Digest> {
        self.access.digest()
    }

    /// Split into backend and handler
    #[must_use]
    pub fn into_parts(self) -> (A, H) {
        (self.access, self.handler)
    }
}
