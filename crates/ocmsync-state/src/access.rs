//! Storage seam for serialized state

use crate::error::StateResult;
use ocmsync_blob::{Blob, Digest};

/// Backend holding the bytes of one persisted object
///
/// # Contract
/// - `get` returns [`StateError::NotFound`](crate::StateError::NotFound) when
///   nothing has been stored yet, and a distinct error for anything else
/// - `put` followed by `get` returns bytes that decode to the same object
#[cfg_attr(test, mockall::automock)]
pub trait StateAccess {
    /// Fetch the current serialized state
    ///
    /// # Errors
    /// See the trait contract
    fn get(&self) -> StateResult<Blob>;

    /// Store new serialized state
    ///
    /// # Errors
    /// Returns error if the backend rejects the write
    fn put(&mut self, data: &[u8]) -> StateResult<()>;

    /// Digest identifying the stored state, if it can be determined
    fn digest(&self) -> Option<Digest>;
}

impl<A: StateAccess + ?Sized> StateAccess for &mut A {
    fn get(&self) -> StateResult<Blob> {
        (**self).get()
    }

    fn put(&mut self, data: &[u8]) -> StateResult<()> {
        (**self).put(data)
    }

    fn digest(&self) -> Option<Digest> {
        (**self).digest()
    }
}

impl<A: StateAccess + ?Sized> StateAccess for Box<A> {
    fn get(&self) -> StateResult<Blob> {
        (**self).get()
    }

    fn put(&mut self, data: &[u8]) -> StateResult<()> {
        (**self).put(data)
    }

    fn digest(&self) -> Option<Digest> {
        (**self).digest()
    }
}
