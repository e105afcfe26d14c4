//! The extension point consumed from external protocol client libraries
//! (spec §6): "a factory `new(protocol, addr) -> client` and the ability to
//! invoke `client.<method>(arg, ...)` by name."

use crate::argument::UnpackedValue;

/// Raised by a client when a call fails at the protocol layer, as opposed to
/// the name simply not being resolvable (that case is [`CallError::
/// FnNotFound`], decided by [`Call::execute`](crate::call::Call::execute)
/// before `invoke` is ever called).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ClientCallError(#[from] pub anyhow::Error);

/// Dynamic dispatch on call name is the essence of the corpus model: a
/// per-protocol table `name -> (args -> result)`, registered once at
/// connection time. No reflection is required in a statically typed
/// language; each protocol crate implements this trait over its own
/// connection type and a `match` (or lookup table) on `name`.
pub trait Client {
    /// Invokes the named operation with the unpacked arguments, in order.
    /// Returns `Ok(None)` (no such method) so [`Call::execute`] can produce
    /// `FnNotFound` without the client needing to know about that error
    /// type; returns `Ok(Some(Err(_)))` is not used — a resolved call that
    /// fails at the protocol layer returns `Err` directly.
    fn invoke(&mut self, name: &str, args: Vec<UnpackedValue>) -> Option<Result<(), ClientCallError>>;
}
