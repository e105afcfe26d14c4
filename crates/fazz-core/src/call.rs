//! A named operation plus its argument list (spec §3, §4.2).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::argument::Argument;
use crate::client::Client;
use crate::error::FazzError;

/// `C = (name, args, is_last)`. `is_last` marks operations that force
/// session termination (e.g. `quit`); mutators must preserve the property
/// that a terminal call, if present, stays last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub name: String,
    pub args: Vec<Argument>,
    pub is_last: bool,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            args,
            is_last: false,
        }
    }

    pub fn terminal(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            args,
            is_last: true,
        }
    }

    /// Mutates every mutable argument of this call. No-op if none are
    /// mutable (the `arg` mutator's precondition, spec §4.4).
    pub fn mutate_args(&mut self, rng: &mut impl Rng) {
        for arg in &mut self.args {
            arg.mutate(rng);
        }
    }

    pub fn has_mutable_args(&self) -> bool {
        self.args.iter().any(|arg| arg.mutable)
    }

    /// Resolves `name` against `client` and invokes it with the unpacked
    /// arguments, in order. `FnNotFound` and `FnExecFailed` are recoverable
    /// at the [`Seed`](crate::seed::Seed) level (spec §4.2, §7).
    pub fn execute(&self, client: &mut dyn Client) -> Result<(), FazzError> {
        let mut unpacked = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let value = arg
                .unpack()
                .map_err(|source| match &arg.kind {
                    crate::argument::ArgumentKind::FilePath(path) => {
                        FazzError::ArgumentUnpackIo(path.clone(), source)
                    }
                    _ => FazzError::ArgumentUnpackIo(Default::default(), source),
                })?;
            unpacked.push(value);
        }
        match client.invoke(&self.name, unpacked) {
            None => Err(FazzError::FnNotFound(self.name.clone())),
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => Err(FazzError::FnExecFailed {
                name: self.name.clone(),
                source: err.0,
            }),
        }
    }
}
