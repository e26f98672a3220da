//! Declarative resource providers.
//!
//! A provider manages one kind of resource below a root directory. Every
//! operation takes a [`ProviderContext`] and a descriptor of the resource;
//! `plan` reports what `create`/`update` would change without touching the
//! filesystem, and `validate` checks a raw descriptor before any of that.

pub mod directory;

use std::path::PathBuf;

/// Where a provider's resources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    pub root: PathBuf,
}

impl ProviderContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}
