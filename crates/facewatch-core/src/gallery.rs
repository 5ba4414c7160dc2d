//! In-memory gallery of known identities.
//!
//! Names are unique: inserting an existing name overwrites that entry in place.
//! All descriptors share one length. The store never persists itself; callers
//! save a [`Gallery::snapshot`] after every mutation.

use crate::types::{Descriptor, Identity};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GalleryError {
    #[error("identity not found: {0}")]
    NotFound(String),
    #[error("descriptor length {actual} does not match gallery dimension {expected}")]
    DescriptorLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<Identity>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Identity> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Insert or overwrite the identity called `name`.
    ///
    /// Returns the previous entry when one was replaced. An overwritten entry
    /// keeps its scan position.
    pub fn insert(
        &mut self,
        descriptor: Descriptor,
        name: &str,
    ) -> Result<Option<Identity>, GalleryError> {
        self.check_dimension(&descriptor, Some(name))?;

        let identity = Identity {
            name: name.to_string(),
            descriptor,
        };

        match self.position(name) {
            Some(idx) => Ok(Some(std::mem::replace(&mut self.entries[idx], identity))),
            None => {
                self.entries.push(identity);
                Ok(None)
            }
        }
    }

    /// Replace both name and descriptor of the entry currently called `old_name`.
    ///
    /// Any other entry already named `new_name` is dropped so names stay unique.
    pub fn rename(
        &mut self,
        old_name: &str,
        descriptor: Descriptor,
        new_name: &str,
    ) -> Result<&Identity, GalleryError> {
        let idx = self
            .position(old_name)
            .ok_or_else(|| GalleryError::NotFound(old_name.to_string()))?;
        self.check_dimension(&descriptor, Some(old_name))?;

        self.entries[idx] = Identity {
            name: new_name.to_string(),
            descriptor,
        };

        if old_name != new_name {
            if let Some(stale) = self
                .entries
                .iter()
                .enumerate()
                .position(|(i, e)| i != idx && e.name == new_name)
            {
                tracing::info!(name = new_name, "dropping older entry with the confirmed name");
                self.entries.remove(stale);
                let idx = if stale < idx { idx - 1 } else { idx };
                return Ok(&self.entries[idx]);
            }
        }

        Ok(&self.entries[idx])
    }

    /// Ordered copy of all identities, for persistence.
    pub fn snapshot(&self) -> Vec<Identity> {
        self.entries.clone()
    }

    /// Replace the gallery contents with `identities`.
    ///
    /// Entries that break the length invariant are skipped; duplicate names
    /// collapse onto the first position with the last descriptor.
    pub fn restore(&mut self, identities: Vec<Identity>) {
        self.entries.clear();
        for identity in identities {
            if let Err(e) = self.insert(identity.descriptor, &identity.name) {
                tracing::warn!(name = %identity.name, error = %e, "skipping gallery entry on restore");
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.entries.iter()
    }

    /// Descriptor length shared by all entries, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.descriptor.len())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// The entry named `replacing` is about to be overwritten and does not
    /// constrain the dimension.
    fn check_dimension(
        &self,
        descriptor: &Descriptor,
        replacing: Option<&str>,
    ) -> Result<(), GalleryError> {
        let other = self
            .entries
            .iter()
            .find(|e| Some(e.name.as_str()) != replacing);
        match other {
            Some(e) if e.descriptor.len() != descriptor.len() => Err(GalleryError::DescriptorLength {
                expected: e.descriptor.len(),
                actual: descriptor.len(),
            }),
            _ => Ok(()),
        }
    }
}
