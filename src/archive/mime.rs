//! MIME type registry.
use anyhow::Result;
use std::collections::HashMap;

/// Bidirectional mapping between MIME type names and dense 16-bit ids.
///
/// Ids are assigned in first-seen order while articles are collected; the
/// on-disk list is re-sorted during finalization and every stored id is
/// mapped through the induced permutation.
#[derive(Debug, Default)]
pub struct MimeTypeRegistry {
    ids: HashMap<String, u16>,
    names: Vec<String>,
}

impl MimeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, assigning the next free id on first sight.
    pub fn intern(&mut self, name: &str) -> Result<u16> {
        if let Some(&id) = self.ids.get(name) {
            return Ok(id);
        }
        if self.names.len() >= u16::MAX as usize {
            anyhow::bail!("too many distinct mime types");
        }
        let id = self.names.len() as u16;
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    /// Returns the name registered for `id`.
    pub fn name(&self, id: u16) -> Result<&str> {
        self.names
            .get(id as usize)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow::anyhow!("mime type index {} not found", id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates names in id order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Returns the lexicographically sorted name list and the permutation
    /// mapping each current id to its position in that list.
    pub fn sorted(&self) -> (Vec<String>, Vec<u16>) {
        let mut sorted = self.names.clone();
        sorted.sort();
        let mapping = self
            .names
            .iter()
            .map(|name| {
                sorted
                    .iter()
                    .position(|s| s == name)
                    .expect("name missing from its own sorted copy") as u16
            })
            .collect();
        (sorted, mapping)
    }
}
