//! [`MemoryStore`]: the in-memory store, kept in sorted maps so it serializes
//! deterministically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Result, SectionReader, SectionWriter, StateError, StateStore};

/// In-memory store. Sections and keys are kept sorted so serialized output
/// is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    sections: BTreeMap<String, Section>,
}

/// One named group of scalars and buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    name: String,
    scalars: BTreeMap<String, u64>,
    buffers: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}

impl Section {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scalars.len() + self.buffers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn missing(&self, key: &str) -> StateError {
        StateError::MissingKey {
            section: self.name.clone(),
            key: key.to_string(),
        }
    }
}

impl StateStore for MemoryStore {
    type Writer<'a> = &'a mut Section;
    type Reader<'a> = &'a Section;

    fn open_for_write(&mut self, section: &str) -> &mut Section {
        let entry = self.sections.entry(section.to_string()).or_default();
        *entry = Section {
            name: section.to_string(),
            ..Section::default()
        };
        entry
    }

    fn open_for_read(&self, section: &str) -> Result<&Section> {
        self.sections
            .get(section)
            .ok_or_else(|| StateError::MissingSection(section.to_string()))
    }
}

impl SectionWriter for &mut Section {
    fn set(&mut self, key: &str, value: u64) {
        self.scalars.insert(key.to_string(), value);
    }

    fn set_buffer(&mut self, key: &str, data: &[u8]) {
        self.buffers.insert(key.to_string(), data.to_vec());
    }
}

impl SectionReader for &Section {
    fn get(&self, key: &str) -> Result<u64> {
        self.scalars
            .get(key)
            .copied()
            .ok_or_else(|| self.missing(key))
    }

    fn get_buffer(&self, key: &str, out: &mut [u8]) -> Result<()> {
        let stored = self.buffers.get(key).ok_or_else(|| self.missing(key))?;
        if stored.len() != out.len() {
            return Err(StateError::BufferLength {
                key: key.to_string(),
                expected: out.len(),
                found: stored.len(),
            });
        }
        out.copy_from_slice(stored);
        Ok(())
    }
}
