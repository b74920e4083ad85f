//! Save and load hooks for a text field index.
//!
//! A snapshot holds, for every tracked key, the terms it contributes with
//! their positions. That is enough to rebuild the posting lists, both tries
//! and the reverse-by-key index without the original text. Snapshots are
//! encoded with bincode using fixed-length integers.

use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

use ahash::AHashSet;
use bincode::{Decode, Encode};
use sift_common::{Result, error::Error, verify_data};

use crate::{
    field_index::{DeletionType, TextFieldIndex},
    key::{FieldId, Key, Position, Term, display_term},
};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"SFTX";

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FieldSnapshot {
    pub magic: [u8; 4],
    pub version: u32,
    /// Field number at the time of the save. Informational only.
    pub field: FieldId,
    pub records: Vec<RecordSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct RecordSnapshot {
    pub key: Vec<u8>,
    pub terms: Vec<TermSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TermSnapshot {
    pub term: Vec<u8>,
    pub positions: Vec<Position>,
}

fn binc_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

impl TextFieldIndex {
    /// Captures the indexed content of this field.
    pub fn snapshot(&self) -> Result<FieldSnapshot> {
        let mut records = Vec::new();
        for key in self.tracked_keys() {
            // A key removed since the listing is simply left out.
            let Some(terms) = self.snapshot_record(&key)? else {
                continue;
            };
            records.push(RecordSnapshot {
                key: key.as_bytes().to_vec(),
                terms: terms
                    .into_iter()
                    .map(|(term, positions)| TermSnapshot { term, positions })
                    .collect(),
            });
        }
        Ok(FieldSnapshot {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            field: self.field_number(),
            records,
        })
    }

    /// Writes a snapshot of this field to `writer`.
    pub fn save_index<W: Write>(&self, writer: &mut W) -> Result<()> {
        let snapshot = self.snapshot()?;
        let written = bincode::encode_into_std_write(&snapshot, writer, binc_config())?;
        log::info!(
            "saved text field {}: {} records, {written} bytes",
            self.field_number(),
            snapshot.records.len()
        );
        Ok(())
    }

    /// Rebuilds this field from a snapshot read from `reader`. Returns the
    /// number of restored records.
    ///
    /// # Errors
    ///
    /// * invalid operation if the field already tracks records,
    /// * invalid format if the snapshot is not a supported text field
    ///   snapshot or holds empty terms, duplicate terms or duplicate keys,
    /// * limit exceeded if a record breaks the field's term limits,
    /// * codec and IO errors from the reader.
    pub fn load_index<R: Read>(&self, reader: &mut R) -> Result<usize> {
        if self.record_count() != 0 {
            return Err(Error::invalid_operation(
                "load_index into a text field that already tracks records",
            ));
        }
        let snapshot: FieldSnapshot = bincode::decode_from_std_read(reader, binc_config())?;
        self.restore(snapshot)
    }

    /// Replays a decoded snapshot into this (empty) field.
    ///
    /// The whole snapshot is checked before the first record is restored, so
    /// a rejected snapshot leaves the field empty and a later load can retry.
    pub fn restore(&self, snapshot: FieldSnapshot) -> Result<usize> {
        verify_data!(magic, snapshot.magic == SNAPSHOT_MAGIC);
        verify_data!(version, snapshot.version == SNAPSHOT_VERSION);
        if snapshot.field != self.field_number() {
            log::info!(
                "restoring snapshot of text field {} into field {}",
                snapshot.field,
                self.field_number()
            );
        }
        let records = self.check_records(snapshot.records)?;
        let count = records.len();
        let mut restored: Vec<Key> = Vec::with_capacity(count);
        for (key, terms) in records {
            if let Err(e) = self.restore_record(&key, terms) {
                log::warn!(
                    "text field {}: restore failed at key {key}, rolling back {} records",
                    self.field_number(),
                    restored.len()
                );
                for key in &restored {
                    self.remove_record(key, DeletionType::None)?;
                }
                return Err(e);
            }
            restored.push(key);
        }
        log::info!("loaded text field {}: {count} records", self.field_number());
        Ok(count)
    }

    /// Validates snapshot records against the format and the configured
    /// limits, converting them into restorable term maps.
    fn check_records(
        &self,
        records: Vec<RecordSnapshot>,
    ) -> Result<Vec<(Key, BTreeMap<Term, Vec<Position>>)>> {
        let limits = &self.config().limits;
        let mut seen: AHashSet<Key> = AHashSet::with_capacity(records.len());
        let mut checked = Vec::with_capacity(records.len());
        for record in records {
            let key = Key::new(record.key);
            if !seen.insert(key.clone()) {
                return Err(Error::invalid_format(
                    "records",
                    format!("duplicate key {key} in snapshot"),
                ));
            }
            if record.terms.len() > limits.max_terms_per_record {
                return Err(Error::limit_exceeded(
                    format!("distinct terms of key {key}"),
                    record.terms.len(),
                    limits.max_terms_per_record,
                ));
            }
            let mut terms = BTreeMap::new();
            for TermSnapshot { term, positions } in record.terms {
                verify_data!(term, !term.is_empty());
                if term.len() > limits.max_term_length {
                    return Err(Error::limit_exceeded(
                        format!("length of term {:?}", display_term(&term)),
                        term.len(),
                        limits.max_term_length,
                    ));
                }
                if terms.insert(term, positions).is_some() {
                    return Err(Error::invalid_format(
                        "terms",
                        format!("duplicate term in record {key}"),
                    ));
                }
            }
            checked.push((key, terms));
        }
        Ok(checked)
    }
}
