//! Contact list builder
//!
//! Turns sampled visibility into directed contact windows. For each
//! (satellite, peer) series the first sample is treated as not visible; a
//! rising edge between samples `i` and `i+1` opens a window at `t[i+1]` and
//! a falling edge closes it at `t[i]`. Windows still open at the last
//! sample are dropped, as are windows that close where they opened.
//!
//! Links to stations and targets are emitted twice, once per direction.

use crate::tracks::Tracks;
use crate::{PlanError, Result};
use mission_model::ModelError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A directed visibility window. `access` is the row position in the
/// contact list it was generated into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub access: usize,
    pub from: String,
    pub to: String,
    pub start: i64,
    pub end: i64,
    pub duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactList {
    contacts: Vec<Contact>,
}

impl ContactList {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// Scan every (satellite, peer) series for contact windows
    pub fn from_tracks(tracks: &Tracks) -> Self {
        let times = tracks.times();
        let peers = tracks.peers();
        let fixed = tracks.fixed_peers();
        let mut open: Vec<Option<i64>> = vec![None; tracks.nodes().len() * peers.len()];
        let mut contacts: Vec<Contact> = Vec::new();

        for i in 0..times.len().saturating_sub(1) {
            for (s, node) in tracks.nodes().iter().enumerate() {
                let current = tracks.sample(s, i);
                let next = tracks.sample(s, i + 1);

                for (p, peer) in peers.iter().enumerate() {
                    if peer == node {
                        continue;
                    }
                    let was_visible = i > 0 && current.visibility[p];
                    let is_visible = next.visibility[p];
                    if was_visible == is_visible {
                        continue;
                    }

                    let slot = &mut open[s * peers.len() + p];
                    if is_visible {
                        *slot = Some(times[i + 1]);
                        continue;
                    }
                    let Some(start) = slot.take() else {
                        continue;
                    };
                    let end = times[i];
                    if end <= start {
                        continue;
                    }

                    push(&mut contacts, node, peer, start, end);
                    if fixed.contains(peer.as_str()) {
                        push(&mut contacts, peer, node, start, end);
                    }
                }
            }
        }

        let dropped = open.iter().filter(|o| o.is_some()).count();
        if dropped > 0 {
            debug!("Dropped {} windows still open at the horizon", dropped);
        }
        info!("Built {} contacts from {} track rows", contacts.len(), tracks.samples().len());

        Self { contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn by_access(&self, access: usize) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.access == access)
    }

    /// Contacts ordered by start time. Equal starts keep list order.
    pub fn sorted_by_start(&self) -> Vec<Contact> {
        let mut sorted = self.contacts.clone();
        sorted.sort_by_key(|c| c.start);
        sorted
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        write_contacts(path.as_ref(), &self.contacts)?;
        info!("Wrote {} contacts to {:?}", self.contacts.len(), path.as_ref());
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading contact list from {:?}", path);

        let mut reader = csv::Reader::from_path(path)?;
        let mut contacts = Vec::new();
        for record in reader.deserialize() {
            let contact: Contact = record?;
            if contact.end <= contact.start || contact.duration != contact.end - contact.start {
                return Err(PlanError::Input(ModelError::InvalidField {
                    field: format!("contact {}", contact.access),
                    reason: format!(
                        "window {}..{} with duration {}",
                        contact.start, contact.end, contact.duration
                    ),
                }));
            }
            contacts.push(contact);
        }

        info!("Loaded {} contacts", contacts.len());
        Ok(Self { contacts })
    }
}

fn push(contacts: &mut Vec<Contact>, from: &str, to: &str, start: i64, end: i64) {
    contacts.push(Contact {
        access: contacts.len(),
        from: from.to_string(),
        to: to.to_string(),
        start,
        end,
        duration: end - start,
    });
}

/// Write contacts with the contact list columns
pub(crate) fn write_contacts(path: &Path, contacts: &[Contact]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if contacts.is_empty() {
        writer.write_record(["access", "from", "to", "start", "end", "duration"])?;
    }
    for contact in contacts {
        writer.serialize(contact)?;
    }
    writer.flush()?;
    Ok(())
}
