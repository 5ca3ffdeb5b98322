//! Optimistic mutation protocol.
//!
//! A store operation takes a snapshot under the lock, applies its change
//! locally and records an [`Undo`]. When the network call resolves, the
//! [`Ticket`] decides whether the response is still current; a current
//! success commits the canonical record, a current failure reverts the
//! change, and a stale response of either kind is dropped.

use std::collections::HashMap;

use papertrail_core::{Note, NoteId};

/// Identity of one in-flight mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub op: &'static str,
    pub id: NoteId,
    pub seq: u64,
    pub epoch: u64,
}

/// How to take an optimistic change back.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Undo {
    /// Drop a placeholder inserted by a create.
    Remove(NoteId),
    /// Put back the pre-update copy of a note, in place.
    Restore(Note),
    /// Re-insert a deleted note at its former index (clamped).
    Reinsert { index: usize, note: Note },
    /// Nothing was changed locally.
    Nothing,
}

impl Undo {
    /// Revert against the current collection. Returns true if it changed.
    pub(crate) fn revert(self, notes: &mut Vec<Note>) -> bool {
        match self {
            Undo::Remove(id) => match position(notes, id) {
                Some(idx) => {
                    notes.remove(idx);
                    true
                }
                None => false,
            },
            // A note deleted meanwhile stays deleted.
            Undo::Restore(before) => match position(notes, before.id) {
                Some(idx) => {
                    notes[idx] = before;
                    true
                }
                None => false,
            },
            Undo::Reinsert { index, note } => {
                if position(notes, note.id).is_some() {
                    return false;
                }
                let index = index.min(notes.len());
                notes.insert(index, note);
                true
            }
            Undo::Nothing => false,
        }
    }
}

/// Per-note sequence numbers. Only the latest mutation issued for a note
/// may commit or revert.
///
/// While any mutation of a note is outstanding the entry also keeps the
/// note's base: its last server-confirmed state. A failure of the latest
/// mutation reverts to the base, so optimistic changes of older mutations
/// that never reached the server are taken back with it.
#[derive(Debug, Default)]
pub(crate) struct Sequencer {
    next: u64,
    pending: HashMap<NoteId, Pending>,
}

#[derive(Debug)]
struct Pending {
    latest: u64,
    outstanding: usize,
    base: Option<Note>,
    /// The latest mutation failed and the collection shows the base.
    reverted: bool,
}

impl Sequencer {
    /// Issue a sequence number for a mutation of `id`. `current` is the
    /// note as the collection shows it; it becomes the base unless another
    /// mutation is already outstanding.
    pub(crate) fn issue(&mut self, id: NoteId, current: Option<&Note>) -> u64 {
        self.next += 1;
        let seq = self.next;
        let entry = self.pending.entry(id).or_insert_with(|| Pending {
            latest: seq,
            outstanding: 0,
            base: current.cloned(),
            reverted: false,
        });
        entry.latest = seq;
        entry.outstanding += 1;
        entry.reverted = false;
        seq
    }

    pub(crate) fn is_latest(&self, id: NoteId, seq: u64) -> bool {
        self.pending.get(&id).map(|p| p.latest) == Some(seq)
    }

    /// Record a server-confirmed state of `id`. Returns true if the
    /// collection currently shows the base and should follow.
    pub(crate) fn confirm(&mut self, id: NoteId, canonical: &Note) -> bool {
        match self.pending.get_mut(&id) {
            Some(entry) => {
                entry.base = Some(canonical.clone());
                entry.reverted
            }
            None => false,
        }
    }

    /// Point `undo` at the note's base and mark the note as reverted.
    pub(crate) fn revert_to_base(&mut self, id: NoteId, undo: Undo) -> Undo {
        let Some(entry) = self.pending.get_mut(&id) else {
            return undo;
        };
        entry.reverted = true;
        match (undo, entry.base.clone()) {
            (Undo::Restore(_), Some(base)) => Undo::Restore(base),
            (Undo::Reinsert { index, .. }, Some(base)) => Undo::Reinsert { index, note: base },
            (undo, _) => undo,
        }
    }

    /// Mark one mutation of `id` as resolved. The entry is dropped once
    /// nothing is outstanding for the note.
    pub(crate) fn settle(&mut self, id: NoteId) {
        if let Some(entry) = self.pending.get_mut(&id) {
            entry.outstanding = entry.outstanding.saturating_sub(1);
            if entry.outstanding == 0 {
                self.pending.remove(&id);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }
}

pub(crate) fn position(notes: &[Note], id: NoteId) -> Option<usize> {
    notes.iter().position(|n| n.id == id)
}

/// Commit a created note: it takes the placeholder's slot. If the canonical
/// id is already present (a load raced ahead), that copy is replaced and
/// the placeholder dropped.
pub(crate) fn commit_created(notes: &mut Vec<Note>, placeholder: NoteId, canonical: Note) {
    match (
        position(notes, canonical.id),
        position(notes, placeholder),
    ) {
        (Some(existing), Some(slot)) => {
            notes[existing] = canonical;
            notes.remove(slot);
        }
        (Some(existing), None) => notes[existing] = canonical,
        (None, Some(slot)) => notes[slot] = canonical,
        (None, None) => notes.insert(0, canonical),
    }
}

/// Merge a canonical record in place. Returns false if the note is gone.
pub(crate) fn commit_updated(notes: &mut [Note], canonical: Note) -> bool {
    match position(notes, canonical.id) {
        Some(idx) => {
            notes[idx] = canonical;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use papertrail_core::NoteDraft;

    fn server_note(id: i64, title: &str) -> Note {
        let now = Utc::now();
        Note {
            id: NoteId::Server(id),
            title: title.to_string(),
            content: "c".to_string(),
            category: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_reinsert_clamps_index() {
        let mut notes = vec![server_note(1, "a")];
        let changed = Undo::Reinsert {
            index: 5,
            note: server_note(2, "b"),
        }
        .revert(&mut notes);
        assert!(changed);
        assert_eq!(notes[1].id, NoteId::Server(2));
    }

    #[test]
    fn test_reinsert_skips_present_note() {
        let mut notes = vec![server_note(1, "a")];
        let changed = Undo::Reinsert {
            index: 0,
            note: server_note(1, "a"),
        }
        .revert(&mut notes);
        assert!(!changed);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_restore_ignores_deleted_note() {
        let mut notes = vec![server_note(1, "a")];
        assert!(!Undo::Restore(server_note(2, "gone")).revert(&mut notes));
        assert!(Undo::Restore(server_note(1, "before")).revert(&mut notes));
        assert_eq!(notes[0].title, "before");
    }

    #[test]
    fn test_commit_created_replaces_placeholder_in_place() {
        let placeholder = Note::placeholder(&NoteDraft::new("t", "c"));
        let pid = placeholder.id;
        let mut notes = vec![server_note(1, "x"), placeholder, server_note(2, "y")];
        commit_created(&mut notes, pid, server_note(3, "t"));
        let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
        assert_eq!(
            ids,
            vec![NoteId::Server(1), NoteId::Server(3), NoteId::Server(2)]
        );
    }

    #[test]
    fn test_commit_created_deduplicates_after_load() {
        let placeholder = Note::placeholder(&NoteDraft::new("t", "c"));
        let pid = placeholder.id;
        let mut notes = vec![placeholder, server_note(3, "stale copy")];
        commit_created(&mut notes, pid, server_note(3, "t"));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "t");
    }

    #[test]
    fn test_sequencer_latest_wins() {
        let mut seq = Sequencer::default();
        let id = NoteId::Server(1);
        let first = seq.issue(id, None);
        let second = seq.issue(id, None);
        assert!(!seq.is_latest(id, first));
        assert!(seq.is_latest(id, second));

        seq.settle(id);
        assert_eq!(seq.pending(), 1);
        assert!(seq.is_latest(id, second));
        seq.settle(id);
        assert_eq!(seq.pending(), 0);
    }

    #[test]
    fn test_base_is_first_outstanding_state() {
        let mut seq = Sequencer::default();
        let id = NoteId::Server(1);
        seq.issue(id, Some(&server_note(1, "orig")));
        seq.issue(id, Some(&server_note(1, "optimistic")));

        match seq.revert_to_base(id, Undo::Restore(server_note(1, "optimistic"))) {
            Undo::Restore(note) => assert_eq!(note.title, "orig"),
            other => panic!("unexpected undo: {:?}", other),
        }
        match seq.revert_to_base(id, Undo::Reinsert { index: 2, note: server_note(1, "x") }) {
            Undo::Reinsert { index, note } => {
                assert_eq!(index, 2);
                assert_eq!(note.title, "orig");
            }
            other => panic!("unexpected undo: {:?}", other),
        }
    }

    #[test]
    fn test_confirm_moves_base_and_reports_reverted() {
        let mut seq = Sequencer::default();
        let id = NoteId::Server(1);
        seq.issue(id, Some(&server_note(1, "orig")));
        seq.issue(id, Some(&server_note(1, "A")));

        assert!(!seq.confirm(id, &server_note(1, "A")));
        let undo = seq.revert_to_base(id, Undo::Restore(server_note(1, "B")));
        match undo {
            Undo::Restore(note) => assert_eq!(note.title, "A"),
            other => panic!("unexpected undo: {:?}", other),
        }
        assert!(seq.confirm(id, &server_note(1, "A2")));
    }

    #[test]
    fn test_new_issue_clears_reverted() {
        let mut seq = Sequencer::default();
        let id = NoteId::Server(1);
        seq.issue(id, Some(&server_note(1, "orig")));
        seq.revert_to_base(id, Undo::Nothing);
        seq.issue(id, Some(&server_note(1, "orig")));
        assert!(!seq.confirm(id, &server_note(1, "x")));
    }
}
