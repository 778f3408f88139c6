//! Segmented entry state for the one-time code.

/// Number of single-digit slots in a one-time code.
pub const CODE_LENGTH: usize = 6;

/// Outcome of a single edit on the code entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEvent {
    /// Digit stored, focus moved to the next slot.
    Advanced,
    /// Digit stored in the last slot: verification fires automatically.
    Filled,
    /// Input rejected, no state change.
    Rejected,
    /// Backspace on an empty slot cleared the previous slot and moved
    /// focus back.
    MergedBack,
    /// Slot cleared in place.
    Cleared,
}

/// Six independently editable digit slots plus the focused slot index.
///
/// The focus index tells the host which slot should receive the next
/// keystroke; slot 0 is the default target after every reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    slots: [Option<char>; CODE_LENGTH],
    focus: usize,
}

impl CodeEntry {
    pub fn new() -> Self {
        Self {
            slots: [None; CODE_LENGTH],
            focus: 0,
        }
    }

    /// Store a digit into `slot`.
    ///
    /// Non-digit input is rejected with no state change. Filling any
    /// slot but the last moves focus one slot right; filling the last
    /// slot reports [`EntryEvent::Filled`] so the caller can trigger
    /// verification.
    pub fn insert(&mut self, slot: usize, ch: char) -> EntryEvent {
        if slot >= CODE_LENGTH || !ch.is_ascii_digit() {
            return EntryEvent::Rejected;
        }

        self.slots[slot] = Some(ch);

        if slot + 1 < CODE_LENGTH {
            self.focus = slot + 1;
            EntryEvent::Advanced
        } else {
            self.focus = slot;
            EntryEvent::Filled
        }
    }

    /// Backspace pressed while `slot` is focused.
    ///
    /// On an empty slot the previous slot is cleared and focused
    /// (merge-delete); on a filled slot only that slot is cleared.
    pub fn backspace(&mut self, slot: usize) -> EntryEvent {
        if slot >= CODE_LENGTH {
            return EntryEvent::Rejected;
        }

        if self.slots[slot].is_some() {
            self.slots[slot] = None;
            self.focus = slot;
            return EntryEvent::Cleared;
        }

        if slot == 0 {
            return EntryEvent::Rejected;
        }

        self.slots[slot - 1] = None;
        self.focus = slot - 1;
        EntryEvent::MergedBack
    }

    /// All six slots hold a digit.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Assembled code, available only when complete.
    pub fn assemble(&self) -> Option<String> {
        self.slots.iter().copied().collect()
    }

    /// Back to six empty slots, focus on slot 0.
    pub fn reset(&mut self) {
        self.slots = [None; CODE_LENGTH];
        self.focus = 0;
    }

    #[inline]
    pub fn focus(&self) -> usize {
        self.focus
    }

    #[inline]
    pub fn slot(&self, index: usize) -> Option<char> {
        self.slots.get(index).copied().flatten()
    }
}

impl Default for CodeEntry {
    fn default() -> Self {
        Self::new()
    }
}
