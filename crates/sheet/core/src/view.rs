//! Sheet view projection.
//!
//! [`CharacterState`](crate::state::CharacterState) is the only source of
//! truth. A view is told what changed so it can re-render; it is never asked
//! for a current value.

use crate::controller::LevelChange;
use crate::state::XpSummary;

/// Rendering collaborator notified after each committed change.
pub trait SheetView {
    fn apply_level_change(&mut self, change: &LevelChange);

    fn xp_changed(&mut self, _summary: XpSummary) {}
}

/// View that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullView;

impl SheetView for NullView {
    fn apply_level_change(&mut self, _change: &LevelChange) {}
}

/// View that keeps every notification, for tests and headless front ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordingView {
    pub changes: Vec<LevelChange>,
    pub xp: Vec<XpSummary>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_change(&self) -> Option<&LevelChange> {
        self.changes.last()
    }
}

impl SheetView for RecordingView {
    fn apply_level_change(&mut self, change: &LevelChange) {
        self.changes.push(change.clone());
    }

    fn xp_changed(&mut self, summary: XpSummary) {
        self.xp.push(summary);
    }
}
