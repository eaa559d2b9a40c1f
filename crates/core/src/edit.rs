//! Per-slot edit state machine.
//!
//! A slot is either being viewed or being edited with a local draft.
//! Regeneration may only start from `Viewing`; saving or cancelling returns
//! the slot to `Viewing`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "draft", rename_all = "snake_case")]
pub enum SlotEditState {
    #[default]
    Viewing,
    Editing(String),
}

impl SlotEditState {
    pub fn is_editing(&self) -> bool {
        matches!(self, SlotEditState::Editing(_))
    }

    /// Regeneration is refused while a draft is open.
    pub fn can_regenerate(&self) -> bool {
        matches!(self, SlotEditState::Viewing)
    }

    /// Enter edit mode seeded with the current content. Re-entering keeps
    /// the existing draft.
    pub fn begin(self, current: &str) -> SlotEditState {
        match self {
            SlotEditState::Viewing => SlotEditState::Editing(current.to_string()),
            editing @ SlotEditState::Editing(_) => editing,
        }
    }

    /// Replace the draft text.
    pub fn update(self, draft: &str) -> Result<SlotEditState, CoreError> {
        match self {
            SlotEditState::Editing(_) => Ok(SlotEditState::Editing(draft.to_string())),
            SlotEditState::Viewing => Err(CoreError::Conflict(
                "Slot is not being edited".to_string(),
            )),
        }
    }

    /// Leave edit mode, returning the draft to persist.
    pub fn save(self) -> Result<(SlotEditState, String), CoreError> {
        match self {
            SlotEditState::Editing(draft) => Ok((SlotEditState::Viewing, draft)),
            SlotEditState::Viewing => Err(CoreError::Conflict(
                "Slot is not being edited".to_string(),
            )),
        }
    }

    /// Leave edit mode discarding the draft.
    pub fn cancel(self) -> SlotEditState {
        SlotEditState::Viewing
    }

    /// Guard used before starting a regeneration.
    pub fn ensure_can_regenerate(&self) -> Result<(), CoreError> {
        if self.can_regenerate() {
            Ok(())
        } else {
            Err(CoreError::Conflict(
                "Save or cancel the open edit before regenerating".to_string(),
            ))
        }
    }
}
