//! Group gesture state machine for the current selection.
//!
//! While the user drags or pinches a non-empty selection, one shared live
//! delta applies to every selected object's rendered position or size. The
//! scene is untouched until the gesture ends; at that point the final delta is
//! handed back exactly once as a [`GroupCommit`] and the state returns to
//! `Idle`.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::camera::{Offset, is_valid_scale};
use crate::consts::IDENTITY_ZOOM;

/// Live state of a selection gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GroupGesture {
    /// No selection gesture in progress.
    #[default]
    Idle,
    /// The selection is being dragged.
    Dragging {
        /// Screen-space travel since the drag began.
        translation: Offset,
    },
    /// The selection is being pinched.
    Scaling {
        /// Scale factor since the pinch began.
        scale: f64,
    },
}

/// The delta a finished selection gesture asks the scene to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupCommit {
    /// Move every selected object by this screen-space travel.
    Move(Offset),
    /// Scale every selected object by this factor.
    Scale(f64),
}

impl GroupGesture {
    /// Translation to add to selected objects' rendered positions.
    #[must_use]
    pub fn live_translation(&self) -> Offset {
        match self {
            Self::Dragging { translation } => *translation,
            _ => Offset::ZERO,
        }
    }

    /// Factor to multiply selected objects' rendered sizes by.
    #[must_use]
    pub fn live_scale(&self) -> f64 {
        match self {
            Self::Scaling { scale } => *scale,
            _ => IDENTITY_ZOOM,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Track drag travel. Ignored while a pinch is running.
    pub fn update_drag(&mut self, translation: Offset) {
        if matches!(self, Self::Idle | Self::Dragging { .. }) {
            *self = Self::Dragging { translation };
        }
    }

    /// Track pinch scale. Ignored while a drag is running or for invalid scales.
    pub fn update_scale(&mut self, scale: f64) {
        if is_valid_scale(scale) && matches!(self, Self::Idle | Self::Scaling { .. }) {
            *self = Self::Scaling { scale };
        }
    }

    /// Finish a drag, returning the move to commit.
    ///
    /// Returns `None` (and leaves the state alone) if a pinch owns the
    /// selection.
    pub fn end_drag(&mut self, translation: Offset) -> Option<GroupCommit> {
        if !matches!(self, Self::Idle | Self::Dragging { .. }) {
            return None;
        }
        *self = Self::Idle;
        Some(GroupCommit::Move(translation))
    }

    /// Finish a pinch, returning the scale to commit.
    ///
    /// Returns `None` if a drag owns the selection; an invalid scale still
    /// ends the pinch but commits nothing.
    pub fn end_scale(&mut self, scale: f64) -> Option<GroupCommit> {
        if !matches!(self, Self::Idle | Self::Scaling { .. }) {
            return None;
        }
        *self = Self::Idle;
        is_valid_scale(scale).then_some(GroupCommit::Scale(scale))
    }

    /// Abandon the gesture without committing anything.
    pub fn cancel(&mut self) {
        *self = Self::Idle;
    }
}
