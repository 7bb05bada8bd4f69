//! Scene model: placed glyphs, the background reference, and the snapshot codec.
//!
//! A `Scene` is the persisted state of one document. It is only ever changed
//! through its own operations (`add_object`, `move_object`, `resize_object`,
//! `remove_object`, `set_background`); operations naming an id that is not in
//! the scene are silent no-ops. Objects are kept in insertion order, which is
//! also the back-to-front draw order.
//!
//! Snapshots are field-tagged JSON. An absent background is encoded by leaving
//! the key out, so it never collides with an empty-string URL.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use serde::{Deserialize, Serialize};

use crate::consts::{FIRST_OBJECT_ID, MIN_EMOJI_SIZE};

/// Identifier of a placed object, unique within one scene.
pub type ObjectId = u64;

// =============================================================
// Errors
// =============================================================

/// Reasons a snapshot could not be turned back into a scene.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("malformed snapshot: duplicate object id {0}")]
    DuplicateId(ObjectId),
    #[error("malformed snapshot: object id {id} outside allocated range (next id {next_id})")]
    IdOutOfRange { id: ObjectId, next_id: ObjectId },
    #[error("malformed snapshot: next id {0} is outside the assignable range")]
    InvalidNextId(ObjectId),
}

// =============================================================
// Objects
// =============================================================

/// A glyph placed on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedObject {
    /// Display token. Fixed at creation.
    pub text: String,
    /// Horizontal offset from the canvas center, in scene units.
    pub x: i64,
    /// Vertical offset from the canvas center, in scene units.
    pub y: i64,
    /// Font size in scene units. Always at least [`MIN_EMOJI_SIZE`].
    pub size: i64,
    pub id: ObjectId,
}

/// Monotonic id source scoped to one scene. Persisted with the scene so ids
/// are never reused across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectIdAllocator {
    next: ObjectId,
}

impl ObjectIdAllocator {
    /// Hand out the next id and advance. The counter stops at `ObjectId::MAX`,
    /// which snapshots may not carry as their next id.
    pub fn allocate(&mut self) -> ObjectId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    #[must_use]
    pub fn peek(&self) -> ObjectId {
        self.next
    }
}

impl Default for ObjectIdAllocator {
    fn default() -> Self {
        Self { next: FIRST_OBJECT_ID }
    }
}

/// Scale an integer size by `factor`, rounding half-to-even and clamping to
/// [`MIN_EMOJI_SIZE`].
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn scaled_size(size: i64, factor: f64) -> i64 {
    let scaled = (size as f64 * factor).round_ties_even() as i64;
    scaled.max(MIN_EMOJI_SIZE)
}

// =============================================================
// Scene
// =============================================================

/// Background reference plus the ordered list of placed objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_url: Option<String>,
    #[serde(default)]
    objects: Vec<PlacedObject>,
    #[serde(default, rename = "next_id")]
    ids: ObjectIdAllocator,
}

impl Scene {
    /// Create an empty scene with no background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Queries ---

    #[must_use]
    pub fn background_url(&self) -> Option<&str> {
        self.background_url.as_deref()
    }

    /// Objects in insertion (back-to-front) order.
    #[must_use]
    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.object(id).is_some()
    }

    /// The id the next `add_object` will assign.
    #[must_use]
    pub fn next_id(&self) -> ObjectId {
        self.ids.peek()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // --- Mutations ---

    /// Append a new object and return its freshly allocated id.
    pub fn add_object(&mut self, text: &str, x: i64, y: i64, size: i64) -> ObjectId {
        let id = self.ids.allocate();
        self.objects.push(PlacedObject {
            text: text.to_string(),
            x,
            y,
            size: size.max(MIN_EMOJI_SIZE),
            id,
        });
        id
    }

    /// Offset an object's position, saturating at the `i64` range. Returns
    /// false if the id is unknown.
    pub fn move_object(&mut self, id: ObjectId, dx: i64, dy: i64) -> bool {
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        obj.x = obj.x.saturating_add(dx);
        obj.y = obj.y.saturating_add(dy);
        true
    }

    /// Multiply an object's size by `factor` (see [`scaled_size`]).
    ///
    /// Non-finite factors are ignored. Returns false if the id is unknown or
    /// the factor was rejected.
    pub fn resize_object(&mut self, id: ObjectId, factor: f64) -> bool {
        if !factor.is_finite() {
            return false;
        }
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        obj.size = scaled_size(obj.size, factor);
        true
    }

    /// Remove the object with `id`, returning it if it was present.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<PlacedObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    pub fn set_background(&mut self, url: Option<String>) {
        self.background_url = url;
    }

    // --- Snapshot codec ---

    /// Serialize the scene to its snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Rebuild a scene from snapshot bytes, rejecting broken id invariants.
    ///
    /// # Errors
    ///
    /// Returns a `SnapshotError` if the bytes are not a valid snapshot, an id
    /// repeats, an id is zero or not below the persisted next id, or the next
    /// id leaves nothing to allocate.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let scene: Self = serde_json::from_slice(bytes)?;
        scene.validate()?;
        Ok(scene)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        let next_id = self.ids.peek();
        if next_id < FIRST_OBJECT_ID || next_id == ObjectId::MAX {
            return Err(SnapshotError::InvalidNextId(next_id));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.objects.len());
        for obj in &self.objects {
            if obj.id < FIRST_OBJECT_ID || obj.id >= next_id {
                return Err(SnapshotError::IdOutOfRange { id: obj.id, next_id });
            }
            if !seen.insert(obj.id) {
                return Err(SnapshotError::DuplicateId(obj.id));
            }
        }
        Ok(())
    }
}
