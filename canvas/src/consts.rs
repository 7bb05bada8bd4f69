//! Shared numeric constants for the canvas crate.

// ── Objects ─────────────────────────────────────────────────────

/// Glyph size used for drops and palette placements when none is given.
pub const DEFAULT_EMOJI_SIZE: i64 = 40;

/// Smallest size an object can shrink to. Scaling never goes below this.
pub const MIN_EMOJI_SIZE: i64 = 1;

/// First id handed out by a fresh scene. Id 0 is never assigned.
pub const FIRST_OBJECT_ID: u64 = 1;

// ── Camera ──────────────────────────────────────────────────────

/// Identity zoom factor for steady-state and live zoom.
pub const IDENTITY_ZOOM: f64 = 1.0;

// ── Palettes ────────────────────────────────────────────────────

/// Glyphs of the palette every library starts with.
pub const DEFAULT_PALETTE: &str = "⛳️⚾️🛹🏌🏽‍♂️❤️🐥🙈🐶🐼⏰📺🏁😀🦕⭐️🌝🌞";

/// Display name of [`DEFAULT_PALETTE`].
pub const DEFAULT_PALETTE_NAME: &str = "Faces & Things";
