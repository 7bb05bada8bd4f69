//! Persisted palette library.
//!
//! Wraps `canvas::palette::Palettes` and writes the whole list under
//! `PALETTES_KEY` after every edit. A missing or unreadable entry starts from
//! the default palette.

#[cfg(test)]
#[path = "palettes_test.rs"]
mod palettes_test;

use std::sync::Arc;

use canvas::palette::Palettes;
use tracing::{error, warn};

use crate::kv::{KvStore, PALETTES_KEY};

pub struct PaletteLibrary {
    kv: Arc<dyn KvStore>,
    palettes: Palettes,
}

impl PaletteLibrary {
    #[must_use]
    pub fn load(kv: Arc<dyn KvStore>) -> Self {
        let palettes = match kv.get(PALETTES_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable palettes");
                Palettes::default()
            }),
            Ok(None) => Palettes::default(),
            Err(e) => {
                error!(error = %e, "palette read failed");
                Palettes::default()
            }
        };
        Self { kv, palettes }
    }

    #[must_use]
    pub fn palettes(&self) -> &Palettes {
        &self.palettes
    }

    pub fn rename(&mut self, emojis: &str, name: &str) -> bool {
        let renamed = self.palettes.rename(emojis, name);
        if renamed {
            self.save();
        }
        renamed
    }

    /// Prepend glyphs to a palette. Returns the palette's new key.
    pub fn add_emojis(&mut self, emojis: &str, to_add: &str) -> String {
        let key = self.palettes.add_emojis(emojis, to_add);
        self.save();
        key
    }

    /// Remove one glyph from a palette. Returns the palette's new key.
    pub fn remove_emoji(&mut self, emojis: &str, emoji: &str) -> String {
        let key = self.palettes.remove_emoji(emojis, emoji);
        self.save();
        key
    }

    fn save(&self) {
        match serde_json::to_vec(&self.palettes) {
            Ok(bytes) => {
                if let Err(e) = self.kv.set(PALETTES_KEY, &bytes) {
                    error!(error = %e, "palette write failed");
                }
            }
            Err(e) => error!(error = %e, "palette encode failed"),
        }
    }
}
