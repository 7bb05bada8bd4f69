//! Emoji palettes: ordered, named strings of glyphs the user picks from.
//!
//! A palette is addressed by its glyph string, so every edit that changes the
//! glyphs hands back the palette's new key. Glyphs are split into clusters
//! (base character plus variation selectors, skin-tone modifiers, ZWJ
//! sequences and flag pairs) so multi-codepoint emoji stay whole.

#[cfg(test)]
#[path = "palette_test.rs"]
mod palette_test;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PALETTE, DEFAULT_PALETTE_NAME};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub emojis: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palettes {
    palettes: Vec<Palette>,
}

impl Default for Palettes {
    fn default() -> Self {
        Self {
            palettes: vec![Palette { emojis: DEFAULT_PALETTE.to_string(), name: DEFAULT_PALETTE_NAME.to_string() }],
        }
    }
}

impl Palettes {
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    #[must_use]
    pub fn name(&self, emojis: &str) -> Option<&str> {
        self.find(emojis).map(|i| self.palettes[i].name.as_str())
    }

    /// The palette following `emojis`, wrapping around. Unknown palettes map
    /// to the first one; an empty library yields `""`.
    #[must_use]
    pub fn palette_after(&self, emojis: &str) -> &str {
        self.step(emojis, 1)
    }

    /// The palette preceding `emojis`, wrapping around.
    #[must_use]
    pub fn palette_before(&self, emojis: &str) -> &str {
        self.step(emojis, self.palettes.len().saturating_sub(1))
    }

    /// Rename a palette. Returns false if it is unknown.
    pub fn rename(&mut self, emojis: &str, name: &str) -> bool {
        let Some(i) = self.find(emojis) else {
            return false;
        };
        self.palettes[i].name = name.to_string();
        true
    }

    /// Prepend glyphs to a palette, dropping duplicates. Returns the new key.
    pub fn add_emojis(&mut self, emojis: &str, to_add: &str) -> String {
        let combined = unique_glyphs(&format!("{to_add}{emojis}"));
        self.change(emojis, combined)
    }

    /// Remove every occurrence of one glyph from a palette. Returns the new key.
    pub fn remove_emoji(&mut self, emojis: &str, emoji: &str) -> String {
        let remaining: String = glyphs(emojis).into_iter().filter(|g| *g != emoji).collect();
        self.change(emojis, remaining)
    }

    fn find(&self, emojis: &str) -> Option<usize> {
        self.palettes.iter().position(|p| p.emojis == emojis)
    }

    fn step(&self, emojis: &str, by: usize) -> &str {
        let len = self.palettes.len();
        if len == 0 {
            return "";
        }
        let next = self.find(emojis).map_or(0, |i| (i + by) % len);
        &self.palettes[next].emojis
    }

    /// Re-key a palette in place, keeping its name. An unknown palette is
    /// appended with an empty name; another palette already holding the new
    /// key is dropped.
    fn change(&mut self, old: &str, new: String) -> String {
        let slot = self.find(old);
        if let Some(dup) = self.find(&new).filter(|d| Some(*d) != slot) {
            self.palettes.remove(dup);
        }
        match self.find(old) {
            Some(i) => self.palettes[i].emojis.clone_from(&new),
            None => self.palettes.push(Palette { emojis: new.clone(), name: String::new() }),
        }
        new
    }
}

// =============================================================
// Glyph clusters
// =============================================================

const ZWJ: char = '\u{200D}';

fn is_extender(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{20E3}'
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{1F3FB}'..='\u{1F3FF}'
        | '\u{E0020}'..='\u{E007F}'
        | ZWJ)
}

fn is_regional_indicator(c: char) -> bool {
    matches!(c, '\u{1F1E6}'..='\u{1F1FF}')
}

/// Split a string into glyph clusters.
#[must_use]
pub fn glyphs(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut lone_indicator = false;

    for (i, c) in s.char_indices() {
        let joins = match prev {
            None => false,
            Some(p) => is_extender(c) || p == ZWJ || (lone_indicator && is_regional_indicator(c)),
        };
        if !joins && i > start {
            out.push(&s[start..i]);
            start = i;
        }
        lone_indicator = is_regional_indicator(c) && !(joins && lone_indicator);
        prev = Some(c);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

/// Glyphs of `s` with later duplicates removed.
#[must_use]
pub fn unique_glyphs(s: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    glyphs(s).into_iter().filter(|g| seen.insert(*g)).collect()
}
