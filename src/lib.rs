//! Emoji canvas documents: persistence, background fetching, and the
//! per-document intent API on top of the pure `canvas` model.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment configuration |
//! | [`kv`] | Key-value storage trait and backends |
//! | [`fetch`] | Background image fetching with request tokens |
//! | [`document`] | One open document's intents and derived state |
//! | [`store`] | The ordered, named set of documents |
//! | [`palettes`] | Persisted emoji palettes |

pub mod config;
pub mod document;
pub mod fetch;
pub mod kv;
pub mod palettes;
pub mod store;

#[cfg(test)]
mod test_support;
