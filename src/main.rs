use std::sync::Arc;
use std::time::Duration;

use emojiart::config::AppConfig;
use emojiart::fetch::UrlByteSource;
use emojiart::kv::DirKvStore;
use emojiart::palettes::PaletteLibrary;
use emojiart::store::DocumentStore;

const STARTUP_FETCH_WAIT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let kv = Arc::new(DirKvStore::open(&config.data_dir)?);
    let source = Arc::new(UrlByteSource::new(config.fetch)?);
    tracing::info!(data_dir = %kv.root().display(), "emojiart starting");

    let palettes = PaletteLibrary::load(kv.clone());
    tracing::info!(count = palettes.palettes().palettes().len(), "palettes loaded");

    let mut store = DocumentStore::load(kv, source, config.default_emoji_size);
    if store.list_documents().is_empty() {
        store.add_document(None);
    }

    let ids: Vec<_> = store.list_documents().iter().map(|e| e.id).collect();
    for id in ids {
        let Some(doc) = store.open_document(id) else {
            continue;
        };
        if doc.is_fetching() && tokio::time::timeout(STARTUP_FETCH_WAIT, doc.wait_for_fetch()).await.is_err() {
            tracing::warn!(document = %id, "background still loading");
        }
        tracing::info!(
            document = %id,
            name = store.name(id).unwrap_or_default(),
            objects = store.document(id).map_or(0, |d| d.scene().len()),
            background = store.document(id).and_then(|d| d.scene().background_url()).unwrap_or("<none>"),
            "document ready"
        );
    }
    Ok(())
}
