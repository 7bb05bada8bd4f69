#![allow(clippy::float_cmp)]

use std::time::Duration;

use canvas::consts::DEFAULT_EMOJI_SIZE;

use super::*;
use crate::kv::MemoryKvStore;
use crate::test_support::{FailingKv, GatedSource, StaticSource, png_bytes};

const VIEWPORT: Size = Size { width: 800.0, height: 600.0 };

fn open_with(kv: Arc<dyn KvStore>, source: impl ByteSource + 'static) -> DocumentController {
    DocumentController::open(Uuid::new_v4(), kv, Arc::new(source), DEFAULT_EMOJI_SIZE)
}

fn open_blank() -> DocumentController {
    open_with(Arc::new(MemoryKvStore::new()), StaticSource::default())
}

fn ids(doc: &DocumentController) -> Vec<ObjectId> {
    doc.scene().objects().iter().map(|o| o.id).collect()
}

fn stored_scene(kv: &MemoryKvStore, id: Uuid) -> Option<Scene> {
    kv.get(&document_key(id)).unwrap().map(|bytes| Scene::decode(&bytes).unwrap())
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

// =============================================================================
// Open
// =============================================================================

#[test]
fn missing_snapshot_opens_empty() {
    let doc = open_blank();
    assert!(doc.scene().is_empty());
    assert!(!doc.is_loading());
    assert!(!doc.is_fetching());
}

#[test]
fn corrupt_snapshot_opens_empty() {
    let kv = Arc::new(MemoryKvStore::new());
    let id = Uuid::new_v4();
    kv.set(&document_key(id), b"{\"objects\": [").unwrap();
    let doc = DocumentController::open(id, kv, Arc::new(StaticSource::default()), DEFAULT_EMOJI_SIZE);
    assert_eq!(doc.scene(), &Scene::new());
}

#[tokio::test]
async fn stored_background_is_fetched_on_open() {
    let kv = Arc::new(MemoryKvStore::new());
    let id = Uuid::new_v4();
    let mut scene = Scene::new();
    scene.add_object("🐶", 1, 2, 30);
    scene.set_background(Some("mem://bg".into()));
    kv.set(&document_key(id), &scene.encode().unwrap()).unwrap();

    let source = StaticSource::default().with("mem://bg", Ok(png_bytes(5, 4)));
    let mut doc = DocumentController::open(id, kv, Arc::new(source), DEFAULT_EMOJI_SIZE);
    assert_eq!(doc.scene(), &scene);
    assert!(doc.is_fetching());
    assert!(doc.is_loading());

    assert!(doc.wait_for_fetch().await);
    assert_eq!(doc.background_image().map(|i| (i.width, i.height)), Some((5, 4)));
    assert!(!doc.is_loading());
}

// =============================================================================
// Scene intents
// =============================================================================

#[test]
fn add_object_maps_canvas_point_and_persists() {
    let kv = Arc::new(MemoryKvStore::new());
    let mut doc = open_with(kv.clone(), StaticSource::default());
    doc.set_viewport(VIEWPORT);
    doc.end_zoom(2.0);

    let id = doc.add_object("😀", Point::new(420.0, 260.0), 40);
    let obj = doc.scene().object(id).unwrap();
    assert_eq!((obj.x, obj.y, obj.size), (10, -20, 40));
    assert_eq!(stored_scene(&kv, doc.id()).as_ref(), Some(doc.scene()));
}

#[test]
fn delete_selected_removes_only_selected_and_clears_selection() {
    let kv = Arc::new(MemoryKvStore::new());
    let mut doc = open_with(kv.clone(), StaticSource::default());
    for _ in 0..7 {
        doc.add_object("⭐️", Point::new(0.0, 0.0), 20);
    }
    for id in [2, 4, 6] {
        doc.toggle_select(id);
    }
    doc.delete_selected();
    assert_eq!(ids(&doc), vec![1, 3, 5, 7]);

    doc.toggle_select(3);
    doc.toggle_select(7);
    doc.delete_selected();
    assert_eq!(ids(&doc), vec![1, 5]);
    assert!(doc.selection().is_empty());
    assert_eq!(stored_scene(&kv, doc.id()).map(|s| s.len()), Some(2));
}

#[test]
fn move_and_resize_apply_to_every_selected_object() {
    let mut doc = open_blank();
    let a = doc.add_object("a", Point::new(0.0, 0.0), 10);
    let b = doc.add_object("b", Point::new(5.0, 5.0), 7);
    let c = doc.add_object("c", Point::new(9.0, 9.0), 40);
    doc.toggle_select(a);
    doc.toggle_select(b);

    doc.move_selected(3, -4);
    doc.resize_selected(1.5);

    let scene = doc.scene();
    let (oa, ob, oc) = (scene.object(a).unwrap(), scene.object(b).unwrap(), scene.object(c).unwrap());
    assert_eq!((oa.x, oa.y, oa.size), (3, -4, 15));
    assert_eq!((ob.x, ob.y, ob.size), (8, 1, 10));
    assert_eq!((oc.x, oc.y, oc.size), (9, 9, 40));
}

#[test]
fn intents_with_empty_selection_change_nothing() {
    let mut doc = open_blank();
    doc.add_object("a", Point::new(0.0, 0.0), 10);
    let before = doc.scene().clone();
    doc.move_selected(5, 5);
    doc.resize_selected(3.0);
    doc.delete_selected();
    assert_eq!(doc.scene(), &before);
}

#[test]
fn toggle_select_ignores_unknown_ids() {
    let mut doc = open_blank();
    let id = doc.add_object("a", Point::new(0.0, 0.0), 10);
    doc.toggle_select(id + 100);
    assert!(doc.selection().is_empty());
    doc.toggle_select(id);
    assert!(doc.is_selected(id));
    doc.toggle_select(id);
    assert!(!doc.is_selected(id));
}

#[test]
fn persistence_failure_keeps_in_memory_change() {
    let mut doc = open_with(Arc::new(FailingKv), StaticSource::default());
    let id = doc.add_object("😀", Point::new(0.0, 0.0), 40);
    doc.toggle_select(id);
    doc.move_selected(1, 1);
    let obj = doc.scene().object(id).unwrap();
    assert_eq!((obj.x, obj.y), (1, 1));
}

#[test]
fn retired_document_stops_writing() {
    let kv = Arc::new(MemoryKvStore::new());
    let mut doc = open_with(kv.clone(), StaticSource::default());
    doc.add_object("a", Point::new(0.0, 0.0), 10);
    doc.retire();
    kv.delete(&document_key(doc.id())).unwrap();

    doc.add_object("b", Point::new(0.0, 0.0), 10);
    assert!(doc.is_retired());
    assert_eq!(doc.scene().len(), 2);
    assert!(stored_scene(&kv, doc.id()).is_none());
}

// =============================================================================
// Drops
// =============================================================================

#[test]
fn dropped_text_is_placed_at_default_size() {
    let mut doc = open_blank();
    doc.set_viewport(VIEWPORT);
    assert!(doc.drop_payload(DropPayload::Text("🦕".into()), Point::new(410.0, 290.0)));
    let obj = &doc.scene().objects()[0];
    assert_eq!((obj.text.as_str(), obj.x, obj.y, obj.size), ("🦕", 10, -10, DEFAULT_EMOJI_SIZE));
}

#[test]
fn dropped_blank_text_is_rejected() {
    let mut doc = open_blank();
    assert!(!doc.drop_payload(DropPayload::Text("  ".into()), Point::new(0.0, 0.0)));
    assert!(!doc.drop_payload(DropPayload::Url(" ".into()), Point::new(0.0, 0.0)));
    assert!(doc.scene().is_empty());
    assert_eq!(doc.scene().background_url(), None);
}

#[tokio::test]
async fn dropped_url_sets_background_and_zooms_to_fit() {
    let source = StaticSource::default().with("https://cdn.example.com/wide.png", Ok(png_bytes(200, 100)));
    let mut doc = open_with(Arc::new(MemoryKvStore::new()), source);
    doc.set_viewport(Size::new(800.0, 800.0));

    let raw = "https://search.example.com/imgres?imgurl=https%3A%2F%2Fcdn.example.com%2Fwide.png";
    assert!(doc.drop_payload(DropPayload::Url(raw.into()), Point::new(0.0, 0.0)));
    assert_eq!(doc.scene().background_url(), Some("https://cdn.example.com/wide.png"));

    assert!(doc.wait_for_fetch().await);
    assert_eq!(doc.transform().camera.zoom(), 4.0);
    assert_eq!(doc.transform().camera.pan(), Offset::ZERO);
}

// =============================================================================
// Background fetching
// =============================================================================

#[tokio::test]
async fn background_loads_and_clears() {
    let kv = Arc::new(MemoryKvStore::new());
    let source = StaticSource::default().with("mem://a", Ok(png_bytes(3, 3)));
    let mut doc = open_with(kv.clone(), source);

    doc.set_background(Some("mem://a".into()));
    assert!(doc.is_loading());
    assert_eq!(stored_scene(&kv, doc.id()).unwrap().background_url(), Some("mem://a"));

    assert!(doc.wait_for_fetch().await);
    assert!(doc.background_image().is_some());
    assert!(!doc.is_loading());

    doc.set_background(None);
    assert!(doc.background_image().is_none());
    assert!(!doc.is_fetching());
    assert!(!doc.is_loading());
    assert!(!doc.wait_for_fetch().await);
}

#[tokio::test]
async fn later_request_wins_when_it_finishes_first() {
    let source = Arc::new(
        GatedSource::default()
            .with("mem://a", Ok(png_bytes(1, 1)))
            .with("mem://b", Ok(png_bytes(2, 2))),
    );
    let mut doc = DocumentController::open(
        Uuid::new_v4(),
        Arc::new(MemoryKvStore::new()),
        source.clone(),
        DEFAULT_EMOJI_SIZE,
    );

    doc.set_background(Some("mem://a".into()));
    doc.set_background(Some("mem://b".into()));
    source.release("mem://b");
    source.release("mem://a");

    assert!(doc.wait_for_fetch().await);
    assert_eq!(doc.background_image().map(|i| i.width), Some(2));
    settle().await;
    doc.poll_fetches();
    assert_eq!(doc.background_image().map(|i| i.width), Some(2));
}

#[tokio::test]
async fn stale_completion_already_delivered_is_discarded() {
    let source = StaticSource::default()
        .with("mem://a", Ok(png_bytes(1, 1)))
        .with("mem://b", Ok(png_bytes(2, 2)));
    let mut doc = open_with(Arc::new(MemoryKvStore::new()), source);

    doc.set_background(Some("mem://a".into()));
    settle().await;
    doc.set_background(Some("mem://b".into()));

    assert!(doc.wait_for_fetch().await);
    assert_eq!(doc.background_image().map(|i| i.width), Some(2));
}

#[tokio::test]
async fn same_url_twice_only_latest_counts() {
    let source = StaticSource::default().with("mem://a", Ok(png_bytes(1, 1)));
    let mut doc = open_with(Arc::new(MemoryKvStore::new()), source);

    doc.set_background(Some("mem://a".into()));
    settle().await;
    doc.set_background(Some("mem://a".into()));
    assert!(doc.poll_fetches() || doc.wait_for_fetch().await);
    assert!(doc.background_image().is_some());
    assert!(!doc.is_fetching());
}

#[tokio::test]
async fn failed_latest_request_leaves_no_image() {
    let source = StaticSource::default()
        .with("mem://a", Ok(png_bytes(1, 1)))
        .with("mem://b", Ok(b"not an image".to_vec()));
    let mut doc = open_with(Arc::new(MemoryKvStore::new()), source);

    doc.set_background(Some("mem://a".into()));
    settle().await;
    doc.set_background(Some("mem://b".into()));

    assert!(doc.wait_for_fetch().await);
    assert!(doc.background_image().is_none());
    assert!(matches!(doc.fetch_failure(), Some(FetchError::DecodeFailed(_))));
    assert!(doc.is_loading());
}

// =============================================================================
// Gestures
// =============================================================================

#[test]
fn group_drag_renders_live_then_commits_in_scene_units() {
    let mut doc = open_blank();
    doc.set_viewport(VIEWPORT);
    doc.end_zoom(2.0);
    let moved = doc.add_object("a", Point::new(400.0, 300.0), 10);
    let still = doc.add_object("b", Point::new(400.0, 300.0), 10);
    doc.toggle_select(moved);

    doc.update_drag(Offset::new(21.0, -40.0));
    let rendered = doc.objects();
    assert_eq!(rendered[0].position, Point::new(421.0, 260.0));
    assert_eq!(rendered[1].position, Point::new(400.0, 300.0));
    assert_eq!(doc.scene().object(moved).map(|o| (o.x, o.y)), Some((0, 0)));

    doc.end_drag(Offset::new(21.0, -40.0));
    assert_eq!(doc.scene().object(moved).map(|o| (o.x, o.y)), Some((10, -20)));
    assert_eq!(doc.scene().object(still).map(|o| (o.x, o.y)), Some((0, 0)));
    assert!(!doc.transform().is_gesturing());
}

#[test]
fn pinch_with_selection_scales_selection_not_canvas() {
    let mut doc = open_blank();
    let id = doc.add_object("a", Point::new(0.0, 0.0), 40);
    doc.toggle_select(id);

    doc.update_zoom(1.5);
    assert_eq!(doc.transform().camera.zoom(), 1.0);
    assert_eq!(doc.objects()[0].size, 60.0);

    doc.end_zoom(1.5);
    assert_eq!(doc.scene().object(id).map(|o| o.size), Some(60));
    assert_eq!(doc.transform().camera.zoom(), 1.0);
}

#[test]
fn pinch_without_selection_zooms_canvas() {
    let mut doc = open_blank();
    doc.update_zoom(3.0);
    assert_eq!(doc.transform().camera.zoom(), 3.0);
    doc.end_zoom(3.0);
    assert_eq!(doc.transform().camera.steady_zoom, 3.0);
    assert!(!doc.transform().is_gesturing());
}

#[test]
fn clearing_selection_mid_pinch_abandons_the_scale() {
    let mut doc = open_blank();
    let id = doc.add_object("a", Point::new(0.0, 0.0), 40);
    doc.toggle_select(id);

    doc.update_zoom(2.0);
    doc.clear_selection();
    assert!(doc.transform().group.is_idle());
    doc.end_zoom(2.0);

    assert!(!doc.transform().is_gesturing());
    assert_eq!(doc.transform().camera.zoom(), 1.0);
    assert_eq!(doc.scene().object(id).map(|o| o.size), Some(40));

    // A later drag on a fresh selection is not blocked by a stale pinch.
    doc.toggle_select(id);
    let before = doc.objects()[0].position;
    doc.update_drag(Offset::new(10.0, 0.0));
    let rendered = &doc.objects()[0];
    assert_eq!(rendered.size, 40.0);
    assert_eq!(rendered.position, Point::new(before.x + 10.0, before.y));
}

#[test]
fn selecting_mid_canvas_pinch_finishes_on_the_canvas() {
    let mut doc = open_blank();
    let id = doc.add_object("a", Point::new(0.0, 0.0), 40);

    doc.update_zoom(3.0);
    doc.toggle_select(id);
    doc.update_zoom(3.0);
    doc.end_zoom(3.0);

    assert_eq!(doc.transform().camera.live_zoom(), 1.0);
    assert_eq!(doc.transform().camera.steady_zoom, 3.0);
    assert!(!doc.transform().is_gesturing());
    assert_eq!(doc.scene().object(id).map(|o| o.size), Some(40));
}


#[test]
fn cancel_gestures_commits_nothing() {
    let mut doc = open_blank();
    let id = doc.add_object("a", Point::new(0.0, 0.0), 40);
    doc.toggle_select(id);
    doc.update_drag(Offset::new(50.0, 50.0));
    doc.update_pan(Offset::new(10.0, 0.0));
    doc.cancel_gestures();
    assert!(!doc.transform().is_gesturing());
    assert_eq!(doc.scene().object(id).map(|o| (o.x, o.y)), Some((0, 0)));
}

#[test]
fn zoom_to_fit_without_image_is_noop() {
    let mut doc = open_blank();
    assert!(!doc.zoom_to_fit(Size::new(800.0, 800.0)));
    assert_eq!(doc.transform().camera.zoom(), 1.0);
}

#[tokio::test]
async fn zoom_to_fit_uses_constraining_axis() {
    let source = StaticSource::default().with("mem://wide", Ok(png_bytes(200, 100)));
    let mut doc = open_with(Arc::new(MemoryKvStore::new()), source);
    doc.end_pan(Offset::new(30.0, 30.0));
    doc.set_background(Some("mem://wide".into()));
    assert!(doc.wait_for_fetch().await);

    assert!(doc.zoom_to_fit(Size::new(800.0, 800.0)));
    assert_eq!(doc.transform().camera.zoom(), 4.0);
    assert_eq!(doc.transform().camera.pan(), Offset::ZERO);
}

#[test]
fn object_at_finds_topmost() {
    let mut doc = open_blank();
    doc.set_viewport(VIEWPORT);
    let below = doc.add_object("a", Point::new(400.0, 300.0), 40);
    let above = doc.add_object("b", Point::new(410.0, 300.0), 40);
    assert_eq!(doc.object_at(Point::new(405.0, 300.0)), Some(above));
    assert_eq!(doc.object_at(Point::new(385.0, 300.0)), Some(below));
    assert_eq!(doc.object_at(Point::new(0.0, 0.0)), None);
}

// =============================================================================
// Change notification
// =============================================================================

#[test]
fn subscribers_see_every_change() {
    let mut doc = open_blank();
    let mut rx = doc.subscribe();
    assert!(!rx.has_changed().unwrap());

    doc.add_object("a", Point::new(0.0, 0.0), 10);
    assert!(rx.has_changed().unwrap());
    rx.borrow_and_update();

    doc.clear_selection();
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), doc.revision());
}
