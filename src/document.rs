//! Document controller: one open document's intent API and derived state.
//!
//! DESIGN
//! ======
//! A `DocumentController` exclusively owns its `Scene` plus session-only
//! state (selection, camera/gesture transform, viewport, decoded background).
//! Every intent is a synchronous, complete state transition. Intents that
//! change the scene re-encode it and write the snapshot under the document's
//! own key before returning. Observers learn about changes through a `watch`
//! revision counter rather than by holding references into the controller.
//!
//! Background images are the only asynchronous piece: `set_background`
//! issues a fetch, and the owner drains completions with `poll_fetches` or
//! `wait_for_fetch` on the same task that issues intents. Only the completion
//! for the most recently issued request can change the image.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here returns an error to the caller. A corrupt snapshot loads as an
//! empty scene, persistence failures are logged and the in-memory change is
//! kept, fetch failures leave the image empty and are exposed through
//! `fetch_failure`, and intents naming ids the scene no longer holds do nothing.

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;

use std::sync::Arc;

use canvas::camera::{Offset, Point, Size};
use canvas::gesture::GroupCommit;
use canvas::hit;
use canvas::scene::{ObjectId, Scene};
use canvas::selection::SelectionSet;
use canvas::transform::{RenderedObject, TransformState};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::fetch::{AssetFetcher, ByteSource, DecodedImage, FetchCompletion, FetchError, image_url};
use crate::kv::{KvStore, document_key};

/// Something the user dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPayload {
    /// A link; becomes the background.
    Url(String),
    /// Plain text; placed as a new object.
    Text(String),
}

/// What a pinch is driving. Fixed when the pinch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinchTarget {
    Canvas,
    Selection,
    /// The selection changed under a selection pinch; the rest of it is ignored.
    Abandoned,
}

pub struct DocumentController {
    id: Uuid,
    scene: Scene,
    selection: SelectionSet,
    transform: TransformState,
    pinch: Option<PinchTarget>,
    viewport: Size,
    background: Option<DecodedImage>,
    fetch_failure: Option<FetchError>,
    autozoom: bool,
    fetcher: AssetFetcher,
    kv: Arc<dyn KvStore>,
    retired: bool,
    revision: watch::Sender<u64>,
    default_emoji_size: i64,
}

impl DocumentController {
    /// Open document `id`, loading its snapshot from `kv` if one exists.
    ///
    /// A stored background URL starts fetching immediately, so this must be
    /// called from within a Tokio runtime.
    #[must_use]
    pub fn open(id: Uuid, kv: Arc<dyn KvStore>, source: Arc<dyn ByteSource>, default_emoji_size: i64) -> Self {
        let scene = load_scene(kv.as_ref(), id);
        let mut doc = Self {
            id,
            scene,
            selection: SelectionSet::new(),
            transform: TransformState::default(),
            pinch: None,
            viewport: Size::default(),
            background: None,
            fetch_failure: None,
            autozoom: false,
            fetcher: AssetFetcher::new(source),
            kv,
            retired: false,
            revision: watch::channel(0).0,
            default_emoji_size,
        };
        if let Some(url) = doc.scene.background_url().map(str::to_string) {
            doc.fetcher.fetch(&url);
        }
        debug!(document = %id, objects = doc.scene.len(), "document opened");
        doc
    }

    // =========================================================================
    // DERIVED STATE
    // =========================================================================

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Objects resolved to viewport coordinates, back to front.
    #[must_use]
    pub fn objects(&self) -> Vec<RenderedObject> {
        self.scene
            .objects()
            .iter()
            .map(|obj| self.transform.render(obj, self.selection.contains(obj.id), self.viewport))
            .collect()
    }

    #[must_use]
    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(id)
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    #[must_use]
    pub fn background_image(&self) -> Option<&DecodedImage> {
        self.background.as_ref()
    }

    /// Why the most recent background fetch failed, until the next one starts.
    #[must_use]
    pub fn fetch_failure(&self) -> Option<&FetchError> {
        self.fetch_failure.as_ref()
    }

    /// True while a background URL is set but no decoded image is available.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.scene.background_url().is_some() && self.background.is_none()
    }

    #[must_use]
    pub fn transform(&self) -> &TransformState {
        &self.transform
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Topmost object under a viewport point.
    #[must_use]
    pub fn object_at(&self, point: Point) -> Option<ObjectId> {
        hit::object_at(point, &self.scene, &self.selection, &self.transform, self.viewport)
    }

    /// Receiver whose value changes after every observable state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    // =========================================================================
    // SCENE INTENTS
    // =========================================================================

    /// Place `text` at a viewport point. Returns the new object's id.
    pub fn add_object(&mut self, text: &str, at: Point, size: i64) -> ObjectId {
        let (x, y) = self.transform.scene_point(at, self.viewport);
        let id = self.scene.add_object(text, x, y, size);
        debug!(document = %self.id, id, x, y, "object added");
        self.commit();
        id
    }

    /// Offset every selected object by a scene-space delta.
    pub fn move_selected(&mut self, dx: i64, dy: i64) {
        let mut changed = false;
        for id in self.selected_ids() {
            changed |= self.scene.move_object(id, dx, dy);
        }
        if changed {
            self.commit();
        }
    }

    /// Scale every selected object's size by `factor`.
    pub fn resize_selected(&mut self, factor: f64) {
        let mut changed = false;
        for id in self.selected_ids() {
            changed |= self.scene.resize_object(id, factor);
        }
        if changed {
            self.commit();
        }
    }

    /// Remove every selected object, then clear the selection.
    pub fn delete_selected(&mut self) {
        let mut removed = 0usize;
        for id in self.selected_ids() {
            if self.scene.remove_object(id).is_some() {
                removed += 1;
            }
        }
        self.selection.clear();
        self.abandon_group_gesture();
        if removed > 0 {
            debug!(document = %self.id, removed, "selection deleted");
            self.commit();
        } else {
            self.notify();
        }
    }

    /// Replace the background reference and start loading it.
    ///
    /// Any outstanding fetch is superseded. The decoded image is cleared at
    /// once; with `None` no fetch is issued.
    pub fn set_background(&mut self, url: Option<String>) {
        self.background = None;
        self.fetch_failure = None;
        match url.as_deref() {
            Some(u) => {
                self.fetcher.fetch(u);
            }
            None => self.fetcher.cancel(),
        }
        info!(document = %self.id, url = url.as_deref().unwrap_or("<none>"), "background set");
        self.scene.set_background(url);
        self.commit();
    }

    /// Handle a drop at a viewport point. Returns false for an empty payload.
    pub fn drop_payload(&mut self, payload: DropPayload, at: Point) -> bool {
        match payload {
            DropPayload::Url(raw) => {
                let url = image_url(&raw);
                if url.is_empty() {
                    return false;
                }
                self.autozoom = true;
                self.set_background(Some(url));
            }
            DropPayload::Text(text) => {
                if text.trim().is_empty() {
                    return false;
                }
                self.add_object(&text, at, self.default_emoji_size);
            }
        }
        true
    }

    // =========================================================================
    // SELECTION INTENTS
    // =========================================================================

    /// Toggle selection of an object. Ids not in the scene are ignored.
    pub fn toggle_select(&mut self, id: ObjectId) {
        if !self.scene.contains(id) {
            return;
        }
        self.selection.toggle(id);
        self.abandon_group_gesture();
        self.notify();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.abandon_group_gesture();
        self.notify();
    }

    /// A live drag or pinch belongs to the selection it started on.
    fn abandon_group_gesture(&mut self) {
        self.transform.group.cancel();
        if self.pinch == Some(PinchTarget::Selection) {
            self.pinch = Some(PinchTarget::Abandoned);
        }
    }

    // =========================================================================
    // GESTURES
    // =========================================================================

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.notify();
    }

    pub fn update_pan(&mut self, translation: Offset) {
        self.transform.camera.update_pan(translation);
        self.notify();
    }

    pub fn end_pan(&mut self, translation: Offset) {
        self.transform.camera.end_pan(translation);
        self.notify();
    }

    /// Pinch in progress. Scales the selection if there was one when the
    /// pinch started, else the canvas.
    pub fn update_zoom(&mut self, scale: f64) {
        let fallback = self.pinch_target_for_selection();
        match *self.pinch.get_or_insert(fallback) {
            PinchTarget::Canvas => self.transform.camera.update_zoom(scale),
            PinchTarget::Selection => self.transform.group.update_scale(scale),
            PinchTarget::Abandoned => {}
        }
        self.notify();
    }

    /// Finish a pinch on whatever it started on.
    pub fn end_zoom(&mut self, scale: f64) {
        let target = self.pinch.take().unwrap_or_else(|| self.pinch_target_for_selection());
        match target {
            PinchTarget::Canvas => {
                self.transform.camera.end_zoom(scale);
                self.notify();
            }
            PinchTarget::Selection => self.end_scale(scale),
            PinchTarget::Abandoned => self.notify(),
        }
    }

    fn pinch_target_for_selection(&self) -> PinchTarget {
        if self.selection.is_empty() {
            PinchTarget::Canvas
        } else {
            PinchTarget::Selection
        }
    }

    /// Selection drag in progress, in viewport pixels.
    pub fn update_drag(&mut self, translation: Offset) {
        self.transform.group.update_drag(translation);
        self.notify();
    }

    pub fn end_drag(&mut self, translation: Offset) {
        let commit = self.transform.group.end_drag(translation);
        self.apply_group_commit(commit);
    }

    pub fn update_scale(&mut self, scale: f64) {
        self.transform.group.update_scale(scale);
        self.notify();
    }

    pub fn end_scale(&mut self, scale: f64) {
        let commit = self.transform.group.end_scale(scale);
        self.apply_group_commit(commit);
    }

    /// Drop every live gesture delta without committing it.
    pub fn cancel_gestures(&mut self) {
        self.transform.cancel();
        self.pinch = None;
        self.notify();
    }

    /// Fit the decoded background into `viewport`. Returns false when there
    /// is nothing to fit.
    pub fn zoom_to_fit(&mut self, viewport: Size) -> bool {
        self.viewport = viewport;
        let fitted = self
            .transform
            .camera
            .zoom_to_fit(self.background.as_ref().map(DecodedImage::size), viewport);
        self.notify();
        fitted
    }

    fn apply_group_commit(&mut self, commit: Option<GroupCommit>) {
        match commit {
            Some(GroupCommit::Move(travel)) => {
                let (dx, dy) = self.transform.scene_translation(travel);
                self.move_selected(dx, dy);
            }
            Some(GroupCommit::Scale(factor)) => self.resize_selected(factor),
            None => {}
        }
        self.notify();
    }

    // =========================================================================
    // BACKGROUND COMPLETIONS
    // =========================================================================

    /// Apply any completions that have already arrived. Returns whether the
    /// current fetch settled.
    pub fn poll_fetches(&mut self) -> bool {
        let mut settled = false;
        while let Some(completion) = self.fetcher.try_next() {
            settled |= self.apply_completion(completion);
        }
        settled
    }

    /// Wait until the current fetch settles. Returns false immediately if no
    /// fetch is outstanding.
    pub async fn wait_for_fetch(&mut self) -> bool {
        while let Some(completion) = self.fetcher.next().await {
            if self.apply_completion(completion) {
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.fetcher.is_fetching()
    }

    fn apply_completion(&mut self, completion: FetchCompletion) -> bool {
        let Some(result) = self.fetcher.accept(completion) else {
            return false;
        };
        match result {
            Ok(image) => {
                debug!(document = %self.id, width = image.width, height = image.height, "background decoded");
                if std::mem::take(&mut self.autozoom) {
                    self.transform.camera.zoom_to_fit(Some(image.size()), self.viewport);
                }
                self.background = Some(image);
                self.fetch_failure = None;
            }
            Err(e) => {
                self.autozoom = false;
                self.background = None;
                self.fetch_failure = Some(e);
            }
        }
        self.notify();
        true
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Detach from storage. Later mutations stay in memory only.
    pub(crate) fn retire(&mut self) {
        self.retired = true;
        self.fetcher.cancel();
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Write the current snapshot. Failures are logged, never returned.
    pub(crate) fn save(&self) {
        if self.retired {
            debug!(document = %self.id, "document retired; skipping save");
            return;
        }
        let key = document_key(self.id);
        match self.scene.encode() {
            Ok(bytes) => {
                if let Err(e) = self.kv.set(&key, &bytes) {
                    error!(error = %e, %key, "snapshot write failed");
                }
            }
            Err(e) => error!(error = %e, %key, "snapshot encode failed"),
        }
    }

    fn commit(&mut self) {
        self.save();
        self.notify();
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn selected_ids(&self) -> Vec<ObjectId> {
        self.selection.iter().collect()
    }
}

fn load_scene(kv: &dyn KvStore, id: Uuid) -> Scene {
    let key = document_key(id);
    match kv.get(&key) {
        Ok(Some(bytes)) => match Scene::decode(&bytes) {
            Ok(scene) => scene,
            Err(e) => {
                warn!(error = %e, %key, "discarding unreadable snapshot");
                Scene::new()
            }
        },
        Ok(None) => Scene::new(),
        Err(e) => {
            error!(error = %e, %key, "snapshot read failed");
            Scene::new()
        }
    }
}
