//! Neighbor-scoped panorama texture cache.
//!
//! The cache only ever holds the textures of the current scene and the scenes
//! one click away from it. Fetching is delegated to a [`TextureSource`], which
//! does its work off the render thread and reports results through
//! [`TextureSource::poll`]; the cache itself is only touched from the render
//! loop.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::graph::SceneId;
use crate::error::TextureLoadError;

/// The external capability that turns a scene ID into a texture.
///
/// `fetch` must not block. Completed fetches, successful or not, are handed
/// back from `poll` exactly once.
pub trait TextureSource {
    /// The GPU-resident resource produced by a fetch.
    type Texture;

    /// Start fetching the panorama for `scene`.
    fn fetch(&mut self, scene: &SceneId);

    /// Fetches that finished since the last call.
    fn poll(&mut self) -> Vec<(SceneId, Result<Self::Texture, TextureLoadError>)>;
}

/// Shared, read-only reference to a cached panorama texture.
///
/// Only the [`TextureCache`] decides when a texture is dropped from the cache;
/// holders of a handle keep the resource alive until they let go of it.
#[derive(Debug)]
pub struct TextureHandle<T> {
    scene: SceneId,
    texture: Rc<T>,
}

impl<T> Clone for TextureHandle<T> {
    fn clone(&self) -> Self {
        Self {
            scene: self.scene.clone(),
            texture: Rc::clone(&self.texture),
        }
    }
}

impl<T> TextureHandle<T> {
    fn new(scene: SceneId, texture: T) -> Self {
        Self {
            scene,
            texture: Rc::new(texture),
        }
    }

    /// The scene this texture was fetched for.
    pub fn scene(&self) -> &SceneId {
        &self.scene
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    /// Whether two handles refer to the same fetched resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.texture, &other.texture)
    }
}

/// Result of a [`TextureCache::preload`] request.
#[derive(Debug)]
pub enum Preload<T> {
    /// Already cached; no fetch was issued.
    Ready(TextureHandle<T>),
    /// A fetch is in flight; completion is reported by [`TextureCache::poll`].
    Pending,
}

/// Something that happened to the cache during [`TextureCache::poll`].
#[derive(Debug)]
pub enum CacheEvent {
    /// A texture arrived and is now cached.
    Loaded(SceneId),
    /// A texture arrived for a scene that is no longer in scope and was dropped.
    Discarded(SceneId),
    /// A fetch failed. The scene stays absent from the cache.
    Failed(TextureLoadError),
}

/// Panorama textures keyed by scene, scoped to the current neighborhood.
pub struct TextureCache<S: TextureSource> {
    source: S,
    entries: HashMap<SceneId, TextureHandle<S::Texture>>,
    /// Scenes with a fetch in flight. Repeated preloads coalesce onto it.
    pending: HashSet<SceneId>,
    /// Scenes allowed into the cache; `None` until the first rescope.
    scope: Option<HashSet<SceneId>>,
}

impl<S: TextureSource> TextureCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            pending: HashSet::new(),
            scope: None,
        }
    }

    /// Make sure a texture for `id` is cached or on its way.
    ///
    /// Idempotent: a cached texture is returned as is, and a scene that is
    /// already being fetched does not get a second fetch.
    pub fn preload(&mut self, id: &SceneId) -> Preload<S::Texture> {
        if let Some(handle) = self.entries.get(id) {
            return Preload::Ready(handle.clone());
        }

        if self.pending.insert(id.clone()) {
            log::debug!("Fetching panorama '{}'", id);
            self.source.fetch(id);
        }
        Preload::Pending
    }

    /// Non-blocking lookup.
    pub fn get(&self, id: &SceneId) -> Option<TextureHandle<S::Texture>> {
        self.entries.get(id).cloned()
    }

    /// Drop every texture outside `keep` and start fetching the missing ones.
    ///
    /// Fetches for scenes outside `keep` that are still in flight are allowed
    /// to finish, but their results are discarded.
    pub fn rescope_to(&mut self, keep: &HashSet<SceneId>) {
        self.rescope_to_skipping(keep, &HashSet::new());
    }

    /// [`rescope_to`](Self::rescope_to), but scenes in `cold` stay in scope
    /// without being fetched.
    pub fn rescope_to_skipping(&mut self, keep: &HashSet<SceneId>, cold: &HashSet<SceneId>) {
        self.entries.retain(|id, _| {
            let retained = keep.contains(id);
            if !retained {
                log::debug!("Evicting panorama '{}'", id);
            }
            retained
        });
        self.scope = Some(keep.clone());

        let mut missing: Vec<&SceneId> = keep.difference(cold).collect();
        missing.sort();
        for id in missing {
            self.preload(id);
        }
    }

    /// Widen the current scope to include `id` and make sure it is cached or
    /// on its way.
    pub fn admit(&mut self, id: &SceneId) -> Preload<S::Texture> {
        if let Some(scope) = self.scope.as_mut() {
            scope.insert(id.clone());
        }
        self.preload(id)
    }

    /// Collect finished fetches from the source and fold them into the cache.
    pub fn poll(&mut self) -> Vec<CacheEvent> {
        let mut events = Vec::new();

        for (id, result) in self.source.poll() {
            self.pending.remove(&id);

            match result {
                Ok(texture) => {
                    if self.in_scope(&id) {
                        log::debug!("Panorama '{}' ready", id);
                        self.entries
                            .insert(id.clone(), TextureHandle::new(id.clone(), texture));
                        events.push(CacheEvent::Loaded(id));
                    } else {
                        log::debug!("Discarding out-of-scope panorama '{}'", id);
                        events.push(CacheEvent::Discarded(id));
                    }
                }
                Err(err) => {
                    log::warn!("{}", err);
                    events.push(CacheEvent::Failed(err));
                }
            }
        }

        events
    }

    fn in_scope(&self, id: &SceneId) -> bool {
        self.scope.as_ref().is_none_or(|scope| scope.contains(id))
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.entries.contains_key(id)
    }

    /// Whether a fetch for `id` is in flight.
    pub fn is_pending(&self, id: &SceneId) -> bool {
        self.pending.contains(id)
    }

    /// Whether any fetch is in flight.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether a fetch for any scene in `ids` is in flight.
    pub fn any_pending<'a>(&self, ids: impl IntoIterator<Item = &'a SceneId>) -> bool {
        ids.into_iter().any(|id| self.pending.contains(id))
    }

    /// Cached scene IDs, sorted.
    pub fn keys(&self) -> Vec<SceneId> {
        let mut keys: Vec<SceneId> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn key_set(&self) -> HashSet<SceneId> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
