//! In-memory texture source for exercising the engine without a GPU.

use std::collections::HashSet;

use super::cache::TextureSource;
use super::graph::{SceneId, TourGraph};
use crate::error::{TextureLoadError, TextureLoadReason};

/// Stand-in for a GPU texture: remembers which scene it was fetched for.
#[derive(Debug, PartialEq)]
pub(crate) struct FakeTexture(pub SceneId);

/// Resolves every fetch on the next `poll`, unless the scene is held or failing.
#[derive(Default)]
pub(crate) struct FakeSource {
    /// Every fetch issued, in order.
    pub requested: Vec<SceneId>,
    /// Scenes whose fetches stay in flight until released.
    pub held: HashSet<SceneId>,
    /// Scenes whose fetches fail.
    pub failing: HashSet<SceneId>,
    in_flight: Vec<SceneId>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(mut self, id: &str) -> Self {
        self.held.insert(SceneId::new(id));
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(SceneId::new(id));
        self
    }

    pub fn release(&mut self, id: &str) {
        self.held.remove(&SceneId::new(id));
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.requested.iter().filter(|r| r.as_str() == id).count()
    }
}

impl TextureSource for FakeSource {
    type Texture = FakeTexture;

    fn fetch(&mut self, scene: &SceneId) {
        self.requested.push(scene.clone());
        self.in_flight.push(scene.clone());
    }

    fn poll(&mut self) -> Vec<(SceneId, Result<FakeTexture, TextureLoadError>)> {
        let (done, still): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|id| !self.held.contains(id));
        self.in_flight = still;

        done.into_iter()
            .map(|id| {
                let result = if self.failing.contains(&id) {
                    Err(TextureLoadError {
                        scene: id.clone(),
                        path: format!("{}.jpg", id).into(),
                        reason: TextureLoadReason::Io(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "no such panorama",
                        )),
                    })
                } else {
                    Ok(FakeTexture(id.clone()))
                };
                (id, result)
            })
            .collect()
    }
}

/// `pano_1 <-> pano_2`, the two-room tour used throughout the tests.
pub(crate) fn two_rooms() -> TourGraph {
    TourGraph::from_json_str(
        r#"{
            "startLocation": "pano_1",
            "pano_1": ["Lobby", { "position": [45, 3, 0], "ref": "pano_2" }],
            "pano_2": ["Hallway", { "position": [-10, 2, -25], "ref": "pano_1" }]
        }"#,
    )
    .unwrap()
}

/// A small star-and-chain tour: `hub` links to `a`, `b` and `c`; `c` links on to `d`.
pub(crate) fn hub_tour() -> TourGraph {
    TourGraph::from_json_str(
        r#"{
            "startLocation": "hub",
            "hub": ["Hub",
                { "position": [20, 0, 0], "ref": "a" },
                { "position": [0, 0, 20], "ref": "b" },
                { "position": [-20, 0, 0], "ref": "c" }],
            "a": ["A", { "position": [-20, 0, 0], "ref": "hub" }],
            "b": ["B", { "position": [0, 0, -20], "ref": "hub" }],
            "c": ["C",
                { "position": [20, 0, 0], "ref": "hub" },
                { "position": [0, 0, 20], "ref": "d" }],
            "d": ["D", { "position": [0, 0, -20], "ref": "c" }]
        }"#,
    )
    .unwrap()
}
