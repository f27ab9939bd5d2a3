//! The tour graph: scenes, their display names and the hotspots linking them.
//!
//! A [`TourGraph`] is loaded once from a JSON description and never mutated
//! afterwards. The canonical description looks like:
//!
//! ```json
//! {
//!   "startLocation": "pano_1",
//!   "imageDirectory": "images",
//!   "pano_1": ["Lobby", { "position": [45, 3, 0], "ref": "pano_2" }],
//!   "pano_2": ["Hallway", { "position": [-10, 2, -25], "ref": "pano_1" }]
//! }
//! ```
//!
//! Index 0 of every scene array is the display name; the remaining entries are
//! hotspots. Hotspot objects accept exactly `position` and `ref`.

use glam::Vec3;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::MalformedGraphError;

/// Unique identifier for a panorama scene.
///
/// Scene IDs are the keys of the tour description and double as the file stem
/// of the scene's panorama image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub(crate) String);

impl SceneId {
    /// Create a new scene ID from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the scene ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SceneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A clickable marker placed inside a scene, linking to another scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Hotspot {
    /// World-space position of the marker inside the panorama sphere.
    pub position: Vec3,
    /// Scene to navigate to when the marker is clicked.
    pub target: SceneId,
}

/// One panorama: its display name and ordered hotspots.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: SceneId,
    pub display_name: String,
    /// Hotspots in declaration order. Order decides hit-test priority.
    pub hotspots: Vec<Hotspot>,
}

impl SceneNode {
    /// Targets of this scene's hotspots, in declaration order, without duplicates.
    pub fn neighbors(&self) -> Vec<SceneId> {
        let mut seen = HashSet::new();
        self.hotspots
            .iter()
            .filter(|h| seen.insert(&h.target))
            .map(|h| h.target.clone())
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHotspot {
    position: [f32; 3],
    #[serde(rename = "ref")]
    target: String,
}

/// The complete, validated, read-only graph of scenes.
#[derive(Clone, Debug)]
pub struct TourGraph {
    start: SceneId,
    image_directory: Option<PathBuf>,
    nodes: HashMap<SceneId, SceneNode>,
}

impl TourGraph {
    /// Load and validate a tour description from a JSON file.
    ///
    /// A relative `imageDirectory` is taken relative to the tour file; without
    /// one, panoramas are looked up next to the tour file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MalformedGraphError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| MalformedGraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut graph = Self::from_json_str(&source)?;
        let base = path.parent().unwrap_or(Path::new(""));
        graph.image_directory = Some(match graph.image_directory.take() {
            Some(directory) => base.join(directory),
            None => base.to_path_buf(),
        });

        log::info!(
            "Loaded tour '{}' with {} scenes (start: {})",
            path.display(),
            graph.nodes.len(),
            graph.start
        );
        Ok(graph)
    }

    /// Parse and validate a tour description from a JSON string.
    pub fn from_json_str(source: &str) -> Result<Self, MalformedGraphError> {
        let Value::Object(mut map) = serde_json::from_str::<Value>(source)? else {
            return Err(MalformedGraphError::NotAnObject);
        };

        let start = match map.remove("startLocation") {
            Some(Value::String(s)) => SceneId::from(s),
            _ => return Err(MalformedGraphError::MissingStartLocation),
        };

        let image_directory = match map.remove("imageDirectory") {
            None | Some(Value::Null) => None,
            Some(value) => Some(PathBuf::from(serde_json::from_value::<String>(value)?)),
        };

        let mut nodes = HashMap::with_capacity(map.len());
        for (key, value) in map {
            let node = parse_scene(&key, value)?;
            nodes.insert(node.id.clone(), node);
        }

        let graph = Self {
            start,
            image_directory,
            nodes,
        };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), MalformedGraphError> {
        if !self.nodes.contains_key(&self.start) {
            return Err(MalformedGraphError::UnknownStartLocation(self.start.clone()));
        }

        // Sorted so the reported error is the same on every run.
        let mut ids: Vec<&SceneId> = self.nodes.keys().collect();
        ids.sort();
        for id in ids {
            for (index, hotspot) in self.nodes[id].hotspots.iter().enumerate() {
                if !self.nodes.contains_key(&hotspot.target) {
                    return Err(MalformedGraphError::DanglingHotspot {
                        scene: id.clone(),
                        index,
                        target: hotspot.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Override the directory panorama images are resolved against.
    pub fn with_image_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.image_directory = Some(directory.into());
        self
    }

    /// The scene the tour starts in.
    pub fn start(&self) -> &SceneId {
        &self.start
    }

    /// Directory panorama images are resolved against, if any.
    pub fn image_directory(&self) -> Option<&Path> {
        self.image_directory.as_deref()
    }

    /// Look up a scene.
    pub fn node(&self, id: &SceneId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Whether `id` names a scene in this tour.
    pub fn contains(&self, id: &SceneId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of scenes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All scene IDs, sorted.
    pub fn scene_ids(&self) -> Vec<&SceneId> {
        let mut ids: Vec<&SceneId> = self.nodes.keys().collect();
        ids.sort();
        ids
    }

    /// Scenes reachable from `id` with one click. Empty for unknown scenes.
    pub fn neighbors(&self, id: &SceneId) -> Vec<SceneId> {
        self.node(id).map(SceneNode::neighbors).unwrap_or_default()
    }

    /// `{id} ∪ neighbors(id)`: the set of scenes whose textures stay cached while `id` is shown.
    pub fn neighborhood(&self, id: &SceneId) -> HashSet<SceneId> {
        let mut keep: HashSet<SceneId> = self.neighbors(id).into_iter().collect();
        keep.insert(id.clone());
        keep
    }

    /// Path of the panorama image for `id`: `<imageDirectory>/<id>.jpg`.
    pub fn texture_path(&self, id: &SceneId) -> PathBuf {
        panorama_path(self.image_directory(), id)
    }
}

/// Resolve the panorama image of `id` inside `directory`.
pub fn panorama_path(directory: Option<&Path>, id: &SceneId) -> PathBuf {
    let file = format!("{}.jpg", id.as_str());
    match directory {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

fn parse_scene(key: &str, value: Value) -> Result<SceneNode, MalformedGraphError> {
    let invalid = |message: String| MalformedGraphError::InvalidScene {
        scene: key.to_string(),
        message,
    };

    let Value::Array(entries) = value else {
        return Err(invalid("expected an array".to_string()));
    };
    let mut entries = entries.into_iter();

    let display_name = match entries.next() {
        Some(Value::String(name)) => name,
        Some(_) => return Err(invalid("index 0 must be the display name".to_string())),
        None => return Err(invalid("missing display name".to_string())),
    };

    let hotspots = entries
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<RawHotspot>(entry)
                .map(|raw| Hotspot {
                    position: Vec3::from_array(raw.position),
                    target: SceneId::from(raw.target),
                })
                .map_err(|e| invalid(format!("hotspot {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SceneNode {
        id: SceneId::new(key),
        display_name,
        hotspots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROOMS: &str = r#"{
        "startLocation": "pano_1",
        "imageDirectory": "images",
        "pano_1": ["Lobby", { "position": [45, 3, 0], "ref": "pano_2" }],
        "pano_2": ["Hallway", { "position": [-10, 2, -25], "ref": "pano_1" }]
    }"#;

    #[test]
    fn parses_canonical_description() {
        let graph = TourGraph::from_json_str(TWO_ROOMS).unwrap();

        assert_eq!(graph.start(), &SceneId::new("pano_1"));
        assert_eq!(graph.len(), 2);

        let lobby = graph.node(&"pano_1".into()).unwrap();
        assert_eq!(lobby.display_name, "Lobby");
        assert_eq!(lobby.hotspots.len(), 1);
        assert_eq!(lobby.hotspots[0].position, Vec3::new(45.0, 3.0, 0.0));
        assert_eq!(lobby.hotspots[0].target, SceneId::new("pano_2"));
    }

    #[test]
    fn neighborhood_includes_self() {
        let graph = TourGraph::from_json_str(TWO_ROOMS).unwrap();
        let keep = graph.neighborhood(&"pano_1".into());

        assert_eq!(keep.len(), 2);
        assert!(keep.contains(&SceneId::new("pano_1")));
        assert!(keep.contains(&SceneId::new("pano_2")));
    }

    #[test]
    fn neighbors_keep_declaration_order_without_duplicates() {
        let graph = TourGraph::from_json_str(
            r#"{
                "startLocation": "a",
                "a": ["A",
                    { "position": [1, 0, 0], "ref": "c" },
                    { "position": [2, 0, 0], "ref": "b" },
                    { "position": [3, 0, 0], "ref": "c" }],
                "b": ["B"],
                "c": ["C"]
            }"#,
        )
        .unwrap();

        assert_eq!(
            graph.neighbors(&"a".into()),
            vec![SceneId::new("c"), SceneId::new("b")]
        );
        assert!(graph.neighbors(&"b".into()).is_empty());
    }

    #[test]
    fn texture_path_uses_image_directory() {
        let graph = TourGraph::from_json_str(TWO_ROOMS).unwrap();
        assert_eq!(
            graph.texture_path(&"pano_2".into()),
            PathBuf::from("images").join("pano_2.jpg")
        );

        let graph = graph.with_image_directory("/srv/panos");
        assert_eq!(
            graph.texture_path(&"pano_2".into()),
            PathBuf::from("/srv/panos/pano_2.jpg")
        );
    }

    #[test]
    fn rejects_dangling_hotspot() {
        let err = TourGraph::from_json_str(
            r#"{
                "startLocation": "a",
                "a": ["A", { "position": [1, 0, 0], "ref": "missing" }]
            }"#,
        )
        .unwrap_err();

        match err {
            MalformedGraphError::DanglingHotspot { scene, index, target } => {
                assert_eq!(scene, SceneId::new("a"));
                assert_eq!(index, 0);
                assert_eq!(target, SceneId::new("missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_start() {
        let err = TourGraph::from_json_str(r#"{ "startLocation": "nowhere", "a": ["A"] }"#)
            .unwrap_err();
        assert!(matches!(err, MalformedGraphError::UnknownStartLocation(_)));
    }

    #[test]
    fn rejects_missing_start() {
        let err = TourGraph::from_json_str(r#"{ "a": ["A"] }"#).unwrap_err();
        assert!(matches!(err, MalformedGraphError::MissingStartLocation));
    }

    #[test]
    fn rejects_legacy_schemas() {
        // Misspelled position field.
        let err = TourGraph::from_json_str(
            r#"{
                "startLocation": "a",
                "a": ["A", { "possition": [1, 0, 0], "ref": "a" }]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, MalformedGraphError::InvalidScene { .. }));

        // Flat hotspot array without a display name.
        let err = TourGraph::from_json_str(
            r#"{
                "startLocation": "a",
                "a": [{ "position": [1, 0, 0], "ref": "a" }]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, MalformedGraphError::InvalidScene { .. }));
    }

    #[test]
    fn rejects_non_object_and_bad_json() {
        assert!(matches!(
            TourGraph::from_json_str("[1, 2]").unwrap_err(),
            MalformedGraphError::NotAnObject
        ));
        assert!(matches!(
            TourGraph::from_json_str("{ not json").unwrap_err(),
            MalformedGraphError::Parse(_)
        ));
    }

    #[test]
    fn load_resolves_images_next_to_the_tour_file() {
        let dir = std::env::temp_dir().join(format!("panotour-graph-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tour.json");
        std::fs::write(&path, TWO_ROOMS).unwrap();

        let graph = TourGraph::load(&path).unwrap();
        assert_eq!(
            graph.texture_path(&SceneId::new("pano_2")),
            dir.join("images").join("pano_2.jpg")
        );

        let missing = TourGraph::load(dir.join("missing.json"));
        assert!(matches!(missing, Err(MalformedGraphError::Io { .. })));
    }
}
