#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod map;
mod osm;
mod tracks;
mod triangulate;
mod viewport;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use self::map::{Bounds, Lane, LaneID, Map, Node, NodeID, Way, WayID, WayKind};
pub use self::osm::{load_map_xml, parse_map};
pub use self::tracks::{
    agent_color, Agent, AgentKind, Extent, Frame, TrackID, Tracks, AGENT_COLORS,
};
pub use self::triangulate::lane_triangles;
pub use self::viewport::Viewport;

/// Everything a renderer needs for one recording session: the road network
/// and the recorded frames. Immutable after loading.
pub struct Model {
    pub map: Map,
    pub tracks: Tracks,
}

impl Model {
    pub fn load(map_path: &Path, track_paths: &[PathBuf]) -> Result<Self> {
        let map = load_map_xml(map_path)?;
        info!(
            "loaded map with {} nodes, {} ways, {} lanes",
            map.nodes.len(),
            map.ways.len(),
            map.lanes.len()
        );
        let tracks = Tracks::load_files(track_paths)?;
        info!("loaded {} frames", tracks.len());
        Ok(Self { map, tracks })
    }

    /// Resolves the INTERACTION dataset directory layout: the map lives at
    /// `maps/<dataset>.osm_xy`, trackfiles under
    /// `recorded_trackfiles/<dataset>/`. The vehicle trackfile must exist;
    /// the pedestrian one is merged in when present.
    pub fn load_dataset(root_dir: &Path, dataset: &str) -> Result<Self> {
        let map_path = root_dir.join("maps").join(format!("{dataset}.osm_xy"));
        let track_dir = root_dir.join("recorded_trackfiles").join(dataset);

        let vehicles = track_dir.join("vehicle_tracks_000.csv");
        if !vehicles.exists() {
            bail!("no trackfile found at {}", vehicles.display());
        }
        let mut track_paths = vec![vehicles];

        let pedestrians = track_dir.join("pedestrian_tracks_000.csv");
        if pedestrians.exists() {
            track_paths.push(pedestrians);
        }

        Self::load(&map_path, &track_paths)
    }
}
