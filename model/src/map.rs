use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use glam::DVec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WayID(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneID(pub String);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node {}", self.0)
    }
}
impl fmt::Display for WayID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "way {}", self.0)
    }
}
impl fmt::Display for LaneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lane {}", self.0)
    }
}

/// The semantic flavor of a way's polyline, from the lanelet tagging scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WayKind {
    SolidLine,
    ThickLine,
    DashedLine,
    GuardRail,
    CurbStone,
    Virtual,
    PedestrianMarking,
    TrafficSign,
    StopLine,
    RoadBorder,
}

/// A map point in meters, already projected to local coordinates.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeID,
    pub position: DVec2,
}

/// An ordered polyline of nodes. The order is meaningful; it defines the
/// direction of a lane boundary.
#[derive(Clone, Debug)]
pub struct Way {
    pub id: WayID,
    pub nodes: Vec<NodeID>,
    pub kind: WayKind,
}

/// One lanelet: a drivable corridor bounded by a left and right way.
#[derive(Clone, Debug)]
pub struct Lane {
    pub id: LaneID,
    pub left: WayID,
    pub right: WayID,
}

/// The full road network, immutable once loaded.
#[derive(Clone, Debug)]
pub struct Map {
    pub nodes: BTreeMap<NodeID, Node>,
    pub ways: BTreeMap<WayID, Way>,
    pub lanes: BTreeMap<LaneID, Lane>,
}

impl Map {
    /// The node positions of a way, in polyline order. The loader guarantees
    /// every referenced node exists.
    pub fn way_points(&self, way: &Way) -> Vec<DVec2> {
        way.nodes.iter().map(|n| self.nodes[n].position).collect()
    }

    /// World-space bounding box over all nodes. A map with no nodes has no
    /// defined bounds.
    pub fn bounds(&self) -> Result<Bounds> {
        if self.nodes.is_empty() {
            bail!("can't compute bounds of a map with no nodes");
        }
        let mut bounds = Bounds::new();
        for node in self.nodes.values() {
            bounds.update(node.position);
        }
        Ok(bounds)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new() -> Bounds {
        Bounds {
            min_x: f64::MAX,
            min_y: f64::MAX,
            max_x: f64::MIN,
            max_y: f64::MIN,
        }
    }

    pub fn update(&mut self, pt: DVec2) {
        self.min_x = self.min_x.min(pt.x);
        self.max_x = self.max_x.max(pt.x);
        self.min_y = self.min_y.min(pt.y);
        self.max_y = self.max_y.max(pt.y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}
