//! Loads a lanelet-style OSM XML file (the `.osm_xy` flavor with node
//! positions already projected to meters) into a [`Map`].
//!
//! Document order matters: nodes come before the ways referencing them, and
//! ways before the lanelet relations referencing them. An unresolved
//! reference or an unrecognized way type aborts the whole load; we never
//! return a partial map.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use glam::DVec2;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::map::{Lane, LaneID, Map, Node, NodeID, Way, WayID, WayKind};

pub fn load_map_xml<P: AsRef<Path>>(path: P) -> Result<Map> {
    let path = path.as_ref();
    let xml = fs_err::read_to_string(path)?;
    parse_map(&xml).with_context(|| format!("loading map from {}", path.display()))
}

pub fn parse_map(xml: &str) -> Result<Map> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut nodes: BTreeMap<NodeID, Node> = BTreeMap::new();
    let mut ways: BTreeMap<WayID, Way> = BTreeMap::new();
    let mut lanes: BTreeMap<LaneID, Lane> = BTreeMap::new();

    let mut current_way: Option<PendingWay> = None;
    let mut current_relation: Option<PendingRelation> = None;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"node" => {
                    let id = NodeID(require_attr(&e, "id")?);
                    let x: f64 = require_attr(&e, "x")?
                        .parse()
                        .with_context(|| format!("bad x for {}", id))?;
                    let y: f64 = require_attr(&e, "y")?
                        .parse()
                        .with_context(|| format!("bad y for {}", id))?;
                    nodes.insert(
                        id.clone(),
                        Node {
                            id,
                            position: DVec2::new(x, y),
                        },
                    );
                }
                b"way" => {
                    current_way = Some(PendingWay {
                        id: WayID(require_attr(&e, "id")?),
                        nodes: Vec::new(),
                        tags: Vec::new(),
                    });
                }
                b"relation" => {
                    current_relation = Some(PendingRelation {
                        id: LaneID(require_attr(&e, "id")?),
                        left: None,
                        right: None,
                        tags: Vec::new(),
                    });
                }
                b"nd" => {
                    if let Some(ref mut way) = current_way {
                        let node_id = NodeID(require_attr(&e, "ref")?);
                        if !nodes.contains_key(&node_id) {
                            bail!("{} references unknown {}", way.id, node_id);
                        }
                        way.nodes.push(node_id);
                    }
                }
                b"tag" => {
                    let key = require_attr(&e, "k")?;
                    let value = require_attr(&e, "v")?;
                    if let Some(ref mut relation) = current_relation {
                        relation.tags.push((key, value));
                    } else if let Some(ref mut way) = current_way {
                        way.tags.push((key, value));
                    }
                }
                b"member" => {
                    if let Some(ref mut relation) = current_relation {
                        let way_ref = WayID(require_attr(&e, "ref")?);
                        match attr(&e, "role")?.as_deref() {
                            Some("left") => relation.left = Some(way_ref),
                            Some("right") => relation.right = Some(way_ref),
                            _ => {}
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"way" => {
                    if let Some(way) = current_way.take() {
                        let kind = way_kind(way.tag("type"), way.tag("subtype"))
                            .with_context(|| format!("{}", way.id))?;
                        ways.insert(
                            way.id.clone(),
                            Way {
                                id: way.id,
                                nodes: way.nodes,
                                kind,
                            },
                        );
                    }
                }
                b"relation" => {
                    if let Some(relation) = current_relation.take() {
                        // Only lanelet relations describe a drivable corridor;
                        // regulatory relations and the like are skipped.
                        if relation.tag("type") == Some("lanelet") {
                            lanes.insert(
                                relation.id.clone(),
                                relation.into_lane(&ways)?,
                            );
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(Map { nodes, ways, lanes })
}

struct PendingWay {
    id: WayID,
    nodes: Vec<NodeID>,
    tags: Vec<(String, String)>,
}

struct PendingRelation {
    id: LaneID,
    left: Option<WayID>,
    right: Option<WayID>,
    tags: Vec<(String, String)>,
}

impl PendingWay {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl PendingRelation {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn into_lane(self, ways: &BTreeMap<WayID, Way>) -> Result<Lane> {
        let left = self
            .left
            .ok_or_else(|| anyhow!("{} has no left member", self.id))?;
        let right = self
            .right
            .ok_or_else(|| anyhow!("{} has no right member", self.id))?;
        for way in [&left, &right] {
            if !ways.contains_key(way) {
                bail!("{} references unknown {}", self.id, way);
            }
        }
        Ok(Lane {
            id: self.id,
            left,
            right,
        })
    }
}

/// The closed (type, subtype) tag table. Anything outside it is malformed
/// input, not something to silently skip.
fn way_kind(way_type: Option<&str>, subtype: Option<&str>) -> Result<WayKind> {
    match way_type {
        Some("road_border") => Ok(WayKind::RoadBorder),
        Some("stop_line") => Ok(WayKind::StopLine),
        Some("guard_rail") => Ok(WayKind::GuardRail),
        Some("curbstone") => Ok(WayKind::CurbStone),
        Some("virtual") => Ok(WayKind::Virtual),
        Some("pedestrian_marking") => Ok(WayKind::PedestrianMarking),
        Some("traffic_sign") => Ok(WayKind::TrafficSign),
        Some("line_thick") => Ok(WayKind::ThickLine),
        Some("line_thin") => match subtype {
            Some("dashed") => Ok(WayKind::DashedLine),
            Some("solid") | Some("solid_solid") => Ok(WayKind::SolidLine),
            other => bail!("unknown line_thin subtype {:?}", other),
        },
        other => bail!("unknown way type {:?}", other),
    }
}

fn attr(e: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn require_attr(e: &BytesStart, name: &str) -> Result<String> {
    attr(e, name)?.ok_or_else(|| {
        anyhow!(
            "<{}> is missing the {} attribute",
            String::from_utf8_lossy(e.name().as_ref()),
            name
        )
    })
}
