//! Recorded trajectory data: CSV trackfiles grouped into per-frame
//! snapshots of every agent in the scene.

use std::collections::BTreeMap;
use std::ops::Index;
use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::DVec2;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, Deserialize)]
pub struct TrackID(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentKind {
    Car,
    Truck,
    Motorbike,
    Bicycle,
    Pedestrian,
}

/// Vehicle footprint in meters. Pedestrians and bicycles don't have one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub length: f64,
    pub width: f64,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub track_id: TrackID,
    pub kind: AgentKind,
    pub position: DVec2,
    pub extent: Option<Extent>,
    pub yaw: Option<f64>,
}

impl Agent {
    /// The world-space outline of a vehicle: a rectangle with a pointed
    /// nose, rotated by yaw about the position. None for agents without an
    /// extent or heading.
    pub fn footprint(&self) -> Option<Vec<DVec2>> {
        let extent = self.extent?;
        let yaw = self.yaw?;
        let half = DVec2::new(extent.length / 2.0, extent.width / 2.0);
        let (sin, cos) = yaw.sin_cos();
        let corners = [
            (1.0, 1.0),
            (1.2, 0.0),
            (1.0, -1.0),
            (-1.0, -1.0),
            (-1.0, 1.0),
        ];
        Some(
            corners
                .iter()
                .map(|&(dx, dy)| {
                    let offset = DVec2::new(half.x * dx, half.y * dy);
                    self.position
                        + DVec2::new(
                            offset.x * cos - offset.y * sin,
                            offset.x * sin + offset.y * cos,
                        )
                })
                .collect(),
        )
    }
}

/// One discrete timestep's snapshot across all tracked agents.
#[derive(Clone, Debug)]
pub struct Frame {
    pub id: u64,
    pub agents: Vec<Agent>,
}

/// All frames of a recording, ordered by strictly increasing frame id.
/// Read-only after loading; every renderer just indexes into it.
#[derive(Clone, Debug)]
pub struct Tracks {
    frames: Vec<Frame>,
}

impl Tracks {
    /// Loads and merges one or more trackfiles sharing a frame-id space
    /// (e.g. a vehicle file and a pedestrian file for the same recording).
    pub fn load_files(paths: &[PathBuf]) -> Result<Self> {
        let mut agents_per_frame = BTreeMap::new();
        for path in paths {
            let file = fs_err::File::open(path)?;
            read_trackfile(file, &mut agents_per_frame)
                .with_context(|| format!("loading tracks from {}", path.display()))?;
        }
        Ok(Self::from_accumulator(agents_per_frame))
    }

    pub fn load_readers<R: std::io::Read>(readers: Vec<R>) -> Result<Self> {
        let mut agents_per_frame = BTreeMap::new();
        for reader in readers {
            read_trackfile(reader, &mut agents_per_frame)?;
        }
        Ok(Self::from_accumulator(agents_per_frame))
    }

    fn from_accumulator(agents_per_frame: BTreeMap<u64, Vec<Agent>>) -> Self {
        // BTreeMap iteration already yields ascending frame ids
        Self {
            frames: agents_per_frame
                .into_iter()
                .map(|(id, agents)| Frame { id, agents })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Frame> {
        self.frames.get(idx)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl Index<usize> for Tracks {
    type Output = Frame;

    fn index(&self, idx: usize) -> &Frame {
        &self.frames[idx]
    }
}

#[derive(Deserialize)]
struct Record {
    frame_id: u64,
    track_id: String,
    agent_type: String,
    x: f64,
    y: f64,
    // Pedestrian files don't carry these columns at all
    #[serde(default)]
    psi_rad: Option<f64>,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
}

fn read_trackfile<R: std::io::Read>(
    reader: R,
    agents_per_frame: &mut BTreeMap<u64, Vec<Agent>>,
) -> Result<()> {
    for record in csv::Reader::from_reader(reader).deserialize() {
        let record: Record = record?;
        let kind = parse_agent_kind(&record.agent_type)?;
        let extent = match (record.length, record.width) {
            (Some(length), Some(width)) => Some(Extent { length, width }),
            (None, None) => None,
            _ => bail!(
                "track {} frame {} has only one of length/width",
                record.track_id,
                record.frame_id
            ),
        };

        agents_per_frame
            .entry(record.frame_id)
            .or_insert_with(Vec::new)
            .push(Agent {
                track_id: TrackID(record.track_id),
                kind,
                position: DVec2::new(record.x, record.y),
                extent,
                yaw: record.psi_rad,
            });
    }
    Ok(())
}

fn parse_agent_kind(raw: &str) -> Result<AgentKind> {
    match raw {
        "car" => Ok(AgentKind::Car),
        "pedestrian" => Ok(AgentKind::Pedestrian),
        "pedestrian/bicycle" => Ok(AgentKind::Bicycle),
        other => bail!("unrecognized agent_type {:?}", other),
    }
}

pub const AGENT_COLORS: [(u8, u8, u8); 10] = [
    (161, 201, 244),
    (255, 180, 130),
    (141, 229, 161),
    (255, 159, 155),
    (208, 187, 255),
    (222, 187, 155),
    (250, 176, 228),
    (207, 207, 207),
    (255, 254, 163),
    (185, 242, 240),
];

/// Palette color for a track. FNV-1a rather than the std hasher, so the
/// assignment is stable across processes and matches what a web client can
/// reproduce.
pub fn agent_color(track_id: &TrackID) -> (u8, u8, u8) {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in track_id.0.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    AGENT_COLORS[(hash % AGENT_COLORS.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn load_one_vehicle_row() {
        let csv = "frame_id,track_id,agent_type,x,y,psi_rad,length,width\n\
                   0,7,car,1.0,2.0,0.0,4,2\n";
        let tracks = Tracks::load_readers(vec![Cursor::new(csv)]).unwrap();
        assert_eq!(tracks.len(), 1);

        let frame = &tracks[0];
        assert_eq!(frame.id, 0);
        assert_eq!(frame.agents.len(), 1);

        let agent = &frame.agents[0];
        assert_eq!(agent.track_id, TrackID("7".to_string()));
        assert_eq!(agent.kind, AgentKind::Car);
        assert_eq!(agent.position, DVec2::new(1.0, 2.0));
        assert_eq!(
            agent.extent,
            Some(Extent {
                length: 4.0,
                width: 2.0
            })
        );
        assert_eq!(agent.yaw, Some(0.0));
    }

    #[test]
    fn pedestrian_rows_have_no_extent() {
        let csv = "frame_id,track_id,agent_type,x,y\n\
                   3,P1,pedestrian,5.0,6.0\n\
                   3,P2,pedestrian/bicycle,7.0,8.0\n";
        let tracks = Tracks::load_readers(vec![Cursor::new(csv)]).unwrap();
        let frame = &tracks[0];
        assert_eq!(frame.agents[0].kind, AgentKind::Pedestrian);
        assert_eq!(frame.agents[0].extent, None);
        assert_eq!(frame.agents[0].yaw, None);
        assert!(frame.agents[0].footprint().is_none());
        assert_eq!(frame.agents[1].kind, AgentKind::Bicycle);
    }

    #[test]
    fn merges_frame_ids_across_files() {
        let vehicles = "frame_id,track_id,agent_type,x,y,psi_rad,length,width\n\
                        1,1,car,0,0,0,4,2\n\
                        3,1,car,1,0,0,4,2\n";
        let pedestrians = "frame_id,track_id,agent_type,x,y\n\
                           2,P1,pedestrian,0,0\n\
                           3,P1,pedestrian,0,1\n";
        let tracks =
            Tracks::load_readers(vec![Cursor::new(vehicles), Cursor::new(pedestrians)]).unwrap();

        let ids: Vec<u64> = tracks.frames().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(tracks[0].agents.len(), 1);
        assert_eq!(tracks[1].agents.len(), 1);
        // Frame 3 merges agents from both files
        assert_eq!(tracks[2].agents.len(), 2);
    }

    #[test]
    fn rejects_unknown_agent_type() {
        let csv = "frame_id,track_id,agent_type,x,y\n\
                   0,1,hovercraft,0,0\n";
        assert!(Tracks::load_readers(vec![Cursor::new(csv)]).is_err());
    }

    #[test]
    fn colors_are_stable_and_in_palette() {
        let id = TrackID("42".to_string());
        let color = agent_color(&id);
        assert_eq!(color, agent_color(&id));
        assert!(AGENT_COLORS.contains(&color));
    }

    #[test]
    fn footprint_is_rotated_about_position() {
        let agent = Agent {
            track_id: TrackID("1".to_string()),
            kind: AgentKind::Car,
            position: DVec2::new(10.0, 20.0),
            extent: Some(Extent {
                length: 4.0,
                width: 2.0,
            }),
            yaw: Some(std::f64::consts::FRAC_PI_2),
        };
        let footprint = agent.footprint().unwrap();
        assert_eq!(footprint.len(), 5);
        // Rotated 90 degrees, the nose points along +y
        let nose = footprint[1];
        assert!((nose.x - 10.0).abs() < 1e-9);
        assert!((nose.y - 22.4).abs() < 1e-9);
    }
}
