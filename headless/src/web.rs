//! WebSocket server for the browser viewer. Per connection: send the
//! triangulated map once, then answer frame requests one at a time. All
//! state is the immutable loaded model, so there's nothing to lock.

use std::net::{TcpListener, TcpStream};

use anyhow::Result;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use tungstenite::{accept, Message, WebSocket};

use model::{
    agent_color, lane_triangles, AgentKind, Frame, Map, Model, TrackID, Tracks, Viewport, WayKind,
};

pub fn serve(model: &Model, port: u16) -> Result<()> {
    // The web client rescales itself; only re-center the world
    let viewport = Viewport::unscaled(&model.map)?;
    let map_msg = serde_json::to_string(&map_data_message(&viewport, &model.map))?;

    let listener = TcpListener::bind(("127.0.0.1", port))?;
    info!("serving on ws://127.0.0.1:{}", port);

    for stream in listener.incoming() {
        let stream = stream?;
        if let Err(err) = handle_client(stream, &map_msg, &viewport, &model.tracks) {
            warn!("client hung up: {}", err);
        }
    }
    Ok(())
}

fn handle_client(
    stream: TcpStream,
    map_msg: &str,
    viewport: &Viewport,
    tracks: &Tracks,
) -> Result<()> {
    let mut websocket: WebSocket<TcpStream> =
        accept(stream).map_err(|err| anyhow!("websocket handshake failed: {}", err))?;
    websocket.send(Message::Text(map_msg.to_string()))?;

    loop {
        let text = match websocket.read()? {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };
        // A malformed request is rejected without killing the connection
        match serde_json::from_str::<ClientRequest>(&text) {
            Ok(ClientRequest::RequestFrame { index }) => match tracks.get(index) {
                Some(frame) => {
                    let response = frame_message(viewport, frame, index, tracks.len());
                    websocket.send(Message::Text(serde_json::to_string(&response)?))?;
                }
                None => warn!("requested frame {} is out of range", index),
            },
            Err(err) => warn!("ignoring malformed request: {}", err),
        }
    }
}

#[derive(Serialize)]
struct MapDataMessage {
    action: &'static str,
    payload: MapPayload,
}

#[derive(Serialize)]
struct MapPayload {
    triangulated_lanes: Vec<Vec<[[f64; 2]; 3]>>,
    ways: Vec<WayPayload>,
}

#[derive(Serialize)]
struct WayPayload {
    points: Vec<[f64; 2]>,
    kind: WayKind,
}

#[derive(Serialize)]
struct FrameMessage {
    action: &'static str,
    payload: FramePayload,
}

#[derive(Serialize)]
struct FramePayload {
    current_index: usize,
    max_index: usize,
    agents: Vec<AgentPayload>,
}

#[derive(Serialize)]
struct AgentPayload {
    track_id: TrackID,
    position: [f64; 2],
    extent: [f64; 2],
    yaw: f64,
    color: [u8; 3],
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientRequest {
    RequestFrame { index: usize },
}

fn xy(pt: DVec2) -> [f64; 2] {
    [pt.x, pt.y]
}

fn map_data_message(viewport: &Viewport, map: &Map) -> MapDataMessage {
    let triangulated_lanes = map
        .lanes
        .values()
        .map(|lane| {
            lane_triangles(map, lane)
                .into_iter()
                .map(|[a, b, c]| {
                    [
                        xy(viewport.project_pt(a)),
                        xy(viewport.project_pt(b)),
                        xy(viewport.project_pt(c)),
                    ]
                })
                .collect()
        })
        .collect();

    let ways = map
        .ways
        .values()
        .map(|way| WayPayload {
            points: viewport
                .project(&map.way_points(way))
                .into_iter()
                .map(xy)
                .collect(),
            kind: way.kind,
        })
        .collect();

    MapDataMessage {
        action: "map_data",
        payload: MapPayload {
            triangulated_lanes,
            ways,
        },
    }
}

fn frame_message(
    viewport: &Viewport,
    frame: &Frame,
    current_index: usize,
    num_frames: usize,
) -> FrameMessage {
    // The web client only draws cars for now
    let agents = frame
        .agents
        .iter()
        .filter(|agent| agent.kind == AgentKind::Car)
        .filter_map(|agent| {
            let extent = agent.extent?;
            let yaw = agent.yaw?;
            let (r, g, b) = agent_color(&agent.track_id);
            Some(AgentPayload {
                track_id: agent.track_id.clone(),
                position: xy(viewport.project_pt(agent.position)),
                extent: [extent.length, extent.width],
                yaw,
                color: [r, g, b],
            })
        })
        .collect();

    FrameMessage {
        action: "frame",
        payload: FramePayload {
            current_index,
            max_index: num_frames.saturating_sub(1),
            agents,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{parse_map, Agent, Extent};

    fn corridor_map() -> Map {
        parse_map(
            r#"<osm>
              <node id="1" x="0.0" y="0.0" />
              <node id="2" x="10.0" y="0.0" />
              <node id="3" x="0.0" y="4.0" />
              <node id="4" x="10.0" y="4.0" />
              <way id="10">
                <nd ref="3" />
                <nd ref="4" />
                <tag k="type" v="line_thin" />
                <tag k="subtype" v="solid" />
              </way>
              <way id="11">
                <nd ref="1" />
                <nd ref="2" />
                <tag k="type" v="virtual" />
              </way>
              <relation id="20">
                <member type="way" role="left" ref="10" />
                <member type="way" role="right" ref="11" />
                <tag k="type" v="lanelet" />
              </relation>
            </osm>"#,
        )
        .unwrap()
    }

    #[test]
    fn map_data_shape() {
        let map = corridor_map();
        let viewport = Viewport::unscaled(&map).unwrap();
        let value = serde_json::to_value(map_data_message(&viewport, &map)).unwrap();

        assert_eq!(value["action"], "map_data");
        let lanes = value["payload"]["triangulated_lanes"].as_array().unwrap();
        assert_eq!(lanes.len(), 1);
        assert!(!lanes[0].as_array().unwrap().is_empty());
        // Every triangle is 3 points of 2 coordinates
        for triangle in lanes[0].as_array().unwrap() {
            assert_eq!(triangle.as_array().unwrap().len(), 3);
            assert_eq!(triangle[0].as_array().unwrap().len(), 2);
        }

        let ways = value["payload"]["ways"].as_array().unwrap();
        assert_eq!(ways.len(), 2);
        assert_eq!(ways[0]["kind"], "SolidLine");
        assert_eq!(ways[1]["kind"], "Virtual");
        // Unscaled projection re-centers: the corridor midpoint is (5, 2)
        assert_eq!(ways[1]["points"][0][0], -5.0);
        assert_eq!(ways[1]["points"][0][1], -2.0);
    }

    #[test]
    fn frame_only_contains_cars() {
        let map = corridor_map();
        let viewport = Viewport::unscaled(&map).unwrap();
        let frame = Frame {
            id: 4,
            agents: vec![
                Agent {
                    track_id: TrackID("7".to_string()),
                    kind: AgentKind::Car,
                    position: DVec2::new(5.0, 2.0),
                    extent: Some(Extent {
                        length: 4.0,
                        width: 2.0,
                    }),
                    yaw: Some(0.5),
                },
                Agent {
                    track_id: TrackID("P1".to_string()),
                    kind: AgentKind::Pedestrian,
                    position: DVec2::new(1.0, 1.0),
                    extent: None,
                    yaw: None,
                },
            ],
        };

        let value = serde_json::to_value(frame_message(&viewport, &frame, 4, 10)).unwrap();
        assert_eq!(value["action"], "frame");
        assert_eq!(value["payload"]["current_index"], 4);
        assert_eq!(value["payload"]["max_index"], 9);

        let agents = value["payload"]["agents"].as_array().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0]["track_id"], "7");
        assert_eq!(agents[0]["extent"][0], 4.0);
        assert_eq!(agents[0]["yaw"], 0.5);
        let (r, g, b) = agent_color(&TrackID("7".to_string()));
        assert_eq!(agents[0]["color"][0], r as i64);
        assert_eq!(agents[0]["color"][1], g as i64);
        assert_eq!(agents[0]["color"][2], b as i64);
    }

    #[test]
    fn parses_frame_requests() {
        let request: ClientRequest =
            serde_json::from_str(r#"{"action": "request_frame", "index": 3}"#).unwrap();
        let ClientRequest::RequestFrame { index } = request;
        assert_eq!(index, 3);

        assert!(serde_json::from_str::<ClientRequest>(r#"{"action": "dance"}"#).is_err());
    }
}
