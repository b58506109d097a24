//! Paints the map and one frame of agents onto an egui canvas, using the
//! same colors and line weights as the offline renderers.

use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke};
use glam::DVec2;

use model::{agent_color, Frame, Map, Viewport, WayKind};

const BACKGROUND: Color32 = Color32::from_rgb(15, 125, 45);
const LANE_FILL: Color32 = Color32::from_rgb(140, 140, 140);
const STOP_LINE: Color32 = Color32::from_rgb(252, 186, 3);
const BOUNDARY: Color32 = Color32::from_rgb(240, 240, 240);

pub fn draw_map(
    painter: &Painter,
    rect: Rect,
    viewport: &Viewport,
    map: &Map,
    lane_surfaces: &[Vec<[DVec2; 3]>],
) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    for triangles in lane_surfaces {
        for triangle in triangles {
            let points = triangle
                .iter()
                .map(|pt| to_screen(rect, viewport, *pt))
                .collect();
            painter.add(Shape::convex_polygon(points, LANE_FILL, Stroke::NONE));
        }
    }

    for way in map.ways.values() {
        if way.kind == WayKind::StopLine {
            let points = project_way(rect, viewport, map, way);
            painter.add(Shape::line(points, Stroke::new(5.0, STOP_LINE)));
        }
    }

    for lane in map.lanes.values() {
        for (way, is_right) in [(&map.ways[&lane.left], false), (&map.ways[&lane.right], true)] {
            if let Some(width) = boundary_width(way.kind, is_right) {
                let points = project_way(rect, viewport, map, way);
                painter.add(Shape::line(points, Stroke::new(width, BOUNDARY)));
            }
        }
    }
}

pub fn draw_frame(painter: &Painter, rect: Rect, viewport: &Viewport, frame: &Frame) {
    for agent in &frame.agents {
        let (r, g, b) = agent_color(&agent.track_id);
        let color = Color32::from_rgb(r, g, b);

        if let Some(footprint) = agent.footprint() {
            let points = footprint
                .iter()
                .map(|pt| to_screen(rect, viewport, *pt))
                .collect();
            painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
        } else {
            let center = to_screen(rect, viewport, agent.position);
            painter.circle_filled(center, 5.0, color);
        }
    }
}

/// Line weight for a lane boundary, or None when it shouldn't be drawn.
fn boundary_width(kind: WayKind, is_right: bool) -> Option<f32> {
    match kind {
        WayKind::Virtual => None,
        WayKind::ThickLine => Some(2.0),
        WayKind::DashedLine if is_right => Some(2.0),
        _ => Some(1.5),
    }
}

fn project_way(rect: Rect, viewport: &Viewport, map: &Map, way: &model::Way) -> Vec<Pos2> {
    map.way_points(way)
        .into_iter()
        .map(|pt| to_screen(rect, viewport, pt))
        .collect()
}

/// World y points up; screen y points down.
fn to_screen(rect: Rect, viewport: &Viewport, pt: DVec2) -> Pos2 {
    let projected = viewport.project_pt(pt);
    Pos2::new(
        rect.left() + projected.x as f32,
        rect.bottom() - projected.y as f32,
    )
}
