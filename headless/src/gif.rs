//! Renders a whole recording to an animated GIF: the map is rasterized
//! once, then each frame of agents is drawn over a copy of it.

use std::io::BufWriter;
use std::path::Path;

use anyhow::Result;
use glam::DVec2;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame as GifFrame, RgbaImage};
use raqote::{
    DrawOptions, DrawTarget, PathBuilder, SolidSource, Source, StrokeStyle,
};

use model::{agent_color, lane_triangles, Frame, Map, Model, Viewport, WayKind};

const BACKGROUND: (u8, u8, u8) = (15, 125, 45);
const LANE_FILL: (u8, u8, u8) = (140, 140, 140);
const STOP_LINE: (u8, u8, u8) = (252, 186, 3);
const BOUNDARY: (u8, u8, u8) = (240, 240, 240);

// 10 recorded frames per second
const FRAME_DELAY_MS: u32 = 100;

pub fn write_gif(model: &Model, out: &Path, width: i32, height: i32, step: usize) -> Result<()> {
    let viewport = Viewport::new(f64::from(width), f64::from(height), &model.map)?;

    let map_target = render_map(&viewport, &model.map, width, height);
    let base_pixels: Vec<u32> = map_target.get_data().to_vec();

    let file = fs_err::File::create(out)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;

    for (idx, frame) in model.tracks.frames().iter().enumerate() {
        if idx % step != 0 {
            continue;
        }
        let mut target = DrawTarget::new(width, height);
        target.get_data_mut().copy_from_slice(&base_pixels);
        render_agents(&mut target, &viewport, frame);
        encoder.encode_frame(to_gif_frame(&target, width, height)?)?;
    }
    Ok(())
}

fn render_map(viewport: &Viewport, map: &Map, width: i32, height: i32) -> DrawTarget {
    let mut target = DrawTarget::new(width, height);
    target.clear(solid(BACKGROUND));

    for lane in map.lanes.values() {
        for triangle in lane_triangles(map, lane) {
            fill_polygon(&mut target, viewport, &triangle, LANE_FILL);
        }
    }

    for way in map.ways.values() {
        if way.kind == WayKind::StopLine {
            stroke_polyline(&mut target, viewport, &map.way_points(way), STOP_LINE, 5.0);
        }
    }

    for lane in map.lanes.values() {
        for (way, is_right) in [(&map.ways[&lane.left], false), (&map.ways[&lane.right], true)] {
            if let Some(line_width) = boundary_width(way.kind, is_right) {
                stroke_polyline(
                    &mut target,
                    viewport,
                    &map.way_points(way),
                    BOUNDARY,
                    line_width,
                );
            }
        }
    }

    target
}

fn render_agents(target: &mut DrawTarget, viewport: &Viewport, frame: &Frame) {
    for agent in &frame.agents {
        let color = agent_color(&agent.track_id);
        if let Some(footprint) = agent.footprint() {
            fill_polygon(target, viewport, &footprint, color);
        } else {
            fill_circle(target, viewport, agent.position, 5.0, color);
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

fn solid((r, g, b): (u8, u8, u8)) -> SolidSource {
    SolidSource::from_unpremultiplied_argb(255, r, g, b)
}

/// Raster y points down, world y up.
fn to_screen(viewport: &Viewport, target_height: i32, pt: DVec2) -> (f32, f32) {
    let projected = viewport.project_pt(pt);
    (
        projected.x as f32,
        target_height as f32 - projected.y as f32,
    )
}

fn fill_polygon(
    target: &mut DrawTarget,
    viewport: &Viewport,
    points: &[DVec2],
    color: (u8, u8, u8),
) {
    let mut pb = PathBuilder::new();
    for (idx, pt) in points.iter().enumerate() {
        let (x, y) = to_screen(viewport, target.height(), *pt);
        if idx == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    target.fill(
        &pb.finish(),
        &Source::Solid(solid(color)),
        &DrawOptions::new(),
    );
}

fn stroke_polyline(
    target: &mut DrawTarget,
    viewport: &Viewport,
    points: &[DVec2],
    color: (u8, u8, u8),
    line_width: f32,
) {
    if points.len() < 2 {
        return;
    }
    let mut pb = PathBuilder::new();
    for (idx, pt) in points.iter().enumerate() {
        let (x, y) = to_screen(viewport, target.height(), *pt);
        if idx == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    target.stroke(
        &pb.finish(),
        &Source::Solid(solid(color)),
        &StrokeStyle {
            width: line_width,
            ..StrokeStyle::default()
        },
        &DrawOptions::new(),
    );
}

fn fill_circle(
    target: &mut DrawTarget,
    viewport: &Viewport,
    center: DVec2,
    radius: f32,
    color: (u8, u8, u8),
) {
    let (x, y) = to_screen(viewport, target.height(), center);
    let mut pb = PathBuilder::new();
    pb.arc(x, y, radius, 0.0, 2.0 * std::f32::consts::PI);
    target.fill(
        &pb.finish(),
        &Source::Solid(solid(color)),
        &DrawOptions::new(),
    );
}

fn to_gif_frame(target: &DrawTarget, width: i32, height: i32) -> Result<GifFrame> {
    // raqote pixels are premultiplied ARGB words; everything we draw is
    // opaque, so unpacking the channels is enough
    let mut rgba = Vec::with_capacity(target.get_data().len() * 4);
    for pixel in target.get_data() {
        rgba.push((pixel >> 16) as u8);
        rgba.push((pixel >> 8) as u8);
        rgba.push(*pixel as u8);
        rgba.push((pixel >> 24) as u8);
    }
    let buffer = RgbaImage::from_raw(width as u32, height as u32, rgba)
        .ok_or_else(|| anyhow!("frame buffer doesn't match target dimensions"))?;
    Ok(GifFrame::from_parts(
        buffer,
        0,
        0,
        Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1),
    ))
}
