//! The affine world-to-screen transform every renderer shares: uniform
//! scale (never stretching x and y independently) plus translation.

use anyhow::Result;
use glam::DVec2;

use crate::map::{Bounds, Map};

#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    screen: Option<(f64, f64)>,
    bounds: Bounds,
}

impl Viewport {
    /// Fits the whole map into a screen of the given pixel dimensions,
    /// preserving aspect ratio. Fails on a map with no nodes.
    pub fn new(screen_width: f64, screen_height: f64, map: &Map) -> Result<Self> {
        Ok(Self::from_bounds(screen_width, screen_height, map.bounds()?))
    }

    /// Re-centers on the map midpoint without any rescaling, keeping units
    /// in meters. Used when the consumer (a web client) applies its own
    /// scale.
    pub fn unscaled(map: &Map) -> Result<Self> {
        Ok(Self {
            screen: None,
            bounds: map.bounds()?,
        })
    }

    pub fn from_bounds(screen_width: f64, screen_height: f64, bounds: Bounds) -> Self {
        Self {
            screen: Some((screen_width, screen_height)),
            bounds,
        }
    }

    pub fn project_pt(&self, pt: DVec2) -> DVec2 {
        let centered = pt - self.bounds.center();
        match self.screen {
            None => centered,
            Some((screen_width, screen_height)) => {
                let world = self.bounds.width().max(self.bounds.height());
                let screen = screen_width.min(screen_height);
                let scaled = if world > 0.0 {
                    centered / world * screen
                } else {
                    centered
                };
                scaled + DVec2::new(screen_width / 2.0, screen_height / 2.0)
            }
        }
    }

    /// Batch transform, preserving order.
    pub fn project(&self, points: &[DVec2]) -> Vec<DVec2> {
        points.iter().map(|pt| self.project_pt(*pt)).collect()
    }

    pub fn screen_dims(&self) -> Option<(f64, f64)> {
        self.screen
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_map;
    use approx::assert_relative_eq;

    fn square_map() -> Map {
        parse_map(
            r#"<osm>
              <node id="1" x="0.0" y="0.0" />
              <node id="2" x="100.0" y="40.0" />
            </osm>"#,
        )
        .unwrap()
    }

    #[test]
    fn empty_map_has_no_viewport() {
        let map = parse_map("<osm></osm>").unwrap();
        assert!(Viewport::new(800.0, 600.0, &map).is_err());
        assert!(Viewport::unscaled(&map).is_err());
    }

    #[test]
    fn unscaled_just_recenters() {
        let viewport = Viewport::unscaled(&square_map()).unwrap();
        let projected = viewport.project_pt(DVec2::new(50.0, 20.0));
        assert_relative_eq!(projected.x, 0.0);
        assert_relative_eq!(projected.y, 0.0);

        let corner = viewport.project_pt(DVec2::new(0.0, 0.0));
        assert_relative_eq!(corner.x, -50.0);
        assert_relative_eq!(corner.y, -20.0);
    }

    #[test]
    fn projection_round_trips() {
        let map = square_map();
        let viewport = Viewport::new(800.0, 600.0, &map).unwrap();
        let bounds = map.bounds().unwrap();
        let scale = 800.0_f64.min(600.0) / bounds.width().max(bounds.height());

        let original = DVec2::new(31.0, 17.0);
        let projected = viewport.project_pt(original);
        let recovered =
            (projected - DVec2::new(400.0, 300.0)) / scale + bounds.center();
        assert_relative_eq!(recovered.x, original.x, max_relative = 1e-12);
        assert_relative_eq!(recovered.y, original.y, max_relative = 1e-12);
    }

    #[test]
    fn scale_is_uniform_in_both_axes() {
        let viewport = Viewport::new(800.0, 600.0, &square_map()).unwrap();

        let dx = viewport.project_pt(DVec2::new(10.0, 0.0))
            - viewport.project_pt(DVec2::new(0.0, 0.0));
        let dy = viewport.project_pt(DVec2::new(0.0, 10.0))
            - viewport.project_pt(DVec2::new(0.0, 0.0));
        assert_relative_eq!(dx.x, dy.y, max_relative = 1e-12);
        assert_relative_eq!(dx.y, 0.0);
        assert_relative_eq!(dy.x, 0.0);
    }

    #[test]
    fn batch_projection_preserves_order() {
        let viewport = Viewport::new(800.0, 600.0, &square_map()).unwrap();
        let points = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(100.0, 40.0),
            DVec2::new(50.0, 20.0),
        ];
        let projected = viewport.project(&points);
        assert_eq!(projected.len(), 3);
        for (single, batched) in points.iter().zip(projected.iter()) {
            assert_eq!(viewport.project_pt(*single), *batched);
        }
    }
}
