use safenavi_shared::LatLng;

use crate::surface::{Graphic, GraphicId, MapSurface, MarkerImage, MarkerSpec, ShapeStyle};

/// Radius rings drawn around the map center: (metres, colour).
pub const RADIUS_RINGS: [(f64, &str); 2] = [(500.0, "#337cf4"), (1000.0, "#ff5050")];
const TRACKER_IMAGE: &str = "/img/markers/marker_me.png";

/// Graphics owned by the map toolbar.
#[derive(Default)]
pub struct MapControls {
    rings: Vec<GraphicId>,
    tracker: Option<GraphicId>,
}

impl MapControls {
    /// Shows the rings around `center`, or removes them if already shown. Returns visibility.
    pub fn toggle_radius(&mut self, surface: &dyn MapSurface, center: LatLng) -> bool {
        if !self.rings.is_empty() {
            for id in self.rings.drain(..) {
                surface.remove(id);
            }
            return false;
        }
        self.rings = RADIUS_RINGS
            .iter()
            .map(|(radius, color)| {
                surface.draw(Graphic::Circle {
                    center,
                    radius_m: *radius,
                    style: ShapeStyle::area(color, color, 0.1),
                })
            })
            .collect();
        true
    }

    /// Moves the position marker, creating it on the first fix.
    pub fn track(&mut self, surface: &dyn MapSurface, at: LatLng) {
        match self.tracker {
            Some(id) => surface.move_marker(id, at),
            None => {
                let spec = MarkerSpec::at(at)
                    .image(MarkerImage::new(TRACKER_IMAGE, 24, 24))
                    .title("내 위치")
                    .z_index(20);
                self.tracker = Some(surface.draw(Graphic::Marker(spec)));
            }
        }
    }

    pub fn stop_tracking(&mut self, surface: &dyn MapSurface) {
        if let Some(id) = self.tracker.take() {
            surface.remove(id);
        }
    }
}
