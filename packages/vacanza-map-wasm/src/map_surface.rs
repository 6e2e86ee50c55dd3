use serde::Serialize;

use crate::models::BoundingBox;
use crate::overlays::Overlays;

/// Camera transition requested from the renderer.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraMove {
    pub pitch: f64,
    pub bearing: f64,
    pub duration: u32,
}

/// What the page needs from the map renderer.
///
/// Pointer events do not go through this trait; the host forwards them to
/// the page with geographic coordinates already resolved.
pub trait MapSurface {
    /// Visible bounds, `None` until the renderer is initialized.
    fn viewport_bounds(&self) -> Option<BoundingBox>;

    /// Enable or suppress drag-panning and rotation.
    fn set_interactive(&self, enabled: bool);

    fn render_overlays(&self, overlays: &Overlays);

    fn set_style(&self, style_url: &str);

    fn ease_camera(&self, camera: CameraMove);
}
