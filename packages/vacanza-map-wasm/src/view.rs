// Base-map style switching and the 2D/3D camera toggle.
use crate::map_surface::CameraMove;

pub const PITCH_3D: f64 = 60.0;
pub const PITCH_2D: f64 = 0.0;
pub const CAMERA_EASE_MS: u32 = 650;

pub struct StyleCycle {
    styles: Vec<String>,
    index: usize,
}

impl StyleCycle {
    pub fn new(styles: Vec<String>, index: usize) -> Self {
        let index = if styles.is_empty() { 0 } else { index % styles.len() };
        Self { styles, index }
    }

    pub fn current(&self) -> Option<&str> {
        self.styles.get(self.index).map(String::as_str)
    }

    /// Advance to the next style, wrapping around.
    pub fn advance(&mut self) -> Option<&str> {
        if self.styles.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.styles.len();
        self.current()
    }
}

#[derive(Default)]
pub struct CameraMode {
    is_3d: bool,
}

impl CameraMode {
    pub fn from_pitch(pitch: f64) -> Self {
        Self { is_3d: pitch > 0.0 }
    }

    pub fn is_3d(&self) -> bool {
        self.is_3d
    }

    /// Flip between 2D and 3D; bearing is reset either way.
    pub fn toggle(&mut self) -> CameraMove {
        self.is_3d = !self.is_3d;
        CameraMove {
            pitch: if self.is_3d { PITCH_3D } else { PITCH_2D },
            bearing: 0.0,
            duration: CAMERA_EASE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_wrap_around() {
        let mut cycle = StyleCycle::new(vec!["a".into(), "b".into(), "c".into()], 1);
        assert_eq!(cycle.current(), Some("b"));
        assert_eq!(cycle.advance(), Some("c"));
        assert_eq!(cycle.advance(), Some("a"));
        assert_eq!(StyleCycle::new(Vec::new(), 3).advance(), None);
    }

    #[test]
    fn camera_toggle_sets_pitch_and_resets_bearing() {
        let mut mode = CameraMode::default();
        let to_3d = mode.toggle();
        assert!(mode.is_3d());
        assert_eq!(to_3d, CameraMove { pitch: 60.0, bearing: 0.0, duration: 650 });
        let to_2d = mode.toggle();
        assert_eq!(to_2d.pitch, 0.0);
        assert!(CameraMode::from_pitch(45.0).is_3d());
    }
}
