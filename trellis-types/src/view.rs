use serde::{Deserialize, Serialize};

/// Scalar song-view state captured with each undo step so that undoing
/// also brings back where the user was looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub x_scroll_clip: i32,
    pub x_zoom_clip: i32,
    pub y_scroll_song: i32,
    pub x_scroll_arranger: i32,
    pub x_zoom_arranger: i32,
    pub y_scroll_arranger: i32,
    /// Scale degrees in use, one bit per semitone above the root
    pub mode_notes: u16,
    pub triplets_on: bool,
    pub triplets_level: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            x_scroll_clip: 0,
            x_zoom_clip: 6,
            y_scroll_song: 0,
            x_scroll_arranger: 0,
            x_zoom_arranger: 6,
            y_scroll_arranger: 0,
            // Major scale
            mode_notes: 0b1010_1011_0101,
            triplets_on: false,
            triplets_level: 0,
        }
    }
}
