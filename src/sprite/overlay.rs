use crate::map::{ScreenPoint, Size};

/// Label font size relative to the display height
const LABEL_FONT_SCALE: f64 = 0.4;

/// Horizontal inset of the label inside the body
const LABEL_INSET_PX: f64 = 7.0;

/// Body colours light enough to need dark label text
const LIGHT_BODY_COLOURS: [&str; 2] = ["white", "yellow"];

/// Lifecycle hooks a map widget calls on anything it renders
pub trait RenderableOverlay {
    /// The overlay was added to the map and may create its render handle
    fn on_attach(&mut self);

    /// The overlay was taken off the map; its render handle must go
    fn on_detach(&mut self);

    /// Place the overlay at a projected screen point
    ///
    /// `None` means no projection is available yet; nothing moves.
    fn redraw(&mut self, screen_point: Option<ScreenPoint>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Right,
}

/// Text drawn on top of a vehicle body
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOverlay {
    pub text: String,
    pub colour: &'static str,
    pub align: TextAlign,
    pub mirrored: bool,
    pub font_size: f64,
    pub line_height: f64,
    pub inset: f64,
    pub visible: bool,
}

impl LabelOverlay {
    /// Lay out a label for a body of `body_colour` facing `heading`
    ///
    /// Bodies facing into the left half-plane are drawn upside down by the
    /// rotation, so their label is mirrored and right-aligned to stay
    /// readable.
    pub fn for_vehicle(text: &str, body_colour: &str, heading: f64, size: Size, visible: bool) -> Self {
        let faces_left = faces_left(heading);
        Self {
            text: text.to_string(),
            colour: text_colour_for(body_colour),
            align: if faces_left { TextAlign::Right } else { TextAlign::Left },
            mirrored: faces_left,
            font_size: f64::from(size.height) * LABEL_FONT_SCALE,
            line_height: f64::from(size.height),
            inset: LABEL_INSET_PX,
            visible,
        }
    }
}

/// Label text colour giving contrast against the body colour
pub fn text_colour_for(body_colour: &str) -> &'static str {
    if LIGHT_BODY_COLOURS.contains(&body_colour) {
        "black"
    } else {
        "white"
    }
}

pub fn faces_left(heading: f64) -> bool {
    heading > 180.0 || heading < 0.0
}

/// What a sprite draws: the embedded image plus placement and label
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHandle {
    /// Serialized image document, once resolved
    pub markup: Option<String>,
    pub left: f64,
    pub top: f64,
    pub size: Size,
    /// Clockwise rotation; 0 is the image pointing East
    pub rotation: f64,
    pub label: Option<LabelOverlay>,
}

impl RenderHandle {
    pub fn new(size: Size, heading: f64) -> Self {
        Self {
            markup: None,
            left: 0.0,
            top: 0.0,
            size,
            rotation: body_rotation(heading),
            label: None,
        }
    }
}

/// Rotation applied to the body so heading 0 points North
pub fn body_rotation(heading: f64) -> f64 {
    heading - 90.0
}
