//! Full-screen overlay model for the start scene.
//!
//! The overlay is plain data: a fixed set of elements addressed by
//! [`ElementId`], laid out against an ideal height of 720 pixels, plus the
//! loading indicator, an optional notice banner and the diagnostic lines. The
//! renderer turns an [`Overlay`] into 2D draw calls every frame; nothing here
//! touches the GPU, so the state machine and the dialogue presenter can be
//! exercised headless.

use std::collections::HashMap;
use std::fmt;

use glam::Vec2;

/// Height the overlay layout is designed for. Everything scales from it.
pub const IDEAL_HEIGHT: f32 = 720.0;

/// A rectangle in screen-space pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

/// RGBA color, components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn from_array(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Same color with alpha multiplied by `factor`.
    pub fn fade(self, factor: f32) -> Self {
        Self {
            a: self.a * factor,
            ..self
        }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    /// Backdrop behind the introduction text.
    pub const PANEL_BG: Color = Color::rgba(0.02, 0.02, 0.08, 0.78);
    /// Semi-transparent dark background for debug panels.
    pub const DEBUG_BG: Color = Color::rgba(0.1, 0.1, 0.1, 0.85);
    pub const DEBUG_BORDER: Color = Color::rgba(0.4, 0.4, 0.4, 1.0);
    pub const NOTICE_BG: Color = Color::rgba(0.45, 0.08, 0.08, 0.9);
}

/// Fixed overlay element ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementId {
    Intro,
    Description,
    NavigatorSx,
    NavigatorDx,
    Play,
    Start,
}

impl ElementId {
    /// Draw order, back to front.
    pub const ALL: [ElementId; 6] = [
        ElementId::Intro,
        ElementId::Description,
        ElementId::NavigatorSx,
        ElementId::NavigatorDx,
        ElementId::Play,
        ElementId::Start,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementId::Intro => "intro",
            ElementId::Description => "description",
            ElementId::NavigatorSx => "navigatorSx",
            ElementId::NavigatorDx => "navigatorDx",
            ElementId::Play => "play",
            ElementId::Start => "start",
        }
    }

    fn kind(self) -> ElementKind {
        match self {
            ElementId::Intro => ElementKind::Panel,
            ElementId::Description => ElementKind::Text,
            _ => ElementKind::Button,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Panel,
    Text,
    Button,
}

#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub rect: Rect,
    pub visible: bool,
    pub opacity: f32,
    pub text: String,
}

impl Element {
    fn new(id: ElementId, text: &str, visible: bool) -> Self {
        Self {
            kind: id.kind(),
            rect: Rect::default(),
            visible,
            opacity: 1.0,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UiError {
    #[error("overlay element '{0}' is missing")]
    MissingElement(ElementId),
}

pub struct Overlay {
    elements: HashMap<ElementId, Element>,
    width: f32,
    height: f32,
    /// Loading indicator shown over everything else.
    pub loading: bool,
    /// Error banner, e.g. when the environment failed to import.
    pub notice: Option<String>,
    /// Diagnostic lines; `None` hides the debug panel.
    pub debug: Option<Vec<String>>,
    /// Seconds since start, drives the loading animation.
    pub elapsed: f32,
}

impl Overlay {
    /// Create the start overlay: only the `start` control is visible until the
    /// introduction is revealed.
    pub fn new(width: f32, height: f32) -> Self {
        let mut elements = HashMap::new();
        elements.insert(ElementId::Intro, Element::new(ElementId::Intro, "", false));
        elements.insert(
            ElementId::Description,
            Element::new(ElementId::Description, "", false),
        );
        elements.insert(
            ElementId::NavigatorSx,
            Element::new(ElementId::NavigatorSx, "<", false),
        );
        elements.insert(
            ElementId::NavigatorDx,
            Element::new(ElementId::NavigatorDx, ">", false),
        );
        elements.insert(ElementId::Play, Element::new(ElementId::Play, "PLAY", false));
        elements.insert(ElementId::Start, Element::new(ElementId::Start, "START", true));

        let mut overlay = Self {
            elements,
            width,
            height,
            loading: false,
            notice: None,
            debug: None,
            elapsed: 0.0,
        };
        overlay.layout(width, height);
        overlay
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Pixel scale relative to [`IDEAL_HEIGHT`].
    pub fn scale(&self) -> f32 {
        (self.height / IDEAL_HEIGHT).max(0.1)
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, UiError> {
        self.elements.get(&id).ok_or(UiError::MissingElement(id))
    }

    pub fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, UiError> {
        self.elements.get_mut(&id).ok_or(UiError::MissingElement(id))
    }

    /// Check that every fixed element is present.
    pub fn validate(&self) -> Result<(), UiError> {
        for id in ElementId::ALL {
            self.element(id)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.elements.remove(&id)
    }

    /// Elements in draw order.
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        ElementId::ALL
            .into_iter()
            .filter_map(|id| self.elements.get(&id).map(|e| (id, e)))
    }

    /// Swap the `start` control for the introduction panel.
    pub fn reveal_intro(&mut self) -> Result<(), UiError> {
        self.element_mut(ElementId::Start)?.visible = false;
        for id in [
            ElementId::Intro,
            ElementId::Description,
            ElementId::NavigatorSx,
            ElementId::NavigatorDx,
            ElementId::Play,
        ] {
            self.element_mut(id)?.visible = true;
        }
        Ok(())
    }

    pub fn intro_revealed(&self) -> bool {
        self.elements
            .get(&ElementId::Intro)
            .is_some_and(|e| e.visible)
    }

    /// Hide every element. Loading, notice and debug state are kept.
    pub fn dismiss(&mut self) {
        for element in self.elements.values_mut() {
            element.visible = false;
        }
    }

    /// Topmost visible button under `point`.
    pub fn hit_test(&self, point: Vec2) -> Option<ElementId> {
        ElementId::ALL.into_iter().rev().find(|id| {
            self.elements.get(id).is_some_and(|e| {
                e.kind == ElementKind::Button && e.visible && e.opacity > 0.0 && e.rect.contains(point)
            })
        })
    }

    /// Recompute element rectangles for a new surface size.
    pub fn layout(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        let s = self.scale();

        let intro_w = (width - 80.0 * s).min(900.0 * s).max(0.0);
        let intro_h = 420.0 * s;
        let intro = Rect::new(
            (width - intro_w) * 0.5,
            (height - intro_h) * 0.5 - 30.0 * s,
            intro_w,
            intro_h,
        );

        let pad = 32.0 * s;
        let nav_w = 48.0 * s;
        let nav_h = 40.0 * s;
        let nav_y = intro.bottom() - pad - nav_h;

        let play_w = width * 0.2;
        let play_h = 40.0 * s;

        let start_w = 240.0 * s;
        let start_h = 48.0 * s;

        let rects = [
            (ElementId::Intro, intro),
            (
                ElementId::Description,
                Rect::new(
                    intro.x + pad,
                    intro.y + pad,
                    intro.width - 2.0 * pad,
                    nav_y - intro.y - 1.5 * pad,
                ),
            ),
            (
                ElementId::NavigatorSx,
                Rect::new(intro.x + pad, nav_y, nav_w, nav_h),
            ),
            (
                ElementId::NavigatorDx,
                Rect::new(intro.right() - pad - nav_w, nav_y, nav_w, nav_h),
            ),
            (
                ElementId::Play,
                Rect::new((width - play_w) * 0.5, height - 14.0 * s - play_h, play_w, play_h),
            ),
            (
                ElementId::Start,
                Rect::new((width - start_w) * 0.5, height * 0.7, start_w, start_h),
            ),
        ];

        for (id, rect) in rects {
            if let Some(element) = self.elements.get_mut(&id) {
                element.rect = rect;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_overlay_has_every_element() {
        let overlay = Overlay::new(1280.0, 720.0);
        assert!(overlay.validate().is_ok());
        assert!(overlay.element(ElementId::Start).unwrap().visible);
        assert!(!overlay.intro_revealed());
    }

    #[test]
    fn missing_element_is_an_error() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        overlay.remove(ElementId::Play);
        assert_eq!(
            overlay.validate(),
            Err(UiError::MissingElement(ElementId::Play))
        );
        assert_eq!(
            UiError::MissingElement(ElementId::Play).to_string(),
            "overlay element 'play' is missing"
        );
    }

    #[test]
    fn hit_test_ignores_hidden_controls() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        let play = overlay.element(ElementId::Play).unwrap().rect;
        let center = Vec2::new(play.x + play.width * 0.5, play.y + play.height * 0.5);
        assert_eq!(overlay.hit_test(center), None);

        overlay.reveal_intro().unwrap();
        assert_eq!(overlay.hit_test(center), Some(ElementId::Play));

        overlay.dismiss();
        assert_eq!(overlay.hit_test(center), None);
    }

    #[test]
    fn panels_are_not_clickable() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        overlay.reveal_intro().unwrap();
        let intro = overlay.element(ElementId::Intro).unwrap().rect;
        let inside = Vec2::new(intro.x + intro.width * 0.5, intro.y + 5.0);
        assert_eq!(overlay.hit_test(inside), None);
    }

    #[test]
    fn layout_scales_with_height() {
        let mut overlay = Overlay::new(1280.0, 720.0);
        let small = overlay.element(ElementId::Start).unwrap().rect;
        overlay.layout(2560.0, 1440.0);
        let large = overlay.element(ElementId::Start).unwrap().rect;
        assert!((large.width - small.width * 2.0).abs() < 1e-3);
        assert_eq!(overlay.scale(), 2.0);
    }
}
