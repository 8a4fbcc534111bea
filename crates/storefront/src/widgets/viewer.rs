//! 360° product viewer.
//!
//! A pure state machine: the host feeds it pointer, keyboard, image-load and
//! timer events and renders `current_image()`. The auto-rotation timer is
//! owned by the host, which asks [`Viewer360::tick_interval`] for the period
//! and calls [`Viewer360::tick`] on each firing.

use std::collections::BTreeSet;
use std::time::Duration;

pub const DEFAULT_ROTATION_SPEED: Duration = Duration::from_millis(2000);

/// Keys the viewer reacts to in fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Space,
}

impl Key {
    /// Map a DOM-style key name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" => Some(Self::ArrowLeft),
            "ArrowRight" => Some(Self::ArrowRight),
            "Escape" => Some(Self::Escape),
            " " | "Space" => Some(Self::Space),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start_x: f64,
    start_index: usize,
}

#[derive(Debug, Clone)]
pub struct Viewer360 {
    images: Vec<String>,
    current: usize,
    auto_rotating: bool,
    rotation_speed: Duration,
    fullscreen: bool,
    drag: Option<Drag>,
    loaded: BTreeSet<usize>,
    load_failed: bool,
}

impl Viewer360 {
    #[must_use]
    pub fn new(images: Vec<String>) -> Self {
        Self {
            images,
            current: 0,
            auto_rotating: false,
            rotation_speed: DEFAULT_ROTATION_SPEED,
            fullscreen: false,
            drag: None,
            loaded: BTreeSet::new(),
            load_failed: false,
        }
    }

    #[must_use]
    pub const fn with_auto_rotate(mut self, enabled: bool) -> Self {
        self.auto_rotating = enabled;
        self
    }

    /// Time for one full revolution.
    #[must_use]
    pub const fn with_rotation_speed(mut self, speed: Duration) -> Self {
        self.rotation_speed = speed;
        self
    }

    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_image(&self) -> Option<&str> {
        self.images
            .get(self.current)
            .or_else(|| self.images.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `"3 / 12"` style position label.
    #[must_use]
    pub fn progress_label(&self) -> String {
        if self.images.is_empty() {
            return "0 / 0".to_owned();
        }
        format!("{} / {}", self.current + 1, self.images.len())
    }

    #[must_use]
    pub const fn is_auto_rotating(&self) -> bool {
        self.auto_rotating
    }

    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn step(&mut self, delta: isize) {
        if let Some(next) = wrap_index(self.current, delta, self.images.len()) {
            self.current = next;
        }
    }

    pub fn rotate_left(&mut self) {
        self.step(-1);
        self.auto_rotating = false;
    }

    pub fn rotate_right(&mut self) {
        self.step(1);
        self.auto_rotating = false;
    }

    /// Back to the front view, rotation stopped.
    pub const fn reset(&mut self) {
        self.current = 0;
        self.auto_rotating = false;
    }

    pub const fn toggle_auto_rotate(&mut self) {
        self.auto_rotating = !self.auto_rotating;
    }

    pub const fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }

    /// Pointer pressed at `x`. Stops auto-rotation.
    pub const fn drag_start(&mut self, x: f64) {
        self.drag = Some(Drag {
            start_x: x,
            start_index: self.current,
        });
        self.auto_rotating = false;
    }

    /// Pointer moved to `x` over a viewport `width` pixels wide.
    ///
    /// Dragging across the full width turns through every image once;
    /// dragging right turns backwards.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn drag_move(&mut self, x: f64, width: f64) {
        let Some(drag) = self.drag else {
            return;
        };
        let count = self.images.len();
        if count <= 1 || width <= 0.0 {
            return;
        }
        let sensitivity = width / count as f64;
        let delta = ((x - drag.start_x) / sensitivity).round() as isize;
        let back = delta.rem_euclid(count as isize);
        if let Some(next) = wrap_index(drag.start_index, -back, count) {
            self.current = next;
        }
    }

    pub const fn drag_end(&mut self) {
        self.drag = None;
    }

    /// Handle a key press. Keys are ignored outside fullscreen. Returns
    /// whether the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.fullscreen {
            return false;
        }
        match key {
            Key::ArrowLeft => self.step(-1),
            Key::ArrowRight => self.step(1),
            Key::Escape => self.fullscreen = false,
            Key::Space => self.toggle_auto_rotate(),
        }
        true
    }

    /// Auto-rotation period, or `None` while rotation should not run.
    #[must_use]
    pub fn tick_interval(&self) -> Option<Duration> {
        if !self.auto_rotating || self.is_dragging() || self.images.len() <= 1 {
            return None;
        }
        let count = u32::try_from(self.images.len()).ok()?;
        Some(self.rotation_speed / count)
    }

    /// One auto-rotation step. A no-op whenever [`Self::tick_interval`] is
    /// `None`.
    pub fn tick(&mut self) {
        if self.tick_interval().is_some() {
            self.step(1);
        }
    }

    pub fn mark_loaded(&mut self, index: usize) {
        if index < self.images.len() {
            self.loaded.insert(index);
        }
    }

    /// An image failed to load; the viewer stops waiting for the rest.
    pub const fn mark_failed(&mut self, _index: usize) {
        self.load_failed = true;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.images.is_empty() && !self.load_failed && self.loaded.len() < self.images.len()
    }

    /// Fraction of images loaded, `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn load_progress(&self) -> f64 {
        if self.images.is_empty() {
            return 0.0;
        }
        self.loaded.len() as f64 / self.images.len() as f64
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn wrap_index(current: usize, delta: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((current as isize + delta).rem_euclid(len as isize) as usize)
}
