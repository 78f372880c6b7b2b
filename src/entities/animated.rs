//! # Animated Surfaces
//!
//! A stack of equally sized cell grids played back as frames, used as the
//! multi-cell appearance of an entity.

use crate::{CellSurface, CellSurfaceRecord, FontMetrics, GridError, GridResult, Point};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frames of cells with a playback clock.
///
/// `center` is the cell inside a frame that sits on the owning entity's
/// position, so the frame's top-left corner is `position - center`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gridglyph::AnimatedSurface;
///
/// let mut anim = AnimatedSurface::new("spin", 3, 3, 4, Duration::from_millis(100)).unwrap();
/// anim.play();
/// anim.update(Duration::from_millis(250));
/// assert_eq!(anim.current_index(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct AnimatedSurface {
    name: String,
    width: usize,
    height: usize,
    frames: Vec<CellSurface>,
    current: usize,
    frame_duration: Duration,
    elapsed: Duration,
    repeat: bool,
    is_playing: bool,
    center: Point,
    position: Point,
    dirty: bool,
}

impl AnimatedSurface {
    pub fn new(
        name: impl Into<String>,
        width: usize,
        height: usize,
        frame_count: usize,
        frame_duration: Duration,
    ) -> GridResult<Self> {
        if frame_count == 0 {
            return Err(GridError::InvalidOperation(
                "animated surface needs at least one frame".to_string(),
            ));
        }
        if frame_duration.is_zero() {
            return Err(GridError::InvalidOperation(
                "animated surface frame duration must be greater than zero".to_string(),
            ));
        }
        let frames = (0..frame_count)
            .map(|_| CellSurface::new(width, height))
            .collect::<GridResult<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            width,
            height,
            frames,
            current: 0,
            frame_duration,
            elapsed: Duration::ZERO,
            repeat: true,
            is_playing: false,
            center: Point::ZERO,
            position: Point::ZERO,
            dirty: true,
        })
    }

    /// Wraps a single static grid.
    pub fn from_surface(name: impl Into<String>, surface: CellSurface) -> Self {
        Self {
            name: name.into(),
            width: surface.width(),
            height: surface.height(),
            frames: vec![surface],
            current: 0,
            frame_duration: Duration::from_secs(1),
            elapsed: Duration::ZERO,
            repeat: false,
            is_playing: false,
            center: Point::ZERO,
            position: Point::ZERO,
            dirty: true,
        }
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn frames(&self) -> &[CellSurface] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> GridResult<&CellSurface> {
        self.frames.get(index).ok_or(GridError::OutOfRange {
            what: "frame",
            index,
            limit: self.frames.len(),
        })
    }

    /// Mutable access to a frame; marks the animation dirty.
    pub fn frame_mut(&mut self, index: usize) -> GridResult<&mut CellSurface> {
        let limit = self.frames.len();
        let frame = self.frames.get_mut(index).ok_or(GridError::OutOfRange {
            what: "frame",
            index,
            limit,
        })?;
        self.dirty = true;
        Ok(frame)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> &CellSurface {
        &self.frames[self.current]
    }

    pub fn set_current_frame(&mut self, index: usize) -> GridResult<()> {
        self.frame(index)?;
        if self.current != index {
            self.current = index;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub fn play(&mut self) {
        self.is_playing = true;
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Rewinds to the first frame and starts playing.
    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
        if self.current != 0 {
            self.current = 0;
            self.dirty = true;
        }
        self.is_playing = true;
    }

    pub fn center(&self) -> Point {
        self.center
    }

    /// Moves the anchor cell; the frame shifts so the anchor stays put.
    pub fn set_center(&mut self, center: Point) {
        if self.center != center {
            self.position = self.position + self.center - center;
            self.center = center;
            self.dirty = true;
        }
    }

    /// Cell position of the frame's top-left corner.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Places the frame so that `center` lands on `anchor`.
    pub(crate) fn anchor_at(&mut self, anchor: Point) {
        let position = anchor - self.center;
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    /// Advances playback and the current frame's cell effects. Returns whether
    /// the visible frame changed.
    pub fn update(&mut self, delta: Duration) -> bool {
        let mut changed = false;
        if self.is_playing {
            self.elapsed += delta;
            while self.elapsed >= self.frame_duration {
                self.elapsed -= self.frame_duration;
                if self.current + 1 < self.frames.len() {
                    self.current += 1;
                } else if self.repeat {
                    self.current = 0;
                } else {
                    debug!("Animation '{}' reached its last frame", self.name);
                    self.is_playing = false;
                    self.elapsed = Duration::ZERO;
                    break;
                }
                changed = true;
            }
        }
        changed |= self.frames[self.current].update_effects(delta);
        if changed {
            self.dirty = true;
        }
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.current_frame().is_dirty()
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
        if !dirty {
            self.frames[self.current].set_dirty(false);
        }
    }

    pub fn to_record(&self) -> AnimatedSurfaceRecord {
        AnimatedSurfaceRecord {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            frames: self.frames.iter().map(CellSurface::to_record).collect(),
            current: self.current,
            frame_duration: self.frame_duration,
            elapsed: self.elapsed,
            repeat: self.repeat,
            is_playing: self.is_playing,
            center: self.center,
        }
    }

    /// Rebuilds an animation; every frame must match the stated size.
    pub fn from_record(record: AnimatedSurfaceRecord, font: &FontMetrics) -> GridResult<Self> {
        let mut animation = Self::new(
            record.name,
            record.width,
            record.height,
            record.frames.len(),
            record.frame_duration,
        )?;
        animation.frames = record
            .frames
            .into_iter()
            .map(|frame| {
                if frame.width != record.width || frame.height != record.height {
                    return Err(GridError::InvalidState(format!(
                        "frame is {}x{}, animation is {}x{}",
                        frame.width, frame.height, record.width, record.height
                    )));
                }
                CellSurface::from_record(frame, font)
            })
            .collect::<GridResult<Vec<_>>>()?;
        animation.set_current_frame(record.current)?;
        animation.elapsed = record.elapsed;
        animation.repeat = record.repeat;
        animation.is_playing = record.is_playing;
        animation.center = record.center;
        Ok(animation)
    }
}

/// Stored form of an [`AnimatedSurface`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatedSurfaceRecord {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub frames: Vec<CellSurfaceRecord>,
    pub current: usize,
    pub frame_duration: Duration,
    pub elapsed: Duration,
    pub repeat: bool,
    pub is_playing: bool,
    pub center: Point,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_or_instant_animation() {
        assert!(AnimatedSurface::new("a", 2, 2, 0, Duration::from_millis(10)).is_err());
        assert!(AnimatedSurface::new("a", 2, 2, 2, Duration::ZERO).is_err());
    }

    #[test]
    fn test_playback_wraps_when_repeating() {
        let mut anim = AnimatedSurface::new("a", 1, 1, 3, Duration::from_millis(10)).unwrap();
        anim.play();
        anim.update(Duration::from_millis(35));
        assert_eq!(anim.current_index(), 0);
        assert!(anim.is_playing());
    }

    #[test]
    fn test_playback_stops_on_last_frame() {
        let mut anim = AnimatedSurface::new("a", 1, 1, 3, Duration::from_millis(10))
            .unwrap()
            .with_repeat(false);
        anim.play();
        anim.update(Duration::from_millis(100));
        assert_eq!(anim.current_index(), 2);
        assert!(!anim.is_playing());
    }

    #[test]
    fn test_stopped_animation_stays_clean() {
        let mut anim = AnimatedSurface::new("a", 1, 1, 2, Duration::from_millis(10)).unwrap();
        anim.set_dirty(false);
        assert!(!anim.update(Duration::from_millis(50)));
        assert!(!anim.is_dirty());
        assert_eq!(anim.current_index(), 0);
    }

    #[test]
    fn test_anchor_uses_center() {
        let mut anim = AnimatedSurface::new("a", 3, 3, 1, Duration::from_millis(10))
            .unwrap()
            .with_center(Point::new(1, 1));
        anim.anchor_at(Point::new(10, 5));
        assert_eq!(anim.position(), Point::new(9, 4));
    }

    #[test]
    fn test_moving_center_keeps_anchor() {
        let mut anim = AnimatedSurface::new("a", 3, 3, 1, Duration::from_millis(10)).unwrap();
        anim.anchor_at(Point::new(5, 5));
        anim.set_dirty(false);

        anim.set_center(Point::new(1, 1));
        assert_eq!(anim.position(), Point::new(4, 4));
        assert!(anim.is_dirty());

        anim.anchor_at(Point::new(5, 5));
        assert_eq!(anim.position(), Point::new(4, 4));
    }

    #[test]
    fn test_record_round_trip_keeps_playback() {
        let mut anim = AnimatedSurface::new("a", 2, 1, 3, Duration::from_millis(10)).unwrap();
        anim.play();
        anim.update(Duration::from_millis(15));

        let record = anim.to_record();
        let rebuilt = AnimatedSurface::from_record(record.clone(), &FontMetrics::default()).unwrap();
        assert_eq!(rebuilt.current_index(), 1);
        assert_eq!(rebuilt.to_record(), record);
    }

    #[test]
    fn test_record_with_mismatched_frame_is_rejected() {
        let mut record = AnimatedSurface::new("a", 2, 2, 2, Duration::from_millis(10))
            .unwrap()
            .to_record();
        record.frames[1] = CellSurface::new(3, 2).unwrap().to_record();
        assert!(AnimatedSurface::from_record(record, &FontMetrics::default()).is_err());
    }
}
