//! Facial landmark geometry

use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Number of contour points describing one eye
pub const EYE_POINTS: usize = 6;

/// 2D point, either normalized [0, 1] or in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// The six contour points of one eye, in fixed order:
///
/// ```text
///        1   2
///   0             3
///        5   4
/// ```
///
/// 0 and 3 are the corners, 1/5 and 2/4 are the upper/lower lid pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarks {
    points: [Point; EYE_POINTS],
}

impl EyeLandmarks {
    pub fn new(points: [Point; EYE_POINTS]) -> Result<Self, DmsError> {
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(DmsError::InvalidLandmarks(format!(
                "non-finite eye point ({}, {})",
                bad.x, bad.y
            )));
        }
        Ok(Self { points })
    }

    pub fn from_slice(points: &[Point]) -> Result<Self, DmsError> {
        let points: [Point; EYE_POINTS] = points.try_into().map_err(|_| {
            DmsError::InvalidLandmarks(format!(
                "expected {} eye points, got {}",
                EYE_POINTS,
                points.len()
            ))
        })?;
        Self::new(points)
    }

    pub fn points(&self) -> &[Point; EYE_POINTS] {
        &self.points
    }
}

/// Where each eye contour point sits in a detector's landmark numbering.
///
/// Field order matches the `EyeLandmarks` point order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndexSet {
    /// Point 0: corner the contour starts from
    pub first_corner: usize,
    /// Point 1: upper lid, near the first corner
    pub upper_near_first: usize,
    /// Point 2: upper lid, near the second corner
    pub upper_near_second: usize,
    /// Point 3: opposite corner
    pub second_corner: usize,
    /// Point 4: lower lid, below point 2
    pub lower_near_second: usize,
    /// Point 5: lower lid, below point 1
    pub lower_near_first: usize,
}

impl EyeIndexSet {
    /// MediaPipe Face Mesh, left eye in image space (33 outer, 133 inner corner)
    pub const MEDIAPIPE_LEFT: Self = Self {
        first_corner: 33,
        upper_near_first: 160,
        upper_near_second: 158,
        second_corner: 133,
        lower_near_second: 153,
        lower_near_first: 144,
    };

    /// MediaPipe Face Mesh, right eye in image space (362 inner, 263 outer corner)
    pub const MEDIAPIPE_RIGHT: Self = Self {
        first_corner: 362,
        upper_near_first: 385,
        upper_near_second: 387,
        second_corner: 263,
        lower_near_second: 373,
        lower_near_first: 380,
    };

    pub fn indices(&self) -> [usize; EYE_POINTS] {
        [
            self.first_corner,
            self.upper_near_first,
            self.upper_near_second,
            self.second_corner,
            self.lower_near_second,
            self.lower_near_first,
        ]
    }
}

/// All landmarks of one detected face, normalized to [0, 1]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    pub points: Vec<Point>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Pick one eye and scale it to pixel space.
    ///
    /// Coordinates are truncated to whole pixels.
    pub fn eye(
        &self,
        set: &EyeIndexSet,
        width: u32,
        height: u32,
    ) -> Result<EyeLandmarks, DmsError> {
        let (w, h) = (width as f64, height as f64);
        let mut points = [Point::default(); EYE_POINTS];
        for (slot, index) in points.iter_mut().zip(set.indices()) {
            let p = self.points.get(index).ok_or_else(|| {
                DmsError::InvalidLandmarks(format!(
                    "landmark {} missing, face has {} points",
                    index,
                    self.points.len()
                ))
            })?;
            *slot = Point::new((p.x * w).trunc(), (p.y * h).trunc());
        }
        EyeLandmarks::new(points)
    }
}
