// THEORY:
// A `DetectedRegion` is the unit the rest of the application cares about: one connected
// patch of constraint color, summarized as a bounding box, a pixel area, a center and a
// confidence score. It is a "dumb" data container, created once by the region extractor
// and never modified afterwards. Downstream code uses it to pick default logo placements
// and to check that a logo stays inside a legal area.
//
// Two simplifications are deliberate:
// 1.  The center is the midpoint of the bounding box, not the centroid of the member
//     pixels. For L-shaped or ring-shaped areas the two differ; placement defaults are
//     defined relative to the box.
// 2.  Confidence is density: the share of the bounding box actually covered by the
//     component. A solid painted rectangle scores 100, a scattered cluster scores low.

use serde::{Deserialize, Serialize};

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Inclusive corner coordinates: `(x1, y1)` top-left, `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// One connected component of the cleaned mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of member pixels.
    pub area: u64,
    /// Bounding-box midpoint.
    pub center: Point,
    /// `area / (width * height) * 100`, rounded.
    pub confidence: u8,
    pub bounding_box: BoundingBox,
}

/// A region expressed as fractions of the image size, for resolution-independent
/// placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl DetectedRegion {
    /// Builds a region from its inclusive extremes and member count.
    pub fn from_extent(min: Point, max: Point, area: u64) -> Self {
        let width = max.x - min.x + 1;
        let height = max.y - min.y + 1;
        let box_area = width as u64 * height as u64;
        let confidence = if box_area == 0 {
            0
        } else {
            ((area as f64 / box_area as f64) * 100.0).round().min(100.0) as u8
        };

        Self {
            x: min.x,
            y: min.y,
            width,
            height,
            area,
            center: Point {
                x: min.x + width / 2,
                y: min.y + height / 2,
            },
            confidence,
            bounding_box: BoundingBox {
                x1: min.x,
                y1: min.y,
                x2: max.x,
                y2: max.y,
            },
        }
    }

    pub fn bounding_box_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.bounding_box.x1
            && point.x <= self.bounding_box.x2
            && point.y >= self.bounding_box.y1
            && point.y <= self.bounding_box.y2
    }

    /// Scales the region into fractions of an `image_width` x `image_height` image.
    pub fn relative_to(&self, image_width: u32, image_height: u32) -> RelativeRegion {
        let w = image_width.max(1) as f32;
        let h = image_height.max(1) as f32;
        RelativeRegion {
            x: self.x as f32 / w,
            y: self.y as f32 / h,
            width: self.width as f32 / w,
            height: self.height as f32 / h,
            center_x: self.center.x as f32 / w,
            center_y: self.center.y as f32 / h,
        }
    }
}
