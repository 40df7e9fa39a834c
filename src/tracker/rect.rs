/// Smallest width, height, area or aspect a recovered box may take.
pub const MIN_DIMENSION: f32 = 1e-6;

/// Bounding box representation with format conversion utilities.
///
/// Supports three bounding box formats:
/// - TLWH: Top-Left X, Top-Left Y, Width, Height
/// - TLBR: Top-Left X, Top-Left Y, Bottom-Right X, Bottom-Right Y
/// - XYSR: Center X, Center Y, Scale (area, w*h), Ratio (aspect, w/h)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions (TLWH format).
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a Rect from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    #[inline]
    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Create a Rect from XYSR format (center x, center y, area, aspect ratio).
    ///
    /// Non-positive area or aspect is clamped to [`MIN_DIMENSION`], so the
    /// result always has finite, positive width and height.
    #[inline]
    pub fn from_xysr(cx: f32, cy: f32, area: f32, aspect_ratio: f32) -> Self {
        let area = clamp_positive(area);
        let aspect_ratio = clamp_positive(aspect_ratio);
        let width = (area * aspect_ratio).sqrt().max(MIN_DIMENSION);
        let height = (area / width).max(MIN_DIMENSION);
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2).
    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Convert to XYSR format: (center_x, center_y, area, aspect_ratio).
    #[inline]
    pub fn to_xysr(&self) -> [f32; 4] {
        let (cx, cy) = self.center();
        let aspect_ratio = if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        };
        [cx, cy, self.area(), aspect_ratio]
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    ///
    /// Disjoint boxes and a zero union (degenerate boxes) both yield 0.
    pub fn iou(&self, other: &Rect) -> f32 {
        let [ax1, ay1, ax2, ay2] = self.to_tlbr();
        let [bx1, by1, bx2, by2] = other.to_tlbr();

        let inter_width = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let inter_height = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            (inter_area / union_area).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[inline]
fn clamp_positive(v: f32) -> f32 {
    if v.is_finite() && v > MIN_DIMENSION {
        v
    } else {
        MIN_DIMENSION
    }
}

/// Detection input for the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Bounding box in TLWH format
    pub bbox: Rect,
    /// Detection confidence score
    pub score: f32,
}

impl Detection {
    /// Create a detection from top-left corner, width and height.
    pub fn new(x: f32, y: f32, width: f32, height: f32, score: f32) -> Self {
        Self {
            bbox: Rect::new(x, y, width, height),
            score,
        }
    }

    pub fn from_tlbr(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }

    #[inline]
    pub fn to_tlbr(&self) -> [f32; 4] {
        self.bbox.to_tlbr()
    }

    #[inline]
    pub fn to_xysr(&self) -> [f32; 4] {
        self.bbox.to_xysr()
    }

    /// Overlap between two detections, see [`Rect::iou`].
    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }
}
