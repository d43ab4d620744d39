//! Pixel geometry for crops and resizes.
//!
//! Offsets are signed because layers may hang off the canvas; sizes are
//! non-negative by construction.

use crate::error::SchemaError;

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Top-left corner.
    pub fn offset(&self) -> (i64, i64) {
        (self.x, self.y)
    }
}

/// Why a bounding box could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("no visible layers to compute a bounding box from")]
    NoLayers,

    #[error("degenerate bounding box: left {left}, top {top}, right {right}, bottom {bottom}")]
    Degenerate {
        left: i64,
        top: i64,
        right: i64,
        bottom: i64,
    },
}

/// Smallest rectangle covering every input rectangle, clamped to a
/// `canvas_width` x `canvas_height` canvas anchored at the origin.
pub fn bounding_box<I>(rects: I, canvas_width: i64, canvas_height: i64) -> Result<Rect, BoundsError>
where
    I: IntoIterator<Item = Rect>,
{
    let mut rects = rects.into_iter();
    let first = rects.next().ok_or(BoundsError::NoLayers)?;

    let (mut left, mut top, mut right, mut bottom) =
        (first.x, first.y, first.right(), first.bottom());
    for rect in rects {
        left = left.min(rect.x);
        top = top.min(rect.y);
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }

    let left = left.max(0);
    let top = top.max(0);
    let right = right.min(canvas_width);
    let bottom = bottom.min(canvas_height);

    if right < left || bottom < top {
        return Err(BoundsError::Degenerate {
            left,
            top,
            right,
            bottom,
        });
    }

    Ok(Rect::new(left, top, right - left, bottom - top))
}

/// Crop region selector for an export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Crop {
    /// Union of every visible leaf layer.
    BoundingBox,
    /// Exactly one named layer's extent.
    Layer(String),
}

impl Crop {
    /// Short human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Self::BoundingBox => "bounding box",
            Self::Layer(name) => name,
        }
    }
}

/// A resize rule applied after cropping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resize {
    /// Uniform scale factor.
    Scale(f64),
    /// Target width; the height follows the aspect ratio.
    Width(u32),
    /// Target height; the width follows the aspect ratio.
    Height(u32),
    /// Target width and height, scaled independently.
    Size { width: u32, height: u32 },
}

impl Resize {
    /// Validated uniform scale.
    pub fn scale(factor: f64) -> Result<Self, SchemaError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(SchemaError::invalid_resize(format!(
                "scale factor must be a positive number, got {factor}"
            )));
        }
        Ok(Self::Scale(factor))
    }

    /// Validated target size. At least one dimension is required.
    pub fn width_height(width: Option<u32>, height: Option<u32>) -> Result<Self, SchemaError> {
        match (width, height) {
            (None, None) => Err(SchemaError::invalid_resize(
                "either width or height must be given",
            )),
            (Some(0), _) | (_, Some(0)) => Err(SchemaError::invalid_resize(
                "width and height must be greater than zero",
            )),
            (Some(width), Some(height)) => Ok(Self::Size { width, height }),
            (Some(width), None) => Ok(Self::Width(width)),
            (None, Some(height)) => Ok(Self::Height(height)),
        }
    }

    /// Work out the target size and per-axis factors for a document of the
    /// given size.
    pub fn plan(&self, width: i64, height: i64) -> ScalePlan {
        match *self {
            Self::Scale(factor) => ScalePlan {
                width: round_px(factor * width as f64),
                height: round_px(factor * height as f64),
                x_factor: factor,
                y_factor: factor,
            },
            Self::Width(target_w) => {
                let factor = f64::from(target_w) / width as f64;
                ScalePlan {
                    width: i64::from(target_w),
                    height: round_px(factor * height as f64),
                    x_factor: factor,
                    y_factor: factor,
                }
            }
            Self::Height(target_h) => {
                let factor = f64::from(target_h) / height as f64;
                ScalePlan {
                    width: round_px(factor * width as f64),
                    height: i64::from(target_h),
                    x_factor: factor,
                    y_factor: factor,
                }
            }
            Self::Size {
                width: target_w,
                height: target_h,
            } => ScalePlan {
                width: i64::from(target_w),
                height: i64::from(target_h),
                x_factor: f64::from(target_w) / width as f64,
                y_factor: f64::from(target_h) / height as f64,
            },
        }
    }
}

/// Target size of a resize plus the factors that carry offsets along.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePlan {
    pub width: i64,
    pub height: i64,
    pub x_factor: f64,
    pub y_factor: f64,
}

impl ScalePlan {
    /// Scale a tracked offset, rounding each axis independently.
    pub fn scale_offset(&self, (x, y): (i64, i64)) -> (i64, i64) {
        (
            round_px(self.x_factor * x as f64),
            round_px(self.y_factor * y as f64),
        )
    }
}

/// Round to the nearest pixel, halves away from zero.
pub fn round_px(value: f64) -> i64 {
    value.round() as i64
}
