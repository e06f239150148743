use std::fmt;

use crate::utils::error::ConvertError;

/// Width x height x depth of the activation flowing along one graph edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShapeSpec {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl ShapeSpec {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// A 1-D shape of `n` features, laid out along the width axis.
    pub fn flat(n: usize) -> Self {
        Self::new(n, 1, 1)
    }

    pub fn size(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Element count, failing instead of wrapping when it does not fit `usize`.
    pub fn checked_size(&self) -> Result<usize, ConvertError> {
        self.width
            .checked_mul(self.height)
            .and_then(|area| area.checked_mul(self.depth))
            .ok_or_else(|| ConvertError::UnsupportedShape {
                field: "shape",
                detail: format!("element count of {} overflows", self),
            })
    }

    /// Build a shape from a caffe-style dims list.
    ///
    /// `[N,C,H,W]` and `[C,H,W]` keep their spatial layout, `[N,C]` and `[C]`
    /// become flat. The batch axis is dropped.
    pub fn from_dims(dims: &[i64]) -> Result<Self, ConvertError> {
        if let Some(bad) = dims.iter().find(|d| **d <= 0) {
            return Err(ConvertError::UnsupportedShape {
                field: "shape",
                detail: format!("dimension {} in {:?} is not positive", bad, dims),
            });
        }

        let d: Vec<usize> = dims.iter().map(|x| *x as usize).collect();
        let shape = match d.as_slice() {
            [_, c, h, w] | [c, h, w] => Self::new(*w, *h, *c),
            [_, c] | [c] => Self::flat(*c),
            _ => {
                return Err(ConvertError::UnsupportedShape {
                    field: "shape",
                    detail: format!("{} dimensions in {:?}, expected 1 to 4", d.len(), dims),
                });
            }
        };
        shape.checked_size()?;
        Ok(shape)
    }
}

impl fmt::Display for ShapeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}
