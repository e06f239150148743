use crate::utils::error::ConvertError;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    dims: Vec<usize>,
}

impl TensorDesc {
    pub fn new(dims: Vec<usize>) -> Self {
        assert!(!dims.is_empty(), "Tensor dimensions cannot be empty");
        Self { dims }
    }

    /// Like `new`, but fails when an f32 buffer of these dims could not be allocated.
    pub fn checked(dims: Vec<usize>) -> Result<Self, ConvertError> {
        let bytes = dims
            .iter()
            .try_fold(std::mem::size_of::<f32>(), |acc, d| acc.checked_mul(*d));
        match bytes {
            Some(b) if b <= isize::MAX as usize => Ok(Self::new(dims)),
            _ => Err(ConvertError::UnsupportedShape {
                field: "weights",
                detail: format!("parameter tensor {:?} is too large", dims),
            }),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    // Get dimensions
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Fan-in and fan-out for a `[out, in, k...]` parameter layout.
    pub fn calculate_fan_in_out(&self) -> (usize, usize) {
        // For 1D tensors, assume bias vector or similar
        if self.dims.len() == 1 {
            return (1, self.dims[0]);
        }

        let out_features = self.dims[0];
        let in_features = self.dims[1];

        // Any remaining dimensions represent the kernel window
        let kernel_size: usize = self.dims[2..].iter().product();

        (in_features * kernel_size, out_features * kernel_size)
    }
}

impl std::fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join("x"))
    }
}
