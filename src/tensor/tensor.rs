use rand::Rng;

use crate::{
    tensor::desc::TensorDesc, utils::error::ConvertError, weight_initialiser::WeightInit,
};

/// Host-side f32 tensor, exclusively owned by the layer it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub desc: TensorDesc,
    data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(desc: TensorDesc) -> Self {
        let data = vec![0.0; desc.num_elements()];
        Self { desc, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Overwrite every element with draws from `init`.
    pub fn initialise<R: Rng + ?Sized>(
        &mut self,
        init: &WeightInit,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<(), ConvertError> {
        self.data = init.init(fan_in, fan_out, self.data.len(), rng)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn zeros_match_desc() {
        let t = Tensor::zeros(TensorDesc::new(vec![2, 3]));
        assert_eq!(t.len(), 6);
        assert!(t.data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn initialise_keeps_length() {
        let mut t = Tensor::zeros(TensorDesc::new(vec![4, 5]));
        let mut rng = StdRng::seed_from_u64(1);
        t.initialise(&WeightInit::Constant(0.25), 5, 4, &mut rng)
            .unwrap();
        assert_eq!(t.len(), 20);
        assert!(t.data().iter().all(|v| *v == 0.25));
    }
}
