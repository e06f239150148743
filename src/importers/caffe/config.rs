use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::weight_initialiser::WeightInit;

use super::descriptor::VarianceNorm;

pub struct ImportConfig {
    /// Seed for the filler rng; a fresh one is drawn when `None`
    pub seed: Option<u64>,
    pub default_weight_init: WeightInit,
    pub default_bias_init: WeightInit,
    /// Require zeros in the blob regions a grouped convolution skips
    pub verify_unconnected_weights: bool,
}

impl ImportConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn build_rng(&self) -> StdRng {
        let seed = self.seed.unwrap_or_else(|| rand::rng().random());
        StdRng::seed_from_u64(seed)
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            seed: None,
            default_weight_init: WeightInit::Xavier(VarianceNorm::FanIn),
            default_bias_init: WeightInit::Constant(0.0),
            verify_unconnected_weights: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rngs_repeat() {
        let config = ImportConfig::with_seed(42);
        let a: u64 = config.build_rng().random();
        let b: u64 = config.build_rng().random();
        assert_eq!(a, b);
        assert!(config.verify_unconnected_weights);
    }
}
