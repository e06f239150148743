use rand::Rng;
use rand::distr::{Distribution, Uniform};

use crate::{
    importers::caffe::descriptor::{FillerParameter, VarianceNorm},
    utils::{error::ConvertError, math::normal_sample},
};

/// Strategy used to fill a parameter tensor when no pretrained blob exists.
#[derive(Clone, Debug, PartialEq)]
pub enum WeightInit {
    /// Uniform in ±sqrt(3 / n)
    Xavier(VarianceNorm),
    /// Normal with std sqrt(2 / n)
    Msra(VarianceNorm),
    Gaussian { mean: f32, std: f32 },
    Uniform { min: f32, max: f32 },
    Constant(f32),
}

impl WeightInit {
    /// Resolve a filler identifier and its parameters.
    pub fn from_filler(filler: &FillerParameter) -> Result<Self, ConvertError> {
        let filler_type = filler.filler_type.as_deref().unwrap_or("constant");
        let norm = filler.variance_norm.unwrap_or_default();

        match filler_type {
            "xavier" => Ok(WeightInit::Xavier(norm)),
            "msra" => Ok(WeightInit::Msra(norm)),
            "gaussian" => {
                let std = filler.std.unwrap_or(1.0);
                if std.is_nan() || std < 0.0 {
                    return Err(ConvertError::UnsupportedFiller(format!(
                        "gaussian std must be non-negative, got {}",
                        std
                    )));
                }
                Ok(WeightInit::Gaussian {
                    mean: filler.mean.unwrap_or(0.0),
                    std,
                })
            }
            "uniform" => {
                let min = filler.min.unwrap_or(0.0);
                let max = filler.max.unwrap_or(1.0);
                if min.is_nan() || max.is_nan() || min > max {
                    return Err(ConvertError::UnsupportedFiller(format!(
                        "uniform range [{}, {}] is empty",
                        min, max
                    )));
                }
                Ok(WeightInit::Uniform { min, max })
            }
            "constant" => Ok(WeightInit::Constant(filler.value.unwrap_or(0.0))),
            other => Err(ConvertError::UnsupportedFiller(format!(
                "unknown filler type '{}'",
                other
            ))),
        }
    }

    pub fn init<R: Rng + ?Sized>(
        &self,
        fan_in: usize,
        fan_out: usize,
        total_elements: usize,
        rng: &mut R,
    ) -> Result<Vec<f32>, ConvertError> {
        match self {
            WeightInit::Xavier(norm) => {
                let n = norm.scale(fan_in, fan_out);
                let limit = (3.0 / n).sqrt();
                Self::uniform(-limit, limit, total_elements, rng)
            }

            WeightInit::Msra(norm) => {
                let n = norm.scale(fan_in, fan_out);
                let std_dev = (2.0 / n).sqrt();
                Ok((0..total_elements)
                    .map(|_| normal_sample(rng, 0.0, std_dev))
                    .collect())
            }

            WeightInit::Gaussian { mean, std } => Ok((0..total_elements)
                .map(|_| normal_sample(rng, *mean, *std))
                .collect()),

            WeightInit::Uniform { min, max } => Self::uniform(*min, *max, total_elements, rng),

            WeightInit::Constant(value) => Ok(vec![*value; total_elements]),
        }
    }

    fn uniform<R: Rng + ?Sized>(
        min: f32,
        max: f32,
        total_elements: usize,
        rng: &mut R,
    ) -> Result<Vec<f32>, ConvertError> {
        let dist = Uniform::new_inclusive(min, max).map_err(|e| {
            ConvertError::UnsupportedFiller(format!("uniform range [{}, {}]: {}", min, max, e))
        })?;
        Ok((0..total_elements).map(|_| dist.sample(rng)).collect())
    }
}

impl VarianceNorm {
    fn scale(&self, fan_in: usize, fan_out: usize) -> f32 {
        let n = match self {
            VarianceNorm::FanIn => fan_in as f32,
            VarianceNorm::FanOut => fan_out as f32,
            VarianceNorm::Average => (fan_in + fan_out) as f32 / 2.0,
        };
        n.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn filler(kind: &str) -> FillerParameter {
        FillerParameter {
            filler_type: Some(kind.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_known_fillers() {
        assert_eq!(
            WeightInit::from_filler(&filler("xavier")).unwrap(),
            WeightInit::Xavier(VarianceNorm::FanIn)
        );
        assert_eq!(
            WeightInit::from_filler(&filler("constant")).unwrap(),
            WeightInit::Constant(0.0)
        );
        assert_eq!(
            WeightInit::from_filler(&filler("gaussian")).unwrap(),
            WeightInit::Gaussian {
                mean: 0.0,
                std: 1.0
            }
        );
    }

    #[test]
    fn missing_type_means_constant() {
        let f = FillerParameter {
            value: Some(0.1),
            ..Default::default()
        };
        assert_eq!(
            WeightInit::from_filler(&f).unwrap(),
            WeightInit::Constant(0.1)
        );
    }

    #[test]
    fn rejects_unknown_filler() {
        let err = WeightInit::from_filler(&filler("bilinear")).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFiller(_)));
    }

    #[test]
    fn rejects_empty_uniform_range() {
        let f = FillerParameter {
            filler_type: Some("uniform".to_string()),
            min: Some(1.0),
            max: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            WeightInit::from_filler(&f),
            Err(ConvertError::UnsupportedFiller(_))
        ));
    }

    #[test]
    fn xavier_stays_within_limit() {
        let mut rng = StdRng::seed_from_u64(42);
        let values = WeightInit::Xavier(VarianceNorm::FanIn)
            .init(75, 150, 1000, &mut rng)
            .unwrap();
        let limit = (3.0f32 / 75.0).sqrt();
        assert_eq!(values.len(), 1000);
        assert!(values.iter().all(|v| v.abs() <= limit));
    }

    #[test]
    fn seeded_init_is_reproducible() {
        let init = WeightInit::Msra(VarianceNorm::Average);
        let a = init
            .init(8, 8, 64, &mut StdRng::seed_from_u64(3))
            .unwrap();
        let b = init
            .init(8, 8, 64, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }
}
