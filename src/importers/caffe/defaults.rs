//! Values applied when an optional caffe field is absent.

use crate::layer::{LrnRegion, PoolingMethod};

use super::canonical::{BatchNormParams, DropoutParams, LrnParams};

pub const CONV_STRIDE: usize = 1;
pub const CONV_GROUPS: usize = 1;
pub const CONV_PAD: usize = 0;
pub const BIAS_TERM: bool = true;

pub const POOL_METHOD: PoolingMethod = PoolingMethod::Max;
pub const POOL_PAD: usize = 0;

pub const INNER_PRODUCT_TRANSPOSE: bool = false;

pub const LRN: LrnParams = LrnParams {
    local_size: 5,
    alpha: 1.0,
    beta: 0.75,
    k: 1.0,
    region: LrnRegion::AcrossChannels,
};

pub const DROPOUT: DropoutParams = DropoutParams { rate: 0.5 };

pub const BATCH_NORM: BatchNormParams = BatchNormParams {
    epsilon: 1e-5,
    momentum: 0.999,
};
