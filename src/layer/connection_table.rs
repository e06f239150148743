use crate::utils::error::ConvertError;

/// Which input channels feed which output channels of a (de)convolution.
///
/// Grouping is block-diagonal: output `o` sees input `i` iff both fall in the
/// same group. A single group is full connectivity and stores no mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionTable {
    in_channels: usize,
    out_channels: usize,
    groups: usize,
    // row-major out_channels x in_channels, None when fully connected
    mask: Option<Vec<bool>>,
}

impl ConnectionTable {
    pub fn full(in_channels: usize, out_channels: usize) -> Self {
        Self {
            in_channels,
            out_channels,
            groups: 1,
            mask: None,
        }
    }

    pub fn grouped(
        groups: usize,
        in_channels: usize,
        out_channels: usize,
    ) -> Result<Self, ConvertError> {
        if groups == 0 || in_channels % groups != 0 || out_channels % groups != 0 {
            return Err(ConvertError::InvalidGroupCount {
                groups,
                in_channels,
                out_channels,
            });
        }

        if groups == 1 {
            return Ok(Self::full(in_channels, out_channels));
        }

        let in_per_group = in_channels / groups;
        let out_per_group = out_channels / groups;

        let cells = out_channels
            .checked_mul(in_channels)
            .ok_or_else(|| ConvertError::UnsupportedShape {
                field: "group",
                detail: format!(
                    "connection table of {}x{} channels is too large",
                    out_channels, in_channels
                ),
            })?;
        let mut mask = vec![false; cells];
        for o in 0..out_channels {
            for i in 0..in_channels {
                mask[o * in_channels + i] = i / in_per_group == o / out_per_group;
            }
        }

        Ok(Self {
            in_channels,
            out_channels,
            groups,
            mask: Some(mask),
        })
    }

    pub fn is_connected(&self, out_channel: usize, in_channel: usize) -> bool {
        if out_channel >= self.out_channels || in_channel >= self.in_channels {
            return false;
        }
        match &self.mask {
            None => true,
            Some(mask) => mask[out_channel * self.in_channels + in_channel],
        }
    }

    pub fn is_full(&self) -> bool {
        self.mask.is_none()
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn in_channels_per_group(&self) -> usize {
        self.in_channels / self.groups
    }

    /// Number of connected (out, in) pairs.
    pub fn connection_count(&self) -> usize {
        match &self.mask {
            None => self.in_channels * self.out_channels,
            Some(mask) => mask.iter().filter(|c| **c).count(),
        }
    }
}
