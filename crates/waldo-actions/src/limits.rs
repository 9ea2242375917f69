//! Pure clipping, scaling, and mask-expansion utilities shared by the joint
//! controllers.

use waldo_core::error::ConfigError;

// ---------------------------------------------------------------------------
// clip_scale
// ---------------------------------------------------------------------------

/// Clamp each command entry to `[-1, 1]`, then scale by the matching
/// per-dimension magnitude limit to produce a physical delta.
///
/// Extra command entries beyond `limits.len()` are dropped; missing entries
/// contribute nothing. No side effects.
#[must_use]
pub fn clip_scale(command: &[f32], limits: &[f32]) -> Vec<f32> {
    command
        .iter()
        .zip(limits.iter())
        .map(|(c, l)| c.clamp(-1.0, 1.0) * l)
        .collect()
}

// ---------------------------------------------------------------------------
// JointMask
// ---------------------------------------------------------------------------

/// Sparse activity mask over a full joint chain.
///
/// One entry per full-dimensionality joint; zero marks a joint the compact
/// command does not control. Construction validates that the number of
/// active entries matches the compact command dimensionality, so expansion
/// itself is infallible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointMask {
    mask: Vec<u8>,
    active: usize,
}

impl JointMask {
    /// Validate and build a mask for a compact command of `command_dim`
    /// entries.
    pub fn new(mask: Vec<u8>, command_dim: usize) -> Result<Self, ConfigError> {
        let active = mask.iter().filter(|m| **m != 0).count();
        if active != command_dim {
            return Err(ConfigError::MaskLengthMismatch {
                active,
                expected: command_dim,
            });
        }
        Ok(Self { mask, active })
    }

    /// Full joint-chain dimensionality.
    #[must_use]
    pub fn full_dim(&self) -> usize {
        self.mask.len()
    }

    /// Number of actively controlled joints.
    #[must_use]
    pub const fn active_dim(&self) -> usize {
        self.active
    }

    /// Expand a compact command into full joint-space, inserting zeros at
    /// masked-out positions and preserving order.
    #[must_use]
    pub fn expand(&self, compact: &[f32]) -> Vec<f32> {
        let mut expanded = vec![0.0; self.mask.len()];
        let mut src_idx = 0;
        for (tgt_idx, mask) in self.mask.iter().enumerate() {
            if *mask == 0 {
                continue;
            }
            expanded[tgt_idx] = compact.get(src_idx).copied().unwrap_or(0.0);
            src_idx += 1;
        }
        expanded
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- clip_scale --

    #[test]
    fn clip_scale_within_range() {
        let out = clip_scale(&[0.5, -0.5], &[0.1, 0.2]);
        assert_eq!(out, vec![0.05, -0.1]);
    }

    #[test]
    fn clip_scale_saturates() {
        let out = clip_scale(&[2.0, -3.0], &[0.1, 0.1]);
        assert_eq!(out, vec![0.1, -0.1]);
    }

    #[test]
    fn clip_scale_drops_extra_entries() {
        let out = clip_scale(&[1.0, 1.0, 1.0], &[0.1, 0.1]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn clip_scale_empty() {
        assert!(clip_scale(&[], &[]).is_empty());
    }

    // -- JointMask --

    #[test]
    fn mask_construction_counts_active() {
        let mask = JointMask::new(vec![1, 0, 1, 1], 3).unwrap();
        assert_eq!(mask.full_dim(), 4);
        assert_eq!(mask.active_dim(), 3);
    }

    #[test]
    fn mask_mismatch_is_config_error() {
        let err = JointMask::new(vec![1, 0, 1, 1], 2).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MaskLengthMismatch {
                active: 3,
                expected: 2
            }
        ));
    }

    #[test]
    fn mask_expand_inserts_zeros_preserving_order() {
        let mask = JointMask::new(vec![1, 0, 1, 1], 3).unwrap();
        let expanded = mask.expand(&[0.1, 0.2, 0.3]);
        assert_eq!(expanded, vec![0.1, 0.0, 0.2, 0.3]);
    }

    #[test]
    fn mask_expand_all_active_is_identity() {
        let mask = JointMask::new(vec![1, 1, 1], 3).unwrap();
        assert_eq!(mask.expand(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn mask_expand_all_masked() {
        let mask = JointMask::new(vec![0, 0, 0], 0).unwrap();
        assert_eq!(mask.expand(&[]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn mask_expand_short_command_pads_zero() {
        let mask = JointMask::new(vec![1, 1], 2).unwrap();
        assert_eq!(mask.expand(&[0.5]), vec![0.5, 0.0]);
    }

    #[test]
    fn mask_nonbinary_entries_count_as_active() {
        let mask = JointMask::new(vec![2, 0, 1], 2).unwrap();
        assert_eq!(mask.expand(&[0.1, 0.2]), vec![0.1, 0.0, 0.2]);
    }
}
