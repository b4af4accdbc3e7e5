//! Lossless PNG optimization.

use super::OptimizeError;

/// Optimize with the oxipng preset for `level` (0-6).
pub(crate) fn optimize(data: &[u8], level: u8) -> Result<Vec<u8>, OptimizeError> {
    let options = oxipng::Options::from_preset(level);
    Ok(oxipng::optimize_from_memory(data, &options)?)
}
