//! Decompression bomb detection.

use crate::ValidationFailure;

/// Validates the archive-wide compression ratio.
///
/// The ratio is `uncompressed / compressed`. An empty archive (both sizes
/// zero) passes; a zero compressed size with any uncompressed data is an
/// infinite ratio and fails.
///
/// # Errors
///
/// Returns [`ValidationFailure::CompressionRatio`] if the ratio exceeds
/// `max_ratio`.
#[allow(clippy::cast_precision_loss)]
pub fn validate_compression_ratio(
    compressed_size: u64,
    uncompressed_size: u64,
    max_ratio: f64,
) -> Result<(), ValidationFailure> {
    if uncompressed_size == 0 {
        return Ok(());
    }

    let ratio = if compressed_size == 0 {
        f64::INFINITY
    } else {
        uncompressed_size as f64 / compressed_size as f64
    };

    if ratio > max_ratio {
        return Err(ValidationFailure::CompressionRatio {
            compressed: compressed_size,
            uncompressed: uncompressed_size,
            ratio,
            max: max_ratio,
        });
    }

    Ok(())
}
