#![forbid(unsafe_code)]

//! BLAKE3 checksums of pixel buffers for golden comparisons.

use inkcel_core::PixelBuffer;

const CHECKSUM_PREFIX: &str = "blake3:";

/// Hash dimensions, format, and pixel bytes of `buf`.
///
/// Returns a hex string prefixed with `blake3:`.
pub fn checksum_buffer(buf: &PixelBuffer) -> String {
    let mut hasher = blake3::Hasher::new();
    // Dimensions first so equal bytes at different shapes differ.
    hasher.update(&buf.width().to_le_bytes());
    hasher.update(&buf.height().to_le_bytes());
    hasher.update(&buf.bytes_per_pixel().to_le_bytes());
    hasher.update(buf.data());
    format!("{CHECKSUM_PREFIX}{}", hasher.finalize().to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_prefixed_hex() {
        let sum = checksum_buffer(&PixelBuffer::new(2, 2, 4));
        assert!(sum.starts_with("blake3:"));
        assert_eq!(sum.len(), "blake3:".len() + 64);
    }

    #[test]
    fn shape_changes_checksum() {
        let a = PixelBuffer::new(4, 1, 4);
        let b = PixelBuffer::new(1, 4, 4);
        assert_eq!(a.data(), b.data());
        assert_ne!(checksum_buffer(&a), checksum_buffer(&b));
    }

    #[test]
    fn content_changes_checksum() {
        let a = PixelBuffer::new(2, 2, 4);
        let mut b = a.clone();
        b.data_mut()[5] = 1;
        assert_ne!(checksum_buffer(&a), checksum_buffer(&b));
        assert_eq!(checksum_buffer(&a), checksum_buffer(&a.clone()));
    }
}
