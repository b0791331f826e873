//! Client-to-server payload masking (RFC 6455 section 5.3).

/// XOR `data` in place with the repeating 4-byte `mask`.
///
/// Masking is its own inverse, so the same call unmasks.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&val.to_ne_bytes());
    }
    for (byte, m) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= m;
    }
}

/// Produces masking keys for outgoing frames.
///
/// Seeded from the OS RNG once; each key is a mixed step of a Weyl sequence,
/// which keeps frame writes off the syscall path.
#[derive(Debug, Clone)]
pub struct MaskGenerator {
    counter: u32,
}

impl MaskGenerator {
    /// Create a generator seeded from `getrandom`, falling back to the clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: random_seed(),
        }
    }

    /// Next masking key.
    pub fn next_mask(&mut self) -> [u8; 4] {
        self.counter = self.counter.wrapping_add(0x9E37_79B9);
        let b = self.counter.wrapping_mul(0x85EB_CA6B);
        let c = b ^ (b >> 13);
        c.wrapping_mul(0xC2B2_AE35).to_le_bytes()
    }
}

impl Default for MaskGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn random_seed() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_ok() {
        u32::from_le_bytes(buf)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x1234_5678)
    }
}
