//! Seeded deterministic random stream
//!
//! Every stochastic choice in generation draws from a `SimpleRng` that is passed
//! explicitly through the recursion. There is no global or wall-clock randomness,
//! so identical seeds give bit-identical output on every platform.

/// Small PCG-style generator with a hashed output function
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.wrapping_add(1) }
    }

    /// Independent stream derived from `seed` and a salt, so that separate
    /// passes (skeleton, leaves) do not shift each other's sequences.
    pub fn derived(seed: u64, salt: u64) -> Self {
        let mut h = seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(h ^ (h >> 31))
    }

    /// Advance state and return next u32
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut h = (self.state >> 32) as u32;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h
    }

    /// Generate f32 in range [0, 1]
    pub fn next_float(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32)
    }

    /// Generate f32 in range [min, max]
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_float() * (max - min)
    }

    /// Generate f32 in range [-extent, extent]
    pub fn symmetric(&mut self, extent: f32) -> f32 {
        self.range(-extent, extent)
    }

    /// Uniform integer in the inclusive range [min, max]
    pub fn range_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = u64::from(max - min) + 1;
        min + (u64::from(self.next_u32()) % span) as u32
    }
}
