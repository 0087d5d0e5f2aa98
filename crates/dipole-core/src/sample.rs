//! Deterministic sample payloads for trying the pipeline without real data.

use crate::domain::{AUGMENTED_WIDTH, FEATURE_COUNT, FeatureMatrix, RecordLayout};
use crate::validate::{OpenClosedRange, ValidationPolicy};

const C2_SAMPLE_MAX: f64 = 5.0;

/// xoshiro256**
struct SampleRng {
    state: [u64; 4],
}

impl SampleRng {
    fn new(seed: u64) -> Self {
        let mut state = [0_u64; 4];
        let mut x = seed;
        for slot in &mut state {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let result = self.state[1]
            .wrapping_mul(5)
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform in `(0, 1]`.
    fn next_unit(&mut self) -> f64 {
        ((self.next_u64() >> 11) + 1) as f64 / (1_u64 << 53) as f64
    }

    /// Log-uniform inside `(lower, upper]`; a zero lower bound is replaced
    /// by `upper * 1e-5` so the logarithm stays finite.
    fn log_uniform(&mut self, range: OpenClosedRange) -> f64 {
        let lower = if range.lower > 0.0 {
            range.lower
        } else {
            range.upper * 1.0e-5
        };
        let (log_lower, log_upper) = (lower.ln(), range.upper.ln());
        let value = (log_lower + self.next_unit() * (log_upper - log_lower)).exp();
        range.clamp(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSpec {
    pub rows: usize,
    pub layout: RecordLayout,
    pub seed: u64,
}

/// Rows whose features and `x_Bj` satisfy `policy`; `c2` is uniform in `[0, 5)`.
pub fn generate_sample_payload(spec: SampleSpec, policy: &ValidationPolicy) -> FeatureMatrix {
    let mut rng = SampleRng::new(spec.seed);
    let width = spec.layout.width();
    let mut values = Vec::with_capacity(spec.rows * width);

    for _ in 0..spec.rows {
        for _ in 0..FEATURE_COUNT {
            values.push(rng.log_uniform(policy.feature_range));
        }
        if spec.layout == RecordLayout::Augmented {
            let c2 = policy.c2_min.max(0.0) + (1.0 - rng.next_unit()) * C2_SAMPLE_MAX;
            values.push(c2);
            values.push(rng.log_uniform(policy.x_bj_range));
        }
    }

    debug_assert!(width == FEATURE_COUNT || width == AUGMENTED_WIDTH);
    FeatureMatrix::from_row_major(spec.rows, width, values)
        .unwrap_or_else(|| unreachable!("sample rows are generated at full width"))
}
