//! Embedding functions
//!
//! Every embedder is a pure function of its input: the same text always
//! yields a bit-identical vector of `dimensions()` components, and the
//! empty string has a well-defined embedding.
//!
//! Two implementations ship:
//! - `HtpEmbedder`: Harmonic Token Projection, a training-free embedding
//!   where texts sharing tokens land close together
//!   (https://arxiv.org/html/2511.20665)
//! - `SeededEmbedder`: text-seeded pseudorandom vectors with no semantic
//!   content, useful as a baseline and in tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

use crate::core::config::{Config, EmbedderKind};
use crate::core::error::{RagError, Result};

/// Default embedding dimension
pub const EMBEDDING_DIM: usize = 384;

/// Maximum token length (Unicode code points)
const MAX_TOKEN_LENGTH: usize = 64;

/// Maps text to a fixed-dimension dense vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Build the embedder selected in the configuration.
pub fn from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Htp => Arc::new(HtpEmbedder::new(config.dimension)?),
        EmbedderKind::Seeded => Arc::new(SeededEmbedder::new(config.dimension)?),
    };
    Ok(embedder)
}

/// HTP Embedding Model
///
/// Each token is read as a base-2^16 integer N, reduced modulo a set of
/// coprime moduli, and every residue is projected onto the unit circle.
pub struct HtpEmbedder {
    moduli: Vec<u64>,
}

impl HtpEmbedder {
    /// `dimension` must be even: each modulus contributes a (sin, cos) pair.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 || dimension % 2 != 0 {
            return Err(RagError::Validation(format!(
                "htp embedder needs a positive even dimension, got {}",
                dimension
            )));
        }
        Ok(Self {
            moduli: first_primes(dimension / 2),
        })
    }

    /// Embed a single token using Harmonic Token Projection
    fn embed_token(&self, token: &str) -> Vec<f64> {
        let n = token_to_integer(token);

        let mut embedding = Vec::with_capacity(self.moduli.len() * 2);
        for &m in &self.moduli {
            let r = n % m;
            let theta = 2.0 * PI * (r as f64) / (m as f64);
            embedding.push(theta.sin());
            embedding.push(theta.cos());
        }

        embedding
    }
}

impl Default for HtpEmbedder {
    fn default() -> Self {
        Self {
            moduli: first_primes(EMBEDDING_DIM / 2),
        }
    }
}

impl Embedder for HtpEmbedder {
    /// Mean-pools token projections, then L2-normalizes.
    /// Text without tokens embeds to the zero vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dimension = self.dimensions();
        let tokens = tokenize(text);

        if tokens.is_empty() {
            return Ok(vec![0.0; dimension]);
        }

        let mut sum_embedding = vec![0.0f64; dimension];
        for token in &tokens {
            for (acc, val) in sum_embedding.iter_mut().zip(self.embed_token(token)) {
                *acc += val;
            }
        }

        let count = tokens.len() as f64;
        for val in &mut sum_embedding {
            *val /= count;
        }

        let norm: f64 = sum_embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
        let embedding = if norm > 0.0 {
            sum_embedding.iter().map(|x| (*x / norm) as f32).collect()
        } else {
            sum_embedding.iter().map(|x| *x as f32).collect()
        };

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.moduli.len() * 2
    }

    fn name(&self) -> &'static str {
        "htp"
    }
}

/// Text-seeded pseudorandom embedder
///
/// The xxHash64 of the UTF-8 text seeds a PRNG that draws uniform `[0, 1)`
/// components.
pub struct SeededEmbedder {
    dimension: usize,
}

impl SeededEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Validation("dimension must be positive".into()));
        }
        Ok(Self { dimension })
    }
}

impl Embedder for SeededEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(text.as_bytes());
        let mut rng = StdRng::seed_from_u64(hasher.finish());

        Ok((0..self.dimension).map(|_| rng.gen::<f32>()).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}

/// Convert token to integer, N = Σ u_j * B^(L-j) with B = 2^16.
/// Wrapping arithmetic keeps only the trailing code points of long tokens.
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

/// Splits text into lowercase words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// First `count` primes, pairwise coprime by construction.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Euclidean distance between two vectors of equal length
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
