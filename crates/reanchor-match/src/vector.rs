//! Embedding vector validation and cosine similarity.

use reanchor_core::{Error, Result};

/// Check that a vector is usable for similarity scoring.
///
/// Empty vectors and vectors containing NaN or infinite components are
/// corrupt.
pub fn validate_vector(v: &[f32]) -> Result<()> {
    if v.is_empty() {
        return Err(Error::Computation("empty embedding vector".to_string()));
    }
    if let Some(pos) = v.iter().position(|x| !x.is_finite()) {
        return Err(Error::Computation(format!(
            "non-finite embedding component at index {}",
            pos
        )));
    }
    Ok(())
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated), also returned for a zero vector
/// - `-1.0` = opposite direction
///
/// Bit-identical non-zero vectors return exactly `1.0`. Mismatched
/// dimensions or corrupt vectors are a `Computation` error, never a silent 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::Computation(format!(
            "Vector dimension mismatch: {} != {}",
            a.len(),
            b.len()
        )));
    }
    validate_vector(a)?;
    validate_vector(b)?;

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    if a == b {
        return Ok(1.0);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(sim.clamp(-1.0, 1.0) as f32)
}
