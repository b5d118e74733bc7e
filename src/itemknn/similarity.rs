use rayon::prelude::*;
use tracing::warn;

use crate::itemknn::interaction_matrix::InteractionMatrix;

/// Maximum divergence tolerated between the reference and the accelerated
/// backend, absolute or relative.
pub const BACKEND_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Users,
    Items,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Auto,
    Reference,
    Accelerated,
}

impl BackendKind {
    pub fn from_name(name: &str) -> BackendKind {
        match name.trim().to_ascii_lowercase().as_str() {
            "reference" => BackendKind::Reference,
            "accelerated" => BackendKind::Accelerated,
            "auto" | "" => BackendKind::Auto,
            other => {
                warn!("unknown similarity backend '{}', using auto", other);
                BackendKind::Auto
            }
        }
    }
}

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v.iter()).map(|(a, b)| a * b).sum()
}

fn norm(u: &[f64]) -> f64 {
    u.iter().map(|a| a * a).sum::<f64>().sqrt()
}

/// Cosine similarity of two vectors. A zero-norm input yields 0.0, the
/// function never divides by zero.
pub fn cosine(u: &[f64], v: &[f64]) -> f64 {
    let norm_u = norm(u);
    let norm_v = norm(v);
    if norm_u == 0.0 || norm_v == 0.0 {
        return 0.0;
    }
    dot(u, v) / (norm_u * norm_v)
}

/// Square symmetric similarity matrix over one axis of the interaction
/// matrix.
pub struct SimilarityMatrix {
    values: Vec<f64>,
    n: usize,
}

impl SimilarityMatrix {
    fn from_upper_triangle(n: usize, upper: Vec<Vec<f64>>) -> Self {
        let mut values = vec![0.0; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, similarity) in row.into_iter().enumerate() {
                let j = i + offset;
                values[i * n + j] = similarity;
                values[j * n + i] = similarity;
            }
        }
        SimilarityMatrix { values, n }
    }

    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

/// Strategy interface for the pairwise similarity computation. Selected once
/// at construction, injected into the engine; backends differ in latency
/// only, never in results.
pub trait PairwiseSimilarity: Send + Sync {
    fn name(&self) -> &'static str;

    fn pairwise(&self, matrix: &InteractionMatrix, axis: Axis) -> SimilarityMatrix;
}

/// Straightforward double loop over the upper triangle, mirrored. Always
/// available, defines ground truth.
pub struct ReferenceBackend;

impl PairwiseSimilarity for ReferenceBackend {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn pairwise(&self, matrix: &InteractionMatrix, axis: Axis) -> SimilarityMatrix {
        let vectors = matrix.axis_vectors(axis);
        let n = vectors.len();
        let upper = (0..n)
            .map(|i| {
                (i..n)
                    .map(|j| cosine(&vectors[i], &vectors[j]))
                    .collect()
            })
            .collect();
        SimilarityMatrix::from_upper_triangle(n, upper)
    }
}

/// Parallel backend: norms are computed once, upper-triangle rows are
/// distributed over a dedicated rayon pool. Each row writes disjoint output,
/// no synchronization needed.
pub struct AcceleratedBackend {
    pool: rayon::ThreadPool,
}

impl AcceleratedBackend {
    pub fn probe() -> Result<AcceleratedBackend, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new().build()?;
        Ok(AcceleratedBackend { pool })
    }
}

impl PairwiseSimilarity for AcceleratedBackend {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    fn pairwise(&self, matrix: &InteractionMatrix, axis: Axis) -> SimilarityMatrix {
        let vectors = matrix.axis_vectors(axis);
        let n = vectors.len();
        let norms: Vec<f64> = vectors.iter().map(|vector| norm(vector)).collect();
        let upper = self.pool.install(|| {
            (0..n)
                .into_par_iter()
                .map(|i| {
                    (i..n)
                        .map(|j| {
                            if norms[i] == 0.0 || norms[j] == 0.0 {
                                0.0
                            } else {
                                dot(&vectors[i], &vectors[j]) / (norms[i] * norms[j])
                            }
                        })
                        .collect()
                })
                .collect()
        });
        SimilarityMatrix::from_upper_triangle(n, upper)
    }
}

/// Resolves the configured backend kind once. An unavailable accelerated
/// backend degrades to the reference backend with a diagnostic, never an
/// error.
pub fn select_backend(kind: BackendKind) -> Box<dyn PairwiseSimilarity> {
    match kind {
        BackendKind::Reference => Box::new(ReferenceBackend),
        BackendKind::Accelerated | BackendKind::Auto => match AcceleratedBackend::probe() {
            Ok(backend) => Box::new(backend),
            Err(error) => {
                warn!(
                    %error,
                    "accelerated similarity backend unavailable, falling back to reference"
                );
                Box::new(ReferenceBackend)
            }
        },
    }
}
