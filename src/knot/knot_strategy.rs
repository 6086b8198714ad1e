use crate::{knot::KnotVector, misc::FloatingPoint};

/// Knot construction strategies
/// Each variant carries exactly what its construction needs.
#[derive(Clone, Debug, PartialEq)]
pub enum KnotStrategy<T> {
    /// `interior` knots linearly spaced in the open domain
    Uniform {
        interior: usize,
        degree: usize,
        domain: (T, T),
    },
    /// Caller supplied interior knots, sorted and within the domain
    Custom {
        knots: Vec<T>,
        degree: usize,
        domain: (T, T),
    },
    /// Interior knots at the k-means centers of the samples
    Clustered {
        samples: Vec<T>,
        weights: Option<Vec<T>>,
        interior: usize,
        degree: usize,
        domain: (T, T),
    },
    /// Interior knots at sliding-window means of the samples
    Averaged {
        samples: Vec<T>,
        interior: usize,
        degree: usize,
        domain: (T, T),
    },
}

impl<T: FloatingPoint> KnotStrategy<T> {
    pub fn degree(&self) -> usize {
        match self {
            KnotStrategy::Uniform { degree, .. }
            | KnotStrategy::Custom { degree, .. }
            | KnotStrategy::Clustered { degree, .. }
            | KnotStrategy::Averaged { degree, .. } => *degree,
        }
    }

    /// Build the clamped knot vector
    pub fn build(&self) -> anyhow::Result<KnotVector<T>> {
        match self {
            KnotStrategy::Uniform {
                interior,
                degree,
                domain,
            } => Ok(KnotVector::uniform(*interior, *degree, domain.0, domain.1)),
            KnotStrategy::Custom {
                knots,
                degree,
                domain,
            } => KnotVector::try_custom(knots, *degree, domain.0, domain.1),
            KnotStrategy::Clustered {
                samples,
                weights,
                interior,
                degree,
                domain,
            } => KnotVector::try_clustered(
                samples,
                weights.as_deref(),
                *interior,
                *degree,
                domain.0,
                domain.1,
            ),
            KnotStrategy::Averaged {
                samples,
                interior,
                degree,
                domain,
            } => KnotVector::try_averaged(samples, *interior, *degree, domain.0, domain.1),
        }
    }
}
