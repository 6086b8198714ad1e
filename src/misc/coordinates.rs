use std::{fmt, str::FromStr};

use nalgebra::SVector;

use crate::{error::SplineFitError, misc::FloatingPoint};

/// Selects which control-point set an entity evaluates
/// `Local` is the normalized set produced by fitting,
/// `Global` is the real-world set written by `denormalize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Coordinates {
    #[default]
    Local,
    Global,
}

impl FromStr for Coordinates {
    type Err = SplineFitError;

    /// # Example
    /// ```
    /// use splinefit::prelude::Coordinates;
    /// let c: Coordinates = "global".parse().unwrap();
    /// assert_eq!(c, Coordinates::Global);
    /// assert!("world".parse::<Coordinates>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Coordinates::Local),
            "global" => Ok(Coordinates::Global),
            other => Err(SplineFitError::InvalidArgument(format!(
                "Unknown coordinate type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinates::Local => write!(f, "local"),
            Coordinates::Global => write!(f, "global"),
        }
    }
}

/// Norm used by the misfit queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceMetric {
    L1,
    #[default]
    L2,
}

impl DistanceMetric {
    pub fn norm<T: FloatingPoint, const D: usize>(&self, v: &SVector<T, D>) -> T {
        match self {
            DistanceMetric::L1 => v.lp_norm(1),
            DistanceMetric::L2 => v.norm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn parse_coordinates() {
        assert_eq!("local".parse::<Coordinates>().unwrap(), Coordinates::Local);
        assert_eq!(
            "global".parse::<Coordinates>().unwrap(),
            Coordinates::Global
        );
        let err = "Global".parse::<Coordinates>().unwrap_err();
        assert!(matches!(err, SplineFitError::InvalidArgument(_)));
    }

    #[test]
    fn metrics() {
        let v = Vector3::new(3.0, -4.0, 0.0);
        assert_relative_eq!(DistanceMetric::L2.norm(&v), 5.0);
        assert_relative_eq!(DistanceMetric::L1.norm(&v), 7.0);
    }
}
