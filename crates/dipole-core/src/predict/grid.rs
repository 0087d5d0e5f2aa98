use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("radial grid is empty")]
    Empty,
    #[error("radial grid point {index} is not a positive finite radius: {value}")]
    NonPositive { index: usize, value: f64 },
    #[error("radial grid is not strictly increasing at point {index} ({previous} -> {value})")]
    NotIncreasing {
        index: usize,
        previous: f64,
        value: f64,
    },
}

/// Radii at which the model reports amplitudes. Non-empty, positive and
/// strictly increasing, so every point has a finite logarithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct RadialGrid {
    points: Vec<f64>,
}

impl RadialGrid {
    pub fn new(points: Vec<f64>) -> Result<Self, GridError> {
        if points.is_empty() {
            return Err(GridError::Empty);
        }
        for (index, value) in points.iter().copied().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(GridError::NonPositive { index, value });
            }
            if index > 0 && value <= points[index - 1] {
                return Err(GridError::NotIncreasing {
                    index,
                    previous: points[index - 1],
                    value,
                });
            }
        }
        Ok(Self { points })
    }

    /// `point_count` radii spaced evenly in `ln r` between `r_min` and `r_max`.
    pub fn logarithmic(r_min: f64, r_max: f64, point_count: usize) -> Result<Self, GridError> {
        if point_count == 0 {
            return Err(GridError::Empty);
        }
        if point_count == 1 {
            return Self::new(vec![r_min]);
        }
        let log_min = r_min.ln();
        let log_step = (r_max.ln() - log_min) / (point_count - 1) as f64;
        let points = (0..point_count)
            .map(|index| (log_min + index as f64 * log_step).exp())
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<f64>> for RadialGrid {
    type Error = GridError;

    fn try_from(points: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<RadialGrid> for Vec<f64> {
    fn from(grid: RadialGrid) -> Self {
        grid.points
    }
}
