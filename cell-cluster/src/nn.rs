use crate::error::{ClusterError, Result};
use log::debug;
use ndarray::parallel::prelude::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use ndarray::{Array2, ArrayView2, Axis};
use noisy_float::checkers::NumChecker;
use noisy_float::NoisyFloat;
use num_traits::Bounded;
use vpsearch::{BestCandidate, MetricSpace, Tree};

/// N × k table of neighbor indices, one row per point, self excluded, nearest first.
pub type NeighborTable = Array2<u32>;

type Distance = NoisyFloat<f64, NumChecker>;

#[derive(Clone, Debug)]
struct Pt<'a> {
    coords: &'a [f64],
}

impl MetricSpace for Pt<'_> {
    type UserData = ();
    type Distance = Distance;

    fn distance(&self, other: &Self, _: &()) -> Distance {
        let d = self
            .coords
            .iter()
            .zip(other.coords.iter())
            .map(|(a, b)| (b - a).powi(2))
            .sum::<f64>()
            .sqrt();
        Distance::new(d)
    }
}

/// Keeps the `max_items` closest candidates seen so far, sorted by `(distance, index)`.
struct Nearest {
    max_items: usize,
    max_observed_distance: Distance,
    distance_x_index: Vec<(Distance, usize)>,
}

impl Nearest {
    fn new(max_items: usize) -> Self {
        Nearest {
            max_items,
            max_observed_distance: Distance::max_value(),
            distance_x_index: Vec::with_capacity(max_items + 1),
        }
    }

    fn clear(&mut self) {
        self.max_observed_distance = Distance::max_value();
        self.distance_x_index.clear();
    }

    fn insert(&mut self, index: usize, distance: Distance) {
        let val = (distance, index);
        let pos = self.distance_x_index.binary_search(&val).unwrap_or_else(|x| x);
        self.distance_x_index.insert(pos, val);
        if self.distance_x_index.len() >= self.max_items {
            self.distance_x_index.truncate(self.max_items);
            if let Some(&(d, _)) = self.distance_x_index.last() {
                self.max_observed_distance = d;
            }
        }
    }
}

impl<'a, 'p> BestCandidate<Pt<'p>, ()> for &'a mut Nearest {
    type Output = std::iter::Cloned<std::slice::Iter<'a, (Distance, usize)>>;

    #[inline]
    fn consider(&mut self, _: &Pt<'p>, distance: Distance, candidate_index: usize, _: &()) {
        if distance < self.max_observed_distance || self.distance_x_index.len() < self.max_items {
            self.insert(candidate_index, distance);
        }
    }

    #[inline]
    fn distance(&self) -> Distance {
        self.max_observed_distance
    }

    fn result(self, _: &()) -> Self::Output {
        self.distance_x_index.iter().cloned()
    }
}

/// Check `k` against the number of points: `1 <= k <= n - 2`.
pub fn check_k(k: usize, n: usize) -> Result<()> {
    if n == 0 {
        return Err(ClusterError::EmptyInput);
    }
    if k < 1 {
        return Err(ClusterError::KNotPositive);
    }
    if n < 2 || k > n - 2 {
        return Err(ClusterError::KTooLarge { k, n });
    }
    Ok(())
}

/// Compute the `k` nearest neighbors of each row in `v`, using Euclidean distance. Each row is
/// a point in the space spanned by the columns of `v`. Equidistant neighbors are ordered by
/// index.
pub fn knn(v: &ArrayView2<f64>, k: usize) -> Result<NeighborTable> {
    let (cells, dims) = v.dim();
    check_k(k, cells)?;
    if dims == 0 {
        return Err(ClusterError::InvalidArgument("coordinates have no columns".to_string()));
    }
    if cells > u32::MAX as usize {
        return Err(ClusterError::InvalidArgument(format!("too many points: {cells}")));
    }
    if let Some(((row, col), x)) = v.indexed_iter().find(|(_, x)| !x.is_finite()) {
        return Err(ClusterError::InvalidArgument(format!(
            "non-finite coordinate {x} at point {row}, dimension {col}"
        )));
    }

    let data = v.as_standard_layout();
    let points = data
        .axis_iter(Axis(0))
        .map(|row| {
            row.to_slice()
                .map(|coords| Pt { coords })
                .ok_or_else(|| ClusterError::InvalidArgument("coordinates are not contiguous".to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("constructing vantage-point tree of {} points", cells);
    let tree = Tree::new_with_user_data_ref(&points, &());

    debug!("querying points for {} neighbors", k);
    let mut output = Array2::from_elem((cells, k), u32::MAX);
    output.axis_iter_mut(Axis(0)).into_par_iter().enumerate().for_each_init(
        || Nearest::new(k + 1),
        |nearest, (cell, mut row)| {
            nearest.clear();
            let mut j = 0;
            for (_, idx) in tree.find_nearest_custom(&points[cell], &(), nearest) {
                if idx != cell && j < k {
                    row[j] = idx as u32;
                    j += 1;
                }
            }
        },
    );
    Ok(output)
}
