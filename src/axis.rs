//! One-dimensional boundary clustering for grid rows and columns.

/// Half-open interval `[start, end)` between two consecutive boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub start: f64,
    pub end: f64,
}

impl Band {
    #[must_use]
    pub fn contains(&self, position: f64) -> bool {
        self.start <= position && position < self.end
    }

    /// Length of the part of `[low, high]` that lies inside the band.
    #[must_use]
    pub fn overlap(&self, low: f64, high: f64) -> f64 {
        (high.min(self.end) - low.max(self.start)).max(0.0)
    }
}

/// Where a coordinate landed among the bands of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandLookup {
    Inside(usize),
    Clamped(usize),
}

impl BandLookup {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Inside(index) | Self::Clamped(index) => index,
        }
    }
}

/// Collapses near-equal coordinates into sorted representative boundaries.
///
/// Coordinates are chained: a value joins the open cluster when it lies within
/// `tolerance` of the cluster's most recently added member. Each cluster is
/// represented by its minimum so cells keep their leading edge.
#[must_use]
pub fn cluster_boundaries(coordinates: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted = coordinates
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);

    let Some(&first) = sorted.first() else {
        return Vec::new();
    };

    let mut boundaries = vec![first];
    let mut last = first;
    for value in sorted.into_iter().skip(1) {
        if value - last > tolerance {
            boundaries.push(value);
        }
        last = value;
    }
    boundaries
}

#[must_use]
pub fn bands_from_boundaries(boundaries: &[f64]) -> Vec<Band> {
    boundaries
        .windows(2)
        .map(|pair| Band {
            start: pair[0],
            end: pair[1],
        })
        .collect()
}

/// Finds the band whose interval contains `position`, clamping to the nearest
/// band when the position falls outside all of them. `bands` must be non-empty.
#[must_use]
pub fn locate_band(bands: &[Band], position: f64) -> BandLookup {
    if let Some(index) = bands.iter().position(|band| band.contains(position)) {
        return BandLookup::Inside(index);
    }

    let nearest = bands
        .iter()
        .enumerate()
        .min_by(|(_, left), (_, right)| {
            distance_to(left, position).total_cmp(&distance_to(right, position))
        })
        .map_or(0, |(index, _)| index);
    BandLookup::Clamped(nearest)
}

fn distance_to(band: &Band, position: f64) -> f64 {
    if position < band.start {
        band.start - position
    } else {
        (position - band.end).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Band, BandLookup, bands_from_boundaries, cluster_boundaries, locate_band};

    #[test]
    fn chains_members_and_keeps_cluster_minimum() {
        let boundaries = cluster_boundaries(&[10.0, 13.0, 16.0, 19.0, 40.0, 41.5], 3.0);
        assert_eq!(boundaries, vec![10.0, 40.0]);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let boundaries = cluster_boundaries(&[55.0, 10.0, 25.0, 40.0, 25.0, 38.0], 4.0);
        assert_eq!(boundaries, vec![10.0, 25.0, 38.0, 55.0]);
    }

    #[test]
    fn empty_input_yields_no_boundaries() {
        assert!(cluster_boundaries(&[], 4.0).is_empty());
    }

    #[test]
    fn output_is_strictly_increasing_and_covers_every_input() {
        let coordinates = [3.0, 97.5, 4.0, 50.0, 52.0, 8.5, 100.0, 49.0, 12.0, 70.0];
        let tolerance = 4.0;
        let boundaries = cluster_boundaries(&coordinates, tolerance);

        assert!(boundaries.windows(2).all(|pair| pair[0] < pair[1]));

        let mut sorted = coordinates.to_vec();
        sorted.sort_by(f64::total_cmp);
        for (index, &value) in sorted.iter().enumerate() {
            let owner = boundaries
                .iter()
                .rev()
                .copied()
                .find(|&boundary| boundary <= value)
                .expect("every coordinate has a boundary at or below it");
            let chain = sorted[..=index]
                .iter()
                .copied()
                .filter(|&member| member >= owner)
                .collect::<Vec<_>>();
            assert!(
                chain.windows(2).all(|pair| pair[1] - pair[0] <= tolerance),
                "{value} is not chained to boundary {owner}"
            );
        }
    }

    #[test]
    fn tight_cluster_members_stay_within_tolerance_of_boundary() {
        let boundaries = cluster_boundaries(&[100.0, 101.0, 103.5, 200.0], 4.0);
        assert_eq!(boundaries, vec![100.0, 200.0]);
        assert!(103.5 - boundaries[0] <= 4.0);
    }

    #[test]
    fn locates_inside_and_clamps_outside() {
        let bands = bands_from_boundaries(&[10.0, 20.0, 30.0]);
        assert_eq!(locate_band(&bands, 15.0), BandLookup::Inside(0));
        assert_eq!(locate_band(&bands, 20.0), BandLookup::Inside(1));
        assert_eq!(locate_band(&bands, 30.0), BandLookup::Clamped(1));
        assert_eq!(locate_band(&bands, 2.0), BandLookup::Clamped(0));
    }

    #[test]
    fn overlap_is_zero_for_disjoint_ranges() {
        let band = Band {
            start: 10.0,
            end: 20.0,
        };
        assert!((band.overlap(12.0, 30.0) - 8.0).abs() < f64::EPSILON);
        assert!(band.overlap(25.0, 30.0).abs() < f64::EPSILON);
    }
}
