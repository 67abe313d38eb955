use std::{f64::consts::PI, fmt, ops::Deref};

use itertools::Itertools;

/// A number that is always rendered with exactly `DIGITS` fractional digits.
/// The last digit is rounded, never truncated.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Fixed<const DIGITS: usize>(pub f64);

pub type FloatFive = Fixed<5>;
pub type FloatOne = Fixed<1>;
pub type FloatZero = Fixed<0>;

impl<const DIGITS: usize> fmt::Display for Fixed<DIGITS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.*}", DIGITS, self.0)
    }
}

impl<const DIGITS: usize> From<f64> for Fixed<DIGITS> {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl<const DIGITS: usize> From<Fixed<DIGITS>> for f64 {
    fn from(value: Fixed<DIGITS>) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pos {
    pub lat: f64,
    pub lon: f64,
    pub ele: f64,
}

impl Pos {
    pub fn new(lat: f64, lon: f64, ele: f64) -> Self {
        Self { lat, lon, ele }
    }

    /// Great-circle distance in km on a spherical earth. Elevation is ignored.
    pub fn distance(&self, other: &Pos) -> f64 {
        let rad_lat1 = PI * self.lat / 180.0;
        let rad_lat2 = PI * other.lat / 180.0;
        let rad_theta = PI * (self.lon - other.lon) / 180.0;

        let mut dist =
            rad_lat1.sin() * rad_lat2.sin() + rad_lat1.cos() * rad_lat2.cos() * rad_theta.cos();
        // rounding can push this just above 1 for (nearly) identical points
        if dist > 1.0 {
            dist = 1.0;
        }

        let degrees = dist.acos() * 180.0 / PI;
        let nautical_miles = degrees * 60.0 * 1.1515;
        nautical_miles * 1.609344
    }

    pub fn is_close(&self, other: &Pos, threshold_km: f64) -> bool {
        self.distance(other) < threshold_km
    }
}

/// An ordered path of positions. The order is the direction of travel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    positions: Vec<Pos>,
}

impl Line {
    pub fn new(positions: Vec<Pos>) -> Self {
        Self { positions }
    }

    /// Index of the nearest position strictly closer than `threshold_km`.
    /// On equal distances the earliest position wins.
    pub fn closest_match(&self, pos: &Pos, threshold_km: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in self.positions.iter().enumerate() {
            if !candidate.is_close(pos, threshold_km) {
                continue;
            }
            let dist = candidate.distance(pos);
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Total length in km.
    pub fn length(&self) -> f64 {
        self.positions
            .iter()
            .tuple_windows()
            .map(|(a, b)| a.distance(b))
            .sum()
    }

    pub fn reverse(&mut self) {
        self.positions.reverse();
    }

    pub fn start(&self) -> Option<&Pos> {
        self.positions.first()
    }

    pub fn end(&self) -> Option<&Pos> {
        self.positions.last()
    }
}

impl Deref for Line {
    type Target = [Pos];

    fn deref(&self) -> &[Pos] {
        &self.positions
    }
}

impl From<Vec<Pos>> for Line {
    fn from(positions: Vec<Pos>) -> Self {
        Self::new(positions)
    }
}

impl FromIterator<Pos> for Line {
    fn from_iter<I: IntoIterator<Item = Pos>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Line {
    type Item = &'a Pos;
    type IntoIter = std::slice::Iter<'a, Pos>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

/// Concatenates the lines in order. Shared endpoints are kept as they are.
pub fn merge_lines<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Line {
    let lines = lines.into_iter().collect_vec();
    let mut positions = Vec::with_capacity(lines.iter().map(|l| l.len()).sum());
    for line in lines {
        positions.extend_from_slice(line);
    }
    Line::new(positions)
}
