//! Diamond-square heightmap generation.
//!
//! The grid is filled from four seeded corners by repeatedly halving the
//! sub-grid side length. Each pass runs a square step (centres of squares)
//! followed by a diamond step (centres of the diamonds those centres form),
//! displacing every new value by a random offset whose amplitude halves with
//! each pass.

use rand::Rng;
use thiserror::Error;

/// Elevation the four corners are seeded with.
pub const DEFAULT_SEED_ELEVATION: f32 = 5.0;

pub const MIN_RESOLUTION: u32 = 2;
/// Largest accepted resolution, a 4097² grid of `f32` is about 64 MiB.
pub const MAX_RESOLUTION: u32 = 4096;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum HeightmapError {
    #[error("Invalid resolution {0}: must be a power of two between 2 and 4096")]
    InvalidResolution(u32),
    #[error("Invalid roughness {0}: must be finite and non-negative")]
    InvalidRoughness(f32),
}

/// Square grid of elevations, `size x size` cells, stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    size: usize,
    data: Vec<f32>,
}

impl HeightGrid {
    fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Number of cells along one side (`resolution + 1`).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the last row/column.
    pub fn max_index(&self) -> usize {
        self.size - 1
    }

    #[inline]
    fn offset(&self, x: usize, z: usize) -> usize {
        z * self.size + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.data[self.offset(x, z)]
    }

    #[inline]
    fn set(&mut self, x: usize, z: usize, value: f32) {
        let offset = self.offset(x, z);
        self.data[offset] = value;
    }

    /// Raw heights, `z` major.
    pub fn heights(&self) -> &[f32] {
        &self.data
    }

    /// Iterates `(x, z, height)` with `x` varying fastest.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &h)| (i % self.size, i / self.size, h))
    }

    /// Lowest and highest elevation in the grid.
    pub fn height_range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), &h| (min.min(h), max.max(h)))
    }
}

#[inline]
pub fn average(a: f32, b: f32, c: f32, d: f32) -> f32 {
    (a + b + c + d) / 4.0
}

/// Diamond-square generator. Holds nothing but the corner seed elevation,
/// the random source is passed to every call.
#[derive(Debug, Clone, Copy)]
pub struct DiamondSquare {
    pub seed_elevation: f32,
}

impl Default for DiamondSquare {
    fn default() -> Self {
        Self {
            seed_elevation: DEFAULT_SEED_ELEVATION,
        }
    }
}

impl DiamondSquare {
    pub fn with_seed_elevation(seed_elevation: f32) -> Self {
        Self { seed_elevation }
    }

    /// Fills a `(resolution + 1)²` grid.
    ///
    /// Every square and diamond cell draws exactly one value from `rng`, even
    /// when the edge rule below replaces the result. Cells computed with
    /// `x == 0` or `z == 0` are pinned to the seed elevation and copied to the
    /// opposite edge, so the wrapped lookups of the next pass see the same
    /// value on both sides.
    pub fn generate<R: Rng>(
        &self,
        resolution: u32,
        roughness: f32,
        rng: &mut R,
    ) -> Result<HeightGrid, HeightmapError> {
        validate_resolution(resolution)?;
        if !roughness.is_finite() || roughness < 0.0 {
            return Err(HeightmapError::InvalidRoughness(roughness));
        }

        let max = resolution as usize;
        let mut grid = HeightGrid::new(max + 1);
        let seed = self.seed_elevation;

        grid.set(0, 0, seed);
        grid.set(max, 0, seed);
        grid.set(0, max, seed);
        grid.set(max, max, seed);

        let mut h = roughness;
        let mut side = max;
        while side >= 2 {
            let half = side / 2;

            // square step
            for x in (0..max).step_by(side) {
                for z in (0..max).step_by(side) {
                    let avg = average(
                        grid.get(x, z),
                        grid.get(x + side, z),
                        grid.get(x, z + side),
                        grid.get(x + side, z + side),
                    );
                    let val = self.edge_value(avg + displacement(rng, h), x, z);
                    mirror_edges(&mut grid, x, z, val);
                    grid.set(x + half, z + half, val);
                }
            }

            // diamond step
            for x in (0..max).step_by(half) {
                for z in ((x + half) % side..max).step_by(side) {
                    let avg = average(
                        grid.get((x + max - half) % max, z),
                        grid.get((x + half) % max, z),
                        grid.get(x, (z + half) % max),
                        grid.get(x, (z + max - half) % max),
                    );
                    let val = self.edge_value(avg + displacement(rng, h), x, z);
                    mirror_edges(&mut grid, x, z, val);
                    grid.set(x, z, val);
                }
            }

            h /= 2.0;
            side /= 2;
        }

        Ok(grid)
    }

    #[inline]
    fn edge_value(&self, val: f32, x: usize, z: usize) -> f32 {
        if x == 0 || z == 0 { self.seed_elevation } else { val }
    }
}

/// Generates with the default seed elevation.
pub fn generate<R: Rng>(
    resolution: u32,
    roughness: f32,
    rng: &mut R,
) -> Result<HeightGrid, HeightmapError> {
    DiamondSquare::default().generate(resolution, roughness, rng)
}

pub fn validate_resolution(resolution: u32) -> Result<(), HeightmapError> {
    if (MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) && resolution.is_power_of_two() {
        Ok(())
    } else {
        Err(HeightmapError::InvalidResolution(resolution))
    }
}

/// Number of subdivision passes for a valid resolution.
pub fn pass_count(resolution: u32) -> u32 {
    resolution.trailing_zeros()
}

/// Uniform offset in `[-h, h)`.
#[inline]
fn displacement<R: Rng>(rng: &mut R, h: f32) -> f32 {
    rng.random::<f32>() * 2.0 * h - h
}

#[inline]
fn mirror_edges(grid: &mut HeightGrid, x: usize, z: usize, val: f32) {
    let max = grid.max_index();
    if x == 0 {
        grid.set(max, z, val);
    }
    if z == 0 {
        grid.set(x, max, val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const ROUGHNESS: f32 = 30.0;

    /// Draw `i` yields exactly `i / 16` as an `f32` sample.
    struct ScriptedRng {
        draws: u32,
    }

    impl RngCore for ScriptedRng {
        fn next_u32(&mut self) -> u32 {
            let value = (self.draws % 16) << 28;
            self.draws += 1;
            value
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.next_u32())
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for chunk in dst.chunks_mut(4) {
                let bytes = self.next_u32().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }

    /// Offsets from the four-point average for the cells written in pass `k`
    /// that are neither flattened nor wrapped.
    fn pass_displacements(grid: &HeightGrid, k: u32) -> Vec<f32> {
        let max = grid.max_index();
        let side = max >> k;
        let half = side / 2;
        let mut out = Vec::new();

        for x in (side..max).step_by(side) {
            for z in (side..max).step_by(side) {
                let avg = average(
                    grid.get(x, z),
                    grid.get(x + side, z),
                    grid.get(x, z + side),
                    grid.get(x + side, z + side),
                );
                out.push(grid.get(x + half, z + half) - avg);
            }
        }

        for x in (half..max - half + 1).step_by(half) {
            for z in ((x + half) % side..max).step_by(side) {
                if z == 0 || z + half > max {
                    continue;
                }
                let avg = average(
                    grid.get(x - half, z),
                    grid.get(x + half, z),
                    grid.get(x, z + half),
                    grid.get(x, z - half),
                );
                out.push(grid.get(x, z) - avg);
            }
        }

        out
    }

    #[test]
    fn test_golden_resolution_two_without_roughness() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let grid = generate(2, 0.0, &mut rng).unwrap();

        assert_eq!(grid.size(), 3);
        assert_eq!(grid.heights(), &[5.0; 9]);
    }

    #[test]
    fn test_zero_roughness_is_flat_at_any_resolution() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let grid = generate(32, 0.0, &mut rng).unwrap();

        assert!(grid.heights().iter().all(|&h| h == DEFAULT_SEED_ELEVATION));
    }

    #[test]
    fn test_corners_after_mirroring() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let grid = generate(2, ROUGHNESS, &mut rng).unwrap();
        let max = grid.max_index();

        for (x, z) in [(0, 0), (max, 0), (0, max), (max, max)] {
            assert_eq!(grid.get(x, z), DEFAULT_SEED_ELEVATION, "corner ({x}, {z})");
        }
        // the single pass at resolution 2 starts every cell from x == 0 or z == 0
        assert_eq!(grid.heights(), &[DEFAULT_SEED_ELEVATION; 9]);
    }

    #[test]
    fn test_edges_are_flattened() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let grid = generate(4, ROUGHNESS, &mut rng).unwrap();
        let max = grid.max_index();

        for i in 0..=max {
            assert_eq!(grid.get(i, 0), DEFAULT_SEED_ELEVATION);
            assert_eq!(grid.get(0, i), DEFAULT_SEED_ELEVATION);
            assert_eq!(grid.get(i, max), DEFAULT_SEED_ELEVATION);
            assert_eq!(grid.get(max, i), DEFAULT_SEED_ELEVATION);
        }
        let interior_varies = (1..max)
            .flat_map(|x| (1..max).map(move |z| (x, z)))
            .any(|(x, z)| grid.get(x, z) != DEFAULT_SEED_ELEVATION);
        assert!(interior_varies, "Interior should be displaced");
    }

    #[test]
    fn test_custom_seed_elevation() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let grid = DiamondSquare::with_seed_elevation(-2.0)
            .generate(8, 0.0, &mut rng)
            .unwrap();

        assert!(grid.heights().iter().all(|&h| h == -2.0));
    }

    #[test]
    fn test_reproducibility() {
        let grid1 = generate(64, ROUGHNESS, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        let grid2 = generate(64, ROUGHNESS, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();
        assert_eq!(grid1, grid2, "Same seed should produce identical heights");

        let grid3 = generate(64, ROUGHNESS, &mut ChaCha8Rng::seed_from_u64(43)).unwrap();
        assert_ne!(grid1, grid3);
    }

    #[test]
    fn test_every_cell_is_finite() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for resolution in [2, 4, 8, 16, 64, 256] {
            let grid = generate(resolution, ROUGHNESS, &mut rng).unwrap();
            assert_eq!(grid.size(), resolution as usize + 1);
            assert_eq!(grid.heights().len(), grid.size() * grid.size());
            assert!(grid.heights().iter().all(|h| h.is_finite()));
        }
    }

    #[test]
    fn test_displacement_bounded_per_pass() {
        for seed in 0..8 {
            let grid = generate(32, ROUGHNESS, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
            for k in 0..pass_count(32) {
                let bound = ROUGHNESS / 2f32.powi(k as i32);
                for d in pass_displacements(&grid, k) {
                    assert!(d.abs() <= bound + 1e-3, "pass {k}: {d} exceeds {bound}");
                }
            }
        }
    }

    #[test]
    fn test_displacement_decays_with_depth() {
        let resolution = 16;
        let passes = pass_count(resolution);
        let mut sums = vec![0.0f32; passes as usize];
        let mut counts = vec![0usize; passes as usize];

        for seed in 0..32 {
            let grid = generate(resolution, ROUGHNESS, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
            for k in 0..passes {
                for d in pass_displacements(&grid, k) {
                    sums[k as usize] += d.abs();
                    counts[k as usize] += 1;
                }
            }
        }

        // pass 0 has no free cell: everything it writes touches an edge
        assert_eq!(counts[0], 0);
        let means: Vec<f32> = (1..passes as usize)
            .map(|k| sums[k] / counts[k] as f32)
            .collect();
        for pair in means.windows(2) {
            assert!(pair[1] < pair[0], "Mean displacement should decay: {means:?}");
        }
    }

    #[test]
    fn test_scripted_draws_resolution_four() {
        let mut rng = ScriptedRng { draws: 0 };
        let grid = generate(4, 4.0, &mut rng).unwrap();

        // pass 1: 1 square + 2 diamond cells, pass 2: 4 square + 8 diamond cells
        assert_eq!(rng.draws, 15);

        // pass 2 offsets are i / 4 - 2 for draw i
        #[rustfmt::skip]
        let expected = [
            5.0, 5.0, 5.0,   5.0,   5.0,
            5.0, 5.0, 5.75,  5.0,   5.0,
            5.0, 5.5, 5.0,   6.375, 5.0,
            5.0, 5.0, 5.875, 4.5,   5.0,
            5.0, 5.0, 5.0,   5.0,   5.0,
        ];
        assert_eq!(grid.heights(), &expected);
        assert_eq!(grid.get(1, 1), 5.0);
        assert_eq!(grid.get(3, 3), 4.5);
        assert_eq!(grid.get(2, 1), 5.75);
    }

    #[test]
    fn test_invalid_resolution() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for resolution in [0, 1, 5, 12, 100, MAX_RESOLUTION * 2, 1 << 31] {
            assert_eq!(
                generate(resolution, ROUGHNESS, &mut rng),
                Err(HeightmapError::InvalidResolution(resolution))
            );
        }
    }

    #[test]
    fn test_invalid_roughness() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert_eq!(
            generate(4, -1.0, &mut rng),
            Err(HeightmapError::InvalidRoughness(-1.0))
        );
        assert!(matches!(
            generate(4, f32::NAN, &mut rng),
            Err(HeightmapError::InvalidRoughness(_))
        ));
        assert!(generate(4, f32::INFINITY, &mut rng).is_err());
    }

    #[test]
    fn test_average() {
        assert_eq!(average(1.0, 2.0, 3.0, 4.0), 2.5);
        assert_eq!(average(5.0, 5.0, 5.0, 5.0), 5.0);
    }

    #[test]
    fn test_grid_accessors() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let grid = generate(4, ROUGHNESS, &mut rng).unwrap();

        assert_eq!(grid.max_index(), 4);
        let cells: Vec<_> = grid.iter().collect();
        assert_eq!(cells.len(), 25);
        assert_eq!(cells[6], (1, 1, grid.get(1, 1)));

        let (min, max) = grid.height_range();
        assert!(min <= DEFAULT_SEED_ELEVATION && max >= DEFAULT_SEED_ELEVATION);
    }

    #[test]
    fn test_pass_count() {
        assert_eq!(pass_count(2), 1);
        assert_eq!(pass_count(64), 6);
    }
}
