//! Block averaging by nozzle size.

use log::debug;

use crate::extract::mm_per_pixel;
use crate::grid::{Grid, Sample};

/// Number of pixels along one side of an averaging block.
///
/// Always at least 1.
pub fn block_size(ppi: f64, nozzle_size: f64) -> usize {
    let blocks = (nozzle_size / mm_per_pixel(ppi)).round();
    if blocks.is_finite() && blocks >= 1.0 {
        blocks as usize
    } else {
        1
    }
}

/// Average `block` x `block` groups of samples into one.
///
/// Each output sample keeps the position of the first sample in its block and
/// takes the mean height. A block of one height keeps that height exactly.
/// Blocks on the far edges may be smaller.
pub fn average_blocks(grid: Grid, block: usize) -> Grid {
    if block <= 1 || grid.is_empty() {
        return grid;
    }

    let rows: Vec<Vec<Sample>> = grid
        .rows()
        .chunks(block)
        .map(|row_block| {
            let columns = row_block[0].len();
            (0..columns)
                .step_by(block)
                .map(|start| {
                    let end = (start + block).min(columns);
                    let first = row_block[0][start];

                    if block_cells(row_block, start, end).all(|s| s.height == first.height) {
                        return first;
                    }
                    let (sum, count) = block_cells(row_block, start, end)
                        .fold((0.0, 0usize), |(sum, count), s| (sum + s.height, count + 1));
                    first.with_height(sum / count as f64)
                })
                .collect()
        })
        .collect();

    // Every output row covers the same column range.
    Grid::from_rows_unchecked(rows)
}

fn block_cells(
    rows: &[Vec<Sample>],
    start: usize,
    end: usize,
) -> impl Iterator<Item = &Sample> + '_ {
    rows.iter().flat_map(move |row| &row[start..end])
}

/// Average the grid so no feature is smaller than the nozzle can print.
///
/// A nozzle size of zero returns the grid unchanged.
pub fn average_by_nozzle_size(grid: Grid, ppi: f64, nozzle_size: f64) -> Grid {
    if nozzle_size <= 0.0 {
        return grid;
    }

    let block = block_size(ppi, nozzle_size);
    let (rows, cols) = (grid.row_count(), grid.column_count());
    let averaged = average_blocks(grid, block);

    debug!(
        "averaged {}x{} grid with block size {} into {}x{}",
        cols,
        rows,
        block,
        averaged.column_count(),
        averaged.row_count()
    );

    averaged
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid_with(rows: usize, cols: usize, height: impl Fn(usize, usize) -> f64) -> Grid {
        Grid::from_rows(
            (0..rows)
                .map(|r| {
                    (0..cols)
                        .map(|c| Sample::new(c as f64, r as f64, height(r, c)))
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_block_size() {
        assert_eq!(block_size(300.0, 0.4), 5);
        assert_eq!(block_size(25.4, 0.4), 1);
        assert_eq!(block_size(25.4, 2.6), 3);
        assert_eq!(block_size(300.0, 0.0), 1);
    }

    #[test]
    fn test_zero_nozzle_is_identity() {
        let grid = grid_with(3, 3, |r, c| (r * 3 + c) as f64);
        assert_eq!(average_by_nozzle_size(grid.clone(), 300.0, 0.0), grid);
    }

    #[test]
    fn test_block_keeps_first_position_and_mean_height() {
        let grid = grid_with(2, 2, |r, c| (r * 2 + c) as f64);
        let averaged = average_blocks(grid, 2);

        assert_eq!(averaged.row_count(), 1);
        assert_eq!(averaged.column_count(), 1);
        let sample = averaged.get(0, 0).unwrap();
        assert_relative_eq!(sample.x, 0.0);
        assert_relative_eq!(sample.y, 0.0);
        assert_relative_eq!(sample.height, 1.5);
    }

    #[test]
    fn test_uniform_block_keeps_exact_height() {
        // 0.1 summed nine times and divided drifts to 0.09999999999999999
        let grid = grid_with(3, 3, |_, _| 0.1);
        let averaged = average_blocks(grid, 3);
        assert_eq!(averaged.samples().next().unwrap().height, 0.1);
    }

    #[test]
    fn test_edge_blocks_average_what_is_present() {
        // 3x5 with block 2: last row block has 1 row, last column block has 1 column
        let grid = grid_with(3, 5, |r, c| (r * 10 + c) as f64);
        let averaged = average_blocks(grid, 2);

        assert_eq!(averaged.row_count(), 2);
        assert_eq!(averaged.column_count(), 3);

        // Bottom-right block: rows 0..2, column 4 -> heights 4 and 14
        assert_relative_eq!(averaged.get(0, 2).unwrap().height, 9.0);
        // Top-left block: row 2, columns 0..2 -> heights 20 and 21
        assert_relative_eq!(averaged.get(1, 0).unwrap().height, 20.5);
        // Top-right corner holds a single sample
        let corner = averaged.get(1, 2).unwrap();
        assert_relative_eq!(corner.height, 24.0);
        assert_relative_eq!(corner.x, 4.0);
        assert_relative_eq!(corner.y, 2.0);
    }
}
