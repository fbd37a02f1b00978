// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Grid geometry.
//!
//! Column count and cell dimensions are derived once at startup from the
//! terminal size. The grid does not react to live resizes.

/// Minimum cell width in terminal columns.
pub const MIN_CELL_WIDTH: u16 = 20;
/// Minimum image height in terminal rows.
pub const MIN_CELL_HEIGHT: u16 = 5;
/// Rows reserved below each image for the resolution label.
pub const LABEL_HEIGHT: u16 = 1;

#[derive(Clone, Copy, Debug)]
pub struct Layout {
    pub columns: usize,
    pub cell_w: u16,
    pub cell_h: u16,
    pub term_w: u16,
    pub term_h: u16,
}

impl Layout {
    pub fn compute(term_w: u16, term_h: u16) -> Self {
        let columns = (term_w / MIN_CELL_WIDTH).max(1);
        let cell_w = term_w / columns;
        // A 16:9 thumbnail through ~2:1 (height:width) character cells:
        // cell_h = cell_w * (9/16) * 0.5 = cell_w * 9/32.
        let cell_h = ((u32::from(cell_w) * 9 / 32) as u16).max(MIN_CELL_HEIGHT);
        Self {
            columns: usize::from(columns),
            cell_w,
            cell_h,
            term_w,
            term_h,
        }
    }

    /// How many grid rows fit in the terminal.
    pub fn visible_rows(&self) -> usize {
        usize::from((self.term_h / (self.cell_h + LABEL_HEIGHT)).max(1))
    }

    pub fn row_of(&self, index: usize) -> usize {
        index / self.columns
    }

    pub fn col_of(&self, index: usize) -> usize {
        index % self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_wide_terminal() {
        let layout = Layout::compute(100, 24);
        assert_eq!(layout.columns, 5);
        assert_eq!(layout.cell_w, 20);
        // 20 * 9 / 32 = 5, not below the minimum
        assert_eq!(layout.cell_h, 5);
    }

    #[test]
    fn test_compute_narrow_terminal_single_column() {
        let layout = Layout::compute(10, 24);
        assert_eq!(layout.columns, 1);
        assert_eq!(layout.cell_w, 10);
        // 10 * 9 / 32 = 2, clamped up to the minimum
        assert_eq!(layout.cell_h, MIN_CELL_HEIGHT);
    }

    #[test]
    fn test_compute_cell_height_scales_with_width() {
        // One 39-column cell: 39 * 9 / 32 = 10
        let layout = Layout::compute(39, 50);
        assert_eq!(layout.columns, 1);
        assert_eq!(layout.cell_w, 39);
        assert_eq!(layout.cell_h, 10);
    }

    #[test]
    fn test_visible_rows() {
        let layout = Layout::compute(100, 24);
        // 24 / (5 + 1) = 4
        assert_eq!(layout.visible_rows(), 4);
    }

    #[test]
    fn test_visible_rows_degenerate_terminal() {
        let layout = Layout::compute(100, 3);
        assert_eq!(layout.visible_rows(), 1);
    }

    #[test]
    fn test_row_and_col_of() {
        let layout = Layout::compute(100, 24);
        assert_eq!(layout.row_of(0), 0);
        assert_eq!(layout.col_of(0), 0);
        assert_eq!(layout.row_of(22), 4);
        assert_eq!(layout.col_of(22), 2);
    }
}
