//! 二维分层 layout：每一维是至多两级的 (shape, stride)。
//!
//! 坐标在一维内按列主序拆分，即 `i -> (i % shape[0], i / shape[0])`。

use std::fmt;

/// layout 的一维。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mode {
    pub shape: [usize; 2],
    pub stride: [usize; 2],
}

impl Mode {
    pub const fn flat(shape: usize, stride: usize) -> Self {
        Self {
            shape: [shape, 1],
            stride: [stride, 0],
        }
    }

    pub const fn nested(shape: [usize; 2], stride: [usize; 2]) -> Self {
        Self { shape, stride }
    }

    pub const fn is_flat(&self) -> bool {
        self.shape[1] == 1
    }

    pub const fn size(&self) -> usize {
        self.shape[0] * self.shape[1]
    }

    /// 维内坐标到偏移
    pub const fn offset(&self, i: usize) -> usize {
        let [s0, _] = self.shape;
        let [d0, d1] = self.stride;
        i % s0 * d0 + i / s0 * d1
    }

    const fn max_offset(&self) -> usize {
        let [s0, s1] = self.shape;
        let [d0, d1] = self.stride;
        (s0 - 1) * d0 + (s1 - 1) * d1
    }

    /// 能合并成一级时合并
    const fn coalesce(self) -> Self {
        let Self {
            shape: [s0, s1],
            stride: [d0, d1],
        } = self;
        if s1 == 1 {
            Self::flat(s0, d0)
        } else if s0 == 1 {
            Self::flat(s1, d1)
        } else if d1 == s0 * d0 {
            Self::flat(s0 * s1, d0)
        } else {
            self
        }
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, val: [usize; 2]) -> fmt::Result {
        if self.is_flat() {
            write!(f, "{}", val[0])
        } else {
            write!(f, "({},{})", val[0], val[1])
        }
    }
}

/// 行 × 列 的二维 layout。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Layout {
    pub rows: Mode,
    pub cols: Mode,
}

impl Layout {
    pub const fn new(rows: Mode, cols: Mode) -> Self {
        Self { rows, cols }
    }

    pub const fn row_major(rows: usize, cols: usize) -> Self {
        Self::new(Mode::flat(rows, cols), Mode::flat(cols, 1))
    }

    pub const fn col_major(rows: usize, cols: usize) -> Self {
        Self::new(Mode::flat(rows, 1), Mode::flat(cols, rows))
    }

    /// 逻辑形状 \[rows, cols]
    pub const fn shape(&self) -> [usize; 2] {
        [self.rows.size(), self.cols.size()]
    }

    pub const fn size(&self) -> usize {
        self.rows.size() * self.cols.size()
    }

    /// 最大偏移 + 1，即覆盖的存储长度
    pub const fn cosize(&self) -> usize {
        if self.size() == 0 {
            0
        } else {
            self.rows.max_offset() + self.cols.max_offset() + 1
        }
    }

    pub const fn offset(&self, row: usize, col: usize) -> usize {
        let [rows, cols] = self.shape();
        assert!(row < rows && col < cols, "coordinate out of layout");
        self.rows.offset(row) + self.cols.offset(col)
    }

    /// 交换行列，存储不变
    pub const fn transpose(&self) -> Self {
        Self::new(self.cols, self.rows)
    }

    /// 以 `self` 为原子块铺满 `rows × cols`。
    ///
    /// 原子块之间按列主序排列，每个原子块占用 `cosize` 个连续元素。
    pub const fn tile_to_shape(&self, rows: usize, cols: usize) -> Self {
        assert!(
            self.rows.is_flat() && self.cols.is_flat(),
            "layout atom must be flat"
        );
        let [ar, ac] = self.shape();
        assert!(
            rows % ar == 0 && cols % ac == 0,
            "target shape must be a multiple of the layout atom"
        );
        let tr = rows / ar;
        let tc = cols / ac;
        let block = self.cosize();
        Self::new(
            Mode::nested([ar, tr], [self.rows.stride[0], block]).coalesce(),
            Mode::nested([ac, tc], [self.cols.stride[0], block * tr]).coalesce(),
        )
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { rows, cols } = self;
        write!(f, "(")?;
        rows.fmt_with(f, rows.shape)?;
        write!(f, ",")?;
        cols.fmt_with(f, cols.shape)?;
        write!(f, "):(")?;
        rows.fmt_with(f, rows.stride)?;
        write!(f, ",")?;
        cols.fmt_with(f, cols.stride)?;
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_col_major() {
        let row = Layout::row_major(4, 8);
        let col = Layout::col_major(4, 8);
        assert_eq!(row.offset(1, 2), 10);
        assert_eq!(col.offset(1, 2), 9);
        assert_eq!(row.cosize(), 32);
        assert_eq!(col.cosize(), 32);
        assert_eq!(row.to_string(), "(4,8):(8,1)");
        assert_eq!(col.to_string(), "(4,8):(1,4)");
    }

    #[test]
    fn test_tile_to_shape() {
        // 单个原子块宽度即覆盖全部列
        let atom = Layout::row_major(8, 64);
        let tiled = atom.tile_to_shape(64, 64);
        assert_eq!(tiled, Layout::row_major(64, 64));

        // 列方向铺两块
        let tiled = atom.tile_to_shape(64, 128);
        assert_eq!(tiled.to_string(), "(64,(64,2)):(64,(1,4096))");
        assert_eq!(tiled.shape(), [64, 128]);
        assert_eq!(tiled.offset(3, 70), 4096 + 3 * 64 + 6);
        assert_eq!(tiled.cosize(), tiled.size());
    }

    #[test]
    fn test_tile_is_bijective() {
        let tiled = Layout::row_major(8, 32).tile_to_shape(40, 96);
        let [rows, cols] = tiled.shape();
        let mut seen = vec![false; tiled.cosize()];
        for r in 0..rows {
            for c in 0..cols {
                let i = tiled.offset(r, c);
                assert!(!seen[i], "offset {i} hit twice");
                seen[i] = true
            }
        }
        assert!(seen.into_iter().all(|x| x))
    }

    #[test]
    fn test_transpose() {
        let tiled = Layout::row_major(8, 32).tile_to_shape(16, 64);
        let t = tiled.transpose();
        assert_eq!(t.shape(), [64, 16]);
        assert_eq!(t.transpose(), tiled);
        assert_eq!(t.offset(40, 9), tiled.offset(9, 40))
    }

    #[test]
    #[should_panic(expected = "multiple of the layout atom")]
    fn test_tile_mismatch() {
        Layout::row_major(8, 64).tile_to_shape(64, 96);
    }
}
