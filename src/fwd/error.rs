use any_tensor::digit_layout::DigitLayout;
use std::fmt;
use thiserror::Error;

/// 行数受约束的分块
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Block {
    /// q/o 分块，`block_m`
    M,
    /// k/v 分块，`block_n`
    N,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::M => write!(f, "block_m"),
            Self::N => write!(f, "block_n"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum ConfigError {
    #[error("unsupported element type {0:?}")]
    UnsupportedElement(DigitLayout),
    #[error("head dim {d} is not a positive multiple of 32")]
    HeadDimAlignment { d: usize },
    #[error("warp count must be positive")]
    NoWarps,
    #[error("{which} = {rows} is not a positive multiple of 8")]
    BlockRows { which: Block, rows: usize },
    #[error("head dim {d} is not a multiple of {elems_per_load} elements per global load")]
    HeadDimNotVectorizable { d: usize, elems_per_load: usize },
    #[error("{threads} threads is not a multiple of {threads_per_row} threads per row")]
    ThreadsPerRow {
        threads: usize,
        threads_per_row: usize,
    },
    #[error("{what} overflows usize")]
    TooLarge { what: &'static str },
}

impl ConfigError {
    /// 不含参数值的描述，可用于编译期报错
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnsupportedElement(_) => "unsupported element type",
            Self::HeadDimAlignment { .. } => "head dim must be a positive multiple of 32",
            Self::NoWarps => "warp count must be positive",
            Self::BlockRows { which: Block::M, .. } => "block_m must be a positive multiple of 8",
            Self::BlockRows { which: Block::N, .. } => "block_n must be a positive multiple of 8",
            Self::HeadDimNotVectorizable { .. } => {
                "head dim must be a multiple of the elements per global load"
            }
            Self::ThreadsPerRow { .. } => {
                "thread count must be a multiple of the global load threads per row"
            }
            Self::TooLarge { .. } => "derived sizes overflow usize",
        }
    }
}
