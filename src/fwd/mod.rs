mod error;
mod kernel;

pub use error::{Block, ConfigError};
pub use kernel::{FlashFwd, FwdTraits};

use crate::{
    element::{CopyAtom, CopyOp, ElementProfile, MmaAtom, MmaShape, WARP_SIZE},
    layout::Layout,
};
use any_tensor::digit_layout::DigitLayout;
use log::{debug, warn};

/// 共享内存原子块的行数
const SMEM_ATOM_ROWS: usize = 8;
/// 一次向量化全局内存访问的字节数
const GMEM_LOAD_BYTES: usize = 16;

/// 前向 kernel 的问题参数。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FlashFwdCfg {
    /// head dim
    pub d: usize,
    /// q 分块行数
    pub block_m: usize,
    /// k/v 分块行数
    pub block_n: usize,
    pub n_warps: usize,
}

/// warp 沿行方向复制的 mma 布局。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TiledMma {
    pub atom: MmaAtom,
    /// 每个维度上的原子数，\[n_warps, 1, 1]
    pub atom_layout: [usize; 3],
    /// 整个线程块一次处理的 (M, N, K)
    pub tile: MmaShape,
}

impl TiledMma {
    const fn new(atom: MmaAtom, n_warps: usize) -> Self {
        Self {
            atom,
            atom_layout: [n_warps, 1, 1],
            tile: MmaShape {
                m: atom.shape.m * n_warps,
                n: 16,
                k: 16,
            },
        }
    }

    pub const fn n_threads(&self) -> usize {
        let [m, n, k] = self.atom_layout;
        m * n * k * WARP_SIZE
    }
}

/// 全局内存与共享内存之间的分块拷贝。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TiledCopy {
    pub atom: CopyAtom,
    /// 线程排布，行主序
    pub thr_layout: Layout,
    /// 每个线程一次搬运的元素排布
    pub val_layout: Layout,
}

impl TiledCopy {
    pub const fn n_threads(&self) -> usize {
        self.thr_layout.size()
    }

    /// 每线程向量宽度
    pub const fn vector_width(&self) -> usize {
        self.val_layout.size()
    }

    /// 所有线程一次拷贝覆盖的 \[rows, cols]
    pub const fn tile_shape(&self) -> [usize; 2] {
        let [tr, tc] = self.thr_layout.shape();
        let [vr, vc] = self.val_layout.shape();
        [tr * vr, tc * vc]
    }
}

/// 推导出的全部常量与 layout。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FwdKernelTraits {
    pub element: ElementProfile,

    pub n_warps: usize,
    pub n_threads: usize,
    pub block_m: usize,
    pub block_n: usize,
    pub head_dim: usize,
    pub block_k_smem: usize,
    pub block_k_gmem: usize,

    pub tiled_mma: TiledMma,

    pub smem_layout_atom_qo: Layout,
    /// shape = {block_m, d}
    pub smem_layout_qo: Layout,
    /// shape = {block_n, d}
    pub smem_layout_kv: Layout,
    pub smem_layout_atom_vt: Layout,
    /// shape = {d, block_n}
    pub smem_layout_vt: Layout,

    pub smem_qo_count: usize,
    pub smem_kv_count: usize,
    pub smem_qo_size: usize,
    pub smem_kv_size: usize,
    pub smem_size: usize,

    pub gmem_elems_per_load: usize,
    pub gmem_threads_per_row: usize,
    pub gmem_tiled_copy: TiledCopy,
}

impl FwdKernelTraits {
    /// 共享内存容量检查，由发射方提供容量
    pub const fn fits_smem(&self, capacity: usize) -> bool {
        self.smem_size <= capacity
    }
}

/// 共享内存总字节数：q/o 一块，k、v 各一块。
///
/// 暂定的计算方式，layout 推导不依赖此值。溢出时返回 `None`。
pub const fn smem_bytes(smem_qo_size: usize, smem_kv_size: usize) -> Option<usize> {
    smem_qo_size.checked_add(smem_kv_size)
}

impl FlashFwdCfg {
    /// 按类型标记查表并推导，供运行时使用
    pub fn resolve(&self, dt: DigitLayout) -> Result<FwdKernelTraits, ConfigError> {
        let Some(element) = ElementProfile::lookup(dt) else {
            warn!("no flash attention profile for {dt:?}");
            return Err(ConfigError::UnsupportedElement(dt));
        };
        self.derive(&element)
            .inspect(|traits| {
                debug!(
                    "{self:?} {dt:?}: {} threads, smem {} bytes, q {} kv {} vt {}",
                    traits.n_threads,
                    traits.smem_size,
                    traits.smem_layout_qo,
                    traits.smem_layout_kv,
                    traits.smem_layout_vt,
                )
            })
            .inspect_err(|e| warn!("reject {self:?} {dt:?}: {e}"))
    }

    pub const fn derive(&self, element: &ElementProfile) -> Result<FwdKernelTraits, ConfigError> {
        let &Self {
            d,
            block_m,
            block_n,
            n_warps,
        } = self;
        // 对齐 tensor core 分块
        if d == 0 || d % 32 != 0 {
            return Err(ConfigError::HeadDimAlignment { d });
        }
        let block_k_smem = if d % 64 == 0 { 64 } else { 32 };
        let block_k_gmem = if d % 128 == 0 { 128 } else { block_k_smem };
        // 线程组织
        if n_warps == 0 {
            return Err(ConfigError::NoWarps);
        }
        let Some(n_threads) = n_warps.checked_mul(WARP_SIZE) else {
            return Err(ConfigError::TooLarge {
                what: "thread count",
            });
        };
        let tiled_mma = TiledMma::new(element.mma, n_warps);
        // q/o、k/v 的共享内存 layout
        if block_m == 0 || block_m % SMEM_ATOM_ROWS != 0 {
            return Err(ConfigError::BlockRows {
                which: Block::M,
                rows: block_m,
            });
        }
        if block_n == 0 || block_n % SMEM_ATOM_ROWS != 0 {
            return Err(ConfigError::BlockRows {
                which: Block::N,
                rows: block_n,
            });
        }
        // 共享内存用量，先于 layout 检查溢出
        let Some(smem_qo_count) = block_m.checked_mul(d) else {
            return Err(ConfigError::TooLarge { what: "q/o tile" });
        };
        let smem_kv_count = match block_n.checked_mul(d) {
            Some(n) => n.checked_mul(2),
            None => None,
        };
        let Some(smem_kv_count) = smem_kv_count else {
            return Err(ConfigError::TooLarge { what: "k/v tile" });
        };
        let (Some(smem_qo_size), Some(smem_kv_size)) = (
            smem_qo_count.checked_mul(element.nbytes),
            smem_kv_count.checked_mul(element.nbytes),
        ) else {
            return Err(ConfigError::TooLarge { what: "smem size" });
        };
        let Some(smem_size) = smem_bytes(smem_qo_size, smem_kv_size) else {
            return Err(ConfigError::TooLarge { what: "smem size" });
        };
        let smem_layout_atom_qo = Layout::row_major(SMEM_ATOM_ROWS, block_k_smem);
        let smem_layout_qo = smem_layout_atom_qo.tile_to_shape(block_m, d);
        let smem_layout_kv = smem_layout_atom_qo.tile_to_shape(block_n, d);
        // 第二次矩阵乘按转置读 v，存储与 kv 相同
        let smem_layout_atom_vt = Layout::col_major(block_k_smem, block_n);
        let smem_layout_vt = smem_layout_atom_vt.tile_to_shape(d, block_n);
        // 全局内存 128 位向量化访问
        let gmem_elems_per_load = match GMEM_LOAD_BYTES.checked_div(element.nbytes) {
            Some(n) => n,
            None => 0,
        };
        if gmem_elems_per_load == 0 || d % gmem_elems_per_load != 0 {
            return Err(ConfigError::HeadDimNotVectorizable {
                d,
                elems_per_load: gmem_elems_per_load,
            });
        }
        let gmem_threads_per_row = block_k_smem / gmem_elems_per_load;
        if n_threads % gmem_threads_per_row != 0 {
            return Err(ConfigError::ThreadsPerRow {
                threads: n_threads,
                threads_per_row: gmem_threads_per_row,
            });
        }
        let gmem_tiled_copy = TiledCopy {
            atom: CopyAtom::new(CopyOp::Default, element.element),
            thr_layout: Layout::row_major(n_threads / gmem_threads_per_row, gmem_threads_per_row),
            val_layout: Layout::col_major(1, gmem_elems_per_load),
        };

        Ok(FwdKernelTraits {
            element: *element,
            n_warps,
            n_threads,
            block_m,
            block_n,
            head_dim: d,
            block_k_smem,
            block_k_gmem,
            tiled_mma,
            smem_layout_atom_qo,
            smem_layout_qo,
            smem_layout_kv,
            smem_layout_atom_vt,
            smem_layout_vt,
            smem_qo_count,
            smem_kv_count,
            smem_qo_size,
            smem_kv_size,
            smem_size,
            gmem_elems_per_load,
            gmem_threads_per_row,
            gmem_tiled_copy,
        })
    }
}
