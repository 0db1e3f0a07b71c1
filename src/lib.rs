//! flash attention 前向 kernel 的编译期配置推导。
//!
//! 由 `(D, BLOCK_M, BLOCK_N, N_WARPS, E)` 推导线程组织、共享内存 layout、
//! 共享内存用量和全局内存拷贝方式，供 kernel 本体与发射方使用。
//!
//! ```
//! use flash_attn_traits::{FlashFwd, FwdTraits, f16};
//!
//! type Fwd = FlashFwd<f16, 64, 64, 64, 4>;
//! const _: () = assert!(Fwd::N_THREADS == 128);
//! const _: () = assert!(Fwd::SMEM_SIZE == 24576);
//!
//! assert_eq!(Fwd::SMEM_LAYOUT_QO.to_string(), "(64,64):(64,1)");
//! assert_eq!(Fwd::new().traits().gmem_threads_per_row, 8);
//! ```
//!
//! head dim 不是 32 的倍数时无法编译：
//!
//! ```compile_fail
//! use flash_attn_traits::{FlashFwd, FwdTraits, f16};
//!
//! const _: usize = <FlashFwd<f16, 48, 64, 64, 4> as FwdTraits>::SMEM_SIZE;
//! ```
//!
//! 不支持的元素类型同样无法编译：
//!
//! ```compile_fail
//! use flash_attn_traits::{FlashFwd, FwdTraits};
//!
//! const _: usize = <FlashFwd<f32, 64, 64, 64, 4> as FwdTraits>::SMEM_SIZE;
//! ```

mod element;
mod fwd;
mod layout;

pub use any_tensor::digit_layout;
pub use element::{CopyAtom, CopyOp, Element, ElementProfile, MmaAtom, MmaShape, WARP_SIZE};
pub use fwd::{
    Block, ConfigError, FlashFwd, FlashFwdCfg, FwdKernelTraits, FwdTraits, TiledCopy, TiledMma,
    smem_bytes,
};
pub use half::{bf16, f16};
pub use layout::{Layout, Mode};
