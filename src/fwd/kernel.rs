use super::{FlashFwdCfg, FwdKernelTraits};
use crate::{
    element::{Element, WARP_SIZE},
    layout::Layout,
};
use num_traits::{Float, PrimInt, Unsigned};
use std::marker::PhantomData;

/// 编译期确定的前向 kernel 配置。
///
/// 所有常量在使用时求值，参数不满足约束则无法编译。
pub trait FwdTraits {
    type Element: Float;
    type ElementAccum: Float;
    type Index: PrimInt + Unsigned;

    const CFG: FlashFwdCfg;
    const TRAITS: FwdKernelTraits;

    const N_WARPS: usize = Self::TRAITS.n_warps;
    const N_THREADS: usize = Self::TRAITS.n_threads;
    const BLOCK_M: usize = Self::TRAITS.block_m;
    const BLOCK_N: usize = Self::TRAITS.block_n;
    const HEAD_DIM: usize = Self::TRAITS.head_dim;
    const BLOCK_K_SMEM: usize = Self::TRAITS.block_k_smem;
    const BLOCK_K_GMEM: usize = Self::TRAITS.block_k_gmem;
    const HAS_CP_ASYNC: bool = Self::TRAITS.element.has_cp_async;

    const SMEM_LAYOUT_QO: Layout = Self::TRAITS.smem_layout_qo;
    const SMEM_LAYOUT_KV: Layout = Self::TRAITS.smem_layout_kv;
    const SMEM_LAYOUT_VT: Layout = Self::TRAITS.smem_layout_vt;
    const SMEM_SIZE: usize = Self::TRAITS.smem_size;

    const GMEM_ELEMS_PER_LOAD: usize = Self::TRAITS.gmem_elems_per_load;
    const GMEM_THREADS_PER_ROW: usize = Self::TRAITS.gmem_threads_per_row;
}

/// `(E, D, BLOCK_M, BLOCK_N, N_WARPS)` 决定的前向 kernel。
#[derive(Clone, Copy, Debug, Default)]
pub struct FlashFwd<
    E: Element,
    const D: usize,
    const BLOCK_M: usize,
    const BLOCK_N: usize,
    const N_WARPS: usize,
>(PhantomData<E>);

impl<E: Element, const D: usize, const BLOCK_M: usize, const BLOCK_N: usize, const N_WARPS: usize>
    FwdTraits for FlashFwd<E, D, BLOCK_M, BLOCK_N, N_WARPS>
{
    type Element = E::Storage;
    type ElementAccum = E::Accum;
    type Index = E::Index;

    const CFG: FlashFwdCfg = FlashFwdCfg {
        d: D,
        block_m: BLOCK_M,
        block_n: BLOCK_N,
        n_warps: N_WARPS,
    };

    const TRAITS: FwdKernelTraits = match Self::CFG.derive(&E::PROFILE) {
        Ok(traits) => traits,
        Err(e) => panic!("{}", e.reason()),
    };
}

impl<E: Element, const D: usize, const BLOCK_M: usize, const BLOCK_N: usize, const N_WARPS: usize>
    FlashFwd<E, D, BLOCK_M, BLOCK_N, N_WARPS>
{
    /// 实例化 kernel 配置，约束在此处检查
    pub const fn new() -> Self {
        const { assert!(<Self as FwdTraits>::TRAITS.n_threads == N_WARPS * WARP_SIZE) };
        Self(PhantomData)
    }

    pub const fn traits(&self) -> FwdKernelTraits {
        <Self as FwdTraits>::TRAITS
    }
}
