//! 元素类型到 tensor core 指令与拷贝原子的映射表。

use any_tensor::digit_layout::{DigitLayout, types};
use half::{bf16, f16};
use num_traits::{Float, PrimInt, Unsigned};

/// 一个 warp 的线程数
pub const WARP_SIZE: usize = 32;

/// 单条 mma 指令处理的 (M, N, K)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MmaShape {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MmaAtom {
    pub name: &'static str,
    pub shape: MmaShape,
    pub a: DigitLayout,
    pub b: DigitLayout,
    pub c: DigitLayout,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum CopyOp {
    /// 逐元素的普通 load/store
    Default,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CopyAtom {
    pub op: CopyOp,
    pub value: DigitLayout,
}

impl CopyAtom {
    pub const fn new(op: CopyOp, value: DigitLayout) -> Self {
        Self { op, value }
    }
}

/// 一种元素类型解析出的全部指令与存储选择。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ElementProfile {
    pub element: DigitLayout,
    pub accum: DigitLayout,
    pub index: DigitLayout,
    /// 存储类型的字节数
    pub nbytes: usize,
    pub mma: MmaAtom,
    pub smem_copy: CopyAtom,
    pub smem_copy_transposed: CopyAtom,
    /// 是否可用 cp.async 异步拷贝
    pub has_cp_async: bool,
}

impl ElementProfile {
    pub const SUPPORTED: [Self; 2] = [
        <f16 as Element>::PROFILE,
        <bf16 as Element>::PROFILE,
    ];

    /// 按类型标记查表
    pub fn lookup(dt: DigitLayout) -> Option<Self> {
        Self::SUPPORTED.into_iter().find(|p| p.element == dt)
    }

    /// sm80 的 16x8x16 mma，累加到 f32，不使用 cp.async
    const fn sm80(element: DigitLayout, nbytes: usize, mma: &'static str) -> Self {
        Self {
            element,
            accum: types::F32,
            index: types::U32,
            nbytes,
            mma: MmaAtom {
                name: mma,
                shape: MmaShape { m: 16, n: 8, k: 16 },
                a: element,
                b: element,
                c: types::F32,
            },
            smem_copy: CopyAtom::new(CopyOp::Default, element),
            smem_copy_transposed: CopyAtom::new(CopyOp::Default, element),
            has_cp_async: false,
        }
    }
}

/// 可作为 flash attention 输入的元素类型。
///
/// 新增类型只需实现此 trait 并登记到 [`ElementProfile::SUPPORTED`]。
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a supported flash-attention element type",
    label = "unsupported element type",
    note = "supported element types are `half::f16` and `half::bf16`"
)]
pub trait Element: Copy + 'static {
    type Storage: Float;
    type Accum: Float;
    type Index: PrimInt + Unsigned;

    const PROFILE: ElementProfile;
}

impl Element for f16 {
    type Storage = f16;
    type Accum = f32;
    type Index = u32;

    const PROFILE: ElementProfile =
        ElementProfile::sm80(types::F16, size_of::<f16>(), "SM80_16x8x16_F32F16F16F32_TN");
}

impl Element for bf16 {
    type Storage = bf16;
    type Accum = f32;
    type Index = u32;

    const PROFILE: ElementProfile =
        ElementProfile::sm80(types::BF16, size_of::<bf16>(), "SM80_16x8x16_F32BF16BF16F32_TN");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let half = ElementProfile::lookup(types::F16).unwrap();
        assert_eq!(half, <f16 as Element>::PROFILE);
        assert_eq!(half.nbytes, 2);
        assert_eq!(half.accum, types::F32);
        assert_eq!(half.index, types::U32);
        assert_eq!(half.mma.shape, MmaShape { m: 16, n: 8, k: 16 });
        assert!(!half.has_cp_async);

        let brain = ElementProfile::lookup(types::BF16).unwrap();
        assert_eq!(brain, <bf16 as Element>::PROFILE);
        assert_eq!(brain.mma.name, "SM80_16x8x16_F32BF16BF16F32_TN");
        assert_eq!(brain.smem_copy.value, types::BF16);

        assert!(ElementProfile::lookup(types::F32).is_none());
        assert!(ElementProfile::lookup(types::F64).is_none())
    }

    #[test]
    fn test_profiles_distinct() {
        let [a, b] = ElementProfile::SUPPORTED;
        assert_ne!(a.element, b.element);
        assert_eq!(a.mma.shape, b.mma.shape)
    }
}
