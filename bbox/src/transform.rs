use super::{Rect, TLBR};
use crate::{common::*, RectNum, HW};

/// Per-axis scale and translation between two pixel grids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transform<T> {
    pub sy: T,
    pub sx: T,
    pub ty: T,
    pub tx: T,
}

impl<T> Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn from_rects<R>(src: &R, tgt: &R) -> Self
    where
        R: Rect<Type = T>,
    {
        let sy = tgt.h() / src.h();
        let sx = tgt.w() / src.w();
        let ty = tgt.t() - src.t() * sy;
        let tx = tgt.l() - src.l() * sx;

        Self { sy, sx, ty, tx }
    }

    /// The transform that stretches the source grid onto the target grid.
    pub fn try_from_sizes_exact<S>(src_size: S, tgt_size: S) -> Result<Self>
    where
        S: TryInto<HW<T>, Error = anyhow::Error>,
    {
        let src_size = src_size.try_into()?;
        let tgt_size = tgt_size.try_into()?;
        ensure!(!src_size.is_empty(), "source size must not be empty");

        let src = TLBR::from_tlhw([T::zero(), T::zero(), src_size.h(), src_size.w()]);
        let tgt = TLBR::from_tlhw([T::zero(), T::zero(), tgt_size.h(), tgt_size.w()]);
        Ok(Self::from_rects(&src, &tgt))
    }
}

impl<T> Mul<&TLBR<T>> for &Transform<T>
where
    T: Copy + Num + PartialOrd,
{
    type Output = TLBR<T>;

    fn mul(self, rhs: &TLBR<T>) -> Self::Output {
        rhs.transform(self)
    }
}
