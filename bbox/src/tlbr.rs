use super::Rect;
use crate::{common::*, Transform, HW};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Build a box from corner coordinates in `(xmin, ymin, xmax, ymax)` order.
    pub fn try_from_xyxy(xyxy: [T; 4]) -> Result<Self> {
        let [l, t, r, b] = xyxy;
        Self::try_from_tlbr([t, l, b, r])
    }

    /// The axis-aligned bounds of a set of `(row, col)` points.
    ///
    /// Returns `None` if the point set is empty.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (T, T)>,
    {
        let mut iter = points.into_iter();
        let (row, col) = iter.next()?;
        let init = TLBR {
            t: row,
            l: col,
            b: row,
            r: col,
        };

        let tlbr = iter.fold(init, |mut tlbr, (row, col)| {
            if row < tlbr.t {
                tlbr.t = row;
            }
            if row > tlbr.b {
                tlbr.b = row;
            }
            if col < tlbr.l {
                tlbr.l = col;
            }
            if col > tlbr.r {
                tlbr.r = col;
            }
            tlbr
        });

        Some(tlbr)
    }

    /// Clamp the box into the `[0, h] x [0, w]` image area.
    pub fn clamp_to(&self, size: &HW<T>) -> Self {
        let zero = T::zero();
        let clamp = |value: T, max: T| -> T {
            if value < zero {
                zero
            } else if value > max {
                max
            } else {
                value
            }
        };

        TLBR {
            t: clamp(self.t, size.h()),
            l: clamp(self.l, size.w()),
            b: clamp(self.b, size.h()),
            r: clamp(self.r, size.w()),
        }
    }

    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }
}

impl<T> Rect for TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    type Type = T;

    fn t(&self) -> Self::Type {
        self.t
    }

    fn l(&self) -> Self::Type {
        self.l
    }

    fn b(&self) -> Self::Type {
        self.b
    }

    fn r(&self) -> Self::Type {
        self.r
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self> {
        let [t, l, h, w] = tlhw;
        let b = t + h;
        let r = l + w;
        Self::try_from_tlbr([t, l, b, r])
    }
}
