use crate::{common::*, iou_cxcywh, TLBR};

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn cy(&self) -> Self::Type;
    fn cx(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn from_tlbr(tlbr: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_tlbr(tlbr).unwrap()
    }

    fn from_cycxhw(cycxhw: [Self::Type; 4]) -> Self
    where
        Self: Sized,
    {
        Self::try_from_cycxhw(cycxhw).unwrap()
    }

    fn cycxhw(&self) -> [Self::Type; 4] {
        [self.cy(), self.cx(), self.h(), self.w()]
    }

    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    fn to_tlbr(&self) -> TLBR<Self::Type> {
        TLBR {
            t: self.t(),
            l: self.l(),
            b: self.b(),
            r: self.r(),
        }
    }

    fn area(&self) -> <Self::Type as Mul<Self::Type>>::Output
    where
        Self::Type: Mul<Self::Type>,
    {
        self.h() * self.w()
    }
}

pub trait RectFloat: RectNum
where
    Self::Type: Float,
{
    /// Intersection over union, zero when the union area is not positive.
    fn iou_with<R>(&self, other: &R) -> Self::Type
    where
        R: Rect<Type = Self::Type>,
    {
        iou_cxcywh(
            [self.cx(), self.cy(), self.w(), self.h()],
            [other.cx(), other.cy(), other.w(), other.h()],
        )
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

impl<T> RectFloat for T
where
    T: Rect,
    T::Type: Float,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CyCxHW, TLBR};
    use approx::assert_abs_diff_eq;

    #[test]
    fn rect_iou_across_formats() {
        let tlbr = TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]);
        let cycxhw = CyCxHW::from_cycxhw([0.5, 1.0, 1.0, 1.0]);
        assert_abs_diff_eq!(tlbr.iou_with(&cycxhw), 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(tlbr.iou_with(&tlbr), 1.0);
    }

    #[test]
    fn rect_disjoint_has_no_intersection() {
        let lhs = TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]);
        let rhs = TLBR::from_tlbr([2.0, 2.0, 3.0, 3.0]);
        assert_abs_diff_eq!(lhs.iou_with(&rhs), 0.0);
    }
}
