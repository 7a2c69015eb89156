use super::{CyCxHW, Rect};
use crate::{common::*, Transform};

/// Bounding box in TLBR format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TLBR<T> {
    pub(crate) t: T,
    pub(crate) l: T,
    pub(crate) b: T,
    pub(crate) r: T,
}

impl<T> TLBR<T> {
    pub fn try_cast<V>(self) -> Option<TLBR<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(TLBR {
            t: V::from(self.t)?,
            l: V::from(self.l)?,
            b: V::from(self.b)?,
            r: V::from(self.r)?,
        })
    }

    pub fn cast<V>(self) -> TLBR<V>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num,
{
    pub fn transform(&self, transform: &Transform<T>) -> Self {
        TLBR {
            t: self.t * transform.sy + transform.ty,
            l: self.l * transform.sx + transform.tx,
            b: self.b * transform.sy + transform.ty,
            r: self.r * transform.sx + transform.tx,
        }
    }
}

impl<T> TLBR<T>
where
    T: Copy + Num + PartialOrd,
{
    /// Expands every side by `amount`.
    pub fn pad(&self, amount: T) -> Self {
        Self {
            t: self.t - amount,
            l: self.l - amount,
            b: self.b + amount,
            r: self.r + amount,
        }
    }

    /// The smallest rectangle enclosing both rectangles.
    pub fn union_with(&self, other: &Self) -> Self {
        Self {
            t: partial_min(self.t, other.t),
            l: partial_min(self.l, other.l),
            b: partial_max(self.b, other.b),
            r: partial_max(self.r, other.r),
        }
    }

    /// Grows the rectangle symmetrically until it reaches the minimum
    /// height and width. The leading side takes the truncated half of the
    /// deficit and the trailing side takes the rest.
    pub fn grow_to(&self, min_h: T, min_w: T) -> Self {
        let two = T::one() + T::one();
        let mut grown = *self;

        let h = self.b - self.t;
        if h < min_h {
            let deficit = min_h - h;
            let half = deficit / two;
            grown.t = self.t - half;
            grown.b = self.b + (deficit - half);
        }

        let w = self.r - self.l;
        if w < min_w {
            let deficit = min_w - w;
            let half = deficit / two;
            grown.l = self.l - half;
            grown.r = self.r + (deficit - half);
        }

        grown
    }

    /// Clips the rectangle into the boundary.
    ///
    /// Returns `None` if nothing is left within the boundary.
    pub fn clip_to(&self, bound: &Self) -> Option<Self> {
        let t = partial_max(self.t, bound.t);
        let l = partial_max(self.l, bound.l);
        let b = partial_min(self.b, bound.b);
        let r = partial_min(self.r, bound.r);
        (b > t && r > l).then(|| Self { t, l, b, r })
    }
}

fn partial_min<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if rhs < lhs {
        rhs
    } else {
        lhs
    }
}

fn partial_max<T: PartialOrd>(lhs: T, rhs: T) -> T {
    if rhs > lhs {
        rhs
    } else {
        lhs
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

    fn cy(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.t + self.h() / two
    }

    fn cx(&self) -> Self::Type {
        let one = T::one();
        let two = one + one;
        self.l + self.w() / two
    }

    fn h(&self) -> Self::Type {
        self.b - self.t
    }

    fn w(&self) -> Self::Type {
        self.r - self.l
    }

    fn try_from_cycxhw(cycxhw: [Self::Type; 4]) -> Result<Self> {
        let [cy, cx, h, w] = cycxhw;
        let zero = T::zero();
        ensure!(h >= zero && w >= zero, "h and w must be non-negative");

        let two = T::one() + T::one();
        let t = cy - h / two;
        let b = cy + h / two;
        let l = cx - w / two;
        let r = cx + w / two;

        Ok(Self { t, l, b, r })
    }

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self> {
        let [t, l, b, r] = tlbr;
        ensure!(b >= t && r >= l, "b >= t and r >= l must hold");

        Ok(Self { t, l, b, r })
    }
}

impl<T> From<CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: CyCxHW<T>) -> Self {
        Self::from(&from)
    }
}

impl<T> From<&CyCxHW<T>> for TLBR<T>
where
    T: Copy + Num,
{
    fn from(from: &CyCxHW<T>) -> Self {
        let two = T::one() + T::one();
        let CyCxHW { cy, cx, h, w, .. } = *from;
        let t = cy - h / two;
        let l = cx - w / two;
        let b = cy + h / two;
        let r = cx + w / two;
        Self { t, l, b, r }
    }
}
