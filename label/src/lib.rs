use bbox::{CyCxHW, Rect, Transform, TLBR};
use num_traits::{Float, Num};
use std::ops::Mul;

/// A bounding box tagged with a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<R, C> Label<R, C>
where
    R: Rect,
    C: Copy,
{
    pub fn new(class: C, rect: R) -> Self {
        Self { rect, class }
    }

    pub fn class(&self) -> C {
        self.class
    }

    pub fn cx(&self) -> R::Type {
        self.rect.cx()
    }

    pub fn cy(&self) -> R::Type {
        self.rect.cy()
    }

    pub fn w(&self) -> R::Type {
        self.rect.w()
    }

    pub fn h(&self) -> R::Type {
        self.rect.h()
    }

    /// Replaces the box while keeping the class.
    pub fn map_rect<S, F>(&self, f: F) -> Label<S, C>
    where
        S: Rect,
        F: FnOnce(&R) -> S,
    {
        Label {
            rect: f(&self.rect),
            class: self.class,
        }
    }
}

impl<T, C> Label<CyCxHW<T>, C>
where
    T: Float,
    C: Copy,
{
    /// Mirrors a label in ratio units, mapping `cx` to `1 - cx`.
    pub fn h_flip(&self) -> Self {
        let half = T::one() / (T::one() + T::one());
        self.map_rect(|rect| rect.h_flip(half))
    }
}

impl<'a, T, C> Mul<&'a Label<TLBR<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<TLBR<T>, C>;

    fn mul(self, rhs: &'a Label<TLBR<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}

impl<'a, T, C> Mul<&'a Label<CyCxHW<T>, C>> for &'a Transform<T>
where
    T: Copy + Num + PartialOrd,
    C: Copy,
{
    type Output = Label<CyCxHW<T>, C>;

    fn mul(self, rhs: &'a Label<CyCxHW<T>, C>) -> Self::Output {
        Label {
            rect: self * &rhs.rect,
            class: rhs.class,
        }
    }
}
