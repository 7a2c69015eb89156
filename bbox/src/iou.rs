use crate::common::*;

/// Intersection over union of two boxes in `[cx, cy, w, h]` layout.
///
/// Box areas are taken by absolute value, so boxes with negative extents
/// still produce a finite ratio. If the union area is not positive, the
/// result is zero.
pub fn iou_cxcywh<T>(lhs: [T; 4], rhs: [T; 4]) -> T
where
    T: Float,
{
    let [l_t, l_l, l_b, l_r] = corners(lhs);
    let [r_t, r_l, r_b, r_r] = corners(rhs);
    let zero = T::zero();

    let dy = (l_b.min(r_b) - l_t.max(r_t)).max(zero);
    let dx = (l_r.min(r_r) - l_l.max(r_l)).max(zero);
    let inter_area = dx * dy;

    let l_area = ((l_b - l_t) * (l_r - l_l)).abs();
    let r_area = ((r_b - r_t) * (r_r - r_l)).abs();
    let union_area = l_area + r_area - inter_area;

    if union_area > zero {
        inter_area / union_area
    } else {
        zero
    }
}

/// Converts `[cx, cy, w, h]` into `[t, l, b, r]` without validation.
fn corners<T>(cxcywh: [T; 4]) -> [T; 4]
where
    T: Float,
{
    let [cx, cy, w, h] = cxcywh;
    let two = T::one() + T::one();
    [cy - h / two, cx - w / two, cy + h / two, cx + w / two]
}
