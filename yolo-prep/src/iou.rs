//! Batched intersection over union.

use crate::common::*;
use bbox::iou_cxcywh;

/// Computes element-wise IoU of two box tensors.
///
/// Both tensors have shape `[..., 4]` with the last axis laid out as
/// `[x, y, w, h]` in center form. The output has shape `[..., 1]`.
pub fn intersection_over_union(lhs: &ArrayViewD<f32>, rhs: &ArrayViewD<f32>) -> Result<ArrayD<f32>> {
    ensure!(
        lhs.shape() == rhs.shape(),
        "box tensors must have the same shape, but get {:?} and {:?}",
        lhs.shape(),
        rhs.shape()
    );
    let last = match lhs.ndim().checked_sub(1) {
        Some(last) => last,
        None => bail!("box tensors must have at least one dimension"),
    };
    ensure!(
        lhs.shape()[last] == 4,
        "the last dimension must be 4, but get {}",
        lhs.shape()[last]
    );

    let iou = Zip::from(lhs.lanes(Axis(last)))
        .and(rhs.lanes(Axis(last)))
        .map_collect(|lhs, rhs| {
            iou_cxcywh([lhs[0], lhs[1], lhs[2], lhs[3]], [rhs[0], rhs[1], rhs[2], rhs[3]])
        });

    Ok(iou.insert_axis(Axis(last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn batched_iou_shape_and_values() -> Result<()> {
        let lhs = array![
            [[0.5, 0.5, 0.2, 0.2], [0.2, 0.2, 0.1, 0.1]],
            [[0.5, 0.5, 1.0, 1.0], [0.5, 0.5, 0.0, 0.0]],
        ]
        .into_dyn();
        let rhs = array![
            [[0.5, 0.5, 0.2, 0.2], [0.8, 0.8, 0.1, 0.1]],
            [[1.0, 0.5, 1.0, 1.0], [0.5, 0.5, 0.0, 0.0]],
        ]
        .into_dyn();

        let iou = intersection_over_union(&lhs.view(), &rhs.view())?;
        assert_eq!(iou.shape(), &[2, 2, 1]);
        assert_abs_diff_eq!(iou[[0, 0, 0]], 1.0);
        assert_abs_diff_eq!(iou[[0, 1, 0]], 0.0);
        assert_abs_diff_eq!(iou[[1, 0, 0]], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(iou[[1, 1, 0]], 0.0);
        Ok(())
    }

    #[test]
    fn batched_iou_is_symmetric_and_bounded() -> Result<()> {
        let lhs = array![[0.3, 0.4, 0.25, 0.5], [0.1, 0.9, 0.3, 0.3], [0.6, 0.6, 0.5, 0.1]].into_dyn();
        let rhs = array![[0.45, 0.35, 0.3, 0.2], [0.2, 0.8, 0.1, 0.4], [0.6, 0.6, 0.1, 0.5]].into_dyn();

        let forward = intersection_over_union(&lhs.view(), &rhs.view())?;
        let backward = intersection_over_union(&rhs.view(), &lhs.view())?;
        assert_eq!(forward, backward);
        assert!(forward.iter().all(|&iou| (0.0..=1.0).contains(&iou)));
        Ok(())
    }

    #[test]
    fn batched_iou_rejects_bad_shapes() {
        let lhs = ArrayD::<f32>::zeros(IxDyn(&[3, 4]));
        let rhs = ArrayD::<f32>::zeros(IxDyn(&[2, 4]));
        assert!(intersection_over_union(&lhs.view(), &rhs.view()).is_err());

        let lhs = ArrayD::<f32>::zeros(IxDyn(&[3, 5]));
        assert!(intersection_over_union(&lhs.view(), &lhs.view()).is_err());
    }
}
