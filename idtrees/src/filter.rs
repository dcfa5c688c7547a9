//! Box clipping and small box removal.

use crate::common::*;

/// Clip boxes into the image and drop the ones that became too small.
///
/// Every box is clamped into `[0, w] x [0, h]`. A box is kept only if both
/// its clipped width and height are at least `min_size`. The same keep mask
/// is applied to the labels, which must be parallel to the boxes.
pub fn filter_boxes<C>(
    size: &HW<f64>,
    min_size: f64,
    boxes: Vec<TLBR<f64>>,
    labels: Option<Vec<C>>,
) -> Result<(Vec<TLBR<f64>>, Option<Vec<C>>)> {
    if let Some(labels) = &labels {
        ensure!(
            labels.len() == boxes.len(),
            "the number of labels ({}) does not match the number of boxes ({})",
            labels.len(),
            boxes.len()
        );
    }

    let clipped: Vec<_> = boxes.iter().map(|tlbr| tlbr.clamp_to(size)).collect();
    let keep: Vec<bool> = clipped
        .iter()
        .map(|tlbr| tlbr.w() >= min_size && tlbr.h() >= min_size)
        .collect();

    let boxes: Vec<_> = clipped
        .into_iter()
        .zip(&keep)
        .filter_map(|(tlbr, &keep)| keep.then(|| tlbr))
        .collect();
    let labels = labels.map(|labels| {
        labels
            .into_iter()
            .zip(&keep)
            .filter_map(|(label, &keep)| keep.then(|| label))
            .collect()
    });

    Ok((boxes, labels))
}
