//! Conversion of samples into libtorch tensors.

use crate::{common::*, dataset::Sample};
use tch::{Kind, Tensor};

/// The tensor form of a [Sample].
#[derive(Debug)]
pub struct TensorSample {
    /// `[3, h, w]` in `Uint8`.
    pub image: Tensor,
    /// `[bands, h, w]` in `Float`.
    pub hsi: Tensor,
    /// `[1, h, w]` in `Float`.
    pub chm: Tensor,
    /// `[3, num_points]` in `Double`.
    pub las: Tensor,
    /// `[num_boxes, 4]` xyxy boxes in `Float`.
    pub boxes: Option<Tensor>,
    /// `[num_boxes]` in `Int64`.
    pub labels: Option<Tensor>,
}

impl Sample {
    pub fn to_tensors(&self) -> Result<TensorSample> {
        let image = array3_to_tensor(&self.image)?;
        let hsi = array3_to_tensor(&self.hsi.to_f32())?;
        let chm = array3_to_tensor(&self.chm.to_f32())?;
        let las = {
            let (rows, cols) = self.las.dim();
            let values: Vec<f64> = self.las.iter().copied().collect();
            Tensor::of_slice(&values).f_view(&[rows as i64, cols as i64])?
        };

        let boxes = self
            .boxes_xyxy()
            .map(|boxes| -> Result<_> {
                let num_boxes = boxes.nrows() as i64;
                let values: Vec<f32> = boxes.iter().map(|&value| value as f32).collect();
                let tensor = Tensor::of_slice(&values).f_view(&[num_boxes, 4])?;
                Ok(tensor)
            })
            .transpose()?;
        let labels = self.labels.as_ref().map(|labels| {
            let values: Vec<i64> = labels.iter().map(|&label| label as i64).collect();
            Tensor::of_slice(&values).to_kind(Kind::Int64)
        });

        Ok(TensorSample {
            image,
            hsi,
            chm,
            las,
            boxes,
            labels,
        })
    }
}

fn array3_to_tensor<T>(array: &Array3<T>) -> Result<Tensor>
where
    T: tch::kind::Element + Copy,
{
    let (c, h, w) = array.dim();
    let values: Vec<T> = array.iter().copied().collect();
    let tensor = Tensor::of_slice(&values).f_view(&[c as i64, h as i64, w as i64])?;
    Ok(tensor)
}
