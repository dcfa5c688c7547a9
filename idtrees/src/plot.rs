//! Sample rendering.

use crate::{
    common::*,
    dataset::Sample,
    species::{self, NUM_CLASSES},
};
use image::{GenericImage, Rgb, RgbImage};
use palette::{FromColor, Hsv, Srgb};

/// Boxes predicted by a model for a sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub boxes: Vec<TLBR<f64>>,
    pub labels: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// HSI bands shown as red, green and blue of the false color panel.
    pub hsi_indices: [usize; 3],
    /// If set and non-empty, an extra panel draws the predictions.
    pub prediction: Option<Prediction>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            hsi_indices: [0, 1, 2],
            prediction: None,
        }
    }
}

/// Render the sample into side-by-side panels.
///
/// From left to right: the RGB image with ground truth boxes, the HSI false
/// color image, the canopy height model, and the predicted boxes if any.
///
/// Boxes carry no text. A labeled box is outlined in [class_color] of its
/// class and an unlabeled box in pure red. Use [class_legend] to list the
/// species code behind each color of a sample.
pub fn render_sample(sample: &Sample, options: &PlotOptions) -> Result<RgbImage> {
    let (_, height, width) = sample.image.dim();

    let mut panels = vec![];

    let mut truth = rgb_panel(&sample.image)?;
    if let Some(boxes) = &sample.boxes {
        draw_boxes(&mut truth, boxes, sample.labels.as_deref());
    }
    panels.push(truth);

    let hsi = sample.hsi.to_f64();
    let (num_bands, _, _) = hsi.dim();
    let bands: Vec<_> = options
        .hsi_indices
        .iter()
        .map(|&band| -> Result<_> {
            ensure!(
                band < num_bands,
                "HSI band {} is out of range for {} bands",
                band,
                num_bands
            );
            Ok(hsi.index_axis(Axis(0), band).to_owned())
        })
        .try_collect()?;
    let false_color = ndarray::stack(
        Axis(0),
        &bands.iter().map(|band| band.view()).collect::<Vec<_>>(),
    )?;
    panels.push(rgb_panel(&normalize_to_u8(&false_color))?);

    let chm = sample.chm.to_f64();
    ensure!(chm.dim().0 >= 1, "the canopy height model has no band");
    let gray = chm.slice(s![0..1, .., ..]).to_owned();
    let gray = normalize_to_u8(&gray);
    let gray = ndarray::concatenate(Axis(0), &[gray.view(), gray.view(), gray.view()])?;
    panels.push(rgb_panel(&gray)?);

    if let Some(prediction) = &options.prediction {
        if !prediction.boxes.is_empty() {
            let mut panel = rgb_panel(&sample.image)?;
            draw_boxes(&mut panel, &prediction.boxes, prediction.labels.as_deref());
            panels.push(panel);
        }
    }

    let mut canvas = RgbImage::new((width * panels.len()) as u32, height as u32);
    for (index, panel) in panels.iter().enumerate() {
        canvas.copy_from(panel, (index * width) as u32, 0)?;
    }

    Ok(canvas)
}

/// The drawing color of a species class.
pub fn class_color(class: usize) -> Rgb<u8> {
    let hue = (class % NUM_CLASSES) as f32 * 360.0 / NUM_CLASSES as f32;
    let hsv: Hsv = Hsv::new(hue, 1.0, 1.0);
    let color: Srgb<u8> = Srgb::<f32>::from_color(hsv).into_format();
    Rgb([color.red, color.green, color.blue])
}

/// The species codes and box colors of the given classes in first-seen
/// order, one entry per distinct class.
pub fn class_legend(labels: &[usize]) -> Vec<(&'static str, Rgb<u8>)> {
    labels
        .iter()
        .unique()
        .map(|&class| {
            let code = species::class_code(class).unwrap_or("?");
            (code, class_color(class))
        })
        .collect()
}

fn rgb_panel(array: &Array3<u8>) -> Result<RgbImage> {
    let (channels, height, width) = array.dim();
    ensure!(channels == 3, "expect 3 channels, but found {}", channels);

    let panel = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([array[[0, y, x]], array[[1, y, x]], array[[2, y, x]]])
    });
    Ok(panel)
}

/// Min-max normalize the whole array into `[0, 255]`.
fn normalize_to_u8(array: &Array3<f64>) -> Array3<u8> {
    let (min, max) = array
        .iter()
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &value| {
            (min.min(value), max.max(value))
        });
    let range = max - min;

    if !(range.is_finite() && range > 0.0) {
        return Array3::zeros(array.dim());
    }

    array.mapv(|value| {
        if value.is_finite() {
            ((value - min) / range * 255.0).round() as u8
        } else {
            0
        }
    })
}

fn draw_boxes(image: &mut RgbImage, boxes: &[TLBR<f64>], labels: Option<&[usize]>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let to_pixel = |value: f64, len: u32| -> u32 { (value.max(0.0) as u32).min(len - 1) };

    for (index, tlbr) in boxes.iter().enumerate() {
        let color = match labels.and_then(|labels| labels.get(index)) {
            Some(&class) => class_color(class),
            None => Rgb([255, 0, 0]),
        };

        let t = to_pixel(tlbr.t(), height);
        let b = to_pixel(tlbr.b(), height);
        let l = to_pixel(tlbr.l(), width);
        let r = to_pixel(tlbr.r(), width);

        for x in l..=r {
            image.put_pixel(x, t, color);
            image.put_pixel(x, b, color);
        }
        for y in t..=b {
            image.put_pixel(l, y, color);
            image.put_pixel(r, y, color);
        }
    }
}
