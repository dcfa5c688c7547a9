//! GeoTIFF raster reading and resampling.

use crate::common::*;
use geo::{AffineTransform, Coord};
use num_traits::{Bounded, NumCast, ToPrimitive};
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
    ColorType,
};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;

/// The value type a raster can be stored in.
pub trait RasterValue
where
    Self: 'static + Copy + Default + Debug + Send + Sync + ToPrimitive + NumCast + Bounded,
{
    const IS_FLOAT: bool;

    /// Convert from `f64`, rounding and saturating for integer types.
    fn from_f64_saturating(value: f64) -> Self {
        if Self::IS_FLOAT {
            return <Self as NumCast>::from(value).unwrap_or_default();
        }

        let min = Self::min_value().to_f64().unwrap_or(f64::MIN);
        let max = Self::max_value().to_f64().unwrap_or(f64::MAX);
        let value = if value.is_nan() { 0.0 } else { value.round() };
        <Self as NumCast>::from(value.max(min).min(max)).unwrap_or_default()
    }
}

macro_rules! impl_raster_value {
    ($($ty:ty => $is_float:expr),* $(,)?) => {
        $(
            impl RasterValue for $ty {
                const IS_FLOAT: bool = $is_float;
            }
        )*
    };
}

impl_raster_value! {
    u8 => false,
    u16 => false,
    i16 => false,
    u32 => false,
    i32 => false,
    f32 => true,
    f64 => true,
}

/// Band-interleaved raster samples in shape `[bands, height, width]`,
/// kept in the value type of the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterArray {
    U8(Array3<u8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    U32(Array3<u32>),
    I32(Array3<i32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

macro_rules! dispatch {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            RasterArray::U8($array) => $body,
            RasterArray::U16($array) => $body,
            RasterArray::I16($array) => $body,
            RasterArray::U32($array) => $body,
            RasterArray::I32($array) => $body,
            RasterArray::F32($array) => $body,
            RasterArray::F64($array) => $body,
        }
    };
}

macro_rules! dispatch_map {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            RasterArray::U8($array) => RasterArray::U8($body),
            RasterArray::U16($array) => RasterArray::U16($body),
            RasterArray::I16($array) => RasterArray::I16($body),
            RasterArray::U32($array) => RasterArray::U32($body),
            RasterArray::I32($array) => RasterArray::I32($body),
            RasterArray::F32($array) => RasterArray::F32($body),
            RasterArray::F64($array) => RasterArray::F64($body),
        }
    };
}

impl RasterArray {
    /// The `(bands, height, width)` shape.
    pub fn shape(&self) -> (usize, usize, usize) {
        dispatch!(self, array => array.dim())
    }

    pub fn num_bands(&self) -> usize {
        self.shape().0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::I16(_) => "i16",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
        }
    }

    /// Bilinearly resample every band onto a `height` x `width` grid.
    pub fn resample(&self, height: usize, width: usize) -> Self {
        dispatch_map!(self, array => resample_bilinear(array, height, width))
    }

    pub fn to_f64(&self) -> Array3<f64> {
        dispatch!(self, array => array.mapv(|value| value.to_f64().unwrap_or(f64::NAN)))
    }

    pub fn to_f32(&self) -> Array3<f32> {
        dispatch!(self, array => array.mapv(|value| value.to_f32().unwrap_or(f32::NAN)))
    }

    /// Cast to 8-bit samples. Values outside `[0, 255]` saturate.
    pub fn to_u8(&self) -> Array3<u8> {
        match self {
            Self::U8(array) => array.clone(),
            _ => self.to_f64().mapv(u8::from_f64_saturating),
        }
    }
}

/// A georeferenced raster file.
#[derive(Debug, Clone)]
pub struct Raster {
    pub path: PathBuf,
    pub data: RasterArray,
    /// Maps `(col, row)` pixel coordinates to geographic `(x, y)`.
    pub transform: AffineTransform<f64>,
}

impl Raster {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::open_inner(path).with_context(|| format!("failed to read raster '{}'", path.display()))
    }

    fn open_inner(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);
        let num_bands = match decoder.colortype()? {
            ColorType::Gray(_) | ColorType::Palette(_) => 1,
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) | ColorType::YCbCr(_) => 3,
            ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
            ColorType::Multiband { num_samples, .. } => num_samples as usize,
            other => bail!("unsupported color type {:?}", other),
        };
        let transform = read_geotransform(&mut decoder)?;
        let layout = read_layout(&mut decoder)?;

        let shape = (num_bands, height, width);
        let decoded = decoder.read_image();
        let decoded = match layout {
            SampleLayout::Interleaved => decoded?,
            SampleLayout::BandSeparate => decoded.with_context(|| {
                format!("failed to decode band-separate raster with {} bands", num_bands)
            })?,
        };
        let data = match decoded {
            DecodingResult::U8(buf) => RasterArray::U8(to_band_major(layout, shape, buf)?),
            DecodingResult::U16(buf) => RasterArray::U16(to_band_major(layout, shape, buf)?),
            DecodingResult::I16(buf) => RasterArray::I16(to_band_major(layout, shape, buf)?),
            DecodingResult::U32(buf) => RasterArray::U32(to_band_major(layout, shape, buf)?),
            DecodingResult::I32(buf) => RasterArray::I32(to_band_major(layout, shape, buf)?),
            DecodingResult::F32(buf) => RasterArray::F32(to_band_major(layout, shape, buf)?),
            DecodingResult::F64(buf) => RasterArray::F64(to_band_major(layout, shape, buf)?),
            _ => bail!("unsupported sample format"),
        };

        Ok(Self {
            path: path.to_owned(),
            data,
            transform,
        })
    }

    /// The native `[height, width]` of the raster.
    pub fn size(&self) -> HW<usize> {
        let (_, h, w) = self.data.shape();
        HW::from_hw([h, w])
    }

    /// Get the `(row, col)` pixel index that contains the geographic point.
    pub fn index(&self, x: f64, y: f64) -> Result<(i64, i64)> {
        let inverse = self
            .transform
            .inverse()
            .ok_or_else(|| format_err!("the geotransform of '{}' is singular", self.path.display()))?;
        let Coord { x: col, y: row } = inverse.apply(Coord { x, y });
        Ok((row.floor() as i64, col.floor() as i64))
    }

    /// Resample the raster data onto the target grid.
    pub fn resample(&self, size: &HW<usize>) -> RasterArray {
        self.data.resample(size.h(), size.w())
    }
}

/// Build the pixel-to-geographic transform from the GeoTIFF model tags.
///
/// Rasters without georeferencing map pixels onto themselves.
fn read_geotransform<R>(decoder: &mut Decoder<R>) -> Result<AffineTransform<f64>>
where
    R: io::Read + io::Seek,
{
    let mut find_f64_vec = |code: u16| -> Result<Option<Vec<f64>>> {
        let value = decoder.find_tag(Tag::from_u16_exhaustive(code))?;
        Ok(value.map(|value| value.into_f64_vec()).transpose()?)
    };

    if let Some(matrix) = find_f64_vec(MODEL_TRANSFORMATION_TAG)? {
        ensure!(matrix.len() >= 8, "malformed ModelTransformationTag");
        return Ok(AffineTransform::new(
            matrix[0], matrix[1], matrix[3], matrix[4], matrix[5], matrix[7],
        ));
    }

    let tiepoint = find_f64_vec(MODEL_TIEPOINT_TAG)?;
    let scale = find_f64_vec(MODEL_PIXEL_SCALE_TAG)?;

    match (tiepoint, scale) {
        (Some(tiepoint), Some(scale)) => {
            ensure!(tiepoint.len() >= 6, "malformed ModelTiepointTag");
            ensure!(scale.len() >= 2, "malformed ModelPixelScaleTag");
            let [i, j, _k, x, y, _z]: [f64; 6] = tiepoint[..6].try_into()?;
            let (sx, sy) = (scale[0], scale[1]);
            Ok(AffineTransform::new(
                sx,
                0.0,
                x - i * sx,
                0.0,
                -sy,
                y + j * sy,
            ))
        }
        _ => Ok(AffineTransform::identity()),
    }
}

/// How the samples of a multi-band pixel are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleLayout {
    /// All bands of a pixel are adjacent.
    Interleaved,
    /// Each band is stored as a separate plane.
    BandSeparate,
}

fn read_layout<R>(decoder: &mut Decoder<R>) -> Result<SampleLayout>
where
    R: io::Read + io::Seek,
{
    let planar = decoder
        .find_tag(Tag::PlanarConfiguration)?
        .map(|value| value.into_u16())
        .transpose()?
        .unwrap_or(1);

    let layout = match planar {
        1 => SampleLayout::Interleaved,
        2 => SampleLayout::BandSeparate,
        other => bail!("invalid PlanarConfiguration value {}", other),
    };
    Ok(layout)
}

/// Arrange decoded samples into shape `[bands, height, width]`.
fn to_band_major<T>(
    layout: SampleLayout,
    shape: (usize, usize, usize),
    buf: Vec<T>,
) -> Result<Array3<T>>
where
    T: Copy,
{
    let (c, h, w) = shape;
    ensure!(
        buf.len() == c * h * w,
        "expect {} samples for {} bands, but found {}",
        c * h * w,
        c,
        buf.len()
    );

    let array = match layout {
        SampleLayout::BandSeparate => Array3::from_shape_vec((c, h, w), buf)?,
        SampleLayout::Interleaved => Array3::from_shape_vec((h, w, c), buf)?
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned(),
    };
    Ok(array)
}

/// Bilinear resampling with pixel-center alignment.
pub fn resample_bilinear<T>(array: &Array3<T>, height: usize, width: usize) -> Array3<T>
where
    T: RasterValue,
{
    let (bands, src_h, src_w) = array.dim();
    if (src_h, src_w) == (height, width) {
        return array.clone();
    }
    if src_h == 0 || src_w == 0 {
        return Array3::default((bands, height, width));
    }

    // source sample position and blending weight per target coordinate
    let sample_positions = |src_len: usize, tgt_len: usize| -> Vec<(usize, usize, f64)> {
        let scale = src_len as f64 / tgt_len as f64;
        (0..tgt_len)
            .map(|index| {
                let pos = ((index as f64 + 0.5) * scale - 0.5).max(0.0);
                let lower = (pos.floor() as usize).min(src_len - 1);
                let upper = (lower + 1).min(src_len - 1);
                (lower, upper, pos - lower as f64)
            })
            .collect()
    };
    let rows = sample_positions(src_h, height);
    let cols = sample_positions(src_w, width);

    let mut output = Array3::default((bands, height, width));
    for band in 0..bands {
        let src = array.index_axis(Axis(0), band);
        let mut tgt = output.index_axis_mut(Axis(0), band);

        for (row, &(r0, r1, dy)) in rows.iter().enumerate() {
            for (col, &(c0, c1, dx)) in cols.iter().enumerate() {
                let value = |r: usize, c: usize| src[[r, c]].to_f64().unwrap_or(f64::NAN);
                let top = value(r0, c0) * (1.0 - dx) + value(r0, c1) * dx;
                let bottom = value(r1, c0) * (1.0 - dx) + value(r1, c1) * dx;
                tgt[[row, col]] = T::from_f64_saturating(top * (1.0 - dy) + bottom * dy);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn saturating_cast() {
        assert_eq!(u8::from_f64_saturating(300.0), 255);
        assert_eq!(u8::from_f64_saturating(-4.0), 0);
        assert_eq!(u8::from_f64_saturating(12.6), 13);
        assert_eq!(i16::from_f64_saturating(f64::NAN), 0);
        assert_abs_diff_eq!(f32::from_f64_saturating(-1.25), -1.25);
    }

    #[test]
    fn resample_keeps_constant_band() {
        let array = Array3::from_elem((2, 4, 4), 7.5f32);
        let output = resample_bilinear(&array, 10, 6);
        assert_eq!(output.dim(), (2, 10, 6));
        output.iter().for_each(|&value| assert_abs_diff_eq!(value, 7.5));
    }

    #[test]
    fn resample_interpolates_between_pixels() {
        let array = array![[[0.0f64, 10.0]]];
        let output = resample_bilinear(&array, 1, 4);
        // target centers at 0.125, 0.375, 0.625, 0.875 of the row
        let expect = [0.0, 2.5, 7.5, 10.0];
        output
            .iter()
            .zip(expect.iter())
            .for_each(|(&lhs, &rhs)| assert_abs_diff_eq!(lhs, rhs));
    }

    #[test]
    fn resample_preserves_type() {
        let raster = RasterArray::U16(Array3::from_elem((3, 2, 2), 1000u16));
        let output = raster.resample(5, 5);
        assert_eq!(output.kind_name(), "u16");
        assert_eq!(output.shape(), (3, 5, 5));
        assert_eq!(output.to_u8(), Array3::from_elem((3, 5, 5), 255u8));
    }

    #[test]
    fn band_major_layout() {
        // two pixels of interleaved RGB
        let array =
            to_band_major(SampleLayout::Interleaved, (3, 1, 2), vec![1u8, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(array, array![[[1u8, 4]], [[2, 5]], [[3, 6]]]);
        assert!(to_band_major(SampleLayout::Interleaved, (3, 1, 2), vec![1u8, 2]).is_err());
    }

    #[test]
    fn band_separate_layout() {
        // three planes of two pixels each
        let array =
            to_band_major(SampleLayout::BandSeparate, (3, 1, 2), vec![1u8, 4, 2, 5, 3, 6]).unwrap();
        assert_eq!(array, array![[[1u8, 4]], [[2, 5]], [[3, 6]]]);

        // only the first plane was decoded
        let err = to_band_major(SampleLayout::BandSeparate, (3, 1, 2), vec![1u8, 4]).unwrap_err();
        assert!(err.to_string().contains("3 bands"));
    }
}
