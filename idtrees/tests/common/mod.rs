//! A miniature on-disk IDTReeS dataset.
//!
//! Every scene covers the same 100 x 100 meter tile whose upper left corner
//! sits at `(ORIGIN_X, ORIGIN_Y)`. The RGB raster has a 0.5 meter pixel and
//! the HSI and CHM rasters a 5 meter pixel.

#![allow(dead_code)]

use shapefile::{
    dbase::{FieldName, FieldValue, Record, TableWriterBuilder},
    Point, Polygon, PolygonRing,
};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use tiff::{
    encoder::{colortype, TiffEncoder, TiffValue},
    tags::Tag,
};

pub const ORIGIN_X: f64 = 1000.0;
pub const ORIGIN_Y: f64 = 2000.0;
pub const RGB_PIXEL: f64 = 0.5;
pub const RGB_SIZE: u32 = 200;
pub const LOW_RES_PIXEL: f64 = 5.0;
pub const LOW_RES_SIZE: u32 = 20;

pub const HSI_BANDS: usize = 6;

pub const SCENE_A: &str = "SCENE_A.tif";
pub const SCENE_B: &str = "SCENE_B.tif";

/// A rectangular crown in RGB pixel indices, inclusive on both ends.
#[derive(Debug, Clone, Copy)]
pub struct PixelCrown {
    pub rows: (f64, f64),
    pub cols: (f64, f64),
}

impl PixelCrown {
    pub const fn new(rows: (f64, f64), cols: (f64, f64)) -> Self {
        Self { rows, cols }
    }

    /// The clockwise ring through the pixel centers of the corners.
    fn ring(&self) -> Vec<Point> {
        let x = |col: f64| ORIGIN_X + RGB_PIXEL * col + RGB_PIXEL / 2.0;
        let y = |row: f64| ORIGIN_Y - RGB_PIXEL * row - RGB_PIXEL / 2.0;
        let (top, bottom) = self.rows;
        let (left, right) = self.cols;

        vec![
            Point::new(x(left), y(top)),
            Point::new(x(right), y(top)),
            Point::new(x(right), y(bottom)),
            Point::new(x(left), y(bottom)),
            Point::new(x(left), y(top)),
        ]
    }
}

/// The crowns of scene A and the survey rows pointing to them, as
/// `(individual id, taxon, polygon id, crown)`.
pub fn train_crowns() -> Vec<(&'static str, &'static str, i64, PixelCrown)> {
    vec![
        ("T1", "ACRU", 1, PixelCrown::new((20.0, 60.0), (10.0, 50.0))),
        ("T2", "LITU", 2, PixelCrown::new((100.0, 130.0), (100.0, 140.0))),
        // narrower than a pixel, filtered out
        ("T3", "FAGR", 3, PixelCrown::new((70.0, 90.0), (70.0, 70.4))),
        // reaches past the right border, clipped
        ("T4", "ACPE", 4, PixelCrown::new((0.0, 10.0), (190.0, 230.0))),
    ]
}

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A training split with scene A carrying [train_crowns] and scene B
    /// carrying no crown.
    pub fn train() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let split_dir = dir.path().join("train");

        write_scene(&split_dir, SCENE_A);
        write_scene(&split_dir, SCENE_B);

        let field_dir = split_dir.join("Field");
        fs::create_dir_all(&field_dir).unwrap();

        let crowns = train_crowns();
        let mut labels = String::from("indvdID,taxonID,siteID\n");
        let mut mappings = String::from("indvdID,id,rsFile\n");
        for (individual, taxon, id, _) in &crowns {
            labels.push_str(&format!("{},{},OSBS\n", individual, taxon));
            mappings.push_str(&format!("{},{},{}\n", individual, id, SCENE_A));
        }
        // a duplicated survey row
        labels.push_str("T1,ACRU,OSBS\n");
        fs::write(field_dir.join("train_data.csv"), labels).unwrap();
        fs::write(field_dir.join("itc_rsFile.csv"), mappings).unwrap();

        let shapes: Vec<_> = crowns
            .iter()
            .map(|&(_, _, id, crown)| (crown, CrownKey::Id(id)))
            .collect();
        write_crowns(&split_dir.join("ITC").join("train_OSBS.shp"), &shapes);

        Self { dir }
    }

    /// A test split with both tasks. Task2 has two crowns in scene A.
    pub fn test() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let task1_dir = dir.path().join("task1");
        write_scene(&task1_dir, SCENE_A);

        let task2_dir = dir.path().join("task2");
        write_scene(&task2_dir, SCENE_A);
        write_scene(&task2_dir, SCENE_B);
        write_crowns(
            &task2_dir.join("ITC").join("test_OSBS.shp"),
            &[
                (
                    PixelCrown::new((20.0, 60.0), (10.0, 50.0)),
                    CrownKey::Plot(SCENE_A),
                ),
                (
                    PixelCrown::new((150.0, 180.0), (150.0, 190.0)),
                    CrownKey::Plot(SCENE_A),
                ),
            ],
        );

        Self { dir }
    }
}

/// The attribute identifying a crown.
#[derive(Debug, Clone, Copy)]
pub enum CrownKey {
    Id(i64),
    Plot(&'static str),
}

pub fn scene_path(split_dir: &Path, modality: &str, name: &str) -> PathBuf {
    let path = split_dir.join("RemoteSensing").join(modality).join(name);
    if modality == "LAS" {
        path.with_extension("las")
    } else {
        path
    }
}

/// Write the RGB, HSI, CHM and LAS files of a scene.
pub fn write_scene(split_dir: &Path, name: &str) {
    for modality in ["RGB", "HSI", "CHM", "LAS"] {
        fs::create_dir_all(split_dir.join("RemoteSensing").join(modality)).unwrap();
    }

    let rgb: Vec<u8> = (0..RGB_SIZE * RGB_SIZE)
        .flat_map(|index| {
            let (row, col) = (index / RGB_SIZE, index % RGB_SIZE);
            [row as u8, col as u8, 128]
        })
        .collect();
    write_geotiff::<colortype::RGB8>(
        &scene_path(split_dir, "RGB", name),
        RGB_SIZE,
        RGB_PIXEL,
        &rgb,
    );

    write_hsi(&scene_path(split_dir, "HSI", name), false);

    let num_pixels = (LOW_RES_SIZE * LOW_RES_SIZE) as usize;

    let chm: Vec<f32> = (0..num_pixels).map(|index| (index % 30) as f32).collect();
    write_geotiff::<colortype::Gray32Float>(
        &scene_path(split_dir, "CHM", name),
        LOW_RES_SIZE,
        LOW_RES_PIXEL,
        &chm,
    );

    write_las(&scene_path(split_dir, "LAS", name));
}

/// Write a north-up GeoTIFF whose upper left corner is the tile origin.
fn write_geotiff<C>(path: &Path, size: u32, pixel: f64, data: &[C::Inner])
where
    C: colortype::ColorType,
    [C::Inner]: TiffValue,
{
    let scale = [pixel, pixel, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, ORIGIN_X, ORIGIN_Y, 0.0];

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path).unwrap())).unwrap();
    let mut image = encoder.new_image::<C>(size, size).unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33550), &scale[..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(33922), &tiepoint[..])
        .unwrap();
    image.write_data(data).unwrap();
}

/// The reflectance written at a pixel of an HSI band.
pub fn hsi_value(band: usize, row: usize, col: usize) -> f32 {
    (band * 1000 + row * LOW_RES_SIZE as usize + col) as f32
}

/// Write a [HSI_BANDS]-band `f32` GeoTIFF filled by [hsi_value], either
/// pixel-interleaved or with one plane per band.
pub fn write_hsi(path: &Path, band_separate: bool) {
    let size = LOW_RES_SIZE as usize;
    let data: Vec<f32> = if band_separate {
        (0..HSI_BANDS)
            .flat_map(|band| {
                (0..size * size).map(move |index| hsi_value(band, index / size, index % size))
            })
            .collect()
    } else {
        (0..size * size)
            .flat_map(|index| {
                (0..HSI_BANDS).map(move |band| hsi_value(band, index / size, index % size))
            })
            .collect()
    };
    write_multiband_f32(path, LOW_RES_SIZE, HSI_BANDS as u16, band_separate, &data);
}

/// Encode a little-endian multi-band `f32` TIFF by hand, since the encoder
/// only offers the fixed gray, RGB and CMYK color types.
fn write_multiband_f32(path: &Path, size: u32, bands: u16, band_separate: bool, data: &[f32]) {
    const SHORT: u16 = 3;
    const LONG: u16 = 4;
    const DOUBLE: u16 = 12;

    let num_planes = if band_separate { bands as u32 } else { 1 };
    let plane_bytes = size * size * 4 * (bands as u32 / num_planes);
    let num_entries = 13u32;

    // extra data follows the header and the directory
    let base = 8 + 2 + num_entries * 12 + 4;
    let mut extra: Vec<u8> = vec![];
    let push_extra = |extra: &mut Vec<u8>, bytes: Vec<u8>| -> u32 {
        let at = base + extra.len() as u32;
        extra.extend(bytes);
        at
    };

    let shorts = |values: &[u16]| -> Vec<u8> { values.iter().flat_map(|v| v.to_le_bytes()).collect() };
    let longs = |values: &[u32]| -> Vec<u8> { values.iter().flat_map(|v| v.to_le_bytes()).collect() };
    let doubles = |values: &[f64]| -> Vec<u8> { values.iter().flat_map(|v| v.to_le_bytes()).collect() };

    let bits_at = push_extra(&mut extra, shorts(&vec![32; bands as usize]));
    let formats_at = push_extra(&mut extra, shorts(&vec![3; bands as usize]));
    let scale_at = push_extra(&mut extra, doubles(&[LOW_RES_PIXEL, LOW_RES_PIXEL, 0.0]));
    let tiepoint_at = push_extra(&mut extra, doubles(&[0.0, 0.0, 0.0, ORIGIN_X, ORIGIN_Y, 0.0]));
    let counts_at = push_extra(&mut extra, longs(&vec![plane_bytes; num_planes as usize]));
    let data_at = base + extra.len() as u32 + num_planes * 4;
    let strip_offsets: Vec<u32> = (0..num_planes).map(|plane| data_at + plane * plane_bytes).collect();
    let offsets_at = push_extra(&mut extra, longs(&strip_offsets));

    // a single strip offset or count is stored inline
    let (offsets_value, counts_value) = if num_planes == 1 {
        (data_at, plane_bytes)
    } else {
        (offsets_at, counts_at)
    };

    let entries: [(u16, u16, u32, u32); 13] = [
        (256, LONG, 1, size),
        (257, LONG, 1, size),
        (258, SHORT, bands as u32, bits_at),
        (259, SHORT, 1, 1),
        (262, SHORT, 1, 1),
        (273, LONG, num_planes, offsets_value),
        (277, SHORT, 1, bands as u32),
        (278, LONG, 1, size),
        (279, LONG, num_planes, counts_value),
        (284, SHORT, 1, if band_separate { 2 } else { 1 }),
        (339, SHORT, bands as u32, formats_at),
        (33550, DOUBLE, 3, scale_at),
        (33922, DOUBLE, 6, tiepoint_at),
    ];

    let mut bytes: Vec<u8> = vec![b'I', b'I'];
    bytes.extend(42u16.to_le_bytes());
    bytes.extend(8u32.to_le_bytes());
    bytes.extend((entries.len() as u16).to_le_bytes());
    for (tag, kind, count, value) in entries {
        bytes.extend(tag.to_le_bytes());
        bytes.extend(kind.to_le_bytes());
        bytes.extend(count.to_le_bytes());
        if kind == SHORT && count == 1 {
            bytes.extend((value as u16).to_le_bytes());
            bytes.extend([0, 0]);
        } else {
            bytes.extend(value.to_le_bytes());
        }
    }
    bytes.extend(0u32.to_le_bytes());
    bytes.extend(extra);
    assert_eq!(bytes.len() as u32, data_at);
    bytes.extend(data.iter().flat_map(|value| value.to_le_bytes()));

    fs::write(path, bytes).unwrap();
}

/// Five colored points spread over the tile.
pub const LAS_POINTS: [[f64; 3]; 5] = [
    [1001.0, 1999.0, 10.0],
    [1020.0, 1980.0, 12.5],
    [1050.0, 1950.0, 20.0],
    [1075.0, 1925.0, 3.0],
    [1099.0, 1901.0, 0.0],
];

fn write_las(path: &Path) {
    use las::Write as _;

    let mut builder = las::Builder::default();
    builder.point_format = las::point::Format::new(2).unwrap();
    let header = builder.into_header().unwrap();

    let mut writer = las::Writer::from_path(path, header).unwrap();
    for [x, y, z] in LAS_POINTS {
        writer
            .write(las::Point {
                x,
                y,
                z,
                color: Some(las::Color::new(u16::MAX, 0, u16::MAX / 2)),
                ..Default::default()
            })
            .unwrap();
    }
    writer.close().unwrap();
}

pub fn write_crowns(path: &Path, crowns: &[(PixelCrown, CrownKey)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let builder = TableWriterBuilder::new()
        .add_numeric_field(FieldName::try_from("id").unwrap(), 10, 0)
        .add_character_field(FieldName::try_from("plotID").unwrap(), 32);
    let mut writer = shapefile::Writer::from_path(path, builder).unwrap();

    for (crown, key) in crowns {
        let polygon = Polygon::new(PolygonRing::Outer(crown.ring()));
        let mut record = Record::default();
        match *key {
            CrownKey::Id(id) => {
                record.insert("id".into(), FieldValue::Numeric(Some(id as f64)));
                record.insert("plotID".into(), FieldValue::Character(None));
            }
            CrownKey::Plot(scene) => {
                record.insert("id".into(), FieldValue::Numeric(None));
                record.insert("plotID".into(), FieldValue::Character(Some(scene.into())));
            }
        }
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }
}
