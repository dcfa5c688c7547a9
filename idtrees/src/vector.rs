//! Crown polygon shapefiles.

use crate::common::*;
use geo::{Coord, LineString, Polygon};
use shapefile::{
    dbase::{FieldValue, Record},
    PolygonRing, Shape,
};

/// An attribute value of a crown polygon.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl Property {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<FieldValue> for Property {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Character(Some(text)) | FieldValue::Memo(text) => Self::Text(text),
            FieldValue::Numeric(Some(value)) | FieldValue::Double(value) => Self::Number(value),
            FieldValue::Currency(value) => Self::Number(value),
            FieldValue::Float(Some(value)) => Self::Number(value as f64),
            FieldValue::Integer(value) => Self::Number(value as f64),
            FieldValue::Logical(Some(value)) => Self::Bool(value),
            _ => Self::Null,
        }
    }
}

/// An individual tree crown polygon in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Crown {
    pub polygon: Polygon<f64>,
    pub properties: HashMap<String, Property>,
}

impl Crown {
    /// The first four exterior coordinates, which are the corners of the
    /// rectangular crown delineations in this dataset.
    pub fn corners(&self) -> impl Iterator<Item = Coord<f64>> + '_ {
        self.polygon.exterior().coords().take(4).copied()
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// Load every polygon of a shapefile along with its attributes.
///
/// Non-polygon shapes are skipped.
pub fn load_crowns(path: impl AsRef<Path>) -> Result<Vec<Crown>> {
    let path = path.as_ref();
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("failed to open shapefile '{}'", path.display()))?;

    let mut crowns = vec![];
    let mut num_skipped = 0;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) =
            result.with_context(|| format!("failed to read shapefile '{}'", path.display()))?;

        let exterior: Option<Vec<(f64, f64)>> = match shape {
            Shape::Polygon(polygon) => outer_ring(polygon.rings(), |p| (p.x, p.y)),
            Shape::PolygonM(polygon) => outer_ring(polygon.rings(), |p| (p.x, p.y)),
            Shape::PolygonZ(polygon) => outer_ring(polygon.rings(), |p| (p.x, p.y)),
            _ => None,
        };
        let exterior = match exterior {
            Some(exterior) => exterior,
            None => {
                num_skipped += 1;
                continue;
            }
        };

        crowns.push(Crown {
            polygon: Polygon::new(LineString::from(exterior), vec![]),
            properties: into_properties(record),
        });
    }

    if num_skipped > 0 {
        warn!(
            "skipped {} non-polygon shapes in '{}'",
            num_skipped,
            path.display()
        );
    }

    Ok(crowns)
}

fn outer_ring<P, F>(rings: &[PolygonRing<P>], to_xy: F) -> Option<Vec<(f64, f64)>>
where
    F: Fn(&P) -> (f64, f64),
{
    rings.iter().find_map(|ring| match ring {
        PolygonRing::Outer(points) => Some(points.iter().map(&to_xy).collect()),
        PolygonRing::Inner(_) => None,
    })
}

fn into_properties(record: Record) -> HashMap<String, Property> {
    HashMap::<String, FieldValue>::from(record)
        .into_iter()
        .map(|(name, value)| (name, Property::from(value)))
        .collect()
}
