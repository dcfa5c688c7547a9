//! LiDAR point clouds.
//!
//! Reading LAS files needs the `lidar` cargo feature. Without it the
//! dataset refuses to be constructed, see [point_cloud_support].

use crate::{common::*, error::IdtreesError};

/// Check whether point cloud reading was compiled in.
pub fn point_cloud_support() -> Result<()> {
    if cfg!(feature = "lidar") {
        Ok(())
    } else {
        Err(IdtreesError::DependencyMissing {
            feature: "lidar",
            purpose: "read LAS point clouds",
        }
        .into())
    }
}

/// A point cloud with optional 16-bit colors per point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub xyz: Vec<[f64; 3]>,
    pub rgb: Option<Vec<[u16; 3]>>,
}

impl PointCloud {
    #[cfg(feature = "lidar")]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        use las::Read as _;

        let path = path.as_ref();
        let mut reader = las::Reader::from_path(path)
            .with_context(|| format!("failed to open point cloud '{}'", path.display()))?;

        let points: Vec<las::Point> = reader
            .points()
            .try_collect()
            .with_context(|| format!("failed to read point cloud '{}'", path.display()))?;

        let xyz: Vec<_> = points.iter().map(|p| [p.x, p.y, p.z]).collect();

        // colors count only if every point carries one
        let rgb: Option<Vec<_>> = points
            .iter()
            .map(|p| p.color.map(|c| [c.red, c.green, c.blue]))
            .collect();
        let rgb = rgb.filter(|rgb| !rgb.is_empty());

        Ok(Self { xyz, rgb })
    }

    #[cfg(not(feature = "lidar"))]
    pub fn open(_path: impl AsRef<Path>) -> Result<Self> {
        point_cloud_support()?;
        bail!("point cloud reading is unavailable")
    }

    pub fn len(&self) -> usize {
        self.xyz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xyz.is_empty()
    }

    /// The coordinates in shape `[3, num_points]`.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((3, self.xyz.len()), |(axis, index)| self.xyz[index][axis])
    }

    /// The coordinates in shape `[num_points, 3]`.
    pub fn points_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.xyz.len(), 3), |(index, axis)| self.xyz[index][axis])
    }

    /// The colors in shape `[num_points, 3]` scaled into `[0, 1]`.
    pub fn colors_array(&self) -> Option<Array2<f64>> {
        let rgb = self.rgb.as_ref()?;
        let max = u16::MAX as f64;
        Some(Array2::from_shape_fn((rgb.len(), 3), |(index, channel)| {
            rgb[index][channel] as f64 / max
        }))
    }
}
