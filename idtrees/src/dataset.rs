//! The indexed sample interface of the dataset.

use crate::{
    acquire,
    common::*,
    config::{DatasetConfig, Split, Task},
    error::IdtreesError,
    filter::filter_boxes,
    index::{self, AnnotationTable, GeometryIndex, SceneRecord},
    lidar::{self, PointCloud},
    raster::{Raster, RasterArray},
    species,
    vector::Crown,
};

/// The user hook applied to every sample before it is returned.
pub type SampleTransform = Box<dyn Fn(Sample) -> Result<Sample> + Send + Sync>;

/// The data of one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// RGB image in shape `[3, h, w]`.
    pub image: Array3<u8>,
    /// Hyperspectral cube in shape `[bands, h, w]`.
    pub hsi: RasterArray,
    /// Canopy height model in shape `[1, h, w]`.
    pub chm: RasterArray,
    /// LiDAR coordinates in shape `[3, num_points]`.
    pub las: Array2<f64>,
    /// Crown boxes in pixel units of the image.
    pub boxes: Option<Vec<TLBR<f64>>>,
    /// Species class indices parallel to the boxes.
    pub labels: Option<Vec<usize>>,
}

impl Sample {
    /// The `[height, width]` of the image.
    pub fn image_size(&self) -> HW<usize> {
        let (_, h, w) = self.image.dim();
        HW::from_hw([h, w])
    }

    /// The boxes in shape `[num_boxes, 4]` with `(xmin, ymin, xmax, ymax)` rows.
    pub fn boxes_xyxy(&self) -> Option<Array2<f64>> {
        let boxes = self.boxes.as_ref()?;
        let array = Array2::from_shape_fn((boxes.len(), 4), |(index, coord)| {
            boxes[index].xyxy()[coord]
        });
        Some(array)
    }
}

/// The IDTReeS dataset.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct IdtreesDataset {
    config: DatasetConfig,
    scenes: Vec<SceneRecord>,
    annotations: Option<AnnotationTable>,
    geometries: Option<GeometryIndex>,
    #[derivative(Debug = "ignore")]
    transform: Option<SampleTransform>,
}

impl IdtreesDataset {
    /// Verify or fetch the dataset and build its index.
    pub fn new(config: DatasetConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [IdtreesDataset::new] with a hook applied on every sample.
    pub fn with_transform<F>(config: DatasetConfig, transform: F) -> Result<Self>
    where
        F: 'static + Fn(Sample) -> Result<Sample> + Send + Sync,
    {
        Self::build(config, Some(Box::new(transform)))
    }

    fn build(config: DatasetConfig, transform: Option<SampleTransform>) -> Result<Self> {
        lidar::point_cloud_support()?;
        config.validate()?;
        acquire::verify(&config)?;

        let dir = config.data_dir();
        let (annotations, geometries) = match (config.split, config.task) {
            (Split::Train, _) => {
                let annotations = AnnotationTable::load(&dir)?;
                let geometries = GeometryIndex::load_annotated(&dir)?;
                (Some(annotations), Some(geometries))
            }
            (Split::Test, Task::Task1) => (None, None),
            (Split::Test, Task::Task2) => (None, Some(GeometryIndex::load_sequenced(&dir)?)),
        };
        let scenes = index::load_scenes(&dir)?;

        info!(
            "loaded {} scenes, {} annotations and {} crowns from '{}'",
            scenes.len(),
            annotations.as_ref().map(|table| table.len()).unwrap_or(0),
            geometries.as_ref().map(|index| index.len()).unwrap_or(0),
            dir.display()
        );

        Ok(Self {
            config,
            scenes,
            annotations,
            geometries,
            transform,
        })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scenes(&self) -> &[SceneRecord] {
        &self.scenes
    }

    pub fn annotations(&self) -> Option<&AnnotationTable> {
        self.annotations.as_ref()
    }

    pub fn geometries(&self) -> Option<&GeometryIndex> {
        self.geometries.as_ref()
    }

    pub fn num_classes(&self) -> usize {
        species::NUM_CLASSES
    }

    pub fn class_index(&self, code: &str) -> Option<usize> {
        species::class_index(code)
    }

    pub fn class_code(&self, index: usize) -> Option<&'static str> {
        species::class_code(index)
    }

    pub fn scene(&self, index: usize) -> Result<&SceneRecord> {
        self.scenes.get(index).ok_or_else(|| {
            format_err!(
                "index {} is out of range for a dataset of {} scenes",
                index,
                self.scenes.len()
            )
        })
    }

    /// Load the sample at `index`.
    pub fn get(&self, index: usize) -> Result<Sample> {
        let scene = self.scene(index)?;
        debug!("loading scene '{}'", scene.name);

        let size = self.config.target_size();
        let rgb = Raster::open(&scene.rgb)?;
        let image = rgb.resample(&size).to_u8();
        let hsi = Raster::open(&scene.hsi)?.resample(&size);
        let chm = Raster::open(&scene.chm)?.resample(&size);
        let las = PointCloud::open(&scene.las)?.to_array();

        let (boxes, labels) = self
            .load_targets(scene, &rgb)
            .with_context(|| format!("failed to load crowns of scene '{}'", scene.name))?;

        let sample = Sample {
            image,
            hsi,
            chm,
            las,
            boxes,
            labels,
        };

        match &self.transform {
            Some(transform) => transform(sample),
            None => Ok(sample),
        }
    }

    /// Project the crowns of a scene into boxes on the target grid, along
    /// with their labels when the split has them.
    fn load_targets(
        &self,
        scene: &SceneRecord,
        rgb: &Raster,
    ) -> Result<(Option<Vec<TLBR<f64>>>, Option<Vec<usize>>)> {
        let geometries = match &self.geometries {
            Some(geometries) => geometries,
            None => return Ok((None, None)),
        };

        let (crowns, labels): (Vec<&Crown>, Option<Vec<usize>>) = match &self.annotations {
            Some(annotations) => {
                let pairs: Vec<(&Crown, usize)> = annotations
                    .scene_rows(&scene.name)
                    .map(|row| -> Result<_> {
                        let crown = geometries.get_annotated(row.geometry_id).ok_or_else(|| {
                            IdtreesError::MissingGeometry {
                                id: row.geometry_id.0,
                                scene: scene.name.clone(),
                            }
                        })?;
                        Ok((crown, row.class))
                    })
                    .try_collect()?;
                let (crowns, labels): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
                (crowns, Some(labels))
            }
            None => (geometries.scene_crowns(&scene.name), None),
        };

        let native_size = rgb.size();
        let target_size = self.config.target_size();
        let transform = Transform::try_from_sizes_exact(
            HW_::from(native_size.cast::<f64>()),
            HW_::from(target_size.clone().cast::<f64>()),
        )?;

        let boxes: Vec<_> = crowns
            .into_iter()
            .map(|crown| crown_to_box(crown, rgb))
            .map(|result| result.map(|tlbr| &transform * &tlbr))
            .try_collect()?;

        let image_size = target_size.cast::<f64>();
        let (boxes, labels) = filter_boxes(&image_size, self.config.min_box_size, boxes, labels)?;

        Ok((Some(boxes), labels))
    }

    /// The point cloud of a scene prepared for 3D viewers.
    pub fn point_cloud_view(&self, index: usize) -> Result<PointCloudView> {
        let scene = self.scene(index)?;
        let cloud = PointCloud::open(&scene.las)?;
        Ok(PointCloudView {
            points: cloud.points_array(),
            colors: cloud.colors_array(),
        })
    }
}

/// Points in shape `[num_points, 3]` with optional per-point RGB in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudView {
    pub points: Array2<f64>,
    pub colors: Option<Array2<f64>>,
}

impl PointCloudView {
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Write the points as an ASCII PLY file.
    pub fn write_ply(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "ply")?;
        writeln!(writer, "format ascii 1.0")?;
        writeln!(writer, "element vertex {}", self.len())?;
        writeln!(writer, "property double x")?;
        writeln!(writer, "property double y")?;
        writeln!(writer, "property double z")?;
        if self.colors.is_some() {
            writeln!(writer, "property uchar red")?;
            writeln!(writer, "property uchar green")?;
            writeln!(writer, "property uchar blue")?;
        }
        writeln!(writer, "end_header")?;

        for (index, point) in self.points.outer_iter().enumerate() {
            write!(writer, "{} {} {}", point[0], point[1], point[2])?;
            if let Some(colors) = &self.colors {
                let color = colors.row(index);
                let [r, g, b] = [color[0], color[1], color[2]]
                    .map(|value| (value * 255.0).round().clamp(0.0, 255.0) as u8);
                write!(writer, " {} {} {}", r, g, b)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// The pixel box enclosing the corners of a crown on the raster grid.
fn crown_to_box(crown: &Crown, raster: &Raster) -> Result<TLBR<f64>> {
    let pixels: Vec<_> = crown
        .corners()
        .map(|coord| raster.index(coord.x, coord.y))
        .try_collect()?;
    TLBR::enclosing(
        pixels
            .into_iter()
            .map(|(row, col)| (row as f64, col as f64)),
    )
    .ok_or_else(|| format_err!("crown polygon has no coordinates"))
}
