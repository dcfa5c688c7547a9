//! Scene, annotation and crown geometry indexes.
//!
//! The training split and the task2 test split identify crown polygons in
//! two unrelated ways. Training polygons carry a stable `id` attribute that
//! the field survey tables refer to ([AnnotationId]). Test polygons have no
//! usable id, so they are numbered by their position across the shapefiles
//! ([SequenceId]) and matched to scenes through their `plotID` attribute.
//! The two id types are distinct and must never be mixed.

use crate::{
    common::*,
    error::IdtreesError,
    species,
    vector::{load_crowns, Crown},
};

/// The stable polygon id of the training split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationId(pub i64);

/// The running position of a polygon among the task2 shapefiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(pub usize);

/// The companion files of one scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneRecord {
    /// The RGB file name, which is how annotations refer to the scene.
    pub name: String,
    pub rgb: PathBuf,
    pub hsi: PathBuf,
    pub chm: PathBuf,
    pub las: PathBuf,
}

impl SceneRecord {
    /// Derive the companion paths from the RGB image path.
    ///
    /// The dataset stores the modalities in sibling directories
    /// `RGB`, `HSI`, `CHM` and `LAS` with matching file names.
    pub fn from_rgb(rgb: impl AsRef<Path>) -> Result<Self> {
        let rgb = rgb.as_ref();
        let name = rgb
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format_err!("invalid image path '{}'", rgb.display()))?
            .to_owned();
        let modality_dir = rgb
            .parent()
            .and_then(|dir| dir.parent())
            .ok_or_else(|| format_err!("invalid image path '{}'", rgb.display()))?;

        let record = Self {
            rgb: rgb.to_owned(),
            hsi: modality_dir.join("HSI").join(&name),
            chm: modality_dir.join("CHM").join(&name),
            las: modality_dir
                .join("LAS")
                .join(Path::new(&name).with_extension("las")),
            name,
        };
        Ok(record)
    }

    /// Fail if any companion file is absent.
    pub fn validate(&self) -> Result<()> {
        [
            ("HSI", &self.hsi),
            ("CHM", &self.chm),
            ("LAS", &self.las),
        ]
        .into_iter()
        .try_for_each(|(modality, path)| -> Result<()> {
            if !path.is_file() {
                return Err(IdtreesError::MissingCompanion {
                    scene: self.name.clone(),
                    modality,
                    path: path.clone(),
                }
                .into());
            }
            Ok(())
        })
    }
}

/// List the scenes of a split directory, sorted by file name.
pub fn load_scenes(dir: impl AsRef<Path>) -> Result<Vec<SceneRecord>> {
    let dir = dir.as_ref();
    let pattern = dir.join("RemoteSensing").join("RGB").join("*.tif");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 path '{}'", pattern.display()))?;

    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.try_collect()?;
    paths.sort();

    paths
        .into_iter()
        .map(|path| -> Result<_> {
            let record = SceneRecord::from_rgb(&path)?;
            record.validate()?;
            Ok(record)
        })
        .try_collect()
}

/// One surveyed tree joined with its scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub individual_id: String,
    pub taxon: String,
    pub class: usize,
    pub geometry_id: AnnotationId,
    /// The RGB file name of the scene.
    pub scene: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelRow {
    #[serde(rename = "indvdID")]
    individual_id: String,
    #[serde(rename = "taxonID")]
    taxon: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MappingRow {
    #[serde(rename = "indvdID")]
    individual_id: String,
    id: i64,
    #[serde(rename = "rsFile")]
    scene: String,
}

/// The joined species and scene tables of the training split.
#[derive(Debug, Clone)]
pub struct AnnotationTable {
    pub rows: Vec<Annotation>,
    by_scene: HashMap<String, Vec<usize>>,
    num_unmapped: usize,
    num_duplicated: usize,
}

impl AnnotationTable {
    /// Load `Field/train_data.csv` and `Field/itc_rsFile.csv` and join
    /// them on the individual id.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let field_dir = dir.as_ref().join("Field");
        let labels: Vec<LabelRow> = read_csv(field_dir.join("train_data.csv"))?;
        let mappings: Vec<MappingRow> = read_csv(field_dir.join("itc_rsFile.csv"))?;
        Self::join(labels, mappings)
    }

    fn join(labels: Vec<LabelRow>, mappings: Vec<MappingRow>) -> Result<Self> {
        let mappings_by_individual = mappings
            .into_iter()
            .map(|row| (row.individual_id.clone(), row))
            .into_group_map();

        let num_labels = labels.len();
        let mut seen = HashSet::new();
        let mut rows = vec![];
        let mut num_unmapped = 0;
        let mut num_duplicated = 0;

        for label in labels {
            let mappings = match mappings_by_individual.get(&label.individual_id) {
                Some(mappings) => mappings,
                None => {
                    num_unmapped += 1;
                    continue;
                }
            };
            let class = species::class_index(&label.taxon)
                .ok_or_else(|| IdtreesError::UnknownSpecies(label.taxon.clone()))?;

            for mapping in mappings {
                let row = Annotation {
                    individual_id: label.individual_id.clone(),
                    taxon: label.taxon.clone(),
                    class,
                    geometry_id: AnnotationId(mapping.id),
                    scene: mapping.scene.clone(),
                };
                if seen.insert(row.clone()) {
                    rows.push(row);
                } else {
                    num_duplicated += 1;
                }
            }
        }

        if num_unmapped > 0 {
            warn!(
                "{} of {} label rows have no crown in itc_rsFile.csv",
                num_unmapped, num_labels
            );
        }
        if num_duplicated > 0 {
            warn!("dropped {} duplicated annotations", num_duplicated);
        }

        let by_scene = rows
            .iter()
            .enumerate()
            .map(|(index, row)| (row.scene.clone(), index))
            .into_group_map();

        Ok(Self {
            rows,
            by_scene,
            num_unmapped,
            num_duplicated,
        })
    }

    /// The number of label rows whose individual has no crown mapping.
    pub fn num_unmapped(&self) -> usize {
        self.num_unmapped
    }

    /// The number of joined annotations dropped as exact duplicates.
    pub fn num_duplicated(&self) -> usize {
        self.num_duplicated
    }

    /// The annotations of a scene, in table order.
    pub fn scene_rows<'a>(&'a self, scene: &str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.by_scene
            .get(scene)
            .into_iter()
            .flatten()
            .map(move |&index| &self.rows[index])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Crown polygons keyed by the id space of the split.
#[derive(Debug, Clone)]
pub enum GeometryIndex {
    /// Training crowns keyed by their `id` attribute.
    Annotated(HashMap<AnnotationId, Crown>),
    /// Task2 crowns numbered by position and grouped by `plotID`.
    Sequenced {
        crowns: Vec<Crown>,
        by_scene: HashMap<String, Vec<SequenceId>>,
    },
}

impl GeometryIndex {
    /// Load the training crowns under `ITC/*.shp`.
    pub fn load_annotated(dir: impl AsRef<Path>) -> Result<Self> {
        let mut crowns = HashMap::new();
        let mut num_anonymous = 0;

        for crown in load_all_crowns(dir)? {
            match crown.property("id").and_then(|id| id.as_f64()) {
                Some(id) => {
                    crowns.insert(AnnotationId(id as i64), crown);
                }
                None => num_anonymous += 1,
            }
        }

        if num_anonymous > 0 {
            warn!("ignored {} crowns without an id", num_anonymous);
        }

        Ok(Self::Annotated(crowns))
    }

    /// Load the task2 crowns under `ITC/*.shp`.
    pub fn load_sequenced(dir: impl AsRef<Path>) -> Result<Self> {
        let crowns = load_all_crowns(dir)?;
        let mut num_orphans = 0;

        let by_scene = crowns
            .iter()
            .enumerate()
            .filter_map(|(index, crown)| {
                let scene = crown.property("plotID").and_then(|id| id.as_str());
                if scene.is_none() {
                    num_orphans += 1;
                }
                Some((scene?.to_owned(), SequenceId(index)))
            })
            .into_group_map();

        if num_orphans > 0 {
            warn!("{} crowns have no plotID and match no scene", num_orphans);
        }

        Ok(Self::Sequenced { crowns, by_scene })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Annotated(crowns) => crowns.len(),
            Self::Sequenced { crowns, .. } => crowns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_annotated(&self, id: AnnotationId) -> Option<&Crown> {
        match self {
            Self::Annotated(crowns) => crowns.get(&id),
            Self::Sequenced { .. } => None,
        }
    }

    pub fn get_sequenced(&self, id: SequenceId) -> Option<&Crown> {
        match self {
            Self::Annotated(_) => None,
            Self::Sequenced { crowns, .. } => crowns.get(id.0),
        }
    }

    /// The task2 crowns whose `plotID` names the scene.
    pub fn scene_crowns<'a>(&'a self, scene: &str) -> Vec<&'a Crown> {
        match self {
            Self::Annotated(_) => vec![],
            Self::Sequenced { crowns, by_scene } => by_scene
                .get(scene)
                .into_iter()
                .flatten()
                .map(|id| &crowns[id.0])
                .collect(),
        }
    }
}

fn load_all_crowns(dir: impl AsRef<Path>) -> Result<Vec<Crown>> {
    let pattern = dir.as_ref().join("ITC").join("*.shp");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 path '{}'", pattern.display()))?;

    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.try_collect()?;
    paths.sort();

    let crowns: Vec<Vec<Crown>> = paths.iter().map(|path| load_crowns(path)).try_collect()?;
    Ok(crowns.into_iter().flatten().collect())
}

fn read_csv<T>(path: PathBuf) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let rows: Vec<T> = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .and_then(|reader| reader.into_deserialize().try_collect())
        .with_context(|| format!("failed to read table '{}'", path.display()))?;
    Ok(rows)
}
