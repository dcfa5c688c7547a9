//! Dataset configuration format.

use crate::common::*;

/// The dataset options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// The root directory where the dataset is found or extracted to.
    pub root: PathBuf,
    /// The dataset split.
    pub split: Split,
    /// The evaluation task. It only matters for the test split.
    #[serde(default)]
    pub task: Task,
    /// If set, download the archive when the dataset is absent.
    #[serde(default)]
    pub download: bool,
    /// If set, verify the MD5 sum of the downloaded archive.
    #[serde(default)]
    pub checksum: bool,
    /// The `[height, width]` every raster is resampled to.
    #[serde(default = "default_image_size")]
    pub image_size: [usize; 2],
    /// Boxes with either side shorter than this, in pixels, are discarded.
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f64,
}

impl DatasetConfig {
    pub fn new(root: impl AsRef<Path>, split: Split, task: Task) -> Self {
        Self {
            root: root.as_ref().to_owned(),
            split,
            task,
            download: false,
            checksum: false,
            image_size: default_image_size(),
            min_box_size: default_min_box_size(),
        }
    }

    /// Load the configuration from a JSON5 file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let [h, w] = self.image_size;
        ensure!(h > 0 && w > 0, "image_size must be positive");
        ensure!(
            self.min_box_size.is_finite() && self.min_box_size >= 0.0,
            "min_box_size must be a non-negative number"
        );
        Ok(())
    }

    /// The directory holding the scenes of the configured split and task.
    pub fn data_dir(&self) -> PathBuf {
        match self.split {
            Split::Train => self.root.join("train"),
            Split::Test => self.root.join(self.task.as_str()),
        }
    }

    /// The target grid size as [HW].
    pub fn target_size(&self) -> HW<usize> {
        HW::from_hw(self.image_size)
    }
}

/// The dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }

    /// The directories under the root that exist once the split is extracted.
    pub fn directories(&self) -> &'static [&'static str] {
        match self {
            Self::Train => &["train"],
            Self::Test => &["task1", "task2"],
        }
    }
}

impl Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluation task of the test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Crown detection.
    Task1,
    /// Crown detection with species classification.
    Task2,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task1 => "task1",
            Self::Task2 => "task2",
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self::Task1
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_image_size() -> [usize; 2] {
    [200, 200]
}

fn default_min_box_size() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json5_config() {
        let text = r#"{
            // trailing commas and comments are fine
            root: "data/idtrees",
            split: "test",
            task: "task2",
            download: true,
        }"#;
        let config: DatasetConfig = json5::from_str(text).unwrap();
        assert_eq!(config.split, Split::Test);
        assert_eq!(config.task, Task::Task2);
        assert!(config.download);
        assert!(!config.checksum);
        assert_eq!(config.image_size, [200, 200]);
        assert_eq!(config.min_box_size, 1.0);
        assert_eq!(config.data_dir(), Path::new("data/idtrees/task2"));
    }

    #[test]
    fn train_ignores_task() {
        let config = DatasetConfig::new("data", Split::Train, Task::Task2);
        assert_eq!(config.data_dir(), Path::new("data/train"));
        assert_eq!(Split::Train.directories(), &["train"]);
        assert_eq!(Split::Test.directories(), &["task1", "task2"]);
    }

    #[test]
    fn reject_empty_image_size() {
        let mut config = DatasetConfig::new("data", Split::Train, Task::Task1);
        config.image_size = [0, 200];
        assert!(config.validate().is_err());
    }

    #[test]
    fn open_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idtrees.json5");
        fs::write(&path, r#"{ root: "data", split: "train", image_size: [64, 64] }"#).unwrap();
        let config = DatasetConfig::open(&path).unwrap();
        assert_eq!(config.image_size, [64, 64]);

        let missing = dir.path().join("missing.json5");
        let err = DatasetConfig::open(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json5"));
    }
}
