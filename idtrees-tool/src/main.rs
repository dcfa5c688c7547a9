use anyhow::{ensure, Result};
use clap::Parser;
use idtrees::{
    index::GeometryIndex,
    plot::{class_legend, render_sample, PlotOptions},
    DatasetConfig, IdtreesDataset,
};
use log::info;
use prettytable::{cell, row, Table};
use std::path::{Path, PathBuf};

/// IDTReeS dataset tool
#[derive(Debug, Clone, Parser)]
enum Opts {
    /// Download and extract the dataset if it is absent.
    Fetch {
        /// configuration file
        config_file: PathBuf,
    },
    /// List the scenes of the dataset.
    Info {
        /// configuration file
        config_file: PathBuf,
    },
    /// Draw a sample into a PNG image.
    Render {
        /// configuration file
        config_file: PathBuf,
        /// scene index
        index: usize,
        /// output PNG file
        output_file: PathBuf,
        /// HSI bands shown as red, green and blue
        #[clap(long, use_value_delimiter = true, default_value = "0,1,2")]
        hsi_bands: Vec<usize>,
    },
    /// Export the point cloud of a scene to a PLY file.
    ExportLas {
        /// configuration file
        config_file: PathBuf,
        /// scene index
        index: usize,
        /// output PLY file
        output_file: PathBuf,
    },
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Fetch { config_file } => {
            fetch(config_file)?;
        }
        Opts::Info { config_file } => {
            print_info(config_file)?;
        }
        Opts::Render {
            config_file,
            index,
            output_file,
            hsi_bands,
        } => {
            render(config_file, index, output_file, &hsi_bands)?;
        }
        Opts::ExportLas {
            config_file,
            index,
            output_file,
        } => {
            export_las(config_file, index, output_file)?;
        }
    }

    Ok(())
}

fn fetch(config_file: impl AsRef<Path>) -> Result<()> {
    let config = DatasetConfig {
        download: true,
        ..DatasetConfig::open(config_file)?
    };
    let dataset = IdtreesDataset::new(config)?;
    info!(
        "{} scenes are ready in '{}'",
        dataset.len(),
        dataset.config().data_dir().display()
    );
    Ok(())
}

fn print_info(config_file: impl AsRef<Path>) -> Result<()> {
    let config = DatasetConfig::open(config_file)?;
    let dataset = IdtreesDataset::new(config)?;

    let mut table = Table::new();
    table.add_row(row!["index", "scene", "crowns", "species"]);

    dataset.scenes().iter().enumerate().for_each(|(index, scene)| {
        let (crowns, species) = match (dataset.annotations(), dataset.geometries()) {
            (Some(annotations), _) => {
                let rows: Vec<_> = annotations.scene_rows(&scene.name).collect();
                let mut codes: Vec<_> = rows.iter().map(|row| row.taxon.as_str()).collect();
                codes.sort_unstable();
                codes.dedup();
                (rows.len().to_string(), codes.join(","))
            }
            (None, Some(geometries @ GeometryIndex::Sequenced { .. })) => (
                geometries.scene_crowns(&scene.name).len().to_string(),
                String::from("-"),
            ),
            _ => (String::from("-"), String::from("-")),
        };
        table.add_row(row![index, scene.name, crowns, species]);
    });

    table.printstd();
    Ok(())
}

fn render(
    config_file: impl AsRef<Path>,
    index: usize,
    output_file: impl AsRef<Path>,
    hsi_bands: &[usize],
) -> Result<()> {
    ensure!(
        hsi_bands.len() == 3,
        "expect 3 HSI bands, but found {}",
        hsi_bands.len()
    );

    let config = DatasetConfig::open(config_file)?;
    let dataset = IdtreesDataset::new(config)?;
    let sample = dataset.get(index)?;

    let options = PlotOptions {
        hsi_indices: [hsi_bands[0], hsi_bands[1], hsi_bands[2]],
        ..Default::default()
    };
    let image = render_sample(&sample, &options)?;
    image.save(output_file.as_ref())?;

    if let Some(labels) = &sample.labels {
        for (code, color) in class_legend(labels) {
            info!("{} is drawn in {:?}", code, color.0);
        }
    }

    Ok(())
}

fn export_las(
    config_file: impl AsRef<Path>,
    index: usize,
    output_file: impl AsRef<Path>,
) -> Result<()> {
    let config = DatasetConfig::open(config_file)?;
    let dataset = IdtreesDataset::new(config)?;
    let view = dataset.point_cloud_view(index)?;
    view.write_ply(&output_file)?;
    info!(
        "wrote {} points to '{}'",
        view.len(),
        output_file.as_ref().display()
    );
    Ok(())
}
