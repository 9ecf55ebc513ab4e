use std::env;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::error;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_scene::config::{load_user_config, UserConfig};
use osm_scene::errors::Result;
use osm_scene::etl::draw_preview::DrawPreviewEtl;
use osm_scene::etl::scene::SceneEtl;
use osm_scene::etl::Etl;

const DEFAULT_CONFIG_PATH: &str = "config/scene.json";

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = match &config.output_dir {
        Some(dir) => PathBuf::from(dir),
        None => {
            let input_fname = Path::new(&config.data_path)
                .file_name()
                .ok_or("Could not get input file name")?;
            Path::new("output").join(input_fname)
        },
    };
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn run(config_path: &Path) -> Result<()> {
    let user_config = load_user_config(config_path)?;
    let output_dir = create_output_dir(&user_config)?;

    SceneEtl::new(&user_config).process(&output_dir)?;
    DrawPreviewEtl::new(&user_config.preview).process(&output_dir)?;
    Ok(())
}

fn main() -> ExitCode {
    setup_logging();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    match run(Path::new(&config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(config = config_path.as_str(), err = err.message(); "Failed to build scene");
            ExitCode::FAILURE
        },
    }
}
