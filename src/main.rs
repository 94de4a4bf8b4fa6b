mod api;
mod app;
mod application;
mod archive;
mod catalog;
mod config;
mod domain;
mod ui;
mod utils;

use iced::{window, Size};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::domain::AppError;

fn main() -> Result<(), AppError> {
    let config = match AppConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            utils::logging::init_logger(false);
            error!("{}", e);
            return Err(e);
        }
    };
    utils::logging::init_logger(config.verbose);

    let catalog =
        catalog::load_catalog(&config.catalog_path).inspect_err(|e| error!("{}", e))?;
    info!(
        proxy = %config.proxy_prefix,
        output = %config.output_filename(),
        "Starting customizer"
    );

    iced::application(
        move || app::CustomizerApp::new(&config, catalog.clone()),
        app::update,
        app::view,
    )
    .title("Frosty Customizer")
    .window(window::Settings {
        size: Size::new(640.0, 780.0),
        ..Default::default()
    })
    .run()?;

    Ok(())
}
