#[macro_use]
extern crate rocket;

pub mod api;
pub mod background;
pub mod common;
pub mod config;
pub mod models;
pub mod utils;

use log::{info, warn};
use rocket::data::{ByteUnit, Limits};
use rocket::fs::FileServer;

use crate::api::handlers::{generate_detection_routes, generate_system_routes};
use crate::background::processors::workspace::Workspace;
use crate::config::DetectorConfig;

pub fn build_rocket(config: DetectorConfig, workspace: Workspace) -> rocket::Rocket<rocket::Build> {
    let upload_limit = ByteUnit::Mebibyte(config.upload_limit_mb);
    let limits = Limits::default()
        .limit("file", upload_limit)
        .limit("data-form", upload_limit + ByteUnit::Mebibyte(1));

    let figment = rocket::Config::figment()
        .merge(("shutdown.ctrlc", false))
        .merge(("limits", limits));

    let frontend_dir = config.frontend_dir.clone();

    let mut rocket = rocket::custom(figment)
        .manage(config)
        .manage(workspace)
        .mount("/", generate_detection_routes())
        .mount("/", generate_system_routes());

    if let Some(dir) = frontend_dir {
        if dir.is_dir() {
            info!("Serving frontend from {:?}", dir);
            rocket = rocket.mount("/", FileServer::from(dir));
        } else {
            warn!("FRONTEND_DIR {:?} is not a directory; not serving a UI", dir);
        }
    }

    rocket
}
