use rocket::Route;

pub mod detection;
pub mod system;

pub fn generate_detection_routes() -> Vec<Route> {
    routes![detection::process_detection]
}

pub fn generate_system_routes() -> Vec<Route> {
    routes![system::health]
}
