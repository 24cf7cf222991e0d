pub mod controller_context;
pub mod health_controller;
pub mod pupil_controller;
