pub mod capture;
pub mod logging;
pub mod screen;
