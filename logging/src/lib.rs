pub mod errors;
mod logger;

pub use logger::setup;
