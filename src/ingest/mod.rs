pub mod service;

pub use service::IngestionLoop;
