pub mod image_store;

pub use image_store::{ImageStore, JPEG_QUALITY, PLUGIN_DIR};
