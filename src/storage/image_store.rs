use crate::{
    error::{GenerationError, Result},
    models::GeneratedImage,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, TimeZone};
use image::{codecs::jpeg::JpegEncoder, ImageFormat};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Folder created under the assets root for generated images.
pub const PLUGIN_DIR: &str = "stable-diffusion-cat";
pub const JPEG_QUALITY: u8 = 90;

/// Writes generated images as JPEG files under `<assets_root>/stable-diffusion-cat/`.
///
/// File names carry a one-second timestamp, so two images persisted within the
/// same second land on the same path and the later one wins.
#[derive(Debug, Clone)]
pub struct ImageStore {
    folder: PathBuf,
}

impl ImageStore {
    pub fn new(assets_root: impl AsRef<Path>) -> Self {
        Self {
            folder: assets_root.as_ref().join(PLUGIN_DIR),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Decodes a base64 payload and checks that it is a readable raster image.
    pub fn decode(encoded: &str) -> Result<GeneratedImage> {
        let binary_data = STANDARD.decode(encoded.trim()).map_err(|e| {
            GenerationError::MalformedResponse(format!("Invalid base64 image: {}", e))
        })?;

        let format = image::guess_format(&binary_data).map_err(|e| {
            GenerationError::MalformedResponse(format!("Unrecognised image data: {}", e))
        })?;

        let pixels = image::load_from_memory_with_format(&binary_data, format).map_err(|e| {
            GenerationError::MalformedResponse(format!("Failed to decode {:?} image: {}", format, e))
        })?;

        log::debug!(
            "Decoded {:?} image {}x{} ({} bytes)",
            format,
            pixels.width(),
            pixels.height(),
            binary_data.len()
        );

        Ok(GeneratedImage {
            binary_data,
            format,
            pixels,
        })
    }

    pub fn output_filename<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        format!("output_image_{}.jpg", timestamp.format("%Y%m%d%H%M%S"))
    }

    pub fn persist(&self, image: &GeneratedImage) -> Result<PathBuf> {
        self.persist_at(image, &Local::now())
    }

    pub fn persist_at<Tz: TimeZone>(
        &self,
        image: &GeneratedImage,
        timestamp: &DateTime<Tz>,
    ) -> Result<PathBuf>
    where
        Tz::Offset: Display,
    {
        fs::create_dir_all(&self.folder).map_err(|e| {
            GenerationError::StorageError(format!(
                "Failed to create {}: {}",
                self.folder.display(),
                e
            ))
        })?;

        let path = self.folder.join(Self::output_filename(timestamp));

        if image.format == ImageFormat::Jpeg {
            fs::write(&path, &image.binary_data).map_err(|e| write_error(&path, e))?;
        } else {
            let rgb = image.pixels.to_rgb8();
            let file = File::create(&path).map_err(|e| write_error(&path, e))?;
            let mut writer = BufWriter::new(file);

            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| write_error(&path, e))?;
            writer.flush().map_err(|e| write_error(&path, e))?;
        }

        log::debug!("Wrote {}", path.display());
        Ok(path)
    }
}

fn write_error(path: &Path, e: impl Display) -> GenerationError {
    GenerationError::StorageError(format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_base64() -> String {
        let img = RgbImage::from_fn(8, 4, |x, y| Rgb([(x * 30) as u8, (y * 60) as u8, 200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_output_filename() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(
            ImageStore::output_filename(&ts),
            "output_image_20240309070502.jpg"
        );
    }

    #[test]
    fn test_folder_is_under_assets_root() {
        let store = ImageStore::new("/admin/assets");
        assert_eq!(
            store.folder(),
            Path::new("/admin/assets/stable-diffusion-cat")
        );
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        assert!(matches!(
            ImageStore::decode("not base64 at all!"),
            Err(GenerationError::MalformedResponse(_))
        ));
        // valid base64, not an image
        assert!(matches!(
            ImageStore::decode(&STANDARD.encode(b"hello world")),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_png_is_reencoded_as_jpeg() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path());
        let image = ImageStore::decode(&png_base64()).unwrap();
        assert_eq!(image.format, ImageFormat::Png);

        let path = store.persist(&image).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let saved = image::load_from_memory(&bytes).unwrap();
        assert_eq!((saved.width(), saved.height()), (8, 4));
    }

    #[test]
    fn test_same_second_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path());
        let image = ImageStore::decode(&png_base64()).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();

        let first = store.persist_at(&image, &ts).unwrap();
        let second = store.persist_at(&image, &ts).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(store.folder()).unwrap().count(), 1);
    }
}
