use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use fast_image_resize as fir;
use futures::future::{BoxFuture, FutureExt};
use image::RgbaImage;
use tracing::debug;

use super::{DecodedImage, ImageSource};
use crate::error::LoadError;

/// Resolves slide and displacement URLs against the network or the asset root.
pub struct UrlImageSource {
    client: reqwest::Client,
    asset_root: PathBuf,
    max_dimension: u32,
}

enum Location {
    Remote(String),
    Local(Vec<PathBuf>),
}

impl UrlImageSource {
    pub fn new(asset_root: impl Into<PathBuf>, max_dimension: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            asset_root: asset_root.into(),
            max_dimension: max_dimension.max(1),
        }
    }

    /// `/images/x.jpg` is a web-root path first and a filesystem path second.
    fn locate(&self, url: &str) -> Location {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Location::Remote(url.to_string());
        }
        let raw = url.strip_prefix("file://").unwrap_or(url);
        let path = Path::new(raw);
        let mut candidates = Vec::with_capacity(2);
        if let Ok(relative) = path.strip_prefix("/") {
            candidates.push(self.asset_root.join(relative));
            candidates.push(path.to_path_buf());
        } else {
            candidates.push(self.asset_root.join(path));
        }
        Location::Local(candidates)
    }
}

impl ImageSource for UrlImageSource {
    fn load(&self, url: &str) -> BoxFuture<'static, Result<DecodedImage, LoadError>> {
        let location = self.locate(url);
        let client = self.client.clone();
        let max_dimension = self.max_dimension;
        let url = url.to_string();
        async move {
            let bytes = match location {
                Location::Remote(target) => fetch_remote(&client, &target)
                    .await
                    .map_err(|err| LoadError::fetch(&url, format!("{err:#}")))?,
                Location::Local(candidates) => read_first(&candidates)
                    .await
                    .map_err(|err| LoadError::fetch(&url, err))?,
            };
            let decode_url = url.clone();
            let image = tokio::task::spawn_blocking(move || {
                let img = decode_rgba8_apply_exif(&bytes)?;
                fit_within(img, max_dimension)
            })
            .await
            .map_err(|err| LoadError::decode(&url, err))?
            .map_err(|err| LoadError::decode(&decode_url, format!("{err:#}")))?;
            let (width, height) = image.dimensions();
            debug!(url, width, height, "decoded image");
            Ok(DecodedImage {
                width,
                height,
                pixels: image.into_raw(),
            })
        }
        .boxed()
    }
}

async fn fetch_remote(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .context("request failed")?
        .error_for_status()
        .context("server rejected request")?;
    let bytes = response.bytes().await.context("failed to read body")?;
    Ok(bytes.to_vec())
}

async fn read_first(candidates: &[PathBuf]) -> Result<Vec<u8>, std::io::Error> {
    let mut first_err = None;
    for path in candidates {
        match tokio::fs::read(path).await {
            Ok(bytes) => return Ok(bytes),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "asset candidate unreadable");
                first_err.get_or_insert(err);
            }
        }
    }
    Err(first_err.unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound)))
}

/// Decode to RGBA8 and apply the EXIF orientation when present.
pub fn decode_rgba8_apply_exif(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();

    let orientation = read_orientation(bytes).unwrap_or(1);
    let img = match orientation {
        2 => image::imageops::flip_horizontal(&img),
        3 => image::imageops::rotate180(&img),
        4 => image::imageops::flip_vertical(&img),
        5 => image::imageops::flip_horizontal(&image::imageops::rotate90(&img)),
        6 => image::imageops::rotate90(&img),
        7 => image::imageops::flip_horizontal(&image::imageops::rotate270(&img)),
        8 => image::imageops::rotate270(&img),
        _ => img,
    };
    Ok(img)
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, "exif orientation");
    Some(orientation)
}

/// Downscale so neither side exceeds `max_dimension`, keeping the aspect ratio.
pub fn fit_within(img: RgbaImage, max_dimension: u32) -> anyhow::Result<RgbaImage> {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension || longest == 0 {
        return Ok(img);
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    let target_w = ((f64::from(width) * scale).round() as u32).clamp(1, max_dimension);
    let target_h = ((f64::from(height) * scale).round() as u32).clamp(1, max_dimension);

    let src_view = fir::images::ImageRef::new(width, height, img.as_raw(), fir::PixelType::U8x4)
        .context("failed to create source view for downscale")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("downscale failed")?;
    debug!(width, height, target_w, target_h, "downscaled oversize image");
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| anyhow::anyhow!("failed to construct resized RGBA image"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    fn orient6_bytes() -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap()
    }

    #[test]
    fn applies_orientation_six() {
        let img = decode_rgba8_apply_exif(&orient6_bytes()).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[test]
    fn fit_within_keeps_small_images() {
        let img = RgbaImage::from_pixel(40, 20, image::Rgba([1, 2, 3, 255]));
        let out = fit_within(img, 64).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
    }

    #[test]
    fn fit_within_downscales_longest_side() {
        let img = RgbaImage::from_pixel(400, 100, image::Rgba([10, 20, 30, 255]));
        let out = fit_within(img, 100).unwrap();
        assert_eq!(out.dimensions(), (100, 25));
    }

    #[test]
    fn locates_root_relative_paths_under_asset_root() {
        let source = UrlImageSource::new("/srv/public", 4096);
        match source.locate("/images/Displacements/fluid.jpg") {
            Location::Local(candidates) => {
                assert_eq!(
                    candidates[0],
                    PathBuf::from("/srv/public/images/Displacements/fluid.jpg")
                );
                assert_eq!(
                    candidates[1],
                    PathBuf::from("/images/Displacements/fluid.jpg")
                );
            }
            Location::Remote(_) => panic!("expected local path"),
        }
        assert!(matches!(
            source.locate("https://cdn.example.com/a.jpg"),
            Location::Remote(_)
        ));
        match source.locate("hero/1.jpg") {
            Location::Local(candidates) => {
                assert_eq!(candidates, vec![PathBuf::from("/srv/public/hero/1.jpg")]);
            }
            Location::Remote(_) => panic!("expected local path"),
        }
    }

    #[tokio::test]
    async fn loads_and_decodes_file_from_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/orient6.jpg"), orient6_bytes()).unwrap();

        let source = UrlImageSource::new(dir.path(), 4096);
        let decoded = source.load("/images/orient6.jpg").await.unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(decoded.pixels.len(), 8);

        let missing = source.load("/images/missing.jpg").await.unwrap_err();
        assert_eq!(missing.url, "/images/missing.jpg");
        assert_eq!(missing.kind, crate::error::LoadErrorKind::Fetch);
    }
}
