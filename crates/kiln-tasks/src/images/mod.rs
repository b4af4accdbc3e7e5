//! Image optimization.
//!
//! Every file under the source directory is mirrored into the output directory.
//! GIF, JPEG, PNG and SVG files are optimized by format; anything else is copied
//! unchanged. An optimized file is never larger than its source.

mod gif;
mod jpeg;
mod png;
mod svg;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use kiln_config::ImagesConfig;

use crate::fs::{glob_files, relative_to, write_file};
use crate::pipeline::Task;
use crate::reload::{ReloadEvent, ReloadSink};
use crate::TaskError;

/// Files picked up under the source directory.
const SOURCE_PATTERN: &str = "**/*.*";

/// Codec failure on a single image. Logged, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("GIF decode failed: {0}")]
    GifDecode(#[from] ::gif::DecodingError),
    #[error("GIF encode failed: {0}")]
    GifEncode(#[from] ::gif::EncodingError),
    #[error("JPEG decode failed: {0}")]
    Jpeg(#[from] image::ImageError),
    #[error("JPEG encode failed: {0}")]
    JpegEncode(#[from] jpeg_encoder::EncodingError),
    #[error("JPEG of {width}x{height} exceeds the encoder limit")]
    JpegSize { width: u32, height: u32 },
    #[error("PNG optimization failed: {0}")]
    Png(#[from] oxipng::PngError),
    #[error("SVG is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("SVG parse failed: {0}")]
    Svg(#[from] quick_xml::Error),
    #[error("SVG attribute is malformed: {0}")]
    SvgAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("SVG write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Image format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Gif,
    Jpeg,
    Png,
    Svg,
}

impl ImageKind {
    /// Kind for `path`, case-insensitive. `None` for unsupported files.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Some(Self::Gif),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }
}

/// Per-format optimizer driven by [`ImagesConfig`].
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: ImagesConfig,
}

impl Optimizer {
    #[must_use]
    pub fn new(config: ImagesConfig) -> Self {
        Self { config }
    }

    /// Optimize `data` read from `path`.
    ///
    /// Returns the smaller of the optimized and original bytes. Unsupported
    /// formats and codec failures return `data` unchanged.
    #[must_use]
    pub fn process(&self, path: &Path, data: Vec<u8>) -> Vec<u8> {
        let Some(kind) = ImageKind::from_path(path) else {
            return data;
        };

        match self.optimize(kind, &data) {
            Ok(optimized) if optimized.len() < data.len() => optimized,
            Ok(_) => data,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Image could not be optimized, copying original"
                );
                data
            }
        }
    }

    fn optimize(&self, kind: ImageKind, data: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        match kind {
            ImageKind::Gif => gif::optimize(data, self.config.gif_interlaced),
            ImageKind::Jpeg => jpeg::optimize(
                data,
                self.config.jpeg_quality,
                self.config.jpeg_progressive,
            ),
            ImageKind::Png => png::optimize(data, self.config.png_optimization_level),
            ImageKind::Svg => svg::optimize(data, self.config.svg_remove_view_box),
        }
    }
}

/// Optimizes the image tree into the output directory.
pub struct ImagesTask {
    source_dir: PathBuf,
    output_dir: PathBuf,
    optimizer: Optimizer,
    reload: Arc<dyn ReloadSink>,
}

impl ImagesTask {
    pub fn new(
        source_dir: PathBuf,
        output_dir: PathBuf,
        config: ImagesConfig,
        reload: Arc<dyn ReloadSink>,
    ) -> Self {
        if config.svg_cleanup_ids {
            tracing::debug!("SVG id cleanup is not available, ids are kept");
        }

        Self {
            source_dir,
            output_dir,
            optimizer: Optimizer::new(config),
            reload,
        }
    }
}

#[async_trait]
impl Task for ImagesTask {
    fn name(&self) -> &str {
        "images"
    }

    async fn run(&self) -> Result<(), TaskError> {
        let files = glob_files(&self.source_dir, SOURCE_PATTERN)?;

        let mut optimized = 0usize;
        let mut saved = 0usize;
        for file in &files {
            let data = tokio::fs::read(file).await.map_err(TaskError::io(file))?;
            let original_len = data.len();

            let optimizer = self.optimizer.clone();
            let path = file.clone();
            let output = tokio::task::spawn_blocking(move || optimizer.process(&path, data)).await?;

            if ImageKind::from_path(file).is_some() {
                optimized += 1;
                saved += original_len - output.len();
            }

            let target = self.output_dir.join(relative_to(file, &self.source_dir)?);
            write_file(&target, output).await?;
        }

        tracing::info!(
            count = optimized,
            saved_bytes = saved,
            "Minified {optimized} images (saved {saved} bytes)"
        );

        self.reload.notify(ReloadEvent::Reload {
            path: self.output_dir.clone(),
        });
        Ok(())
    }
}
