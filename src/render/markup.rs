use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use image::ImageFormat;
use quick_xml::{escape::unescape, events::Event, reader::Reader};

use crate::{
    assets::{
        RasterImage,
        decode::{encode_jpeg, premul_rgba_to_rgb},
        fetch::{ImageSource, short_ref},
    },
    foundation::error::{FetchError, RenderFailure},
};

/// Turns a styled markup fragment into a raster image.
///
/// `width`/`height` are layout pixels; the output is `scale` times larger.
#[async_trait]
pub trait MarkupRasterizer: Send + Sync {
    async fn rasterize(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        scale: f32,
    ) -> Result<RasterImage, RenderFailure>;
}

// Avoid pathological allocations from a bad scale.
const MAX_DIM: u32 = 16_384;

/// Attach/detach counters for rendering surfaces.
#[derive(Debug, Default)]
pub struct SurfaceCounters {
    live: AtomicUsize,
    attached_total: AtomicUsize,
}

impl SurfaceCounters {
    /// Surfaces currently attached.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Surfaces attached since construction.
    pub fn attached_total(&self) -> usize {
        self.attached_total.load(Ordering::SeqCst)
    }
}

/// Off-screen pixmap that lives for exactly one rasterization.
struct RenderSurface {
    pixmap: resvg::tiny_skia::Pixmap,
    counters: Arc<SurfaceCounters>,
}

impl RenderSurface {
    fn attach(
        width: u32,
        height: u32,
        counters: &Arc<SurfaceCounters>,
    ) -> Result<Self, RenderFailure> {
        if width > MAX_DIM || height > MAX_DIM {
            return Err(RenderFailure::Raster(format!(
                "surface too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
            )));
        }
        let pixmap = resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            RenderFailure::Raster(format!("failed to allocate {width}x{height} surface"))
        })?;
        counters.live.fetch_add(1, Ordering::SeqCst);
        counters.attached_total.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(width, height, "render surface attached");
        Ok(Self {
            pixmap,
            counters: Arc::clone(counters),
        })
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!("render surface detached");
    }
}

#[derive(Clone, Copy, Debug)]
enum EmbeddedFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl EmbeddedFormat {
    fn sniff(bytes: &[u8]) -> Result<Self, FetchError> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(ImageFormat::Png) => Ok(Self::Png),
            Ok(ImageFormat::Gif) => Ok(Self::Gif),
            Ok(ImageFormat::WebP) => Ok(Self::WebP),
            Ok(other) => Err(FetchError::decode(format!(
                "unsupported image format {other:?}"
            ))),
            Err(e) => Err(FetchError::decode(e.to_string())),
        }
    }

    fn image_kind(self, bytes: Arc<Vec<u8>>) -> usvg::ImageKind {
        match self {
            Self::Jpeg => usvg::ImageKind::JPEG(bytes),
            Self::Png => usvg::ImageKind::PNG(bytes),
            Self::Gif => usvg::ImageKind::GIF(bytes),
            Self::WebP => usvg::ImageKind::WEBP(bytes),
        }
    }
}

type ResolvedImages = HashMap<String, (EmbeddedFormat, Arc<Vec<u8>>)>;

/// [`MarkupRasterizer`] for SVG markup, backed by `usvg` + `resvg`.
///
/// External `href`s are fetched through the [`ImageSource`] before parsing; if any of them fails
/// the whole rasterization fails. `data:` hrefs are left to `usvg`.
pub struct SvgRasterizer {
    images: Arc<dyn ImageSource>,
    fontdb: Arc<usvg::fontdb::Database>,
    jpeg_quality: u8,
    background: [u8; 3],
    counters: Arc<SurfaceCounters>,
}

impl SvgRasterizer {
    /// Rasterizer with system fonts loaded.
    pub fn new(images: Arc<dyn ImageSource>, jpeg_quality: u8) -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!(faces = fontdb.len(), "loaded system fonts for markup rendering");
        Self::with_fontdb(images, jpeg_quality, Arc::new(fontdb))
    }

    pub fn with_fontdb(
        images: Arc<dyn ImageSource>,
        jpeg_quality: u8,
        fontdb: Arc<usvg::fontdb::Database>,
    ) -> Self {
        Self {
            images,
            fontdb,
            jpeg_quality,
            background: [0, 0, 0],
            counters: Arc::new(SurfaceCounters::default()),
        }
    }

    pub fn surface_counters(&self) -> &SurfaceCounters {
        &self.counters
    }

    async fn resolve_external(&self, markup: &str) -> Result<ResolvedImages, RenderFailure> {
        let mut resolved = ResolvedImages::new();
        for href in external_hrefs(markup) {
            if resolved.contains_key(&href) {
                continue;
            }
            let bytes = self
                .images
                .fetch(&href)
                .await
                .and_then(|bytes| EmbeddedFormat::sniff(&bytes).map(|fmt| (fmt, bytes)));
            match bytes {
                Ok((fmt, bytes)) => {
                    tracing::debug!(href = %short_ref(&href), len = bytes.len(), "resolved markup image");
                    resolved.insert(href, (fmt, Arc::new(bytes)));
                }
                Err(source) => return Err(RenderFailure::Resource { url: href, source }),
            }
        }
        Ok(resolved)
    }
}

#[async_trait]
impl MarkupRasterizer for SvgRasterizer {
    #[tracing::instrument(level = "debug", skip(self, markup))]
    async fn rasterize(
        &self,
        markup: &str,
        width: u32,
        height: u32,
        scale: f32,
    ) -> Result<RasterImage, RenderFailure> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderFailure::Raster("scale must be finite and > 0".to_string()));
        }
        let resolved = self.resolve_external(markup).await?;

        let job = RasterJob {
            markup: markup.to_string(),
            resolved,
            fontdb: Arc::clone(&self.fontdb),
            width_px: ((width as f32) * scale).round() as u32,
            height_px: ((height as f32) * scale).round() as u32,
            jpeg_quality: self.jpeg_quality,
            background: self.background,
            counters: Arc::clone(&self.counters),
        };

        tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| RenderFailure::Raster(format!("render task failed: {e}")))?
    }
}

struct RasterJob {
    markup: String,
    resolved: ResolvedImages,
    fontdb: Arc<usvg::fontdb::Database>,
    width_px: u32,
    height_px: u32,
    jpeg_quality: u8,
    background: [u8; 3],
    counters: Arc<SurfaceCounters>,
}

impl RasterJob {
    fn run(self) -> Result<RasterImage, RenderFailure> {
        let mut surface = RenderSurface::attach(self.width_px, self.height_px, &self.counters)?;

        let resolved = self.resolved;
        let mut opts = usvg::Options::default();
        opts.fontdb = self.fontdb;
        opts.image_href_resolver = usvg::ImageHrefResolver {
            resolve_data: usvg::ImageHrefResolver::default_data_resolver(),
            resolve_string: Box::new(move |href: &str, _opts: &usvg::Options| {
                resolved
                    .get(href)
                    .map(|(fmt, bytes)| fmt.image_kind(Arc::clone(bytes)))
            }),
        };

        let tree = usvg::Tree::from_str(&self.markup, &opts)
            .map_err(|e| RenderFailure::Parse(e.to_string()))?;

        let size = tree.size();
        let sx = (self.width_px as f32) / size.width();
        let sy = (self.height_px as f32) / size.height();
        let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
        resvg::render(&tree, xform, &mut surface.pixmap.as_mut());

        let rgb = premul_rgba_to_rgb(
            self.width_px,
            self.height_px,
            surface.pixmap.data(),
            self.background,
        );
        let jpeg = encode_jpeg(&rgb, self.jpeg_quality)
            .map_err(|e| RenderFailure::Encode(e.to_string()))?;
        Ok(RasterImage::new(self.width_px, self.height_px, jpeg))
    }
}

/// `href` / `xlink:href` attribute values that point outside the document, XML-unescaped.
///
/// Fragment references (`#id`) and `data:` URIs are skipped. Malformed markup ends the scan early;
/// `usvg` reports the parse error.
pub(crate) fn external_hrefs(markup: &str) -> Vec<String> {
    let mut reader = Reader::from_str(markup);
    let mut out = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() != b"href" {
                        continue;
                    }
                    let Ok(raw) = reader.decoder().decode(&attr.value) else {
                        continue;
                    };
                    let Ok(value) = unescape(&raw) else {
                        continue;
                    };
                    let value = value.trim();
                    if value.is_empty() || value.starts_with('#') || value.starts_with("data:") {
                        continue;
                    }
                    out.push(value.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "stopped scanning markup for image references");
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct MapSource(HashMap<String, Vec<u8>>);

    #[async_trait]
    impl ImageSource for MapSource {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.0.get(url).cloned().ok_or(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn rasterizer(entries: &[(&str, Vec<u8>)]) -> SvgRasterizer {
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        SvgRasterizer::with_fontdb(
            Arc::new(MapSource(map)),
            90,
            Arc::new(usvg::fontdb::Database::new()),
        )
    }

    fn red_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn href_scan_tolerates_spaced_attributes() {
        let markup = r#"<svg><image href = "https://x.test/bg.jpg" width="8"/><image
            xlink:href
            =
            'b.png'/></svg>"#;
        assert_eq!(external_hrefs(markup), ["https://x.test/bg.jpg", "b.png"]);
    }

    #[test]
    fn href_scan_skips_fragments_and_data() {
        let markup = r##"<svg><use href="#a"/><image href="https://x.test/a.jpg?w=1&amp;h=2"/>
            <image xlink:href='local.png'/><image href="data:image/png;base64,AA"/></svg>"##;
        assert_eq!(
            external_hrefs(markup),
            ["https://x.test/a.jpg?w=1&h=2", "local.png"]
        );
    }

    #[tokio::test]
    async fn rasterizes_at_scaled_size() {
        let r = rasterizer(&[]);
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20"><rect width="10" height="20" fill="#00ff00"/></svg>"##;
        let raster = r.rasterize(svg, 10, 20, 2.0).await.unwrap();
        assert_eq!((raster.width, raster.height), (20, 40));

        let decoded = image::load_from_memory(&raster.jpeg).unwrap().to_rgb8();
        let px = decoded.get_pixel(10, 20).0;
        assert!(px[1] > 200 && px[0] < 60 && px[2] < 60, "{px:?}");
        assert_eq!(r.surface_counters().live(), 0);
        assert_eq!(r.surface_counters().attached_total(), 1);
    }

    #[tokio::test]
    async fn external_image_is_resolved_through_source() {
        let url = "https://x.test/bg.png";
        let r = rasterizer(&[(url, red_png())]);
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><image href="{url}" width="8" height="8"/></svg>"#
        );
        let raster = r.rasterize(&svg, 8, 8, 1.0).await.unwrap();
        let decoded = image::load_from_memory(&raster.jpeg).unwrap().to_rgb8();
        let px = decoded.get_pixel(4, 4).0;
        assert!(px[0] > 200 && px[1] < 60, "{px:?}");
    }

    #[tokio::test]
    async fn missing_external_image_is_a_resource_failure() {
        let r = rasterizer(&[]);
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><image href="https://x.test/missing.jpg" width="8" height="8"/></svg>"#;
        let err = r.rasterize(svg, 8, 8, 1.0).await.unwrap_err();
        assert!(matches!(err, RenderFailure::Resource { .. }));
    }

    #[tokio::test]
    async fn spaced_href_that_fails_to_load_is_a_resource_failure() {
        let r = rasterizer(&[]);
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><image href = "https://x.test/missing.jpg" width="8" height="8"/></svg>"#;
        let err = r.rasterize(svg, 8, 8, 1.0).await.unwrap_err();
        assert!(matches!(err, RenderFailure::Resource { ref url, .. } if url == "https://x.test/missing.jpg"));
    }

    #[tokio::test]
    async fn surface_is_detached_when_parsing_fails() {
        let r = rasterizer(&[]);
        let err = r.rasterize("<svg", 8, 8, 1.0).await.unwrap_err();
        assert!(matches!(err, RenderFailure::Parse(_)));
        assert_eq!(r.surface_counters().attached_total(), 1);
        assert_eq!(r.surface_counters().live(), 0);
    }

    #[tokio::test]
    async fn zero_sized_target_fails() {
        let r = rasterizer(&[]);
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#;
        assert!(matches!(
            r.rasterize(svg, 0, 8, 1.0).await,
            Err(RenderFailure::Raster(_))
        ));
        assert_eq!(r.surface_counters().attached_total(), 0);
    }
}
