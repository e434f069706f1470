use std::{
    io::{BufWriter, Cursor},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use image::{ColorType, ImageDecoder, codecs::jpeg::JpegDecoder};
use printpdf::{
    BuiltinFont, Color, ColorBits, ColorSpace, Image, ImageFilter, ImageTransform, ImageXObject,
    IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Polygon, Px,
    Rgb,
    path::{PaintMode, WindingOrder},
};

use crate::{
    assets::RasterImage,
    compose::{
        document::{Align, ComposedDocument, Element, FontStyle, Page, TextPage, TextRun},
        wrap::text_width_mm,
    },
    foundation::{
        core::{PageSize, Rgb8},
        error::{ReportError, ReportResult},
    },
};

// Embedded rasters are placed at this nominal density and then scaled to their box.
const IMAGE_DPI: f32 = 300.0;

/// `relatorio_<client>_<yyyy-mm-dd>.pdf`, each whitespace run in the name replaced by `_`.
pub fn report_file_name(client_name: &str, session_date: NaiveDate) -> String {
    let mut slug = String::with_capacity(client_name.len());
    let mut in_space = false;
    for ch in client_name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                slug.push('_');
            }
            in_space = true;
        } else {
            slug.push(ch);
            in_space = false;
        }
    }
    format!("relatorio_{slug}_{}.pdf", session_date.format("%Y-%m-%d"))
}

/// Serializes a [`ComposedDocument`] to PDF, one PDF page per composed page.
#[derive(Clone, Debug)]
pub struct DocumentExporter {
    title: String,
}

impl Default for DocumentExporter {
    fn default() -> Self {
        Self::new("Relatório Terapêutico")
    }
}

struct Fonts {
    normal: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> ReportResult<Self> {
        let add = |font| {
            doc.add_builtin_font(font)
                .map_err(|e| ReportError::generation(format!("font setup failed: {e}")))
        };
        Ok(Self {
            normal: add(BuiltinFont::Helvetica)?,
            bold: add(BuiltinFont::HelveticaBold)?,
            italic: add(BuiltinFont::HelveticaOblique)?,
        })
    }

    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Normal => &self.normal,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

impl DocumentExporter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the whole document into PDF bytes.
    pub fn to_bytes(&self, doc: &ComposedDocument) -> ReportResult<Vec<u8>> {
        if doc.is_empty() {
            return Err(ReportError::generation("document has no pages"));
        }
        let size = doc.page_size();
        let (pdf, first_page, first_layer) = PdfDocument::new(
            self.title.as_str(),
            Mm(size.width_mm),
            Mm(size.height_mm),
            "Layer 1",
        );
        let fonts = Fonts::load(&pdf)?;

        for (i, page) in doc.pages().iter().enumerate() {
            let layer = if i == 0 {
                pdf.get_page(first_page).get_layer(first_layer)
            } else {
                let (p, l) = pdf.add_page(Mm(size.width_mm), Mm(size.height_mm), "Layer 1");
                pdf.get_page(p).get_layer(l)
            };
            match page {
                Page::Image(img) => {
                    draw_image(&layer, size, &img.image, 0.0, 0.0, size.width_mm, size.height_mm)?
                }
                Page::Text(text) => draw_text_page(&layer, size, &fonts, text)?,
            }
        }

        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(Cursor::new(&mut buf));
            pdf.save(&mut writer)
                .map_err(|e| ReportError::generation(format!("pdf serialization failed: {e}")))?;
        }
        Ok(buf)
    }

    /// Write `doc` to `out_dir/file_name` and return the full path.
    ///
    /// The bytes go to a sibling temporary file first, so a failed write leaves no partial PDF.
    #[tracing::instrument(skip(self, doc), fields(pages = doc.len()))]
    pub async fn export(
        &self,
        doc: &ComposedDocument,
        out_dir: &Path,
        file_name: &str,
    ) -> ReportResult<PathBuf> {
        let bytes = self.to_bytes(doc)?;

        tokio::fs::create_dir_all(out_dir).await.map_err(|e| {
            ReportError::generation(format!(
                "failed to create output directory '{}': {e}",
                out_dir.display()
            ))
        })?;
        let path = out_dir.join(file_name);
        let partial = out_dir.join(format!("{file_name}.part"));

        if let Err(e) = tokio::fs::write(&partial, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(ReportError::generation(format!(
                "failed to write '{}': {e}",
                partial.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(ReportError::generation(format!(
                "failed to move report into '{}': {e}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), bytes = bytes.len(), "report written");
        Ok(path)
    }
}

fn pdf_color(c: Rgb8) -> Color {
    let (r, g, b) = c.to_unit();
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn fill_page(layer: &PdfLayerReference, size: PageSize, color: Rgb8) {
    let corners = [
        (0.0, 0.0),
        (size.width_mm, 0.0),
        (size.width_mm, size.height_mm),
        (0.0, size.height_mm),
    ];
    layer.set_fill_color(pdf_color(color));
    layer.add_polygon(Polygon {
        rings: vec![
            corners
                .iter()
                .map(|&(x, y)| (Point::new(Mm(x), Mm(y)), false))
                .collect(),
        ],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

fn draw_text_page(
    layer: &PdfLayerReference,
    size: PageSize,
    fonts: &Fonts,
    page: &TextPage,
) -> ReportResult<()> {
    if let Some(bg) = page.background {
        fill_page(layer, size, bg);
    }
    layer.set_fill_color(pdf_color(page.text_color));
    draw_run(layer, size, fonts, &page.title);

    for element in &page.elements {
        match element {
            Element::Line(run) => draw_run(layer, size, fonts, run),
            Element::Block(block) => {
                let font = fonts.get(block.style);
                for (i, line) in block.lines.iter().enumerate() {
                    if line.is_empty() {
                        continue;
                    }
                    let y = block.y_mm + i as f32 * block.line_height_mm;
                    layer.use_text(
                        line.as_str(),
                        block.size_pt,
                        Mm(block.x_mm),
                        Mm(size.height_mm - y),
                        font,
                    );
                }
            }
            Element::Image(img) => {
                draw_image(layer, size, &img.image, img.x_mm, img.y_mm, img.width_mm, img.height_mm)?;
                layer.set_fill_color(pdf_color(page.text_color));
            }
        }
    }
    Ok(())
}

fn draw_run(layer: &PdfLayerReference, size: PageSize, fonts: &Fonts, run: &TextRun) {
    let x = match run.align {
        Align::Left => run.x_mm,
        Align::Center => run.x_mm - text_width_mm(&run.text, run.size_pt) / 2.0,
    };
    layer.use_text(
        run.text.as_str(),
        run.size_pt,
        Mm(x),
        Mm(size.height_mm - run.y_mm),
        fonts.get(run.style),
    );
}

/// Place `raster` with its top-left corner at (`x_mm`, `y_mm`), stretched to the given box.
///
/// The JPEG bytes are embedded as-is (`/DCTDecode`); only the header is read.
fn draw_image(
    layer: &PdfLayerReference,
    size: PageSize,
    raster: &RasterImage,
    x_mm: f32,
    y_mm: f32,
    width_mm: f32,
    height_mm: f32,
) -> ReportResult<()> {
    let decoder = JpegDecoder::new(Cursor::new(raster.jpeg.as_slice()))
        .map_err(|e| ReportError::generation(format!("embedded image is not a valid JPEG: {e}")))?;
    let (w, h) = decoder.dimensions();
    if w == 0 || h == 0 {
        return Err(ReportError::generation("embedded image is empty"));
    }
    let color_space = match decoder.color_type() {
        ColorType::Rgb8 => ColorSpace::Rgb,
        ColorType::L8 => ColorSpace::Greyscale,
        other => {
            return Err(ReportError::generation(format!(
                "unsupported JPEG colour type {other:?}"
            )));
        }
    };

    let natural_w_mm = w as f32 * 25.4 / IMAGE_DPI;
    let natural_h_mm = h as f32 * 25.4 / IMAGE_DPI;
    let xobject = ImageXObject {
        width: Px(w as usize),
        height: Px(h as usize),
        color_space,
        bits_per_component: ColorBits::Bit8,
        interpolate: true,
        image_data: raster.jpeg.to_vec(),
        image_filter: Some(ImageFilter::DCT),
        clipping_bbox: None,
        smask: None,
    };
    Image::from(xobject).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x_mm)),
            translate_y: Some(Mm(size.height_mm - y_mm - height_mm)),
            scale_x: Some(width_mm / natural_w_mm),
            scale_y: Some(height_mm / natural_h_mm),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
    Ok(())
}
