use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    assets::{RasterImage, decode::reencode_inset, fetch::ImageSource},
    compose::{
        document::{
            ComposedDocument, Element, FontStyle, ImagePage, Page, PlacedImage, TextBlock,
            TextPage, TextRun,
        },
        wrap::split_text_to_size,
    },
    foundation::{
        core::{ReportSettings, Rgb8},
        error::FetchError,
        locale,
    },
    model::{catalog::CatalogItem, session::SessionInput},
    render::{CoverFields, MarkupRasterizer, cover_markup},
};

const FALLBACK_COVER_FILL: Rgb8 = Rgb8::new(41, 128, 185);

const TITLE_Y_MM: f32 = 40.0;
const BODY_Y_MM: f32 = 60.0;

/// Everything a single composition reads. Preconditions are checked by the caller.
#[derive(Clone, Debug)]
pub struct CompositionInput<'a> {
    pub session: &'a SessionInput,
    /// The validated session date.
    pub session_date: NaiveDate,
    /// Selected catalog items in catalog order. The closing page counts these, not the
    /// requested ids.
    pub items: Vec<&'a CatalogItem>,
    pub cover_image: &'a str,
    /// Introduction with the client-name placeholder still in place.
    pub introduction_text: &'a str,
    /// Printed in the closing page footer.
    pub issued_on: NaiveDate,
}

/// Builds the page sequence: cover, introduction, one page per item, closing.
///
/// Pages are produced strictly one after another. Failures of the cover raster or of an item
/// image are recovered on the page they belong to and never abort the document.
pub struct PageComposer {
    settings: ReportSettings,
    rasterizer: Arc<dyn MarkupRasterizer>,
    images: Arc<dyn ImageSource>,
}

impl PageComposer {
    pub fn new(
        settings: ReportSettings,
        rasterizer: Arc<dyn MarkupRasterizer>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            settings,
            rasterizer,
            images,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    #[tracing::instrument(skip_all, fields(items = input.items.len()))]
    pub async fn compose(&self, input: &CompositionInput<'_>) -> ComposedDocument {
        let mut doc = ComposedDocument::new(self.settings.page);

        doc.push(self.cover_page(input).await);
        doc.push(self.introduction_page(input));
        for item in &input.items {
            doc.push(self.item_page(item).await);
        }
        doc.push(self.closing_page(input));

        tracing::debug!(pages = doc.len(), "composed");
        doc
    }

    async fn cover_page(&self, input: &CompositionInput<'_>) -> Page {
        let session = input.session;
        let date = locale::format_date(input.session_date);
        let time = session.time().unwrap_or(locale::TIME_NOT_INFORMED);
        let fields = CoverFields {
            date: &date,
            time,
            client_name: &session.client_name,
            therapist_name: &session.therapist_name,
            background_image: input.cover_image,
        };
        let (w, h) = self.settings.cover_pixels();
        let markup = cover_markup(&fields, w, h);

        match self
            .rasterizer
            .rasterize(&markup, w, h, self.settings.cover_scale)
            .await
        {
            Ok(image) => Page::Image(ImagePage { image }),
            Err(err) => {
                tracing::warn!(error = %err, "cover rasterization failed; drawing plain cover");
                Page::Text(self.fallback_cover(session, &date, time))
            }
        }
    }

    fn fallback_cover(&self, session: &SessionInput, date: &str, time: &str) -> TextPage {
        let x = self.settings.margin_mm;
        let title = TextRun::new(
            locale::COVER_TITLE,
            self.settings.page.width_mm / 2.0,
            60.0,
            24.0,
            FontStyle::Bold,
        )
        .centered();

        let mut page = TextPage::new(title);
        page.background = Some(FALLBACK_COVER_FILL);
        page.text_color = Rgb8::WHITE;

        let rows = [
            (locale::LABEL_THERAPIST, session.therapist_name.as_str()),
            (locale::LABEL_CLIENT, session.client_name.as_str()),
            (locale::LABEL_DATE, date),
            (locale::LABEL_TIME, time),
        ];
        for (i, (label, value)) in rows.into_iter().enumerate() {
            let y = 100.0 + 15.0 * i as f32;
            page.push(Element::Line(TextRun::new(
                locale::label_line(label, value),
                x,
                y,
                14.0,
                FontStyle::Normal,
            )));
        }
        page
    }

    fn introduction_page(&self, input: &CompositionInput<'_>) -> Page {
        let text = locale::fill_client_name(input.introduction_text, &input.session.client_name);
        let mut page = TextPage::new(self.title(locale::INTRODUCTION_TITLE, 18.0));
        page.push(Element::Block(self.block(text, BODY_Y_MM, 12.0)));
        Page::Text(page)
    }

    async fn item_page(&self, item: &CatalogItem) -> Page {
        let mut page = TextPage::new(self.title(&item.title, 18.0));
        let x = self.settings.margin_mm;
        let mut y = BODY_Y_MM;

        if let Some(url) = item.image() {
            match self.inset_image(url).await {
                Ok(image) => {
                    let height_mm = self.settings.item_image_height_mm;
                    page.push(Element::Image(PlacedImage {
                        image,
                        x_mm: x,
                        y_mm: y,
                        width_mm: self.settings.item_image_width_mm,
                        height_mm,
                    }));
                    y += height_mm + 10.0;
                }
                Err(err) => {
                    tracing::warn!(item = item.id, error = %err, "item image unavailable");
                    page.push(Element::Line(TextRun::new(
                        locale::IMAGE_UNAVAILABLE,
                        x,
                        y,
                        10.0,
                        FontStyle::Italic,
                    )));
                    y += 20.0;
                }
            }
        }

        page.push(Element::Block(self.block(item.description.clone(), y, 12.0)));
        Page::Text(page)
    }

    async fn inset_image(&self, url: &str) -> Result<RasterImage, FetchError> {
        let bytes = self.images.fetch(url).await?;
        let (w, h) = self.settings.item_image_pixels();
        let quality = self.settings.item_image_jpeg_quality;
        tokio::task::spawn_blocking(move || reencode_inset(&bytes, w, h, quality))
            .await
            .map_err(|e| FetchError::decode(format!("image task failed: {e}")))?
    }

    fn closing_page(&self, input: &CompositionInput<'_>) -> Page {
        let session = input.session;
        let x = self.settings.margin_mm;
        let page_h = self.settings.page.height_mm;

        let mut page = TextPage::new(self.title(locale::CLOSING_TITLE, 16.0));
        let text = locale::closing_text(input.items.len(), &session.client_name);
        page.push(Element::Block(self.block(text, BODY_Y_MM, 12.0)));

        let footer = [
            (session.therapist_name.clone(), page_h - 60.0),
            (locale::THERAPIST_ROLE.to_string(), page_h - 50.0),
            (locale::issued_on_line(input.issued_on), page_h - 30.0),
        ];
        for (text, y) in footer {
            page.push(Element::Line(TextRun::new(text, x, y, 10.0, FontStyle::Italic)));
        }
        Page::Text(page)
    }

    fn title(&self, text: &str, size_pt: f32) -> TextRun {
        TextRun::new(text, self.settings.margin_mm, TITLE_Y_MM, size_pt, FontStyle::Bold)
    }

    fn block(&self, text: String, y_mm: f32, size_pt: f32) -> TextBlock {
        let lines = split_text_to_size(&text, size_pt, self.settings.content_width_mm());
        TextBlock {
            source: text,
            lines,
            x_mm: self.settings.margin_mm,
            y_mm,
            size_pt,
            style: FontStyle::Normal,
            line_height_mm: size_pt * self.settings.line_height_factor,
        }
    }
}
