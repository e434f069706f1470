use crate::{
    assets::RasterImage,
    foundation::core::{PageSize, Rgb8},
};

/// Font face within the Helvetica family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
}

/// Horizontal anchoring of a [`TextRun`]'s `x_mm`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// One positioned line of text. `y_mm` is the baseline, measured from the top edge.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub style: FontStyle,
    pub align: Align,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x_mm: f32, y_mm: f32, size_pt: f32, style: FontStyle) -> Self {
        Self {
            text: text.into(),
            x_mm,
            y_mm,
            size_pt,
            style,
            align: Align::Left,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }
}

/// A paragraph already broken into lines at the page's content width.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    /// Text before wrapping.
    pub source: String,
    pub lines: Vec<String>,
    pub x_mm: f32,
    /// Baseline of the first line.
    pub y_mm: f32,
    pub size_pt: f32,
    pub style: FontStyle,
    /// Distance between consecutive baselines.
    pub line_height_mm: f32,
}

/// Raster placed inside a text page. `y_mm` is the top edge.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedImage {
    pub image: RasterImage,
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Line(TextRun),
    Block(TextBlock),
    Image(PlacedImage),
}

/// Page drawn from text runs on an optional solid background.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPage {
    pub background: Option<Rgb8>,
    pub text_color: Rgb8,
    pub title: TextRun,
    pub elements: Vec<Element>,
}

impl TextPage {
    pub fn new(title: TextRun) -> Self {
        Self {
            background: None,
            text_color: Rgb8::BLACK,
            title,
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Title, line texts and block sources in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        let mut out = vec![self.title.text.as_str()];
        for element in &self.elements {
            match element {
                Element::Line(run) => out.push(&run.text),
                Element::Block(block) => out.push(&block.source),
                Element::Image(_) => {}
            }
        }
        out
    }

    /// `true` if `needle` occurs in the title, a line, or a block's source text.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    pub fn images(&self) -> impl Iterator<Item = &PlacedImage> {
        self.elements.iter().filter_map(|e| match e {
            Element::Image(img) => Some(img),
            _ => None,
        })
    }
}

/// Page that is a single full-bleed raster.
#[derive(Clone, Debug, PartialEq)]
pub struct ImagePage {
    pub image: RasterImage,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Page {
    Image(ImagePage),
    Text(TextPage),
}

impl Page {
    pub fn as_text(&self) -> Option<&TextPage> {
        match self {
            Page::Text(page) => Some(page),
            Page::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Page::Image(_))
    }
}

/// Raster-free view of a page, for comparing documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageOutline {
    Image { width: u32, height: u32 },
    Text { texts: Vec<String>, images: usize },
}

/// Ordered pages of one report. Pages are only ever appended.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedDocument {
    page_size: PageSize,
    pages: Vec<Page>,
}

impl ComposedDocument {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn outline(&self) -> Vec<PageOutline> {
        self.pages
            .iter()
            .map(|page| match page {
                Page::Image(p) => PageOutline::Image {
                    width: p.image.width,
                    height: p.image.height,
                },
                Page::Text(p) => PageOutline::Text {
                    texts: p.texts().into_iter().map(str::to_string).collect(),
                    images: p.images().count(),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texts_skip_images_and_keep_order() {
        let mut page = TextPage::new(TextRun::new("T", 20.0, 40.0, 18.0, FontStyle::Bold));
        page.push(Element::Image(PlacedImage {
            image: RasterImage::new(1, 1, vec![0]),
            x_mm: 20.0,
            y_mm: 60.0,
            width_mm: 80.0,
            height_mm: 60.0,
        }));
        page.push(Element::Block(TextBlock {
            source: "corpo".to_string(),
            lines: vec!["corpo".to_string()],
            x_mm: 20.0,
            y_mm: 130.0,
            size_pt: 12.0,
            style: FontStyle::Normal,
            line_height_mm: 6.0,
        }));
        assert_eq!(page.texts(), ["T", "corpo"]);
        assert_eq!(page.images().count(), 1);
        assert!(page.contains_text("orp"));
    }
}
