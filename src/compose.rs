pub mod composer;
pub mod document;
pub mod wrap;

pub use composer::{CompositionInput, PageComposer};
pub use document::{
    Align, ComposedDocument, Element, FontStyle, ImagePage, Page, PageOutline, PlacedImage,
    TextBlock, TextPage, TextRun,
};
