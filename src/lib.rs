#![forbid(unsafe_code)]

pub mod assets;
pub mod compose;
pub mod export;
pub mod foundation;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod store;

pub use assets::{
    RasterImage,
    decode::{MAX_UPLOAD_BYTES, image_data_uri},
    fetch::{HttpImageSource, ImageSource},
};
pub use compose::{ComposedDocument, Page, PageComposer, PageOutline, TextPage};
pub use export::{DocumentExporter, report_file_name};
pub use foundation::{
    core::{PageSize, ReportSettings, Rgb8},
    error::{FetchError, RenderFailure, ReportError, ReportResult},
    locale,
};
pub use model::{
    catalog::{
        COVER_PRESETS, CUSTOM_COVER_VARIANT, CatalogItem, ConfigUpdate, Configuration,
        CoverPreset, CoverSettings, ItemPatch,
    },
    session::SessionInput,
};
pub use pipeline::{GeneratedReport, ReportGenerator};
pub use render::{MarkupRasterizer, SvgRasterizer};
pub use store::{ConfigurationStore, InMemoryStore, JsonFileStore};
