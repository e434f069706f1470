pub mod cover;
pub mod markup;

pub use cover::{CoverFields, cover_markup};
pub use markup::{MarkupRasterizer, SurfaceCounters, SvgRasterizer};
