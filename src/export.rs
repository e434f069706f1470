pub mod pdf;

pub use pdf::{DocumentExporter, report_file_name};
