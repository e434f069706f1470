pub(crate) mod core;
pub(crate) mod error;
pub mod locale;
