pub mod logging;
pub mod urls;

pub use logging::truncate_text;
