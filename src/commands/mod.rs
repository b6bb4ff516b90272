pub mod convert;
pub mod paths;

pub use convert::{ConvertCommand, ConvertOptions, FormatChoice};
