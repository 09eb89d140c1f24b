mod document;
mod error;
mod host;
mod ora;

pub use document::{filter_type, Layer, LayeredImage, DEFAULT_RESOLUTION};
pub use error::CodecError;
pub use host::{load_composite, load_document, RasterHost, IMPORTABLE_EXTENSIONS};
pub use ora::{read_merged, read_ora, write_ora, OraFlavor};
