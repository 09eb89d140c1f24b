use pagebook_application::ApplicationError;
use thiserror::Error;

/// Failures inside the file codecs, before they reach the application layer.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("invalid OpenRaster file: {0}")]
    InvalidOra(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),

    #[error("GIF encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("JPEG encoding error: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),

    #[error("{format} cannot store a {width}x{height} image")]
    TooLarge {
        format: &'static str,
        width: u32,
        height: u32,
    },
}

impl From<quick_xml::Error> for CodecError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for CodecError {
    fn from(value: quick_xml::escape::EscapeError) -> Self {
        Self::Xml(value.to_string())
    }
}

impl From<CodecError> for ApplicationError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Io(error) => ApplicationError::Io(error.to_string()),
            CodecError::Zip(_)
            | CodecError::Xml(_)
            | CodecError::InvalidOra(_)
            | CodecError::Image(_) => ApplicationError::Decode(value.to_string()),
            CodecError::Png(_)
            | CodecError::Gif(_)
            | CodecError::Tiff(_)
            | CodecError::Jpeg(_)
            | CodecError::TooLarge { .. } => ApplicationError::Encode(value.to_string()),
        }
    }
}
