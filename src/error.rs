//! Error types for the texture/model engine.

use thiserror::Error;

/// Result type alias using MapTexError.
pub type Result<T> = std::result::Result<T, MapTexError>;

/// Main error type for texture pack and model loading operations.
#[derive(Error, Debug)]
pub enum MapTexError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or process an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Texture pack path is neither a readable file nor a directory.
    #[error("Invalid texture pack: {0}")]
    InvalidTexturePack(String),

    /// Malformed directive in a model or texture description file.
    /// Aborts the remainder of that file; other files continue loading.
    #[error("Format error in {file} line {line}: {message}")]
    FileFormat {
        file: String,
        line: usize,
        message: String,
    },

    /// Sub-tile index outside a tile file's declared tile count.
    #[error("Tile index {index} out of range for file {file} ({count} tiles)")]
    TileIndexOutOfRange {
        file: String,
        index: usize,
        count: usize,
    },
}

impl MapTexError {
    /// Fatal-to-file parse error with source position attached.
    pub fn format(file: &str, line: usize, message: impl Into<String>) -> Self {
        MapTexError::FileFormat {
            file: file.to_string(),
            line,
            message: message.into(),
        }
    }
}
