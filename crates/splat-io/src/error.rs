//! Errors at the loader boundary (spec.md §7: "I/O failure reading vertex
//! stream" is fatal; abort the frame).

/// Everything that can go wrong turning a vertex stream into a
/// [`splat_render::GaussianStore`](splat_render::GaussianStore).
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read vertex stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed PLY header: {0}")]
    InvalidHeader(String),

    #[error("vertex stream is missing required property `{0}`")]
    MissingProperty(String),
}
