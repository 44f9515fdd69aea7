//! Error types for terratin

use thiserror::Error;

/// Main error type for terratin operations
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or otherwise unusable parameter series, bad knob values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Border detection or triangulation cannot proceed on the given input
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Malformed buffers handed to the vertex-fetch optimizer
    #[error("Precondition violation: {0}")]
    PreconditionViolation(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Tile build failed at zoom {zoom} ({point_count} points): {source}")]
    TileBuild {
        zoom: u32,
        point_count: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether a tile-pyramid orchestrator may recover from this error by
    /// relaxing parameters, skipping the zoom level or falling back to the
    /// unsimplified point set.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Configuration(_) | Error::DegenerateGeometry(_) => true,
            Error::TileBuild { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Attach tile context to an error.
    pub fn in_tile(self, zoom: u32, point_count: usize) -> Self {
        match self {
            already @ Error::TileBuild { .. } => already,
            other => Error::TileBuild {
                zoom,
                point_count,
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for terratin operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::Configuration("empty".into()).is_recoverable());
        assert!(Error::DegenerateGeometry("flat".into()).is_recoverable());
        assert!(!Error::PreconditionViolation("index".into()).is_recoverable());
        assert!(!Error::InvalidData("nan".into()).is_recoverable());
    }

    #[test]
    fn test_tile_context_is_attached_once() {
        let err = Error::PreconditionViolation("bad vertex size".into())
            .in_tile(4, 1200)
            .in_tile(5, 10);
        match &err {
            Error::TileBuild { zoom, point_count, source } => {
                assert_eq!(*zoom, 4);
                assert_eq!(*point_count, 1200);
                assert!(matches!(**source, Error::PreconditionViolation(_)));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("zoom 4"));
    }
}
