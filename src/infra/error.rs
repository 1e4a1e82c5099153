use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

/// Failures of the process around the pipeline: sockets, files, logging.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to read `{path}`: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
    #[error("server stopped unexpectedly: {0}")]
    Serve(#[source] io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    pub fn read_input(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ReadInput {
            path: path.into(),
            source,
        }
    }
}
