use thiserror::Error;

/// Crate-wide error type. Each variant corresponds to one row of the
/// error-handling table: some are fatal (propagated to `main` and turned
/// into a non-zero exit code), others are caught and logged where they
/// occur.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not open alignment file {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: rust_htslib::errors::Error,
    },

    #[error("no index found for {path}")]
    IndexMissing { path: String },

    #[error("invalid region {region}")]
    RegionInvalid { region: String },

    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },

    // NoDeletionFound/EmptyTargetRegions document §7's policy table but are
    // never constructed: both are "quiet, continue" outcomes handled by
    // skipping or logging at the call site rather than by raising an error.
    #[error("no deletion found for target region {reference_id}:{start}-{end}")]
    NoDeletionFound {
        reference_id: i32,
        start: i64,
        end: i64,
    },

    #[error("no discordant evidence on reference {reference_id}")]
    EmptyTargetRegions { reference_id: i32 },

    #[error("run cancelled")]
    Cancelled,

    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
