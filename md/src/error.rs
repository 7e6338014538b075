use thiserror::Error;

#[derive(Error, Debug)]
pub enum MdError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Inconsistent system size: {n_atoms} atoms at density {density} need box side {expected}, got {box_length}")]
    InconsistentBox {
        n_atoms: usize,
        density: f64,
        box_length: f64,
        expected: f64,
    },

    #[error("Cutoff {cutoff} exceeds half the box side ({half_box}); minimum image is not valid")]
    CutoffTooLarge { cutoff: f64, half_box: f64 },

    #[error("Atom count mismatch: expected {expected}, found {found}")]
    AtomCountMismatch { expected: usize, found: usize },

    #[error("An fcc lattice needs 4*k^3 atoms, got {n_atoms}")]
    LatticeSize { n_atoms: usize },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yml::Error),

    // File I/O errors
    #[error("Failed to access file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot '{path}' at line {line}: {reason}")]
    Snapshot {
        path: String,
        line: usize,
        reason: String,
    },

    // Physics errors
    #[error("Particle overlap between atoms {i} and {j} (r = {distance:.4})")]
    Overlap { i: usize, j: usize, distance: f64 },

    #[error("Non-finite {quantity} encountered at step {step}")]
    NonFinite { quantity: &'static str, step: usize },
}

pub type Result<T> = std::result::Result<T, MdError>;
