pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod solver;
pub mod sweep;
pub mod types;

pub use error::CarteiraError;
pub use types::*;

/// Standard result type for all carteira operations
pub type CarteiraResult<T> = Result<T, CarteiraError>;
