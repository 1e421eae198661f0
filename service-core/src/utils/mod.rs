pub mod extract;
pub mod validation;

pub use extract::{Path, Query};
pub use validation::ValidatedJson;
