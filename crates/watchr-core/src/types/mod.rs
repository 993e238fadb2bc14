mod certificate;
mod chain;
mod domain;
mod registry;
mod status;

pub use certificate::*;
pub use chain::*;
pub use domain::*;
pub use registry::*;
pub use status::*;
