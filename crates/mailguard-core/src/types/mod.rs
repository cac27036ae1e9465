mod api;
mod dkim;
mod health;
mod outcome;
mod report;
mod spf;
mod zone;

pub use api::*;
pub use dkim::*;
pub use health::*;
pub use outcome::*;
pub use report::*;
pub use spf::*;
pub use zone::*;
