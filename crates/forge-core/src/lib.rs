pub mod blueprint;
pub mod cookbook;
pub mod diff;
pub mod error;
pub mod git;
pub mod io;
pub mod marketplace;
pub mod mcp;
pub mod paths;
pub mod plugins;
pub mod provisioner;
pub mod radar;
pub mod scorer;
pub mod session;
pub mod skill;
pub mod sync;
pub mod theme;
pub mod vault;

pub use error::{ForgeError, Result};
