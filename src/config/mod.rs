mod accounts;
mod loader;

pub use accounts::{find_group, load_account_groups};
#[allow(unused_imports)]
pub use loader::{Config, RunSettings, TimeoutConfig};
