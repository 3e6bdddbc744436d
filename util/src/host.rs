//! Host environment utility functions

use std::{env, path::PathBuf};

/// Name of the environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "WUC_SW_ROOT";

/// Get the software root directory, which contains the `params` and `sessions` directories.
pub fn get_wuc_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
