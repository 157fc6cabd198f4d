use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::models::AccountGroup;

/// Reads the account groups file: a YAML list of
/// `{accounts_name, accounts: [{token, proxy}]}`.
pub fn load_account_groups(path: &Path) -> Result<Vec<AccountGroup>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file: {:?}", path))?;
    let groups: Vec<AccountGroup> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse accounts file: {:?}", path))?;
    Ok(groups)
}

/// Picks the group called `name`, or the first group when no name is given.
pub fn find_group(groups: Vec<AccountGroup>, name: Option<&str>) -> Result<AccountGroup> {
    match name {
        Some(name) => match groups
            .into_iter()
            .find(|g| g.accounts_name.eq_ignore_ascii_case(name))
        {
            Some(group) => Ok(group),
            None => bail!("Account group '{}' not found", name),
        },
        None => match groups.into_iter().next() {
            Some(group) => Ok(group),
            None => bail!("Accounts file contains no groups"),
        },
    }
}
