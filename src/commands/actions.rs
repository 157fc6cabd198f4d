use anyhow::Result;

use crate::actions::{ActionKind, ActionPayloadBuilder};
use crate::models::Selection;

pub async fn execute() -> Result<()> {
    println!("{:<24} {:<30} {:<8} {}", "ACTION", "ENDPOINT", "ITEMS", "SELECTION");
    println!("{}", "-".repeat(72));

    for kind in ActionKind::all() {
        let selection = match kind.selection() {
            Selection::InOrder => "in order",
            Selection::Pooled => "pooled",
        };
        println!(
            "{:<24} {:<30} {:<8} {}",
            kind.name(),
            kind.endpoint(),
            kind.item_shape().to_string(),
            selection
        );
    }

    Ok(())
}
