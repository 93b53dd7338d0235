use anyhow::{Context, Result};
use serde::Serialize;

pub fn display_json<T: Serialize>(o: T) -> Result<()> {
    let json = serde_json::to_string_pretty(&o).context("encode json")?;
    println!("{json}");
    Ok(())
}
