//! `cmake-kits list` command

use anyhow::Result;

use crate::cli::ListArgs;
use cmake_kits::{GlobalContext, KitCatalog};

pub fn execute(ctx: &GlobalContext, args: ListArgs) -> Result<()> {
    let kits = KitCatalog::new(ctx.catalog_path()).load();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&kits)?);
        return Ok(());
    }

    if kits.is_empty() {
        eprintln!("No kits in catalog; run `cmake-kits scan`");
        return Ok(());
    }

    for kit in &kits {
        match &kit.preferred_generator {
            Some(generator) => println!("{}  [{}]", kit.name, generator.name),
            None => println!("{}", kit.name),
        }
    }
    Ok(())
}
