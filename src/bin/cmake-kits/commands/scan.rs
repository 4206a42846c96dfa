//! `cmake-kits scan` command

use std::time::Duration;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::ScanArgs;
use cmake_kits::ops::scan_and_save_async;
use cmake_kits::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: ScanArgs) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Scanning for kits...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let handle = scan_and_save_async(ctx)?;
    let kits = handle
        .join()
        .map_err(|_| anyhow!("kit scan thread panicked"))?;

    spinner.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&kits)?);
        return Ok(());
    }

    if kits.is_empty() {
        eprintln!("No kits found");
    } else {
        for kit in &kits {
            println!("{}", kit.name);
        }
        eprintln!(
            "     Found {} kit(s), saved to {}",
            kits.len(),
            ctx.catalog_path().display()
        );
    }
    Ok(())
}
