//! `cmake-kits env` command

use anyhow::Result;

use crate::cli::EnvArgs;
use cmake_kits::kits::Environment;
use cmake_kits::ops::KitSession;
use cmake_kits::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: EnvArgs) -> Result<()> {
    let session = KitSession::open(ctx, &args.kit)?;
    let base: Environment = std::env::vars().collect();
    let env = session.environment_over(&base);

    for (key, value) in &env {
        if args.changed && base.get(key) == Some(value) {
            continue;
        }
        println!("{}={}", key, value);
    }
    Ok(())
}
