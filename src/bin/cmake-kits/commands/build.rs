//! `cmake-kits build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use cmake_kits::kits::BuildOptions;
use cmake_kits::ops::KitSession;
use cmake_kits::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let options = BuildOptions {
        targets: args.target,
        config: args.config,
        clean_first: args.clean_first,
    };

    let session = KitSession::open(ctx, &args.kit)?;
    let code = session.build(ctx, &args.build, &options)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
