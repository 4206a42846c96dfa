//! `cmake-kits configure` command

use anyhow::Result;

use crate::cli::ConfigureArgs;
use cmake_kits::kits::{CMakeSetting, ConfigureOptions, ConfigureSettings};
use cmake_kits::ops::KitSession;
use cmake_kits::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: ConfigureArgs) -> Result<()> {
    let user_settings = args
        .define
        .iter()
        .map(|d| CMakeSetting::parse_definition(d))
        .collect::<Result<ConfigureSettings, _>>()?;
    let options = ConfigureOptions {
        user_settings,
        no_warn_unused_cli: !args.warn_unused_cli,
    };

    let session = KitSession::open(ctx, &args.kit)?;
    let code = session.configure(ctx, &args.source, &args.build, &options)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
