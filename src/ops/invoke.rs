//! Using a catalogued kit: resolving its environment and running CMake.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::kits::{BuildOptions, CMakeEnv, ConfigureOptions, Environment, EnvironmentBootstrapper, Kit};
use crate::kits::instance::{default_locator, InstanceLocator};
use crate::ops::catalog::KitCatalog;
use crate::ops::scan::{bootstrapper, instances_from};
use crate::util::paths::PathSearch;
use crate::util::process::{CommandRunner, SystemRunner};
use crate::util::GlobalContext;

/// A kit looked up from the catalog together with what it needs to
/// activate.
pub struct KitSession {
    kit: Kit,
    search: PathSearch,
    bootstrapper: EnvironmentBootstrapper,
}

impl KitSession {
    /// Look `name` up in the context's catalog.
    pub fn open(ctx: &GlobalContext, name: &str) -> Result<Self> {
        let search = ctx.search_path();
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        let locator = default_locator(&search, runner.clone());
        Self::open_with(ctx, name, search, locator.as_ref(), runner)
    }

    /// [`KitSession::open`] with an explicit search path and locator.
    ///
    /// Instances are queried for every kit, not just MSVC ones: the only
    /// CMake on a host may be the one bundled with Visual Studio.
    pub fn open_with(
        ctx: &GlobalContext,
        name: &str,
        search: PathSearch,
        locator: &dyn InstanceLocator,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let catalog = KitCatalog::new(ctx.catalog_path());
        let info = catalog.find(name).with_context(|| {
            format!(
                "no kit named '{}' in {} (run `cmake-kits scan` first)",
                name,
                catalog.path().display()
            )
        })?;
        let kit = Kit::new(info)?;

        let instances = instances_from(locator);
        Ok(Self::with_parts(kit, search, bootstrapper(instances, runner)))
    }

    pub fn with_parts(kit: Kit, search: PathSearch, bootstrapper: EnvironmentBootstrapper) -> Self {
        KitSession {
            kit,
            search,
            bootstrapper,
        }
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    /// The kit's environment on top of `base`.
    pub fn environment_over(&self, base: &Environment) -> Environment {
        self.kit
            .merge_environment(base, &self.bootstrapper, self.search.platform())
    }

    /// The kit's environment on top of this process's environment.
    pub fn environment(&self) -> Environment {
        let base: Environment = std::env::vars().collect();
        self.environment_over(&base)
    }

    /// CMake to run: the configured override, else discovery.
    pub fn cmake(&self, ctx: &GlobalContext) -> Result<CMakeEnv> {
        let cmake = CMakeEnv::locate(
            &self.search,
            self.bootstrapper.instances(),
            ctx.config().cmake.path.as_deref(),
        )?;
        Ok(cmake)
    }

    /// Configure `source_dir` into `build_dir`; returns CMake's exit code.
    pub fn configure(
        &self,
        ctx: &GlobalContext,
        source_dir: &Path,
        build_dir: &Path,
        options: &ConfigureOptions,
    ) -> Result<i32> {
        let cmake = self.cmake(ctx)?;
        let code = cmake.configure(&self.kit, &self.environment(), source_dir, build_dir, options)?;
        Ok(code)
    }

    /// Build `build_dir`; returns CMake's exit code.
    pub fn build(&self, ctx: &GlobalContext, build_dir: &Path, options: &BuildOptions) -> Result<i32> {
        let cmake = self.cmake(ctx)?;
        let code = cmake.build(&self.environment(), build_dir, options)?;
        Ok(code)
    }
}
