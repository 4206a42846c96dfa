//! Scan the host and persist the catalog.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};

use crate::kits::instance::{default_locator, InstanceLocator};
use crate::kits::msvc::BatchActivation;
use crate::kits::{CompilerProbe, EnvironmentBootstrapper, KitInfo, KitScanner, VsInstance};
use crate::ops::catalog::KitCatalog;
use crate::util::paths::PathSearch;
use crate::util::process::{CommandRunner, SystemRunner};
use crate::util::GlobalContext;

/// Installed Visual Studio instances. A failing locator means none.
pub fn query_instances(search: &PathSearch, runner: Arc<dyn CommandRunner>) -> Vec<VsInstance> {
    instances_from(default_locator(search, runner).as_ref())
}

/// Instances reported by `locator`, or none when it fails.
pub fn instances_from(locator: &dyn InstanceLocator) -> Vec<VsInstance> {
    match locator.instances() {
        Ok(instances) => {
            tracing::debug!("{} Visual Studio instances", instances.len());
            instances
        }
        Err(e) => {
            tracing::warn!("{}", e);
            Vec::new()
        }
    }
}

/// A bootstrapper that activates through real child processes.
pub fn bootstrapper(instances: Vec<VsInstance>, runner: Arc<dyn CommandRunner>) -> EnvironmentBootstrapper {
    EnvironmentBootstrapper::new(instances, Arc::new(BatchActivation::new(runner)))
}

/// A scanner wired to the host using the context's configuration.
pub fn host_scanner(ctx: &GlobalContext, instances: Vec<VsInstance>, runner: Arc<dyn CommandRunner>) -> KitScanner {
    let search = ctx.search_path();
    let probe = CompilerProbe::new(runner.clone(), search.platform());
    KitScanner::new(
        search,
        probe,
        bootstrapper(instances, runner),
        ctx.config().scan.scan_options(),
    )
}

/// Run `scanner` and save the result to `catalog`. A failed save is
/// logged; the kits are returned either way.
pub fn scan_into(scanner: &KitScanner, catalog: &KitCatalog) -> Vec<KitInfo> {
    let kits = scanner.scan_all();
    catalog.save(&kits);
    kits
}

/// Scan the host and rewrite the context's catalog.
pub fn scan_and_save(ctx: &GlobalContext) -> Vec<KitInfo> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let instances = query_instances(&ctx.search_path(), runner.clone());
    let scanner = host_scanner(ctx, instances, runner);
    scan_into(&scanner, &KitCatalog::new(ctx.catalog_path()))
}

/// [`scan_and_save`] on a worker thread.
///
/// Instances are queried on the calling thread before the worker starts.
/// Dropping the handle abandons the result but not the scan.
pub fn scan_and_save_async(ctx: &GlobalContext) -> Result<JoinHandle<Vec<KitInfo>>> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let instances = query_instances(&ctx.search_path(), runner.clone());
    let scanner = host_scanner(ctx, instances, runner);
    spawn_scan(scanner, KitCatalog::new(ctx.catalog_path()))
}

/// Run a prepared scanner on a worker thread.
pub fn spawn_scan(scanner: KitScanner, catalog: KitCatalog) -> Result<JoinHandle<Vec<KitInfo>>> {
    std::thread::Builder::new()
        .name("kit-scan".to_string())
        .spawn(move || scan_into(&scanner, &catalog))
        .context("failed to start scan thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kits::scanner::ScanOptions;
    use crate::test_support::{touch, FakeActivation, FakeOutput, FakeRunner, GCC_LINUX_BANNER};
    use crate::util::paths::Platform;
    use tempfile::TempDir;

    fn gcc_scanner(bin: &std::path::Path) -> KitScanner {
        touch(bin, "gcc");
        let runner = FakeRunner::new();
        runner.expect_contains("gcc", FakeOutput::stderr(0, GCC_LINUX_BANNER));
        KitScanner::new(
            PathSearch::from_dirs(vec![bin.to_path_buf()], Platform::Unix),
            CompilerProbe::new(Arc::new(runner), Platform::Unix),
            EnvironmentBootstrapper::new(Vec::new(), Arc::new(FakeActivation::new())),
            ScanOptions::default(),
        )
    }

    #[test]
    fn test_scan_into_saves_catalog() {
        let tmp = TempDir::new().unwrap();
        let catalog = KitCatalog::new(tmp.path().join("kits-cache-v1.json"));

        let kits = scan_into(&gcc_scanner(&tmp.path().join("bin")), &catalog);
        assert_eq!(kits.len(), 1);
        assert_eq!(catalog.load(), kits);
    }

    #[test]
    fn test_spawn_scan_runs_off_thread() {
        let tmp = TempDir::new().unwrap();
        let catalog = KitCatalog::new(tmp.path().join("kits-cache-v1.json"));

        let handle = spawn_scan(gcc_scanner(&tmp.path().join("bin")), catalog.clone()).unwrap();
        assert_eq!(handle.thread().name(), Some("kit-scan"));
        let kits = handle.join().unwrap();
        assert_eq!(kits[0].name, "GCC 12.2.0 (x86_64-linux-gnu)");
        assert_eq!(catalog.load().len(), 1);
    }

    #[test]
    fn test_instances_from_listed_locator() {
        let tmp = TempDir::new().unwrap();
        let listed = vec![crate::test_support::fake_vs_install(tmp.path(), "17.8.34330.188", &[])];

        assert_eq!(instances_from(&listed), listed);
    }

    #[test]
    fn test_no_instances_off_windows() {
        let search = PathSearch::from_dirs(Vec::new(), Platform::Unix);
        assert!(query_instances(&search, Arc::new(FakeRunner::new())).is_empty());
    }
}
