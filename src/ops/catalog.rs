//! Kit catalog I/O.
//!
//! The catalog is a JSON array of [`KitInfo`] records. A missing or corrupt
//! file reads as an empty catalog, and a failed save leaves the previous
//! file untouched.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::kits::{KitError, KitInfo};
use crate::util::fs::write_atomic;

/// The persisted list of discovered kits.
#[derive(Debug, Clone)]
pub struct KitCatalog {
    path: PathBuf,
}

impl KitCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        KitCatalog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the catalog, reporting why it could not be read.
    pub fn try_load(&self) -> Result<Vec<KitInfo>, KitError> {
        let file = File::open(&self.path).map_err(|e| self.error(e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| self.error(e))
    }

    /// Read the catalog; anything unreadable is an empty catalog.
    pub fn load(&self) -> Vec<KitInfo> {
        if !self.path.exists() {
            tracing::debug!("no kit catalog at {}", self.path.display());
            return Vec::new();
        }
        self.try_load().unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Vec::new()
        })
    }

    /// Rewrite the whole catalog.
    pub fn try_save(&self, kits: &[KitInfo]) -> Result<(), KitError> {
        let json = serde_json::to_vec_pretty(kits).map_err(|e| self.error(e))?;
        write_atomic(&self.path, &json).map_err(|e| self.error(format!("{:#}", e)))?;
        tracing::info!("saved {} kits to {}", kits.len(), self.path.display());
        Ok(())
    }

    /// Rewrite the whole catalog; a failure is logged and otherwise
    /// ignored. Returns whether the catalog was written.
    pub fn save(&self, kits: &[KitInfo]) -> bool {
        match self.try_save(kits) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    /// Look a kit up by exact name.
    pub fn find(&self, name: &str) -> Option<KitInfo> {
        self.load().into_iter().find(|k| k.name == name)
    }

    fn error(&self, reason: impl ToString) -> KitError {
        KitError::Persistence {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kits::{Arch, GeneratorInfo};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_kits() -> Vec<KitInfo> {
        let mut gcc = KitInfo::named("GCC 12.2.0 (x86_64-linux-gnu)");
        let mut compilers = BTreeMap::new();
        compilers.insert("C".to_string(), PathBuf::from("/usr/bin/gcc"));
        gcc.compilers = Some(compilers);
        gcc.preferred_generator = Some(GeneratorInfo::ninja());

        let mut msvc = KitInfo::named("Visual Studio Community 2022 - x64_arm64");
        msvc.instance_id = Some("2a7b3c1d".to_string());
        msvc.host_arch = Some(Arch::X64);
        msvc.target_arch = Some(Arch::Arm64);
        msvc.additional_paths = Some(vec![PathBuf::from("/opt/bin")]);
        msvc.toolchain_file = Some(PathBuf::from("/opt/toolchain.cmake"));

        vec![gcc, msvc]
    }

    #[test]
    fn test_save_then_load_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let catalog = KitCatalog::new(tmp.path().join("cfg").join("kits-cache-v1.json"));
        let kits = sample_kits();

        assert!(catalog.save(&kits));
        assert_eq!(catalog.load(), kits);
        assert_eq!(
            catalog.find("GCC 12.2.0 (x86_64-linux-gnu)").unwrap().compiler("C"),
            Some(&PathBuf::from("/usr/bin/gcc"))
        );
        assert!(catalog.find("nope").is_none());
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let tmp = TempDir::new().unwrap();
        let catalog = KitCatalog::new(tmp.path().join("kits-cache-v1.json"));
        catalog.save(&[KitInfo::named("bare")]);

        let text = std::fs::read_to_string(catalog.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!([{ "name": "bare" }]));
    }

    #[test]
    fn test_missing_catalog_is_empty() {
        let tmp = TempDir::new().unwrap();
        let catalog = KitCatalog::new(tmp.path().join("kits-cache-v1.json"));
        assert!(catalog.load().is_empty());
        assert!(matches!(catalog.try_load(), Err(KitError::Persistence { .. })));
    }

    #[test]
    fn test_corrupt_catalog_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kits-cache-v1.json");
        std::fs::write(&path, "[{\"name\": ").unwrap();

        assert!(KitCatalog::new(&path).load().is_empty());
    }

    #[test]
    fn test_failed_save_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let catalog = KitCatalog::new(blocker.join("kits-cache-v1.json"));

        assert!(!catalog.save(&sample_kits()));
    }
}
