//! Filesystem fixtures: fake compilers and fake Visual Studio layouts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::kits::instance::VsInstance;

/// `-v` banner of a native Linux GCC.
pub const GCC_LINUX_BANNER: &str = "Using built-in specs.\n\
    COLLECT_GCC=gcc\n\
    Target: x86_64-linux-gnu\n\
    Thread model: posix\n\
    gcc version 12.2.0 (Debian 12.2.0-14) \n";

/// `-v` banner of a MinGW-w64 GCC.
pub const GCC_MINGW_BANNER: &str = "Using built-in specs.\n\
    COLLECT_GCC=gcc.exe\n\
    Target: x86_64-w64-mingw32\n\
    Thread model: posix\n\
    gcc version 13.2.0 (MinGW-W64 x86_64-ucrt-posix-seh) \n";

/// `-v` banner of a Linux Clang.
pub const CLANG_LINUX_BANNER: &str = "Ubuntu clang version 15.0.7\n\
    Target: x86_64-pc-linux-gnu\n\
    Thread model: posix\n\
    InstalledDir: /usr/bin\n";

/// `-v` banner of a Clang targeting MSVC.
pub const CLANG_MSVC_BANNER: &str = "clang version 17.0.3\n\
    Target: x86_64-pc-windows-msvc\n\
    Thread model: posix\n\
    InstalledDir: C:\\Program Files\\LLVM\\bin\n";

/// `-v` banner of a 32-bit clang-cl.
pub const CLANG_CL_X86_BANNER: &str = "clang version 16.0.5\n\
    Target: i686-pc-windows-msvc\n\
    Thread model: posix\n";

/// Write an executable shell script named `name` into `dir` that prints
/// `banner` to stderr and exits 0.
#[cfg(unix)]
pub fn write_fake_compiler(dir: &Path, name: &str, banner: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let script = format!("#!/bin/sh\ncat >&2 <<'BANNER_END'\n{}\nBANNER_END\n", banner);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Create an empty file at `dir/name`, creating parents.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, "").unwrap();
    path
}

/// Lay out a fake Visual Studio install under `root` containing `files`
/// (relative, `/`-separated) and describe it as an instance.
pub fn fake_vs_install(root: &Path, version: &str, files: &[&str]) -> VsInstance {
    fs::create_dir_all(root.join("Common7").join("Tools")).unwrap();
    for file in files {
        touch(root, file);
    }
    let label = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vs".to_string());
    let major = version.split('.').next().unwrap_or(version);
    VsInstance::new(
        format!("{}-{}", label, version),
        root,
        version,
        format!("Visual Studio {}", major),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_vs_install_layout() {
        let tmp = tempfile::TempDir::new().unwrap();
        let inst = fake_vs_install(tmp.path(), "14.0", &["Common7/IDE/devenv.exe"]);
        assert!(inst.has_ide());
        assert!(inst.common_tools_dir().is_dir());
        assert_eq!(inst.display_name, "Visual Studio 14");
    }
}
