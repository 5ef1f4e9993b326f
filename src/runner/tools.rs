//! Invocation builders for the external tools
//!
//! Each builder turns configuration values into the exact command line the
//! pipeline drives. The tools themselves are black boxes; only their
//! argument conventions are encoded here.

use crate::runner::ToolInvocation;
use std::path::Path;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Create an isolated environment for one variant with the runtime and the
/// declared dependency packages
pub fn create_environment(
    conda: &str,
    env_name: &str,
    python: &str,
    packages: &[String],
) -> ToolInvocation {
    ToolInvocation::new(conda)
        .args(["create", "-y", "-n"])
        .arg(env_name)
        .arg(format!("python={}", python))
        .args(packages.iter().cloned())
}

/// Install the target package into the variant's environment
pub fn install_package(conda: &str, env_name: &str, source: &Path) -> ToolInvocation {
    ToolInvocation::new(conda)
        .args(["run", "-n"])
        .arg(env_name)
        .args(["pip", "install"])
        .arg(path_arg(source))
}

/// Run the configured verification command inside the environment
pub fn verify_command(
    conda: &str,
    env_name: &str,
    command: &[String],
    source: &Path,
) -> ToolInvocation {
    ToolInvocation::new(conda)
        .args(["run", "-n"])
        .arg(env_name)
        .args(command.iter().cloned())
        .cwd(source)
}

/// Build a platform-tagged wheel into the given dist directory
///
/// The dist directory is per-variant so parallel matrix jobs never write
/// into each other's output.
pub fn build_wheel(
    conda: &str,
    env_name: &str,
    source: &Path,
    platform_tag: &str,
    dist_dir: &Path,
) -> ToolInvocation {
    ToolInvocation::new(conda)
        .args(["run", "-n"])
        .arg(env_name)
        .args(["python", "setup.py", "bdist_wheel"])
        .args(["--plat-name", platform_tag])
        .arg("--dist-dir")
        .arg(path_arg(dist_dir))
        .cwd(source)
}

/// Invoke the configured credential helper; it prints the credentials file
/// path on stdout
pub fn resolve_credentials(helper: &[String]) -> ToolInvocation {
    let mut inv = ToolInvocation::new(&helper[0]);
    for arg in &helper[1..] {
        inv = inv.arg(arg);
    }
    inv
}

/// Upload every collected wheel to the feed in a single invocation
pub fn upload_wheels(
    twine: &str,
    feed: &str,
    pypirc: &Path,
    wheels: &[std::path::PathBuf],
) -> ToolInvocation {
    ToolInvocation::new(twine)
        .arg("upload")
        .args(["--config-file", &path_arg(pypirc)])
        .args(["-r", feed])
        .env("PYPIRC_PATH", path_arg(pypirc))
        .args(wheels.iter().map(|w| path_arg(w)))
}
