use std::path::Path;

use anyhow::{bail, Context, Result};
use deb_builder::{load_build_config, run};

fn usage() -> &'static str {
    "Usage:\n  deb-builder build <config.toml> [--output-dir DIR]"
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, config] if cmd == "build" => build(Path::new(config), None),
        [cmd, config, flag, dir] if cmd == "build" && flag == "--output-dir" => {
            build(Path::new(config), Some(Path::new(dir)))
        }
        _ => bail!(usage()),
    }
}

fn build(config_path: &Path, output_dir: Option<&Path>) -> Result<()> {
    let config = load_build_config(config_path)
        .with_context(|| format!("loading build config '{}'", config_path.display()))?;

    // Default output lands beside the config, like the rest of the inputs.
    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => config_path.parent().unwrap_or(Path::new(".")).join("output"),
    };

    let outcome = run(&config, &output_dir)
        .with_context(|| format!("building package '{}'", config.spec.name))?;

    println!(
        "[deb-builder] done: {} (sha256 {})",
        outcome.artifact.display(),
        outcome.report.artifact_sha256
    );
    Ok(())
}
