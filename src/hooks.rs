//! Lifecycle hook scripts: `DEBIAN/postinst` and `DEBIAN/postrm`.
//!
//! Both scripts are rendered from the same [`PackageSpec`] the tree builder
//! used, so the path postrm deletes is the install root that was actually
//! staged. Both are idempotent and exit 0 even when their optional sub-steps
//! fail: the package manager must never treat a cosmetic failure (a missing
//! icon-cache refresher, an offline pip index) as a broken install.

use anyhow::Result;
use std::path::Path;

use crate::config::PackageSpec;
use crate::staging::{StagingTree, CONTROL_DIR};

/// Render the post-install hook: best-effort desktop integration refresh
/// plus optional pip-only runtime dependencies.
pub fn render_postinst(spec: &PackageSpec) -> String {
    let mut out = String::new();
    out.push_str("#!/bin/sh\n");
    out.push_str(&format!("# post-install hook for {}\n", spec.name));
    out.push_str("set -u\n\n");

    out.push_str("if command -v gtk-update-icon-cache >/dev/null 2>&1; then\n");
    out.push_str("    gtk-update-icon-cache -f /usr/share/icons/hicolor || true\n");
    out.push_str("fi\n\n");

    out.push_str("if command -v update-desktop-database >/dev/null 2>&1; then\n");
    out.push_str("    update-desktop-database /usr/share/applications || true\n");
    out.push_str("fi\n");

    if !spec.pip_packages.is_empty() {
        out.push('\n');
        out.push_str("# Runtime bindings only published on PyPI; try pip3 first,\n");
        out.push_str("# then the module form, then give up silently.\n");
        out.push_str(&format!("for pkg in {}; do\n", spec.pip_packages.join(" ")));
        out.push_str("    pip3 install \"$pkg\" >/dev/null 2>&1 \\\n");
        out.push_str("        || python3 -m pip install \"$pkg\" >/dev/null 2>&1 \\\n");
        out.push_str("        || true\n");
        out.push_str("done\n");
    }

    out.push_str("\nexit 0\n");
    out
}

/// Render the post-removal hook: on purge, delete the install root; any
/// other trigger (remove, upgrade, abort-*) leaves it untouched.
pub fn render_postrm(spec: &PackageSpec) -> String {
    format!(
        "#!/bin/sh\n\
         # post-removal hook for {name}\n\
         set -u\n\
         \n\
         case \"${{1:-}}\" in\n\
         \x20   purge)\n\
         \x20       rm -rf \"{install_root}\"\n\
         \x20       ;;\n\
         esac\n\
         \n\
         exit 0\n",
        name = spec.name,
        install_root = spec.install_root.display()
    )
}

/// Write both hooks into the control directory, executable.
pub fn write_hooks(tree: &mut StagingTree, spec: &PackageSpec) -> Result<()> {
    tree.write_file(
        Path::new(CONTROL_DIR).join("postinst"),
        &render_postinst(spec),
        0o755,
    )?;
    tree.write_file(
        Path::new(CONTROL_DIR).join("postrm"),
        &render_postrm(spec),
        0o755,
    )?;
    Ok(())
}
