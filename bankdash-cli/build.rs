use std::path::Path;
use std::process::Command;

/// Trimmed stdout of a successful git call in `dir`.
fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let out = Command::new("git").arg("-C").arg(dir).args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=BANKDASH_BUILD_SHA");

    // Source tarballs have no .git; packagers can stamp the revision themselves.
    let stamp = std::env::var("BANKDASH_BUILD_SHA").ok().filter(|s| !s.trim().is_empty());

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let workspace = Path::new(&manifest_dir).join("..");

    let stamp = stamp.or_else(|| {
        if let Some(git_dir) = git(&workspace, &["rev-parse", "--git-dir"]) {
            let git_dir = workspace.join(git_dir);
            println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
            println!("cargo:rerun-if-changed={}", git_dir.join("refs").display());
        }
        git(&workspace, &["describe", "--always", "--dirty", "--abbrev=8"])
    });

    println!(
        "cargo:rustc-env=BANKDASH_BUILD_SHA={}",
        stamp.as_deref().unwrap_or("unknown")
    );
}
