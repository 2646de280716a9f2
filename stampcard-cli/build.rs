use std::process::Command;

// Embeds the short git revision in `stampcard --version`.
fn main() {
    println!("cargo:rerun-if-env-changed=STAMPCARD_BUILD_SHA");

    let sha = std::env::var("STAMPCARD_BUILD_SHA")
        .ok()
        .or_else(|| {
            let out = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output().ok()?;
            out.status
                .success()
                .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=STAMPCARD_BUILD_SHA={sha}");
}
