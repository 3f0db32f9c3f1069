fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!(
        "cargo:rustc-env=CYBERHUNT_BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    // Short commit hash, when built from a git checkout
    if let Ok(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        if output.status.success() {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=CYBERHUNT_GIT_HASH={hash}");
        }
    }
}
