use std::process::Command;

// Release builds outside a git checkout report the package version.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|version| !version.is_empty());

    let version = described.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    println!("cargo:rustc-env=DUALPROXY_VERSION={}", version);
}
