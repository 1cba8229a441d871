use anyhow::{Context, Result};

fn main() -> Result<()> {
    let version = env("CARGO_PKG_VERSION")?
        .into_string()
        .map_err(|v| anyhow::anyhow!("invalid CARGO_PKG_VERSION: {v:?}"))?;

    let rustc = rustc_version::version().context("failed to query rustc version")?;

    println!("cargo:rustc-env=PORTAL_VERSION={version}");
    println!("cargo:rustc-env=PORTAL_RUSTC_VERSION={rustc}");
    Ok(())
}

fn env(key: &str) -> Result<std::ffi::OsString> {
    println!("cargo:rerun-if-env-changed={key}");
    std::env::var_os(key).with_context(|| format!("missing '{key}' environment variable"))
}
