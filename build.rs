use std::{env, fs, path::Path, process::Command};

use anyhow::{anyhow, Result};

fn is_exist(dir: &str) -> bool {
    fs::metadata(dir).is_ok()
}

fn join(root: &str, next: &str) -> String {
    Path::new(root).join(next).to_str().unwrap().to_string()
}

fn exec(command: &str, work_dir: &str) -> Result<()> {
    let shell = if cfg!(windows) { "powershell" } else { "bash" };
    let flag = if cfg!(windows) { "-command" } else { "-c" };

    let status = Command::new(shell)
        .args([flag, command])
        .current_dir(work_dir)
        .status()?;

    if !status.success() {
        return Err(anyhow!("`{command}` failed in {work_dir}"));
    }

    Ok(())
}

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=./build.rs");

    if env::var("DOCS_RS").is_ok() {
        return Ok(());
    }

    if which::which("cmake").is_err() {
        panic!(
            "cmake is required to build the vendored SRT library. \
             On debian/ubuntu: `sudo apt install cmake`. \
             On Windows, install it from the official cmake website."
        );
    }

    let out_dir = env::var("OUT_DIR")?;
    let srt_dir = join(&out_dir, "srt");

    if !is_exist(&srt_dir) {
        exec(
            "git clone --branch v1.5.3 https://github.com/Haivision/srt",
            &out_dir,
        )?;
    }

    build_library(&srt_dir)?;

    Ok(())
}

#[cfg(target_os = "windows")]
fn build_library(srt_dir: &str) -> Result<()> {
    if !is_exist(&join(srt_dir, "./Release/srt_static.lib")) {
        exec(
            "cmake -DENABLE_APPS=OFF -DENABLE_SHARED=OFF -DENABLE_ENCRYPTION=OFF \
             -DENABLE_UNITTESTS=OFF .",
            srt_dir,
        )?;
        exec("cmake --build . --config Release", srt_dir)?;
    }

    println!(
        "cargo:rustc-link-search=all={}",
        join(srt_dir, "./Release")
    );
    println!("cargo:rustc-link-lib=srt_static");

    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn build_library(srt_dir: &str) -> Result<()> {
    if !is_exist(&join(srt_dir, "libsrt.a")) {
        exec(
            "./configure --enable-shared=OFF --enable-apps=OFF --enable-encryption=OFF",
            srt_dir,
        )?;
        exec("make", srt_dir)?;
    }

    println!("cargo:rustc-link-search=all={}", srt_dir);
    println!("cargo:rustc-link-lib=srt");

    if cfg!(target_os = "linux") {
        println!("cargo:rustc-link-lib=stdc++");
    } else {
        println!("cargo:rustc-link-lib=c++");
    }

    Ok(())
}
