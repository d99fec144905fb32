#![allow(dead_code)]

pub mod command;
pub mod file;

const TMPDIR: &str = "../playground";

pub fn redirect_temp_dir() {
    unsafe {
        std::env::set_var("TMPDIR", TMPDIR);
    }

    // Ensure the TMPDIR exists
    if !std::path::Path::new(TMPDIR).exists() {
        std::fs::create_dir_all(TMPDIR).expect("Failed to create TMPDIR");
    }
}

/// A syntactically valid LFS pointer file for `content`
pub fn lfs_pointer_for(content: &str) -> (String, String) {
    use sha2::{Digest, Sha256};

    let oid = hex::encode(Sha256::digest(content.as_bytes()));
    let pointer = format!(
        "version https://git-lfs.github.com/spec/v1\noid sha256:{oid}\nsize {}\n",
        content.len()
    );

    (oid, pointer)
}
