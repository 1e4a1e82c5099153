use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

use syntect::dumps::dump_to_uncompressed_file;
use walkdir::WalkDir;

/// Directory compiled into the binary as the default asset bundle.
const STATIC_DIR: &str = "static";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    let pack = write_syntax_pack()?;
    println!("cargo:rustc-env=SYNTAX_PACK_FILE={}", pack.display());

    watch_bundle(Path::new(STATIC_DIR));
    Ok(())
}

/// Serialize the extended grammar collection so the binary can load it
/// without parsing `.sublime-syntax` files at startup.
fn write_syntax_pack() -> Result<PathBuf, Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let pack_path = out_dir.join("syntaxes.packdump");
    let syntax_set = two_face::syntax::extra_newlines();

    dump_to_uncompressed_file(&syntax_set, &pack_path)
        .map_err(|err| format!("failed to encode syntax set: {err}"))?;
    Ok(pack_path)
}

// include_dir does not track new files on its own.
fn watch_bundle(dir: &Path) {
    println!("cargo:rerun-if-changed={}", dir.display());
    if !dir.is_dir() {
        return;
    }

    for entry in WalkDir::new(dir).into_iter().flatten() {
        println!("cargo:rerun-if-changed={}", entry.path().display());
    }
}
