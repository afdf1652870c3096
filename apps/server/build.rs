use std::env::vars;

use dotenvy::dotenv;

/// Bake `TRUSTMESH_*` values from `.env` in as compile-time defaults.
fn main() {
    dotenv().ok();
    println!("cargo:rerun-if-changed=.env");

    for (k, v) in vars().filter(|(k, _)| k.starts_with("TRUSTMESH_")) {
        println!("cargo:rustc-env={k}={v}");
    }
}
