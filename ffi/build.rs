use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = env!("CARGO_MANIFEST_DIR");
    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        pragma_once: true,
        usize_is_size_t: true,
        documentation: true,
        ..Default::default()
    };

    let bindings = match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => bindings,
        Err(err) => {
            // Header generation must not break the library build.
            println!("cargo:warning=cbindgen: {err}");
            return;
        }
    };

    let include = Path::new(crate_dir).join("include");
    if let Err(err) = std::fs::create_dir_all(&include) {
        println!("cargo:warning=cannot create {}: {err}", include.display());
        return;
    }
    bindings.write_to_file(include.join("edupage.h"));
}
