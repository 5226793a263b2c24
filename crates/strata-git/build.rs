fn main() {
    // libgit2 needs advapi32 for credential and registry APIs on Windows.
    if std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows") {
        println!("cargo:rustc-link-lib=advapi32");
    }
}
