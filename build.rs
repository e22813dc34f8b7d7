// Bindings under src/gen are checked in. Set REGENERATE_PROTOS to rebuild them
// from the trimmed Envoy protos in proto/ (requires protoc on PATH).
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-env-changed=REGENERATE_PROTOS");
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("REGENERATE_PROTOS").is_none() {
        return Ok(());
    }

    let protos = [
        "envoy/service/ext_proc/v3/external_processor.proto",
        "envoy/config/core/v3/base.proto",
    ];

    // Configure tonic-build
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .out_dir("src/gen")
        .file_descriptor_set_path("src/gen/ext_proc_descriptor.bin")
        .compile(
            &protos
                .iter()
                .map(|p| format!("proto/{}", p))
                .collect::<Vec<_>>(),
            &["proto"],
        )?;

    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
