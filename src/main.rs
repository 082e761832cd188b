#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;

    let config = vmu_host::config::Config::parse();
    vmu_host::host::run(&config)
}

// the browser host is the library's `WebApp`
#[cfg(target_arch = "wasm32")]
fn main() {}
