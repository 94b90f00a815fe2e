use stringscope_core::API_PREFIX;

pub fn run(host: &str, port: u16) {
    let base = format!("http://{host}:{port}");

    println!("🧵 Stringscope Server v{}", stringscope_core::VERSION);
    println!("   {base}");
    println!();
    println!("   Endpoints:");
    println!("     GET  /                          API index (try: curl {base})");
    println!("     GET  {API_PREFIX}/     Current state and mass spectrum");
    println!("     POST {API_PREFIX}/update  Update parameters");
    println!("     GET  /health                    Health check");
    println!();
    println!("   Examples:");
    println!("     curl {base}{API_PREFIX}/");
    println!(
        "     curl -X POST -H 'content-type: application/json' \\\n          -d '{{\"coupling\": 0.05, \"topology\": \"K3\"}}' {base}{API_PREFIX}/update"
    );
    println!();
    println!("   Watch it live: stringscope monitor --url {base}");
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(stringscope_server::run_server(host, port)) {
        eprintln!("Server error on {host}:{port}: {e}");
        std::process::exit(1);
    }
}
