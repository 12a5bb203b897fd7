use routerdash_core::{API_ENDPOINTS, ServerConfig};

pub fn run(host: &str, port: u16, seed: Option<u64>) {
    let config = ServerConfig {
        host: host.to_string(),
        port,
    };
    let base = format!("http://{}", config.addr());

    println!("routerdash mock device v{}", routerdash_core::VERSION);
    println!("   {base}");
    println!();
    println!("   Endpoints:");
    for e in API_ENDPOINTS.iter().filter(|e| !e.stub) {
        println!("     {:<5} {:<20} {}", e.method, e.path, e.summary);
    }
    println!();
    println!("   Examples:");
    println!("     curl {base}/api/metrics");
    println!("     curl -X POST {base}/api/mqtt/start");
    println!("     routerdash dashboard --url http://127.0.0.1:{port}");
    println!();

    let rt = super::runtime();
    if let Err(e) = rt.block_on(routerdash_server::run_server(&config, seed)) {
        super::fail(format!("server on {}: {e}", config.addr()));
    }
}
