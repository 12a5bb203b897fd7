use routerdash_core::API_ENDPOINTS;

pub fn run() {
    println!("{:<6} {:<28} Description", "Method", "Path");
    for e in API_ENDPOINTS {
        let note = if e.stub { "  (documented, not called)" } else { "" };
        println!("{:<6} {:<28} {}{note}", e.method, e.path, e.summary);
    }
}
