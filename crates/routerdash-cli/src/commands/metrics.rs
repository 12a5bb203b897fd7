use routerdash_core::{DashboardEvent, DashboardModel, MetricsBackend};

pub fn run(url: &str, timeout_sec: f64, json: bool) {
    let config = super::device_config(url, timeout_sec);
    let backend = super::make_backend(&config);
    let rt = super::runtime();

    let snapshot = match rt.block_on(backend.fetch_metrics()) {
        Ok(s) => s,
        Err(e) => super::fail(e),
    };

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(s) => println!("{s}"),
            Err(e) => super::fail(e),
        }
        return;
    }

    let mut model = DashboardModel::default();
    model.apply(DashboardEvent::Metrics(snapshot));

    println!("Device     {}", backend.base_url());
    println!("CPU        {}", model.cpu.text);
    println!("Memory     {:<8} {}", model.memory.text, model.memory.details);
    println!("Storage    {:<8} {}", model.storage.text, model.storage.details);
    println!("Download   {}", model.bandwidth.download_text);
    println!("Upload     {}", model.bandwidth.upload_text);
    println!("Internet   {}", model.internet.label());
    println!("Ultima     {}", model.ultima_server.label());
}
