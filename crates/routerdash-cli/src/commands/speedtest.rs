use std::io::Write;

use routerdash_core::bandwidth::TICK_INTERVAL;
use routerdash_core::{BandwidthTest, Phase, RandomSpeeds, TestEvent};

pub fn run(seed: Option<u64>, json: bool) {
    let speeds = match seed {
        Some(seed) => RandomSpeeds::seeded(seed),
        None => RandomSpeeds::from_os_rng(),
    };
    let mut test = BandwidthTest::new(speeds);
    if test.start().is_none() {
        super::fail("speed test already running");
    }

    let rt = super::runtime();
    let sample = rt.block_on(async {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for event in test.tick() {
                match event {
                    TestEvent::Progress {
                        phase,
                        progress,
                        current_mbps,
                    } if !json => {
                        print!("\r{:<17} {progress:>3}%  {current_mbps:>7.1} Mbps", phase.label());
                        let _ = std::io::stdout().flush();
                    }
                    TestEvent::Completed { sample } => return sample,
                    _ => {}
                }
            }
            if test.phase() == Phase::Idle {
                super::fail("speed test stopped unexpectedly");
            }
        }
    });

    let run = test.run();
    let download = run.download_mbps.unwrap_or(run.target_download_mbps);
    let upload = run.upload_mbps.unwrap_or(run.target_upload_mbps);
    if json {
        let body = serde_json::json!({
            "download_mbps": download,
            "upload_mbps": upload,
            "ping_ms": run.ping_ms,
            "history_sample": {
                "download": sample.download_mbps,
                "upload": sample.upload_mbps,
            },
        });
        println!("{body}");
    } else {
        println!();
        println!("Download   {download:.1} Mbps");
        println!("Upload     {upload:.1} Mbps");
        if let Some(ping) = run.ping_ms {
            println!("Ping       {ping} ms");
        }
    }
}
