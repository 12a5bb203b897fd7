use routerdash_core::{TerminalBackend, normalize_command};

/// Send one console command and print what the device returned. Exits with
/// the command's status.
pub fn run(url: &str, timeout_sec: f64, words: &[String]) {
    let Some(command) = normalize_command(&words.join(" ")) else {
        super::fail("empty command");
    };
    let config = super::device_config(url, timeout_sec);
    let backend = super::make_backend(&config);
    let rt = super::runtime();

    let out = rt
        .block_on(backend.run_command(&command))
        .unwrap_or_else(|e| super::fail(e));
    log::debug!("`{}` exited with {}", out.command, out.exit_status);
    print!("{}", out.output);
    if !out.output.is_empty() && !out.output.ends_with('\n') {
        println!();
    }
    if !out.succeeded() {
        std::process::exit(out.exit_status.clamp(1, 255));
    }
}
