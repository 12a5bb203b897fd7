use routerdash_core::{MqttBackend, MqttPanel};

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Status,
    Start,
    Stop,
}

pub fn run(url: &str, timeout_sec: f64, action: Action) {
    let config = super::device_config(url, timeout_sec);
    let backend = super::make_backend(&config);
    let rt = super::runtime();
    let mut panel = MqttPanel::new(config.device_host());

    match action {
        Action::Status => match rt.block_on(backend.mqtt_status()) {
            Ok(status) => panel.apply_status(Some(&status)),
            Err(e) => {
                log::warn!("error fetching MQTT status: {e}");
                panel.apply_status(None);
            }
        },
        Action::Start | Action::Stop => {
            let result = match action {
                Action::Start => rt.block_on(backend.start_mqtt()),
                _ => rt.block_on(backend.stop_mqtt()),
            };
            let ack = result.unwrap_or_else(|e| super::fail(e));
            let applied = match action {
                Action::Start => panel.apply_start(&ack),
                _ => panel.apply_stop(&ack),
            };
            if !applied {
                super::fail(format!("broker did not acknowledge {action:?}"));
            }
            println!("{action:?} acknowledged");
        }
    }

    println!("Broker     {}", panel.broker_address);
    println!("Status     {}", panel.status_label());
    if panel.connected {
        println!("Clients    {}", panel.clients);
        println!("Published  {}", panel.published);
        println!("Received   {}", panel.received);
    }
}
