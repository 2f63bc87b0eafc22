// src/cli/watch.rs - Print push updates until interrupted

use crate::client::DojoClient;
use crate::events::{ClientEvent, EventKind};
use crate::realtime::{PushUpdate, Scope};

/// `dojo watch`: subscribe to `scope` and print one line per update.
pub async fn run_watch(client: &DojoClient, scope: Scope) -> anyhow::Result<()> {
    let bus = client.events();
    bus.on(EventKind::ConnectionStatusChanged, |event| {
        if let ClientEvent::ConnectionStatusChanged { status } = event {
            eprintln!("[{}]", status);
        }
    });
    bus.on(EventKind::ReconnectFailed, |event| {
        if let ClientEvent::ReconnectFailed { scope } = event {
            eprintln!("[gave up reconnecting to {}]", scope);
        }
    });

    println!("Watching {} (Ctrl-C to stop)", scope);
    let handle = client.realtime().subscribe(scope, |update: &PushUpdate| {
        println!("{}", format_update(update));
    });

    tokio::signal::ctrl_c().await?;
    handle.unsubscribe();
    client.shutdown();
    Ok(())
}

fn format_update(update: &PushUpdate) -> String {
    let kind = update.kind.as_str();
    if update.data.is_null() {
        kind.to_string()
    } else {
        format!("{:<16} {}", kind, update.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::UpdateKind;
    use serde_json::json;

    #[test]
    fn test_format_update() {
        let update = PushUpdate::new(UpdateKind::StreamStart, json!({"id": 1}));
        assert_eq!(format_update(&update), r#"stream_start     {"id":1}"#);
        let bare = PushUpdate::new(UpdateKind::Status, serde_json::Value::Null);
        assert_eq!(format_update(&bare), "status");
    }
}
