//! Line console on stdin to drive the virtual devices by hand.
//!
//! ```text
//! sensor <device> <level>     set a virtual device level (on, off, 42, …)
//! switch <instance> on|off    enable or disable a motion trigger
//! status                      print the metrics of every instance
//! devices                     print every virtual device
//! ```

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use motiontrigger_adapter_virtual::VirtualRegistry;
use motiontrigger_app::event_bus::InProcessEventBus;
use motiontrigger_app::ports::DeviceRegistry;
use motiontrigger_app::runtime::EngineHandle;
use motiontrigger_domain::device::Level;
use motiontrigger_domain::id::{DeviceId, InstanceId};

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Sensor { device: DeviceId, level: Level },
    Switch { instance: InstanceId, command: String },
    Status,
    Devices,
}

impl ConsoleCommand {
    /// Parse one console line, `None` when it is not understood.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next(), words.next()) {
            ("sensor", Some(device), Some(level)) => Self::Sensor {
                device: DeviceId::new(device),
                level: parse_level(level),
            },
            ("switch", Some(instance), Some(command)) => Self::Switch {
                instance: InstanceId::new(instance),
                command: command.to_string(),
            },
            ("status", None, None) => Self::Status,
            ("devices", None, None) => Self::Devices,
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }
}

/// Numbers are read as numbers, anything else as text.
fn parse_level(input: &str) -> Level {
    input
        .parse::<f64>()
        .map_or_else(|_| Level::from(input), Level::from)
}

type Registry = Arc<VirtualRegistry<InProcessEventBus>>;

/// Read commands from stdin until end of input.
///
/// # Errors
///
/// Returns an error when stdin or stdout fail.
pub async fn run(registry: Registry, handles: &[EngineHandle]) -> std::io::Result<()> {
    let mut lines = read_lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.recv().await {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let output = match ConsoleCommand::parse(trimmed) {
            Some(command) => execute(&registry, handles, command).await,
            None => format!("unknown command: {trimmed}"),
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Forward stdin lines from a plain thread. A read pending on a runtime
/// blocking thread would hold the shutdown until the next newline.
fn read_lines() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn execute(registry: &Registry, handles: &[EngineHandle], command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::Sensor { device, level } => {
            match registry.set_level(&device, level.clone()).await {
                Ok(()) => format!("{device} = {level}"),
                Err(err) => format!("error: {err}"),
            }
        }
        ConsoleCommand::Switch { instance, command } => {
            match handles.iter().find(|handle| handle.instance() == &instance) {
                Some(handle) if handle.command(command.as_str()) => {
                    format!("{instance} <- {command}")
                }
                Some(_) => format!("error: instance {instance} stopped"),
                None => format!("error: unknown instance {instance}"),
            }
        }
        ConsoleCommand::Status => {
            let mut lines = Vec::with_capacity(handles.len());
            for handle in handles {
                let line = match handle.metrics().await {
                    Some(metrics) => format!(
                        "{}: level={} triggered={} icon={} timeout={}",
                        handle.instance(),
                        metrics.level,
                        metrics.triggered,
                        metrics.icon,
                        metrics
                            .timeout
                            .map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339()),
                    ),
                    None => format!("{}: stopped", handle.instance()),
                };
                lines.push(line);
            }
            lines.join("\n")
        }
        ConsoleCommand::Devices => {
            let mut lines = Vec::new();
            for id in registry.device_ids() {
                if let Ok(Some(device)) = registry.get(&id).await {
                    lines.push(format!(
                        "{} ({}): {}{}",
                        device.id,
                        device.device_type,
                        device.level,
                        if device.auto { " [auto]" } else { "" }
                    ));
                }
            }
            lines.join("\n")
        }
    }
}
