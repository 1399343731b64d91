//! Newline-delimited JSON host loop
//!
//! Each input line is one message. Every emission is written as one output
//! line: a single message as an object, a batch as an array.

use anyhow::{Context, Result};
use qgate_engine::{GateError, GateHandle};
use qgate_types::{GateStatus, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{info, warn};

/// Counters for one host run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostStats {
    pub received: u64,
    pub emitted: u64,
    pub rejected: u64,
}

/// Feed every line of `input` to `gate`, writing emissions to `output`,
/// until the input ends.
pub async fn pump<R, W>(gate: &GateHandle, input: R, mut output: W) -> Result<HostStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = HostStats::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("reading input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.received += 1;

        let message = match serde_json::from_str::<serde_json::Value>(line)
            .map_err(anyhow::Error::from)
            .and_then(|value| Message::from_value(value).map_err(anyhow::Error::from))
        {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Input line is not a JSON object, skipped");
                stats.rejected += 1;
                continue;
            }
        };

        match gate.dispatch(message).await {
            Ok(Some(emission)) => {
                let mut encoded = serde_json::to_vec(&emission)?;
                encoded.push(b'\n');
                output.write_all(&encoded).await.context("writing output")?;
                stats.emitted += 1;
            }
            Ok(None) => {}
            Err(GateError::Closed(name)) => {
                anyhow::bail!("gate {} stopped while input remained", name);
            }
            Err(e) => {
                warn!(gate = %gate.name(), error = %e, "Message not handled");
                stats.rejected += 1;
            }
        }
    }

    output.flush().await.context("flushing output")?;
    Ok(stats)
}

/// Log every status change of a gate until it stops.
pub async fn watch_status(name: String, mut status: watch::Receiver<GateStatus>) {
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().clone();
        info!(
            gate = %name,
            status = %current.text,
            fill = ?current.fill,
            shape = ?current.shape,
            "Gate status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qgate_engine::GateBuilder;
    use qgate_types::{GateConfig, Mode};
    use serde_json::Value;

    async fn run(config: GateConfig, input: &str) -> (HostStats, Vec<Value>) {
        let gate = GateBuilder::new(config).spawn().await.unwrap();
        let mut output = Vec::new();
        let stats = pump(&gate, input.as_bytes(), &mut output).await.unwrap();
        let lines = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        (stats, lines)
    }

    #[tokio::test]
    async fn open_gate_echoes_each_message() {
        let input = "{\"_msgid\":\"a\",\"payload\":1}\n\n{\"_msgid\":\"b\",\"payload\":2}\n";
        let (stats, lines) = run(GateConfig::default(), input).await;

        assert_eq!(stats.received, 2);
        assert_eq!(stats.emitted, 2);
        assert_eq!(lines[1]["payload"], 2);
    }

    #[tokio::test]
    async fn released_queue_is_one_array_line() {
        let config = GateConfig {
            default_mode: Mode::Queueing,
            ..GateConfig::default()
        };
        let input = concat!(
            "{\"payload\":1}\n",
            "{\"payload\":2}\n",
            "{\"topic\":\"control\",\"payload\":\"open\"}\n",
        );
        let (stats, lines) = run(config, input).await;

        assert_eq!(stats.emitted, 1);
        let batch = lines[0].as_array().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0]["payload"], 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_counted_and_skipped() {
        let input = "not json\n[1,2]\n{\"payload\":3}\n";
        let (stats, lines) = run(GateConfig::default(), input).await;

        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.emitted, 1);
        assert_eq!(lines.len(), 1);
    }
}
