/// stdio Transport (C5)
///
/// Frame = one JSON object per line on stdin; responses are written one
/// JSON object per line to stdout. Exactly one session is hosted per
/// process invocation; its id is synthesized. EOF on stdin moves the
/// session to `Closing` (spec §4.5). Generalizes the teacher's
/// `run_server_stdio`, which processed requests strictly one at a time;
/// here each line is dispatched on its own task so `$/cancelRequest`
/// notifications can interleave with a long-running `tools/call` exactly
/// as spec §5 requires ("no per-request thread... asynchronous or
/// lightweight-task constructs are expected").
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::rpc::dispatcher;
use crate::rpc::envelope::Envelope;
use crate::session::manager::OutboundMessage;
use crate::transport::AppContext;

pub async fn run(ctx: AppContext) -> std::io::Result<()> {
    info!(
        name = %ctx.config.server_name,
        version = %ctx.config.server_version,
        "MCP server starting (stdio transport)"
    );

    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);
    let session_id = format!("stdio-{}", Uuid::new_v4());
    let session = ctx.sessions.create(session_id.clone(), tx);

    let stdout = tokio::io::stdout();
    let mut writer = BufWriter::with_capacity(8192, stdout);
    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                OutboundMessage::Frame(value) => {
                    let Ok(line) = serde_json::to_string(&value) else { continue };
                    if writer.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                    if writer.write_all(b"\n").await.is_err() {
                        break;
                    }
                    if writer.flush().await.is_err() {
                        break;
                    }
                }
                OutboundMessage::Close => break,
            }
        }
    });

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::with_capacity(8192, stdin).lines();
    let mut in_flight = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: Result<Envelope, _> = serde_json::from_str(&line);
        let envelope = match parsed {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "parse error on stdio frame");
                if let Ok(partial) = serde_json::from_str::<serde_json::Value>(&line) {
                    if let Some(id) = partial.get("id").cloned() {
                        let response = crate::rpc::envelope::Response::err(
                            id,
                            crate::core::error::codes::PARSE_ERROR,
                            format!("parse error: {err}"),
                        );
                        if let Ok(value) = serde_json::to_value(&response) {
                            session.send(value).await;
                        }
                    }
                }
                continue;
            }
        };

        let session = session.clone();
        let registry = ctx.registry.clone();
        let index = ctx.index.clone();
        let config = ctx.config.clone();
        in_flight.push(tokio::spawn(async move {
            if let Some(response) = dispatcher::dispatch(&session, &registry, &index, &config, envelope).await {
                if let Ok(value) = serde_json::to_value(&response) {
                    session.send(value).await;
                }
            }
        }));
        in_flight.retain(|h: &tokio::task::JoinHandle<()>| !h.is_finished());
    }

    for handle in in_flight {
        let _ = handle.await;
    }
    session.close().await;
    if let Err(err) = writer_task.await {
        error!(error = %err, "stdio writer task panicked");
    }
    ctx.sessions.remove(&session_id).await;
    info!("stdio session closed (EOF)");
    Ok(())
}
