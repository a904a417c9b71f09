use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::{debug, info, warn};

use panelcast_gen::{GenerationError, OllamaSource, TextSource};
use panelcast_text::{encode_payload, sanitize, PanelConstraints};
use panelcast_transport::{Ack, DeliveryError, Transport};

use crate::cmd::{parse_duration, PanelArgs, TransportArgs};
use crate::exit::{generation_error, CliError, CliResult, INTERNAL, SUCCESS};

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub transport: TransportArgs,

    #[command(flatten)]
    pub panel: PanelArgs,

    /// Ollama host.
    #[arg(long, env = "OLLAMA_HOST", default_value = "http://127.0.0.1:11434")]
    pub host: String,

    /// Ollama model identifier.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "mistral:7b-instruct")]
    pub model: String,

    /// Sleep between iterations (e.g. 60s, 500ms).
    #[arg(long, env = "INTERVAL_S", default_value = "60s")]
    pub interval: String,

    /// Run a single iteration and exit.
    #[arg(long)]
    pub once: bool,
}

/// One loop iteration failed. Caught at the loop boundary, logged, and the
/// loop moves on — no iteration error is fatal.
#[derive(Debug, thiserror::Error)]
enum IterationError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

pub fn run(args: RunArgs) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let constraints = args.panel.constraints()?;
    let mut session = args.transport.open()?;
    let source = OllamaSource::new(&args.host, &args.model)
        .map_err(|err| generation_error("generation setup failed", err))?;

    info!(
        transport = session.name(),
        host = %args.host,
        model = %args.model,
        interval = ?interval,
        "panelcast loop starting"
    );

    warm_up(session.as_mut());

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup: {err}")))?;
    }

    while !shutdown.load(Ordering::SeqCst) {
        match iteration(&source, session.as_mut(), &constraints) {
            Ok(ack) => info!(%ack, "delivered"),
            Err(err) => warn!(error = %err, "iteration failed"),
        }

        if args.once {
            break;
        }
        sleep_until_shutdown(interval, &shutdown);
    }

    // Best-effort teardown; never surfaces.
    session.close();
    info!("panelcast loop stopped");
    Ok(SUCCESS)
}

/// Establish the session before the loop so the slow first BLE scan or the
/// serial reset settle happens ahead of the first message. Not fatal: the
/// first delivery will retry on its own.
fn warm_up(session: &mut dyn Transport) {
    if let Err(err) = session.prepare() {
        warn!(transport = session.name(), error = %err, "session warm-up failed");
    }
}

/// Fetch, shape, deliver. Errors bubble to the loop boundary; a malformed
/// generation result never reaches the transport, so it cannot corrupt
/// session state.
fn iteration<S, T>(
    source: &S,
    transport: &mut T,
    constraints: &PanelConstraints,
) -> Result<Ack, IterationError>
where
    S: TextSource + ?Sized,
    T: Transport + ?Sized,
{
    let raw = source.generate()?;
    let lines = sanitize(&raw, constraints);
    debug!(lines = lines.len(), "sanitized model output");
    let payload = encode_payload(&lines);
    let ack = transport.deliver(&payload)?;
    Ok(ack)
}

fn sleep_until_shutdown(interval: Duration, shutdown: &AtomicBool) {
    let slice = Duration::from_millis(200);
    let mut remaining = interval;
    while !remaining.is_zero() && !shutdown.load(Ordering::SeqCst) {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}
