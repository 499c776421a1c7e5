//! Client-side request dispatch for a replicated key-value service.
//!
//! The client keeps one TCP session to one replica at a time. Commands drawn
//! from a [`CommandSource`] are wrapped in sequenced [`relay_wire`] requests,
//! sent with a per-attempt deadline by [`dispatch`], and resent over a fresh
//! connection from [`connect`] whenever the exchange fails. Replies that do
//! not answer the outstanding request stop the client; everything else is
//! retried until it succeeds.
//!
//! The [`run`] entry point wires the engine to layered configuration from
//! [`relay_config`], structured telemetry, a CSV latency log, and process
//! signals.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use ortho_config::OrthoConfig;
use relay_config::{Config, RuntimeSettings, SourceSelection};
use tracing::info;

mod connector;
mod dispatcher;
mod errors;
mod request_loop;
mod shutdown;
mod source;
mod stats;
mod telemetry;

pub use connector::{Connection, connect};
pub use dispatcher::dispatch;
pub use errors::{ClientError, ConnectError, DispatchError, ProtocolViolation};
pub use request_loop::{FIRST_REQUEST_ID, RequestLoop, RunSummary};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
pub use source::{
    AnySource, Command, CommandSource, ConsoleSource, SourceError, WorkloadError, WorkloadSource,
    WorkloadSpec,
};
pub use stats::{CsvStatsSink, LatencyRecord, StatsError, StatsSink};
pub use telemetry::TelemetryError;

use errors::AppError;
use request_loop::REQUEST_LOOP_TARGET;

/// Grace period for blocking reads still pending when the client exits.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Loads configuration for a run.
pub(crate) trait ConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Completed(RunSummary),
    Interrupted,
}

/// Runs the client with `args`, reporting fatal errors on `stderr`.
#[must_use]
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    run_with(args, stderr, &OrthoConfigLoader, SystemShutdownSignal)
}

pub(crate) fn run_with<I, E, L, S>(args: I, stderr: &mut E, loader: &L, shutdown: S) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, loader, shutdown) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "relay: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<L, S>(args: &[OsString], loader: &L, shutdown: S) -> Result<Outcome, AppError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
{
    let config = loader.load(args)?;
    let settings = RuntimeSettings::try_from(&config)?;
    telemetry::initialise(config.log_filter(), config.log_format())?;

    let stats = CsvStatsSink::open(&settings.stats_path).map_err(AppError::OpenStats)?;
    let source = match &settings.source {
        SourceSelection::Interactive => AnySource::Console(ConsoleSource::stdio()),
        SourceSelection::Workload { path } => AnySource::Workload(WorkloadSource::from_path(path)?),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;
    let mut request_loop = RequestLoop::new(settings.client, source, stats);
    let outcome = runtime.block_on(drive(&mut request_loop, shutdown));
    // Stdin reads run on the blocking pool and cannot be cancelled.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    outcome
}

/// Runs `request_loop` until it finishes or `shutdown` fires, then flushes
/// the stats sink either way.
pub(crate) async fn drive<S, T, Sig>(
    request_loop: &mut RequestLoop<S, T>,
    shutdown: Sig,
) -> Result<Outcome, AppError>
where
    S: CommandSource,
    T: StatsSink,
    Sig: ShutdownSignal + 'static,
{
    let outcome = tokio::select! {
        result = request_loop.run() => result.map(Outcome::Completed).map_err(AppError::from),
        signal = shutdown::wait_for(shutdown) => match signal {
            Ok(()) => Ok(Outcome::Interrupted),
            Err(error) => Err(AppError::from(error)),
        },
    };
    let flushed = request_loop
        .flush_stats()
        .map_err(|error| AppError::Client(ClientError::Stats(error)));

    match &outcome {
        Ok(Outcome::Completed(summary)) => info!(
            target: REQUEST_LOOP_TARGET,
            delivered = summary.delivered,
            next_request_id = summary.next_request_id,
            "client finished"
        ),
        Ok(Outcome::Interrupted) => info!(
            target: REQUEST_LOOP_TARGET,
            next_request_id = request_loop.next_request_id(),
            "client interrupted"
        ),
        Err(_) => {}
    }
    let outcome = outcome?;
    flushed?;
    Ok(outcome)
}

#[cfg(test)]
mod tests;
