//! Entry points that run one multiplication across a whole group.

use std::sync::Arc;

use futures_util::future::join_all;
use matrix_mul_transport::{LocalTransport, Transport};
use tracing::{debug, warn};

use crate::Error;
use crate::config::Config;
use crate::coordinator::{Coordinator, Operands, Outcome};
use crate::worker::Worker;

/// Runs this rank's part of the multiplication described by `config`.
///
/// Must be called on every rank of the group with the same configuration.
/// The root generates the operands from `config.seed` and returns
/// `Some(outcome)`; every other rank returns `None` once its work is done.
pub async fn run<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
) -> Result<Option<Outcome>, Error> {
    config.validate(transport.size())?;
    let operands = if transport.rank() == config.root {
        Some(Operands::generate(config)?)
    } else {
        None
    };
    run_with_operands(transport, config, operands).await
}

/// Like [`run`], with the root supplying its own operands. Non-root ranks
/// ignore `operands`.
pub async fn run_with_operands<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    operands: Option<Operands>,
) -> Result<Option<Outcome>, Error> {
    config.validate(transport.size())?;

    if transport.rank() == config.root {
        let operands = operands
            .ok_or_else(|| Error::Configuration("the root rank was given no operands".into()))?;
        Coordinator::new(transport, config)
            .run(operands)
            .await
            .map(Some)
    } else {
        let summary = Worker::new(transport, config).run().await?;
        debug!(rank = transport.rank(), ?summary, "worker finished");
        Ok(None)
    }
}

/// Runs a whole group of `process_count` ranks as tasks in this process and
/// returns the root's outcome.
pub async fn run_local(config: Config, process_count: usize) -> Result<Outcome, Error> {
    config.validate(process_count)?;
    let operands = Operands::generate(&config)?;
    run_local_with_operands(config, process_count, operands).await
}

pub async fn run_local_with_operands(
    config: Config,
    process_count: usize,
    operands: Operands,
) -> Result<Outcome, Error> {
    config.validate(process_count)?;

    let config = Arc::new(config);
    let mut operands = Some(operands);
    let handles: Vec<_> = LocalTransport::group(process_count)
        .into_iter()
        .map(|transport| {
            let config = Arc::clone(&config);
            let operands = if transport.rank() == config.root {
                operands.take()
            } else {
                None
            };
            tokio::spawn(async move { run_with_operands(&transport, &config, operands).await })
        })
        .collect();

    let mut outcome = None;
    let mut failure: Option<Error> = None;
    for (rank, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined? {
            Ok(Some(result)) => outcome = Some(result),
            Ok(None) => {}
            Err(err) => {
                warn!(rank, error = %err, "rank failed");
                if failure.as_ref().is_none_or(is_consequential) {
                    failure = Some(err);
                }
            }
        }
    }

    match (failure, outcome) {
        (Some(err), _) => Err(err),
        (None, Some(outcome)) => Ok(outcome),
        (None, None) => Err(Error::ProtocolViolation(
            "the root finished without an outcome".into(),
        )),
    }
}

/// A rank that lost its peer usually failed because another rank failed
/// first; prefer reporting the other rank's error.
fn is_consequential(err: &Error) -> bool {
    matches!(
        err,
        Error::Transport(matrix_mul_transport::Error::ConnectionClosed(_))
    )
}
