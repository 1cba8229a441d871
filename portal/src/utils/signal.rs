use std::future::Future;

use anyhow::Result;
use tokio::signal::unix::{self, SignalKind};

pub const TERMINATION_SIGNALS: [SignalKind; 3] = [
    SignalKind::interrupt(),
    SignalKind::terminate(),
    SignalKind::quit(),
];

/// Runs `f` until it completes or the process receives a termination signal.
pub async fn run_or_terminate<F>(f: F) -> Result<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let stop_fut = any_signal(TERMINATION_SIGNALS)?;
    let run_fut = tokio::spawn(f);

    tokio::select! {
        res = run_fut => res?,
        signal = stop_fut => {
            tracing::info!(?signal, "received termination signal");
            Ok(())
        }
    }
}

/// Subscribes to all `kinds` and resolves with the first one received.
pub fn any_signal<I>(kinds: I) -> std::io::Result<impl Future<Output = SignalKind>>
where
    I: IntoIterator<Item = SignalKind>,
{
    let mut signals = kinds
        .into_iter()
        .map(|kind| unix::signal(kind).map(|signal| (kind, signal)))
        .collect::<std::io::Result<Vec<_>>>()?;

    Ok(async move {
        let waiting = signals.iter_mut().map(|(kind, signal)| {
            Box::pin(async move {
                signal.recv().await;
                *kind
            })
        });
        futures_util::future::select_all(waiting).await.0
    })
}
