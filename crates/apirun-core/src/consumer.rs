//! Consumer contract.
//!
//! Consumers read a run's events in emission order. [`dispatch`] hands each
//! event to every handler before reading the next one, and checks the order
//! against the [`Lifecycle`] as it goes, so handlers can rely on:
//! - `initialized` first, exactly once
//! - each `before_execution(e)` before its `after_execution(e)`
//! - the terminal event last
//!
//! The final Result Set is read from the returned terminal event.

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::InvariantViolation;
use crate::events::ExecutionEvent;
use crate::lifecycle::Lifecycle;
use crate::Result;

/// An observer of a run's events (progress reporter, aggregator, recorder).
#[async_trait]
pub trait EventHandler: Send {
    async fn handle(&mut self, event: &ExecutionEvent) -> Result<()>;
}

/// Feed every event of `stream` to `handlers`, in order.
///
/// Returns the terminal event. Fails if the stream breaks the lifecycle or
/// ends before a terminal event, or if a handler fails.
pub async fn dispatch<S>(
    mut stream: S,
    handlers: &mut [&mut dyn EventHandler],
) -> Result<ExecutionEvent>
where
    S: Stream<Item = ExecutionEvent> + Unpin,
{
    let mut lifecycle = Lifecycle::new();
    while let Some(event) = stream.next().await {
        lifecycle.advance(&event.kind)?;
        for handler in handlers.iter_mut() {
            handler.handle(&event).await?;
        }
        if event.is_terminal() {
            return Ok(event);
        }
    }
    Err(InvariantViolation::MissingTerminal.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CheckSet, Endpoint, ExecutionSettings, ResultsView, SchemaHandle, Status};
    use crate::emitter::channel;
    use crate::error::Error;
    use crate::events::EventKind;

    #[derive(Default)]
    struct Names(Vec<&'static str>);

    #[async_trait]
    impl EventHandler for Names {
        async fn handle(&mut self, event: &ExecutionEvent) -> Result<()> {
            self.0.push(event.name());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_in_order() {
        let (mut emitter, stream) = channel(SchemaHandle::new("openapi.json"), 8);
        let a = Endpoint::new("GET", "/a");
        emitter
            .initialized(CheckSet::default(), ExecutionSettings::default())
            .await
            .expect("init");
        emitter.before_execution(&a).await.expect("before");
        emitter
            .after_execution(&a, Status::Success, vec![])
            .await
            .expect("after");
        emitter.finished().await.expect("finish");

        let mut first = Names::default();
        let mut second = Names::default();
        let terminal = dispatch(stream, &mut [&mut first, &mut second])
            .await
            .expect("dispatch");

        assert_eq!(terminal.name(), "finished");
        assert_eq!(terminal.results.rollup(), Status::Success);
        assert_eq!(first.0, second.0);
        assert_eq!(first.0.len(), 4);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_out_of_order_stream() {
        let schema = SchemaHandle::new("openapi.json");
        let results = ResultsView::new();
        let events = vec![ExecutionEvent::new(
            schema,
            results,
            EventKind::Finished { duration_ms: 0 },
        )];

        let mut names = Names::default();
        let err = dispatch(futures::stream::iter(events), &mut [&mut names])
            .await
            .expect_err("finished before initialized");
        assert!(matches!(
            err,
            Error::Protocol(InvariantViolation::NotInitialized { .. })
        ));
        assert!(names.0.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_requires_terminal() {
        let events = vec![ExecutionEvent::new(
            SchemaHandle::new("openapi.json"),
            ResultsView::new(),
            EventKind::initialized(CheckSet::default(), ExecutionSettings::default()),
        )];
        let err = dispatch(futures::stream::iter(events), &mut [])
            .await
            .expect_err("no terminal");
        assert!(matches!(
            err,
            Error::Protocol(InvariantViolation::MissingTerminal)
        ));
    }
}
