// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ready-made completion sinks.

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::traits::CompletionSink;

/// What a sink eventually receives: a payload or an error message.
pub type Reply = std::result::Result<Value, String>;

/// Forwards the reply into a `tokio` oneshot channel.
pub struct ChannelSink {
    tx: oneshot::Sender<Reply>,
}

impl CompletionSink for ChannelSink {
    fn succeed(self: Box<Self>, payload: Value) {
        if self.tx.send(Ok(payload)).is_err() {
            debug!("reply receiver dropped before success was delivered");
        }
    }

    fn fail(self: Box<Self>, message: String) {
        if self.tx.send(Err(message)).is_err() {
            debug!("reply receiver dropped before failure was delivered");
        }
    }
}

/// Create a sink whose reply can be awaited on the returned receiver.
pub fn channel_sink() -> (Box<dyn CompletionSink>, oneshot::Receiver<Reply>) {
    let (tx, rx) = oneshot::channel();
    (Box::new(ChannelSink { tx }), rx)
}

/// Calls a closure with the reply.
pub struct FnSink<F>(F);

impl<F> CompletionSink for FnSink<F>
where
    F: FnOnce(Reply) + Send,
{
    fn succeed(self: Box<Self>, payload: Value) {
        let FnSink(f) = *self;
        f(Ok(payload))
    }

    fn fail(self: Box<Self>, message: String) {
        let FnSink(f) = *self;
        f(Err(message))
    }
}

/// Wrap a closure as a completion sink.
pub fn fn_sink<F>(f: F) -> Box<dyn CompletionSink>
where
    F: FnOnce(Reply) + Send + 'static,
{
    Box::new(FnSink(f))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[tokio::test]
    async fn channel_sink_delivers_success() {
        let (sink, rx) = channel_sink();
        sink.succeed(serde_json::json!({ "CAMERA": "GRANTED" }));
        let reply = rx.await.unwrap();
        assert_eq!(reply.unwrap()["CAMERA"], "GRANTED");
    }

    #[tokio::test]
    async fn channel_sink_delivers_failure() {
        let (sink, rx) = channel_sink();
        sink.fail("boom".into());
        assert_eq!(rx.await.unwrap(), Err("boom".to_string()));
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (sink, rx) = channel_sink();
        drop(rx);
        sink.succeed(Value::Null);
    }

    #[test]
    fn fn_sink_runs_closure_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = fn_sink(move |reply| captured.lock().unwrap().push(reply));
        sink.fail("denied".into());
        assert_eq!(*seen.lock().unwrap(), vec![Err("denied".to_string())]);
    }
}
