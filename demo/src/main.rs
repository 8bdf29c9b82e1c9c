//! Histack demo
//!
//! Drives a navigation stack over the in-memory host: a list of blaps, a
//! detail page, a delete dialog opened as an action, and a few moves made
//! behind the stack's back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use histack::{PushOptions, Stack, StackConfig};
use histack_host::MemoryHistory;
use serde_json::json;
use tokio::sync::mpsc;

struct Demo {
    host: MemoryHistory,
    stack: Stack,
    changes: mpsc::UnboundedReceiver<()>,
}

impl Demo {
    async fn start() -> Result<Self> {
        let host = MemoryHistory::new("https://blaps.example/")?;
        let config = StackConfig::from_env()?;
        let stack = Stack::attach(Arc::new(host.clone()), config)?;

        let (tx, changes) = mpsc::unbounded_channel();
        stack.add_listener(move || {
            let _ = tx.send(());
        });

        stack.ready().await?;
        let mut demo = Self {
            host,
            stack,
            changes,
        };
        demo.settled().await?;
        Ok(demo)
    }

    /// Let the host make a move on its own and wait for the stack to catch up.
    async fn user_move(&mut self, mv: impl FnOnce(&MemoryHistory) -> Result<()>) -> Result<()> {
        while self.changes.try_recv().is_ok() {}
        mv(&self.host)?;
        self.settled().await
    }

    async fn settled(&mut self) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(2), self.changes.recv())
            .await
            .context("stack never announced")?
            .context("listener dropped")?;

        tracing::info!(
            depth = self.stack.depth(),
            action = self.stack.is_action(),
            state = ?self.stack.state(),
            url = %self.stack.url(),
            "Stack changed"
        );
        Ok(())
    }

    fn dump(&self) {
        let entries = self.host.entries();
        for (i, entry) in entries.iter().enumerate() {
            let marker = if i == self.host.index() { ">" } else { " " };
            tracing::info!(
                "{marker} {i}: {} {}",
                entry.url,
                entry.state.as_ref().map(|s| s.to_string()).unwrap_or_default()
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    histack::init_logging();

    let mut demo = Demo::start().await?;
    tracing::info!(initial = %demo.stack.initial(), "Demo started");

    demo.stack.push(
        "/blap/7",
        PushOptions::new()
            .with_state(&json!({"id": 7, "scroll": 0}))?
            .with_title("Blap 7"),
    )?;
    demo.settled().await?;
    demo.stack.push("/blap/7/comments", PushOptions::new().with_title("Comments"))?;
    demo.settled().await?;

    demo.stack.set_action(&json!({"dialog": "delete", "id": 7}))?;
    demo.settled().await?;
    tracing::info!(back_to = ?demo.stack.page_for_back(), "Dialog open");
    demo.dump();

    // The user hits Back twice from the history picker; the stack repairs
    // the entries the dialog left behind.
    demo.user_move(|host| {
        host.go(-2);
        Ok(())
    })
    .await?;
    demo.dump();

    demo.user_move(|host| {
        host.go(1);
        Ok(())
    })
    .await?;

    // Following an in-page link out of a dialog replaces the dialog entry.
    demo.stack.set_action(&json!({"dialog": "share"}))?;
    demo.settled().await?;
    demo.user_move(|host| Ok(host.follow_fragment("share-link")?))
        .await?;
    demo.dump();

    let popped = demo.stack.pop().await?;
    demo.settled().await?;
    tracing::info!(popped, url = %demo.stack.url(), "Popped");

    let went_back = demo.stack.back().await?;
    demo.settled().await?;
    tracing::info!(went_back, can_pop = demo.stack.can_pop(), "Went back");
    demo.dump();

    if let Some(fault) = demo.stack.last_fault() {
        tracing::warn!(error = %fault, "Stack reported a fault");
    }

    Ok(())
}
