//! Two mirror bridges joined by an in-process `Link`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;
use webview_bridge::{Bridge, Error, Link, callback};

// ============================================================================
// Helpers
// ============================================================================

/// Installs a subscriber honoring `RUST_LOG`; repeated calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pair() -> Result<(Bridge, Bridge)> {
    init_tracing();
    let web = Bridge::builder().web().build()?;
    let host = Bridge::builder().host().build()?;
    Ok((web, host))
}

// ============================================================================
// Invocations
// ============================================================================

#[tokio::test]
async fn test_web_invokes_host_command() -> Result<()> {
    let (web, host) = pair()?;
    host.register_command("greet", |args| {
        let name = args
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing name".to_string())?;
        Ok(json!(format!("Hello, {name}!")))
    });

    let link = Link::connect(&web, &host);

    let greeting = web.invoke("greet", json!({ "name": "Ada" }))?.await?;
    assert_eq!(greeting, json!("Hello, Ada!"));

    let err = web.invoke("greet", json!({}))?.await.unwrap_err();
    assert!(
        matches!(err, Error::CommandFailed { ref message, .. } if message == "missing name")
    );

    link.close().await;
    Ok(())
}

#[tokio::test]
async fn test_host_invokes_web_command() -> Result<()> {
    let (web, host) = pair()?;
    web.register_command("get_selection", |_| Ok(json!({ "text": "hello" })));

    let _link = Link::connect(&web, &host);

    let selection = host.invoke("get_selection", json!({}))?.await?;
    assert_eq!(selection, json!({ "text": "hello" }));
    Ok(())
}

#[tokio::test]
async fn test_unknown_command_fails() -> Result<()> {
    let (web, host) = pair()?;
    let _link = Link::connect(&web, &host);

    let err = web.invoke("does_not_exist", json!({}))?.await.unwrap_err();
    match err {
        Error::CommandFailed { command, message } => {
            assert_eq!(command, "does_not_exist");
            assert!(message.contains("unknown command"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_typed_command_round_trip() -> Result<()> {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Sum {
        a: i64,
        b: i64,
    }

    let (web, host) = pair()?;
    host.register_typed_command("sum", |args: Sum| Ok::<_, String>(args.a + args.b));
    let _link = Link::connect(&web, &host);

    let total: i64 = web.invoke_typed("sum", &Sum { a: 40, b: 2 }).await?;
    assert_eq!(total, 42);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_invocations_resolve_independently() -> Result<()> {
    let (web, host) = pair()?;
    host.register_command("double", |args| {
        let n = args.get("n").and_then(Value::as_i64).unwrap_or(0);
        Ok(json!(n * 2))
    });
    let _link = Link::connect(&web, &host);

    let handles = (0..100)
        .map(|n| web.invoke("double", json!({ "n": n })))
        .collect::<webview_bridge::Result<Vec<_>>>()?;

    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await?, json!(n as i64 * 2));
    }
    assert_eq!(web.pending_invocations(), 0);
    Ok(())
}

#[tokio::test]
async fn test_closed_counterpart_fails_fast() -> Result<()> {
    let (web, host) = pair()?;
    host.register_command("ping", |_| Ok(json!("pong")));
    let _link = Link::connect(&web, &host);

    assert_eq!(web.invoke("ping", json!({}))?.await?, json!("pong"));

    host.shutdown().await;

    let err = web
        .invoke_with_timeout("ping", json!({}), Duration::from_secs(5))?
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::CommandFailed { ref message, .. } if message.contains("closed"))
    );
    Ok(())
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_flow_both_ways() -> Result<()> {
    let (web, host) = pair()?;
    let web_seen = Arc::new(Mutex::new(Vec::new()));
    let host_seen = Arc::new(Mutex::new(Vec::new()));
    let arrived = Arc::new(Notify::new());

    {
        let seen = Arc::clone(&web_seen);
        let arrived = Arc::clone(&arrived);
        web.listen(
            "theme-changed",
            callback(move |p| {
                seen.lock().push(p.clone());
                arrived.notify_one();
            }),
        );
    }
    {
        let seen = Arc::clone(&host_seen);
        let arrived = Arc::clone(&arrived);
        host.listen(
            "saved",
            callback(move |p| {
                seen.lock().push(p.clone());
                arrived.notify_one();
            }),
        );
    }

    let _link = Link::connect(&web, &host);

    host.emit("theme-changed", json!({ "dark": true }));
    tokio::time::timeout(Duration::from_secs(5), arrived.notified()).await?;

    web.emit("saved", json!({ "path": "notes.txt" }));
    tokio::time::timeout(Duration::from_secs(5), arrived.notified()).await?;

    assert_eq!(*web_seen.lock(), vec![json!({ "dark": true })]);
    assert_eq!(*host_seen.lock(), vec![json!({ "path": "notes.txt" })]);
    Ok(())
}

#[tokio::test]
async fn test_events_keep_emit_order() -> Result<()> {
    let (web, host) = pair()?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(Notify::new());

    {
        let seen = Arc::clone(&seen);
        let done = Arc::clone(&done);
        web.listen(
            "tick",
            callback(move |p| {
                let mut seen = seen.lock();
                seen.push(p.clone());
                if seen.len() == 20 {
                    done.notify_one();
                }
            }),
        );
    }

    let _link = Link::connect(&web, &host);
    for n in 0..20 {
        host.emit("tick", json!(n));
    }

    tokio::time::timeout(Duration::from_secs(5), done.notified()).await?;
    let expected: Vec<Value> = (0..20).map(|n| json!(n)).collect();
    assert_eq!(*seen.lock(), expected);
    Ok(())
}
