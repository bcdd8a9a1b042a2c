//! Node.js evaluation host
//!
//! Spawns `node` running an embedded host script that keeps a `vm` context
//! alive for the whole session. Requests go out on the child's stdin; a
//! background task reads replies from its stdout and routes each one to the
//! request it answers. The child's stderr is inherited, so anything user
//! code prints lands on the terminal.

use super::evaluator::{Evaluation, Evaluator, Value};
use super::protocol::{HostMessage, HostReply, HostRequest, READY_ID};
use crate::error::{TrymodError, TrymodResult};
use crate::package::ResolvedModule;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Host script run with `node -e`
const HOST_SCRIPT: &str = include_str!("host.js");

/// How long the host may take to report ready
const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for the host to exit on its own
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

type Routes = Arc<StdMutex<HashMap<u64, mpsc::UnboundedSender<HostReply>>>>;

/// Settings for spawning the host
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Node executable
    pub node: String,
    /// Budget the host enforces on synchronous execution
    pub timeout: Duration,
    /// Render values with ANSI colors
    pub colors: bool,
    /// Cache root; bare `require('name')` in the REPL resolves from here
    pub cache_root: Option<PathBuf>,
}

/// Evaluator backed by a long-lived node child process
pub struct NodeEvaluator {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    routes: Routes,
    next_id: AtomicU64,
    timeout_ms: u64,
    reader: JoinHandle<()>,
}

impl NodeEvaluator {
    /// Start the host and wait until it is reading requests
    pub async fn spawn(options: &HostOptions) -> TrymodResult<Self> {
        let mut command = Command::new(&options.node);
        command
            .arg("-e")
            .arg(HOST_SCRIPT)
            .env("TRYMOD_COLORS", if options.colors { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(ref root) = options.cache_root {
            command.env("TRYMOD_CACHE", root);
        }

        debug!("Starting evaluation host: {}", options.node);
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrymodError::HostUnavailable(format!("{} not found", options.node))
            } else {
                TrymodError::command_failed(options.node.clone(), e)
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TrymodError::HostUnavailable("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrymodError::HostUnavailable("stdout not captured".to_string()))?;

        let routes = Routes::default();
        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
        lock(&routes).insert(READY_ID, ready_tx);
        let reader = tokio::spawn(read_replies(stdout, Arc::clone(&routes)));

        match tokio::time::timeout(STARTUP_TIMEOUT, ready_rx.recv()).await {
            Ok(Some(HostReply::Ready)) => debug!("Evaluation host ready"),
            Ok(_) => {
                reader.abort();
                return Err(TrymodError::HostUnavailable(format!(
                    "{} exited during startup",
                    options.node
                )));
            }
            Err(_) => {
                reader.abort();
                return Err(TrymodError::HostUnavailable(format!(
                    "{} did not start within {}s",
                    options.node,
                    STARTUP_TIMEOUT.as_secs()
                )));
            }
        }

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(Some(stdin)),
            routes,
            next_id: AtomicU64::new(READY_ID + 1),
            timeout_ms: options.timeout.as_millis() as u64,
            reader,
        })
    }

    /// Close the host's stdin and wait briefly for it to exit
    pub async fn shutdown(&self) {
        self.stdin.lock().await.take();

        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => debug!("Evaluation host exited: {}", status),
            Ok(Err(e)) => warn!("Waiting for evaluation host failed: {}", e),
            Err(_) => {
                debug!("Evaluation host still running, killing it");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill evaluation host: {}", e);
                }
            }
        }
    }

    /// Send a request and return the channel its replies arrive on
    async fn request<'a>(
        &self,
        build: impl FnOnce(u64) -> HostRequest<'a>,
    ) -> TrymodResult<mpsc::UnboundedReceiver<HostReply>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&build(id))?;
        line.push('\n');

        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.routes).insert(id, tx);

        let mut stdin = self.stdin.lock().await;
        let Some(pipe) = stdin.as_mut() else {
            lock(&self.routes).remove(&id);
            return Err(TrymodError::HostExited);
        };
        let written = match pipe.write_all(line.as_bytes()).await {
            Ok(()) => pipe.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            debug!("Writing to evaluation host failed: {}", e);
            lock(&self.routes).remove(&id);
            return Err(TrymodError::HostExited);
        }

        Ok(rx)
    }
}

#[async_trait]
impl Evaluator for NodeEvaluator {
    async fn bind(&self, alias: &str, module: &ResolvedModule) -> TrymodResult<()> {
        let mut replies = self
            .request(|id| HostRequest::Bind {
                id,
                alias,
                path: &module.entry,
            })
            .await?;

        match replies.recv().await {
            Some(HostReply::Bound) => Ok(()),
            Some(HostReply::Threw { message }) => Err(TrymodError::load(&module.name, message)),
            Some(other) => Err(unexpected("bind", &other)),
            None => Err(TrymodError::HostExited),
        }
    }

    async fn evaluate(&self, source: &str) -> TrymodResult<Evaluation> {
        let timeout_ms = self.timeout_ms;
        let mut replies = self
            .request(|id| HostRequest::Eval {
                id,
                code: source,
                timeout_ms,
            })
            .await?;

        let first = replies.recv().await;
        match first {
            Some(HostReply::Value { display }) => Ok(Evaluation::Ready(Value::new(display))),
            Some(HostReply::CompileError { message }) => Err(TrymodError::Compile(message)),
            Some(HostReply::Threw { message }) => Err(TrymodError::Runtime(message)),
            Some(HostReply::TimedOut) => Err(TrymodError::EvaluationTimeout { millis: timeout_ms }),
            Some(HostReply::Deferred) => Ok(Evaluation::Deferred(Box::pin(async move {
                match replies.recv().await {
                    Some(HostReply::Settled { display }) => Ok(Value::new(display)),
                    Some(HostReply::Rejected { message }) => Err(TrymodError::Runtime(message)),
                    Some(other) => Err(unexpected("deferred eval", &other)),
                    None => Err(TrymodError::HostExited),
                }
            }))),
            Some(other) => Err(unexpected("eval", &other)),
            None => Err(TrymodError::HostExited),
        }
    }
}

impl Drop for NodeEvaluator {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read reply lines until the host closes stdout, then drop every route so
/// waiting requests see the host as gone.
async fn read_replies(stdout: ChildStdout, routes: Routes) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => dispatch(&routes, &line),
            Ok(None) => break,
            Err(e) => {
                warn!("Reading from evaluation host failed: {}", e);
                break;
            }
        }
    }
    debug!("Evaluation host closed its output");
    lock(&routes).clear();
}

/// Route one reply line to the request waiting for it
fn dispatch(routes: &Routes, line: &str) {
    let message: HostMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring malformed evaluation host reply: {}", e);
            return;
        }
    };

    let id = message.id;
    let is_final = message.reply.is_final();
    let mut routes = lock(routes);
    let delivered = routes
        .get(&id)
        .is_some_and(|tx| tx.send(message.reply).is_ok());

    if !delivered {
        debug!("Discarding reply for abandoned request {}", id);
    }
    if is_final || !delivered {
        routes.remove(&id);
    }
}

fn unexpected(stage: &str, reply: &HostReply) -> TrymodError {
    TrymodError::HostProtocol(format!("unexpected {:?} reply to {}", reply, stage))
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn routes_with(id: u64) -> (Routes, mpsc::UnboundedReceiver<HostReply>) {
        let routes = Routes::default();
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&routes).insert(id, tx);
        (routes, rx)
    }

    #[test]
    fn dispatch_routes_by_id() {
        let (routes, mut rx) = routes_with(4);
        dispatch(&routes, r#"{"id":4,"type":"value","display":"2"}"#);

        assert_eq!(
            rx.try_recv().unwrap(),
            HostReply::Value {
                display: "2".into()
            }
        );
        assert!(lock(&routes).is_empty());
    }

    #[test]
    fn dispatch_keeps_route_open_after_deferred() {
        let (routes, mut rx) = routes_with(5);
        dispatch(&routes, r#"{"id":5,"type":"deferred"}"#);
        assert!(lock(&routes).contains_key(&5));

        dispatch(&routes, r#"{"id":5,"type":"settled","display":"42"}"#);
        assert_eq!(rx.try_recv().unwrap(), HostReply::Deferred);
        assert_eq!(
            rx.try_recv().unwrap(),
            HostReply::Settled {
                display: "42".into()
            }
        );
        assert!(lock(&routes).is_empty());
    }

    #[test]
    fn dispatch_discards_abandoned_and_malformed_replies() {
        let (routes, rx) = routes_with(6);
        drop(rx);
        dispatch(&routes, r#"{"id":6,"type":"deferred"}"#);
        assert!(lock(&routes).is_empty());

        dispatch(&routes, "not json");
        dispatch(&routes, r#"{"id":99,"type":"bound"}"#);
        assert!(lock(&routes).is_empty());
    }

    // The tests below need a node binary and return early without one.

    async fn host(timeout: Duration, cache_root: Option<PathBuf>) -> Option<NodeEvaluator> {
        let options = HostOptions {
            node: "node".to_string(),
            timeout,
            colors: false,
            cache_root,
        };
        match NodeEvaluator::spawn(&options).await {
            Ok(host) => Some(host),
            Err(TrymodError::HostUnavailable(reason)) => {
                eprintln!("skipping: {}", reason);
                None
            }
            Err(e) => panic!("unexpected spawn error: {e}"),
        }
    }

    async fn eval_ready(host: &NodeEvaluator, source: &str) -> String {
        match host.evaluate(source).await.unwrap() {
            Evaluation::Ready(value) => value.to_string(),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn node_evaluates_plain_values() {
        let Some(host) = host(Duration::from_secs(5), None).await else {
            return;
        };
        assert_eq!(eval_ready(&host, "1+1").await, "2");
        assert_eq!(eval_ready(&host, "var x = 20; x + 1").await, "21");
        assert_eq!(eval_ready(&host, "x * 2").await, "40");
        assert_eq!(eval_ready(&host, "console.log('noise'); 'quiet'").await, "'quiet'");
        host.shutdown().await;
    }

    #[tokio::test]
    async fn node_unwraps_promises() {
        let Some(host) = host(Duration::from_secs(5), None).await else {
            return;
        };
        match host
            .evaluate("new Promise(r => setTimeout(() => r(42), 10))")
            .await
            .unwrap()
        {
            Evaluation::Deferred(pending) => assert_eq!(pending.await.unwrap().as_str(), "42"),
            other => panic!("expected Deferred, got {other:?}"),
        }

        match host.evaluate("Promise.reject(new Error('nope'))").await.unwrap() {
            Evaluation::Deferred(pending) => {
                let err = pending.await.unwrap_err();
                assert!(matches!(err, TrymodError::Runtime(ref m) if m == "Error: nope"));
            }
            other => panic!("expected Deferred, got {other:?}"),
        }
        host.shutdown().await;
    }

    #[tokio::test]
    async fn node_reports_compile_and_runtime_errors() {
        let Some(host) = host(Duration::from_secs(5), None).await else {
            return;
        };
        let err = host.evaluate("let = ;").await.unwrap_err();
        assert!(matches!(err, TrymodError::Compile(ref m) if m.starts_with("SyntaxError")));

        let err = host.evaluate("notDefined + 1").await.unwrap_err();
        assert!(matches!(err, TrymodError::Runtime(ref m) if m.starts_with("ReferenceError")));

        assert_eq!(eval_ready(&host, "'still alive'").await, "'still alive'");
        host.shutdown().await;
    }

    #[tokio::test]
    async fn node_stops_runaway_code_and_keeps_scope() {
        let Some(host) = host(Duration::from_millis(200), None).await else {
            return;
        };
        eval_ready(&host, "var kept = 7").await;

        let err = host.evaluate("while (true) {}").await.unwrap_err();
        assert!(matches!(err, TrymodError::EvaluationTimeout { millis: 200 }));

        assert_eq!(eval_ready(&host, "kept").await, "7");
        host.shutdown().await;
    }

    #[tokio::test]
    async fn node_binds_cached_package() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("node_modules").join("answer-pkg");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            r#"{"name":"answer-pkg","version":"1.0.0","main":"main.js"}"#,
        )
        .unwrap();
        std::fs::write(dir.join("main.js"), "module.exports = { answer: 42 }\n").unwrap();

        let Some(host) = host(Duration::from_secs(5), Some(temp.path().to_path_buf())).await
        else {
            return;
        };
        let module = ResolvedModule {
            name: "answer-pkg".to_string(),
            version: Some("1.0.0".to_string()),
            entry: dir.join("main.js"),
            dir,
        };
        host.bind("answer_pkg", &module).await.unwrap();

        assert_eq!(eval_ready(&host, "answer_pkg.answer").await, "42");
        assert_eq!(eval_ready(&host, "require('answer-pkg').answer").await, "42");
        host.shutdown().await;
    }

    #[tokio::test]
    async fn node_bind_failure_is_load_error() {
        let temp = TempDir::new().unwrap();
        let Some(host) = host(Duration::from_secs(5), None).await else {
            return;
        };
        let module = ResolvedModule {
            name: "ghost".to_string(),
            version: None,
            dir: temp.path().join("ghost"),
            entry: temp.path().join("ghost").join("index.js"),
        };
        let err = host.bind("ghost", &module).await.unwrap_err();
        assert!(matches!(err, TrymodError::Load { ref package, .. } if package == "ghost"));
        host.shutdown().await;
    }

    #[tokio::test]
    async fn missing_node_is_unavailable() {
        let options = HostOptions {
            node: "/nonexistent/node".to_string(),
            timeout: Duration::from_secs(5),
            colors: false,
            cache_root: None,
        };
        assert!(matches!(
            NodeEvaluator::spawn(&options).await,
            Err(TrymodError::HostUnavailable(_))
        ));
    }
}
