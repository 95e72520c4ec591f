// pool.rs: Central event loop driving the session from commands, fetches and ticks

use crate::event::{Command, FetchContext, Session, UpdateSender};
use crate::now_playing::NowPlaying;
use crate::state::Update;
use crate::timer::TickDriver;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// What the session loop needs from the command line.
pub struct SessionConfig {
    pub fetch: Arc<FetchContext>,
    pub tick: Duration,
    pub autoplay: bool,
    pub sink: Arc<dyn NowPlaying>,
}

/// Runs the session until `Shutdown`, the command channel closes, or the
/// update receiver goes away.
///
/// The tick driver is only polled while playing, so a paused session sleeps
/// until the next command or fetch result.
pub async fn listen(
    update_tx: mpsc::Sender<Update>,
    mut cmd_rx: mpsc::Receiver<Command>,
    config: SessionConfig,
) {
    let (fetch_tx, mut fetch_rx) = mpsc::channel(8);
    let mut session = Session::new(config.fetch, fetch_tx, config.sink, config.autoplay);
    let mut sender = UpdateSender::new(update_tx);
    let mut driver = TickDriver::new(config.tick);

    tracing::debug!(tick_ms = driver.period().as_millis() as u64, "Session loop started");
    if !sender.send(&session.state, true).await {
        return;
    }

    loop {
        let playing = session.state.sync.is_playing();
        tokio::select! {
            maybe_cmd = cmd_rx.recv() => {
                let Some(cmd) = maybe_cmd else { break };
                if cmd == Command::Shutdown {
                    session.handle_command(cmd);
                    break;
                }
                tracing::debug!(?cmd, "Command");
                if session.handle_command(cmd) {
                    driver.restart();
                }
                if !sender.send(&session.state, false).await {
                    break;
                }
            }
            Some(outcome) = fetch_rx.recv() => {
                if session.handle_fetch(outcome) {
                    driver.restart();
                }
                if !sender.send(&session.state, false).await {
                    break;
                }
            }
            delta = async {
                if playing {
                    driver.next_delta().await
                } else {
                    futures_util::future::pending::<f64>().await
                }
            } => {
                if session.handle_tick(delta) && !sender.send(&session.state, false).await {
                    break;
                }
            }
        }
    }
    tracing::debug!("Session loop stopped");
}
