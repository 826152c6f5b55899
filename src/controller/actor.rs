use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::{Action, EditController, ViewState};

pub type ActionTx = UnboundedSender<Action>;
pub type ActionRx = UnboundedReceiver<Action>;

/// UI-side handle to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: ActionTx,
    view: watch::Receiver<ViewState>,
}

impl ControllerHandle {
    /// Queue an action. Returns `false` once the controller has stopped.
    pub fn send(&self, action: Action) -> bool {
        self.tx.send(action).is_ok()
    }

    /// Latest published snapshot.
    pub fn view(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.clone()
    }
}

/// Move `controller` onto its own task. Actions are applied strictly in
/// arrival order; a snapshot is published after the local part of each
/// action and again once its store work finishes. `notify` runs after every
/// publish, e.g. to request a repaint.
///
/// Must be called from within a tokio runtime.
pub fn spawn<F>(controller: EditController, notify: F) -> (ControllerHandle, JoinHandle<()>)
where
    F: Fn() + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(controller.view());
    let task = tokio::spawn(run(controller, rx, view_tx, notify));
    (ControllerHandle { tx, view: view_rx }, task)
}

async fn run<F>(
    mut controller: EditController,
    mut rx: ActionRx,
    view_tx: watch::Sender<ViewState>,
    notify: F,
) where
    F: Fn() + Send + Sync + 'static,
{
    let publish = |controller: &EditController| {
        view_tx.send_replace(controller.view());
        notify();
    };

    while let Some(action) = rx.recv().await {
        match controller.apply(action) {
            Ok(Some(effect)) => {
                publish(&controller);
                controller.run(effect).await;
            }
            Ok(None) | Err(_) => {}
        }
        publish(&controller);
    }
    info!("controller stopped");
}
