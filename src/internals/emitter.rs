use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Something that produces a stream of values on its own async task.
///
/// Spawning hands back the receiving half of the channel the task feeds, and
/// a [`JoinHandle`] to await the task's termination. The task winds down when
/// the given [`CancellationToken`] is cancelled.
pub trait Emitter {
    type Emitted: Send;

    fn spawn(
        &self,
        shutdown_token: CancellationToken,
    ) -> (mpsc::Receiver<Self::Emitted>, JoinHandle<()>);
}
