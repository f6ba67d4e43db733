//! Cancels the running session when the process is asked to stop.
//!
//! The first SIGINT or SIGTERM cancels the session and ends the input, which
//! wakes the runtime whether it is waiting on the worker or on the next input
//! line, and lets it close and reap the worker before exiting. A second
//! signal falls back to the default disposition.

use percolator::CancelHandle;

use crate::input::InputInterrupt;

#[cfg(unix)]
pub(crate) use unix::SignalGuard;

#[cfg(not(unix))]
pub(crate) use fallback::SignalGuard;

#[cfg(unix)]
mod unix {
    use std::io;
    use std::thread::{self, JoinHandle};

    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::{Handle, Signals};
    use signal_hook::low_level;
    use tracing::{info, warn};

    use super::{CancelHandle, InputInterrupt};
    use crate::CLI_TARGET;

    /// Listens for termination signals while a session runs.
    pub(crate) struct SignalGuard {
        handle: Handle,
        listener: Option<JoinHandle<()>>,
    }

    impl SignalGuard {
        /// Starts listening; dropping the guard stops the listener.
        pub(crate) fn install(cancel: CancelHandle, input: InputInterrupt) -> io::Result<Self> {
            let mut signals = Signals::new([SIGINT, SIGTERM])?;
            let handle = signals.handle();
            let listener = thread::Builder::new()
                .name("percolate-signals".to_owned())
                .spawn(move || {
                    for signal in signals.forever() {
                        if cancel.is_cancelled() {
                            if let Err(error) = low_level::emulate_default_handler(signal) {
                                warn!(
                                    target: CLI_TARGET,
                                    signal,
                                    error = %error,
                                    "failed to apply default signal disposition"
                                );
                            }
                            continue;
                        }
                        info!(
                            target: CLI_TARGET,
                            signal,
                            "termination signal received, cancelling session"
                        );
                        cancel.cancel();
                        input.interrupt();
                    }
                })?;
            Ok(Self {
                handle,
                listener: Some(listener),
            })
        }
    }

    impl Drop for SignalGuard {
        fn drop(&mut self) {
            self.handle.close();
            if let Some(listener) = self.listener.take()
                && listener.join().is_err()
            {
                warn!(target: CLI_TARGET, "signal listener thread panicked");
            }
        }
    }
}

#[cfg(not(unix))]
mod fallback {
    use std::io;

    use super::{CancelHandle, InputInterrupt};

    /// Signal handling is unavailable; the guard does nothing.
    pub(crate) struct SignalGuard;

    impl SignalGuard {
        pub(crate) fn install(_cancel: CancelHandle, _input: InputInterrupt) -> io::Result<Self> {
            Ok(Self)
        }
    }
}
