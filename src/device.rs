//! Host platform capabilities.
//!
//! The receiver installs a file and then restarts the device so the new
//! file takes effect. How a restart actually happens is platform business;
//! the core only needs something it can invoke after a successful install.

/// Restart capability of the host platform.
///
/// Invoked exactly once, after the installed file has been renamed into
/// place and the client connection has been closed. Implementations are
/// not expected to return.
pub trait DeviceReset: Send + Sync {
    fn reset(&self);
}

/// Restarts by terminating the process with a success status. The platform
/// supervisor relaunches the service, which then runs the updated file.
pub struct SystemReset;

impl DeviceReset for SystemReset {
    fn reset(&self) {
        std::process::exit(0);
    }
}
