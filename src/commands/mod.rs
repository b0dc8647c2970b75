mod capture;

pub use capture::run_capture_command;
