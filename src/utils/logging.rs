use chrono::Local;

pub trait Logger: Send + Sync {
    fn log(&mut self, message: &str);
    fn debug_log(&mut self, message: &str);
}

// Progress goes to stderr so stdout stays reserved for command output.
#[derive(Debug)]
pub struct StderrLogger {
    debug: bool,
}

impl StderrLogger {
    pub fn new(debug: bool) -> Self {
        StderrLogger { debug }
    }
}

impl Logger for StderrLogger {
    fn log(&mut self, message: &str) {
        eprintln!(
            "{}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            eprintln!(
                "{}: [DEBUG] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                message
            );
        }
    }
}
