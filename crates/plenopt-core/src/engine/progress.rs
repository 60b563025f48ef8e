/// Events emitted while the joint parameters are optimized.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    /// An outer coordinate-descent round begins.
    RoundStart { iteration: usize },
    /// An outer round ended with the given joint log-likelihood.
    RoundFinish { iteration: usize, log_likelihood: f64 },

    /// One block fans out over `partitions` units of work.
    TaskStart { partitions: u64 },
    TaskIncrement,
    TaskFinish,

    /// Non-fatal condition the caller should surface (e.g. saturated partition rates).
    Warning(String),
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards [`Progress`] events to an optional callback. Shared by reference across the
/// worker threads of a parallel block.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        self.report(Progress::Message(text.into()));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.report(Progress::Warning(text.into()));
    }
}
