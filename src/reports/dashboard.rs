use std::sync::{Arc, Mutex};

use super::client::{QuickStats, Report, ReportSummary, RECENT_LIMIT};

/// UI state for the sales dashboard. All of it is discarded on navigation
/// away; nothing here persists. Responses are applied in arrival order
/// (last response wins); only report generation is guarded against
/// re-entrancy.
#[derive(Default)]
pub struct Dashboard {
    summaries: Vec<ReportSummary>,
    today: Option<QuickStats>,
    current: Option<Report>,
    generating: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> &[ReportSummary] {
        &self.summaries
    }

    pub fn today(&self) -> Option<&QuickStats> {
        self.today.as_ref()
    }

    pub fn current(&self) -> Option<&Report> {
        self.current.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Replace the summary list, keeping it bounded.
    pub fn apply_summaries(&mut self, mut summaries: Vec<ReportSummary>) {
        summaries.truncate(RECENT_LIMIT);
        self.summaries = summaries;
    }

    pub fn apply_today(&mut self, stats: QuickStats) {
        self.today = Some(stats);
    }

    pub fn show_report(&mut self, report: Report) {
        self.current = Some(report);
    }

    /// Claim the generate slot. Returns false while a request is already
    /// outstanding; the trigger control stays disabled until
    /// [`Dashboard::finish_generate`].
    pub fn begin_generate(&mut self) -> bool {
        if self.generating {
            return false;
        }
        self.generating = true;
        true
    }

    pub fn finish_generate(&mut self) {
        self.generating = false;
    }
}

/// Held claim on the generate slot. Releasing on drop covers every exit
/// path, including a request future dropped when the client disconnects;
/// a plain call after the await would leave the slot wedged shut.
pub struct GenerateGuard {
    dashboard: Arc<Mutex<Dashboard>>,
}

impl GenerateGuard {
    pub fn claim(dashboard: &Arc<Mutex<Dashboard>>) -> Option<Self> {
        if dashboard.lock().unwrap().begin_generate() {
            Some(Self {
                dashboard: Arc::clone(dashboard),
            })
        } else {
            None
        }
    }
}

impl Drop for GenerateGuard {
    fn drop(&mut self) {
        self.dashboard.lock().unwrap().finish_generate();
    }
}
