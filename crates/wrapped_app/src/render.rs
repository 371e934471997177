use wrapped_core::{JobStatus, StatusView};
use wrapped_logging::short_wallet;

/// Text shown for a view, one status line plus optional detail lines.
pub fn render(view: &StatusView) -> String {
    let Some(wallet) = &view.wallet else {
        return with_notice("Connect a wallet to get started.".to_string(), view);
    };

    let job = view
        .job_id
        .as_ref()
        .map(|id| format!(" job {id}"))
        .unwrap_or_default();
    let mut out = format!("[{}]{} {}", short_wallet(wallet), job, view.status);

    match view.status {
        JobStatus::Idle if view.creating => out.push_str("\n  Starting your report..."),
        JobStatus::Idle => out.push_str("\n  No report yet. Type `start` to generate one."),
        JobStatus::Pending => out.push_str("\n  Waiting for the processor to pick up the job."),
        JobStatus::Processing => out.push_str("\n  Crunching your on-chain history..."),
        JobStatus::Completed => {
            let body = view
                .result
                .as_ref()
                .and_then(|result| serde_json::to_string_pretty(result).ok())
                .unwrap_or_default();
            for line in body.lines() {
                out.push_str("\n  ");
                out.push_str(line);
            }
        }
        JobStatus::Failed => {
            out.push_str("\n  ");
            out.push_str(view.error.as_deref().unwrap_or("Processing failed"));
            out.push_str("\n  Type `retry` to try again.");
        }
    }
    with_notice(out, view)
}

fn with_notice(mut out: String, view: &StatusView) -> String {
    if let Some(notice) = &view.notice {
        out.push_str("\n  ! ");
        out.push_str(&notice.message);
        out.push_str(" (type `dismiss` to hide)");
    }
    out
}
