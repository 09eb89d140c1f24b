use pagebook_application::{ExportReport, ExportState, ImportReport, Progress};
use pagebook_domain::{Book, DisplayMode};

pub fn present_book(book: &Book) -> String {
    let mode = match book.display_mode() {
        DisplayMode::Grid => "grid",
        DisplayMode::Flow => "flow",
    };
    format!(
        "book {} ({} pages, thumbnails={}px, mode={}) at {}",
        book.name(),
        book.page_count(),
        book.thumbnail_size().get(),
        mode,
        book.root().display()
    )
}

pub fn present_page_row(book: &Book, index: usize, page: &str) -> String {
    let marker = if book.selected() == Some(index) { "*" } else { " " };
    format!("{marker}{index}\t{page}")
}

pub fn present_import_report(report: &ImportReport) -> String {
    let mut lines = vec![format!(
        "import finished: imported={}, skipped={}",
        report.imported.len(),
        report.skipped.len()
    )];
    lines.extend(
        report
            .skipped
            .iter()
            .map(|(path, reason)| format!("  skipped {}: {reason}", path.display())),
    );
    lines.join("\n")
}

pub fn present_export_report(report: &ExportReport) -> String {
    let state = match report.state {
        ExportState::Configured => "configured",
        ExportState::Running => "running",
        ExportState::Completed => "completed",
        ExportState::CompletedWithErrors => "completed with errors",
    };
    let mut lines = vec![format!(
        "export {state}: exported={}, failed={}, skipped={} into {}",
        report.exported.len(),
        report.failures.len(),
        report.skipped,
        report.output_dir.display()
    )];
    lines.extend(report.failures.iter().map(|failure| {
        format!(
            "  page {} ({}): {}",
            failure.index, failure.page, failure.message
        )
    }));
    lines.join("\n")
}

pub fn present_progress(progress: &Progress) -> String {
    format!(
        "[{:>3.0}%] {}/{} {}",
        progress.fraction() * 100.0,
        progress.completed,
        progress.total,
        progress.current
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pagebook_application::PageFailure;
    use pagebook_domain::ThumbnailSize;

    use super::*;

    #[test]
    fn marks_selected_page() {
        let mut book = Book::new(
            PathBuf::from("/books/Comic/Comic.book"),
            vec!["Template.ora".to_string(), "One.ora".to_string()],
            ThumbnailSize::DEFAULT,
            DisplayMode::Grid,
        );
        book.select(Some(1)).expect("select");

        assert_eq!(present_page_row(&book, 0, "Template.ora"), " 0\tTemplate.ora");
        assert_eq!(present_page_row(&book, 1, "One.ora"), "*1\tOne.ora");
        assert!(present_book(&book)
            .starts_with("book Comic (2 pages, thumbnails=256px, mode=grid)"));
    }

    #[test]
    fn export_report_lists_failures() {
        let report = ExportReport {
            output_dir: PathBuf::from("out/Comic"),
            state: ExportState::CompletedWithErrors,
            exported: vec![PathBuf::from("out/Comic/0_Comic.jpg")],
            failures: vec![PageFailure {
                index: 1,
                page: "One.ora".to_string(),
                message: "decode error: bad zip".to_string(),
            }],
            skipped: 0,
        };

        let text = present_export_report(&report);

        assert_eq!(
            text,
            "export completed with errors: exported=1, failed=1, skipped=0 into out/Comic\n  page 1 (One.ora): decode error: bad zip"
        );
    }

    #[test]
    fn progress_shows_percentage() {
        let progress = Progress {
            completed: 1,
            total: 4,
            current: "One.ora".to_string(),
        };

        assert_eq!(present_progress(&progress), "[ 25%] 1/4 One.ora");
    }
}
