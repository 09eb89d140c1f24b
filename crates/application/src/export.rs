use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use pagebook_domain::{
    output_file_name, page_number_padding, Book, ErrorPolicy, ExportJob,
};

use crate::{ApplicationError, BookStorage, ImageHost, Progress};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Configured,
    Running,
    Completed,
    CompletedWithErrors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub index: usize,
    pub page: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub state: ExportState,
    pub exported: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    /// Pages left unexported because the job aborted on a failure.
    pub skipped: usize,
}

/// Directory an export of `book` writes into.
pub fn export_output_dir(book: &Book, job: &ExportJob) -> PathBuf {
    job.destination.join(book.name())
}

pub(crate) struct ExportPipeline<'a> {
    storage: &'a dyn BookStorage,
    host: &'a dyn ImageHost,
}

impl<'a> ExportPipeline<'a> {
    pub(crate) fn new(storage: &'a dyn BookStorage, host: &'a dyn ImageHost) -> Self {
        Self { storage, host }
    }

    /// Exports every page in the job's range. A page that fails is recorded
    /// in the report; the remaining pages still run unless the job asks to
    /// abort.
    pub(crate) fn run(
        &self,
        book: &Book,
        job: &ExportJob,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<ExportReport, ApplicationError> {
        let range = job.resolve_range(book.page_count())?;
        let output_dir = export_output_dir(book, job);
        if self.storage.is_dir(&output_dir) && !self.storage.is_empty_dir(&output_dir) {
            info!("overwriting files in {}", output_dir.display());
        }
        self.storage.create_dir_all(&output_dir)?;

        let padding = page_number_padding(book.page_count());
        let total = range.count();
        let mut report = ExportReport {
            output_dir,
            state: ExportState::Configured,
            exported: Vec::with_capacity(total),
            failures: Vec::new(),
            skipped: 0,
        };

        info!(
            "exporting {} pages of {:?} to {}",
            total,
            book.name(),
            report.output_dir.display()
        );
        report.state = ExportState::Running;

        for (done, index) in range.indices().enumerate() {
            let page = book.page(index)?.to_string();
            progress(&Progress {
                completed: done,
                total,
                current: page.clone(),
            });

            let file_name = output_file_name(
                &job.naming,
                index,
                padding,
                book.name(),
                &page,
                job.format.extension(),
            );
            let target = report.output_dir.join(file_name);

            match self.export_page(book, job, index, &target) {
                Ok(()) => {
                    debug!("exported page {index} to {}", target.display());
                    report.exported.push(target);
                }
                Err(error) => {
                    warn!("export of page {index} ({page}) failed: {error}");
                    report.failures.push(PageFailure {
                        index,
                        page,
                        message: error.to_string(),
                    });
                    if job.on_error == ErrorPolicy::Abort {
                        report.skipped = total - done - 1;
                        break;
                    }
                }
            }
        }

        progress(&Progress {
            completed: total - report.skipped,
            total,
            current: String::new(),
        });

        report.state = if report.failures.is_empty() {
            ExportState::Completed
        } else {
            ExportState::CompletedWithErrors
        };
        info!(
            "export finished: {} written, {} failed",
            report.exported.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn export_page(
        &self,
        book: &Book,
        job: &ExportJob,
        index: usize,
        target: &Path,
    ) -> Result<(), ApplicationError> {
        let mut document = self.host.open_document(&book.page_path(index)?)?;

        if !job.tags.is_noop() {
            for (layer_index, layer) in document.layers().into_iter().enumerate() {
                let visible = job.tags.resolve(&layer.name, layer.visible);
                if visible != layer.visible {
                    document.set_layer_visible(layer_index, visible)?;
                }
            }
        }

        if job.format.should_flatten() {
            document.flatten();
        }

        if let Some(growth) = job
            .margins
            .grow(index, document.width(), document.height())?
        {
            document.resize_canvas(growth, job.margin_fill)?;
        }

        let (width, height) = job.scale.target(document.width(), document.height())?;
        if (width, height) != (document.width(), document.height()) {
            document.scale(width, height, job.interpolation)?;
        }

        document.export(target, &job.format)
    }
}
