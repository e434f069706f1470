use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::NaiveDate;

use crate::{
    assets::fetch::{HttpImageSource, ImageSource},
    compose::{ComposedDocument, CompositionInput, PageComposer},
    export::{DocumentExporter, report_file_name},
    foundation::{core::ReportSettings, error::ReportResult},
    model::{catalog::Configuration, session::SessionInput},
    render::{MarkupRasterizer, SvgRasterizer},
    store::ConfigurationStore,
};

/// Result of one successful generation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedReport {
    pub path: PathBuf,
    pub file_name: String,
    pub page_count: usize,
}

/// Validate, compose and export a report.
pub struct ReportGenerator {
    composer: PageComposer,
    exporter: DocumentExporter,
}

impl ReportGenerator {
    pub fn new(
        settings: ReportSettings,
        rasterizer: Arc<dyn MarkupRasterizer>,
        images: Arc<dyn ImageSource>,
    ) -> ReportResult<Self> {
        settings.validate()?;
        Ok(Self {
            composer: PageComposer::new(settings, rasterizer, images),
            exporter: DocumentExporter::default(),
        })
    }

    /// HTTP image loading plus the SVG cover rasterizer with system fonts.
    pub fn with_defaults(settings: ReportSettings) -> ReportResult<Self> {
        let images: Arc<dyn ImageSource> = Arc::new(HttpImageSource::new(Duration::from_secs(
            settings.http_timeout_secs,
        ))?);
        let rasterizer = Arc::new(SvgRasterizer::new(
            Arc::clone(&images),
            settings.cover_jpeg_quality,
        ));
        Self::new(settings, rasterizer, images)
    }

    pub fn settings(&self) -> &ReportSettings {
        self.composer.settings()
    }

    /// Check preconditions and build the page sequence without writing anything.
    pub async fn compose(
        &self,
        session: &SessionInput,
        config: &Configuration,
        issued_on: NaiveDate,
    ) -> ReportResult<ComposedDocument> {
        let session_date = session.validate()?;
        Ok(self
            .compose_checked(session, session_date, config, issued_on)
            .await)
    }

    #[tracing::instrument(skip_all, fields(client = %session.client_name))]
    pub async fn generate(
        &self,
        session: &SessionInput,
        config: &Configuration,
        issued_on: NaiveDate,
        out_dir: &Path,
    ) -> ReportResult<GeneratedReport> {
        let session_date = session.validate()?;
        self.generate_checked(session, session_date, config, issued_on, out_dir)
            .await
    }

    /// Read the current configuration from `store`, then generate as [`Self::generate`] does.
    ///
    /// Preconditions are checked before the store is touched.
    #[tracing::instrument(skip_all, fields(client = %session.client_name))]
    pub async fn generate_from_store(
        &self,
        store: &dyn ConfigurationStore,
        session: &SessionInput,
        issued_on: NaiveDate,
        out_dir: &Path,
    ) -> ReportResult<GeneratedReport> {
        let session_date = session.validate()?;
        let config = store.read().await?;
        self.generate_checked(session, session_date, &config, issued_on, out_dir)
            .await
    }

    async fn compose_checked(
        &self,
        session: &SessionInput,
        session_date: NaiveDate,
        config: &Configuration,
        issued_on: NaiveDate,
    ) -> ComposedDocument {
        let items = config.selected_items(session);
        if items.len() < session.selected_item_ids.len() {
            tracing::debug!(
                requested = session.selected_item_ids.len(),
                found = items.len(),
                "ignoring selected ids absent from the catalog"
            );
        }
        let input = CompositionInput {
            session,
            session_date,
            items,
            cover_image: &config.cover_settings.background_image,
            introduction_text: &config.introduction_text,
            issued_on,
        };
        self.composer.compose(&input).await
    }

    async fn generate_checked(
        &self,
        session: &SessionInput,
        session_date: NaiveDate,
        config: &Configuration,
        issued_on: NaiveDate,
        out_dir: &Path,
    ) -> ReportResult<GeneratedReport> {
        tracing::info!(
            selected = session.selected_item_ids.len(),
            out_dir = %out_dir.display(),
            "generating report"
        );
        let doc = self
            .compose_checked(session, session_date, config, issued_on)
            .await;
        let file_name = report_file_name(&session.client_name, session_date);
        let path = self.exporter.export(&doc, out_dir, &file_name).await?;

        tracing::info!(pages = doc.len(), file = %file_name, "report generated");
        Ok(GeneratedReport {
            path,
            file_name,
            page_count: doc.len(),
        })
    }
}
