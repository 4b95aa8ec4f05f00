use async_trait::async_trait;
use std::fmt;
use tracing::{info, warn};

use crate::components::calendar::models::Window;
use crate::error::DigestResult;
use crate::report::Section;

// Export digest sources
pub mod calendar;
pub mod github;
pub mod jira;
pub mod slack;

/// A single digest source: one section of the report
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// Source name, matching its key in the sources config
    fn name(&self) -> &'static str;

    /// Report section heading
    fn heading(&self) -> &'static str;

    /// Collect the section contents for the report window
    async fn collect(&self, window: &Window) -> DigestResult<Section>;
}

/// Registry over all configured digest sources
pub struct SourceRegistry {
    sources: Vec<Box<dyn DigestSource>>,
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("source_count", &self.sources.len())
            .finish()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Register a source
    pub fn register<T: DigestSource + 'static>(&mut self, source: T) {
        info!("Registering digest source: {}", source.name());
        self.sources.push(Box::new(source));
    }

    /// Collect all sections in registration order.
    ///
    /// A failing source degrades to an empty section with a warning and
    /// never aborts the other sources.
    pub async fn collect_all(&self, window: &Window) -> Vec<Section> {
        let mut sections = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            info!("Collecting digest source: {}", source.name());
            match source.collect(window).await {
                Ok(section) => sections.push(section),
                Err(e) => {
                    warn!("Error collecting source {}: {:?}", source.name(), e);
                    sections.push(Section::empty(source.heading(), "(source unavailable)"));
                }
            }
        }
        sections
    }
}
