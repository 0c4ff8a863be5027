//! Handler bundles: a producer plus its optional guards and issue reporters

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProduceError;
use crate::guard::{ContentGuard, ContentIssueReporter, VariantGuard, VariantIssueReporter, VariantGuards};

/// Renders content into text
///
/// Plain synchronous closures taking `(&Value, Option<&str>)` are producers too.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, content: &Value, variant: Option<&str>) -> Result<String, ProduceError>;
}

#[async_trait]
impl<F> Producer for F
where
    F: Fn(&Value, Option<&str>) -> Result<String, ProduceError> + Send + Sync,
{
    async fn produce(&self, content: &Value, variant: Option<&str>) -> Result<String, ProduceError> {
        self(content, variant)
    }
}

/// The functions a template module exposes
#[derive(Clone)]
pub struct HandlerBundle {
    pub producer: Arc<dyn Producer>,
    pub content_guard: Option<ContentGuard>,
    pub content_issue_reporter: Option<ContentIssueReporter>,
    pub variant_guard: Option<VariantGuard>,
    pub variant_issue_reporter: Option<VariantIssueReporter>,
}

impl HandlerBundle {
    /// Create a bundle with a producer and no guards
    pub fn new(producer: Arc<dyn Producer>) -> Self {
        Self {
            producer,
            content_guard: None,
            content_issue_reporter: None,
            variant_guard: None,
            variant_issue_reporter: None,
        }
    }

    /// Create a bundle from a synchronous rendering function
    pub fn from_fn<F>(producer: F) -> Self
    where
        F: Fn(&Value, Option<&str>) -> Result<String, ProduceError> + Send + Sync + 'static,
    {
        Self::new(Arc::new(producer))
    }

    pub fn with_content_guard(mut self, guard: ContentGuard) -> Self {
        self.content_guard = Some(guard);
        self
    }

    pub fn with_content_issue_reporter(mut self, reporter: ContentIssueReporter) -> Self {
        self.content_issue_reporter = Some(reporter);
        self
    }

    pub fn with_variant_guard(mut self, guard: VariantGuard) -> Self {
        self.variant_guard = Some(guard);
        self
    }

    pub fn with_variant_issue_reporter(mut self, reporter: VariantIssueReporter) -> Self {
        self.variant_issue_reporter = Some(reporter);
        self
    }

    /// Attach a content guard and reporter pair
    pub fn with_content_guards(self, (guard, reporter): (ContentGuard, ContentIssueReporter)) -> Self {
        self.with_content_guard(guard).with_content_issue_reporter(reporter)
    }

    /// Attach all four variant-aware guards at once
    pub fn with_variant_guards(self, guards: VariantGuards) -> Self {
        self.with_content_guard(guards.content_guard)
            .with_content_issue_reporter(guards.content_issue_reporter)
            .with_variant_guard(guards.variant_guard)
            .with_variant_issue_reporter(guards.variant_issue_reporter)
    }
}

impl fmt::Debug for HandlerBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBundle")
            .field("content_guard", &self.content_guard.is_some())
            .field("content_issue_reporter", &self.content_issue_reporter.is_some())
            .field("variant_guard", &self.variant_guard.is_some())
            .field("variant_issue_reporter", &self.variant_issue_reporter.is_some())
            .finish_non_exhaustive()
    }
}
