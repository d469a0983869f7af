use super::injector::{LinkInjectionResult, LinkInjector};
use super::roles::SourcePage;
use crate::seo::{ProcessedSeo, SeoContext, SeoProcessor, SeoTemplates};
use serde::{Deserialize, Serialize};

/// Processed fields with internal links applied to `content`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedSeo {
    pub seo: ProcessedSeo,
    pub links: LinkInjectionResult,
}

/// Template processing followed by link injection
#[derive(Clone)]
pub struct SeoRenderer {
    processor: SeoProcessor,
    injector: LinkInjector,
}

impl SeoRenderer {
    pub fn new(processor: SeoProcessor, injector: LinkInjector) -> Self {
        Self {
            processor,
            injector,
        }
    }

    pub fn processor(&self) -> &SeoProcessor {
        &self.processor
    }

    pub async fn render(&self, templates: &SeoTemplates, ctx: &SeoContext, source: &SourcePage) -> RenderedSeo {
        let seo = self.processor.process_templates(templates, ctx).await;
        self.finish(seo, ctx, source).await
    }

    pub async fn render_for_family(&self, ctx: &SeoContext, source: &SourcePage) -> RenderedSeo {
        let seo = self.processor.process_for_family(ctx).await;
        self.finish(seo, ctx, source).await
    }

    async fn finish(&self, mut seo: ProcessedSeo, ctx: &SeoContext, source: &SourcePage) -> RenderedSeo {
        if !LinkInjector::has_markers(&seo.content) {
            let links = LinkInjectionResult {
                content: seo.content.clone(),
                ..Default::default()
            };
            return RenderedSeo { seo, links };
        }

        let links = self.injector.inject(&seo.content, ctx, source).await;
        seo.content = links.content.clone();
        RenderedSeo { seo, links }
    }
}
