//! Template processing and rendering through the public API

use ammonia::clean_text;
use seo_link_engine::cache::MemoryCache;
use seo_link_engine::config::LinksConfig;
use seo_link_engine::links::{FamilyTarget, LinkInjector, MemoryLinkCatalog, PageRole, SeoRenderer, SourcePage};
use seo_link_engine::seo::interpolation::collapse_whitespace;
use seo_link_engine::seo::{
    select_variation, select_variation_with_index, MemoryTemplateSource, SeoContext, SeoProcessor, SeoTemplates,
};
use std::sync::Arc;

fn bmw_320d() -> SeoContext {
    SeoContext {
        type_id: 9045,
        pg_id: 4,
        marque_id: Some(33),
        marque_name: "BMW".into(),
        modele_id: Some(33019),
        modele_name: "Série 3 (E46)".into(),
        type_name: "320 d".into(),
        power_ps: Some("136".into()),
        year_from: Some("1998".into()),
        year_to: Some("2001".into()),
        gamme_name: "Alternateur".into(),
        ..Default::default()
    }
}

fn processor() -> SeoProcessor {
    SeoProcessor::new(Arc::new(MemoryCache::new()))
}

#[test]
fn test_legacy_vehicle_line() {
    let out = processor()
        .process_template(
            "Alternateur #VMarque# #VModele# #VType# #VNbCh# ch #VAnnee#",
            &bmw_320d(),
        )
        .unwrap();
    assert_eq!(out, "Alternateur BMW Série 3 (E46) 320 d 136 ch 1998-2001");
}

#[test]
fn test_unresolved_switches_vanish() {
    let out = processor()
        .process_template("Test #CompSwitch_2# et #FamilySwitch_3#", &bmw_320d())
        .unwrap();
    assert_eq!(out, "Test et");
}

#[test]
fn test_min_price_dialects() {
    let ctx = SeoContext {
        min_price: Some(118.45),
        ..bmw_320d()
    };
    let p = processor();
    assert_eq!(p.process_template("#MinPrice#", &ctx).unwrap(), "à partir de 118.45€");
    assert_eq!(p.process_template("%min_price%", &ctx).unwrap(), "118.45€");

    let free = SeoContext {
        min_price: Some(0.0),
        ..bmw_320d()
    };
    assert_eq!(p.process_template("Prix #MinPrice#", &free).unwrap(), "Prix");
}

#[test]
fn test_whitespace_collapse_is_idempotent() {
    let once = collapse_whitespace("  a \n\t b   c ");
    assert_eq!(once, "a b c");
    assert_eq!(collapse_whitespace(&once), once);
}

#[test]
fn test_selector_is_stable() {
    let verbs = ["a", "b", "c"];
    let first = select_variation(&verbs, 17, 402, 1).unwrap();
    for _ in 0..10 {
        assert_eq!(select_variation(&verbs, 17, 402, 1).unwrap(), first);
    }
    let (index, value) = select_variation_with_index(&verbs, 17, 402, 1).unwrap();
    assert_eq!(index, 0);
    assert_eq!(*value, "a");

    let empty: [&str; 0] = [];
    assert!(select_variation(&empty, 1, 1, 0).is_err());
}

#[tokio::test]
async fn test_every_field_is_expanded() {
    let templates = SeoTemplates {
        h1: "#Gamme# %marque_name% %modele_name%".into(),
        title: "#Gamme# #VMarque# #VModele# #VType# | #PrixPasCher#".into(),
        description: "#VousPropose# #Gamme# pour #LinkCarAll#.".into(),
        content: "#Commander# votre #Gamme# #LinkCar#. #Switch_12#".into(),
        preview: "%gamme% %vehicle% %unknown_key%".into(),
    };
    let out = processor().process_templates(&templates, &bmw_320d()).await;

    assert!(out.success);
    assert_eq!(out.h1, "Alternateur BMW Série 3 (E46)");
    assert!(out.content.starts_with("commander votre Alternateur BMW"));
    assert!(!out.content.contains("Switch"));
    for field in [&out.h1, &out.title, &out.description, &out.content, &out.preview] {
        assert!(!field.contains('%'), "leaked modern token in {field:?}");
        assert!(!field.contains('#'), "leaked legacy token in {field:?}");
    }
    assert!(out.keywords.contains("pas cher"));
}

#[tokio::test]
async fn test_family_lookup_and_invalidation() {
    let source = MemoryTemplateSource::new();
    source
        .insert(
            4,
            SeoTemplates {
                h1: "#Gamme# #VMarque#".into(),
                ..Default::default()
            },
        )
        .await;
    let processor = processor().with_template_source(Arc::new(source.clone()));

    let first = processor.process_for_family(&bmw_320d()).await;
    assert_eq!(first.h1, "Alternateur BMW");

    source
        .insert(
            4,
            SeoTemplates {
                h1: "Nouveau #Gamme#".into(),
                ..Default::default()
            },
        )
        .await;
    // still served from cache until invalidated
    assert_eq!(processor.process_for_family(&bmw_320d()).await.h1, "Alternateur BMW");

    tokio_test::assert_ok!(processor.invalidate_cache(4, Some(9045)).await);
    assert_eq!(processor.process_for_family(&bmw_320d()).await.h1, "Nouveau Alternateur");
}

#[tokio::test]
async fn test_family_without_templates_renders_empty_fields() {
    let processor = processor().with_template_source(Arc::new(MemoryTemplateSource::new()));
    let out = processor.process_for_family(&bmw_320d()).await;
    assert!(out.success);
    assert_eq!(out.h1, "");
    assert!(!out.keywords.is_empty());
}

#[tokio::test]
async fn test_render_on_blog_page() {
    let catalog = MemoryLinkCatalog::new();
    catalog.insert(FamilyTarget::new(2, "Démarreur")).await;
    catalog.insert(FamilyTarget::new(7, "Courroie")).await;
    let renderer = SeoRenderer::new(
        processor(),
        LinkInjector::new(Arc::new(catalog), LinksConfig::default()),
    );

    let templates = SeoTemplates {
        h1: "#Gamme# #LinkGammeCar_2#".into(),
        content: "Notre boutique #VousPropose# #Gamme#. Voir #LinkGammeCar_2# et #LinkGamme_7#.".into(),
        ..Default::default()
    };
    let source = SourcePage::new(PageRole::Blog, "/blog/alternateur");
    let rendered = renderer.render(&templates, &bmw_320d(), &source).await;

    assert!(rendered.seo.success);
    // outside `content` markers flatten to the current family and vehicle
    assert_eq!(rendered.seo.h1, "Alternateur Alternateur BMW Série 3 (E46) 320 d");
    assert_eq!(rendered.links.links_injected, 2);
    assert_eq!(rendered.links.formulas[0].link_type, "LinkGammeCar");
    assert_eq!(rendered.links.formulas[1].link_type, "LinkGamme");
    assert_eq!(rendered.links.formulas[1].url, "/pieces/courroie-7.html");
    assert!(rendered
        .seo
        .content
        .contains(&format!("href=\"{}\"", clean_text("/pieces/courroie-7.html"))));
}
