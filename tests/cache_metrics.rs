use std::collections::HashMap;
use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use viewcache::{
    CacheConfig, CacheKey, CacheStore, ContentProducer, DataMap, MemoryStore, PageOptions,
    RenderCache, RequestContext, TemplateSet,
};

fn renderer(config: CacheConfig) -> RenderCache {
    let store = Arc::new(MemoryStore::new(&config));
    let templates = TemplateSet::new().with("pages/home", |_data: &DataMap| {
        Ok("<h1>home</h1>".to_string())
    });
    RenderCache::new(
        config,
        store as Arc<dyn CacheStore>,
        Arc::new(templates) as Arc<dyn ContentProducer>,
        viewcache::BlockRegistry::new(),
    )
}

fn counters(snapshotter: &Snapshotter) -> HashMap<(String, Option<String>), u64> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let kind = key
                .labels()
                .find(|label| label.key() == "kind")
                .map(|label| label.value().to_string());
            match value {
                DebugValue::Counter(count) => Some(((key.name().to_string(), kind), count)),
                _ => None,
            }
        })
        .collect()
}

#[test]
fn render_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let renderer = renderer(CacheConfig {
            max_entries: 1,
            ..Default::default()
        });
        let ctx = RequestContext::new();

        let home = PageOptions::new("home").with_ttl(60);
        renderer.render_page(&ctx, &home).expect("miss");
        renderer.render_page(&ctx, &home).expect("hit");
        renderer
            .render_page(&ctx, &home.clone().with_ttl(0))
            .expect("bypass");
        renderer
            .render_page(&ctx, &home.with_tags(["lang-en"]))
            .expect("second key evicts the first");
    });

    let counters = counters(&snapshotter);

    let page = Some("page".to_string());
    let expected = [
        (("viewcache_render_cache_miss_total".to_string(), page.clone()), 2),
        (("viewcache_render_cache_hit_total".to_string(), page.clone()), 1),
        (("viewcache_render_cache_bypass_total".to_string(), page), 1),
        (("viewcache_store_evict_total".to_string(), None), 1),
    ];

    for (metric, count) in expected {
        assert_eq!(
            counters.get(&metric),
            Some(&count),
            "unexpected count for {metric:?}"
        );
    }
}

#[test]
fn caller_keys_are_counted_under_their_own_kind() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let renderer = renderer(CacheConfig::default());
        let key = CacheKey::from("view:custom:home");
        for _ in 0..2 {
            renderer
                .fetch_or_render(&key, "pages/home", &DataMap::new(), 60)
                .expect("rendered");
        }
    });

    let counters = counters(&snapshotter);
    let caller = Some("caller".to_string());
    assert_eq!(
        counters.get(&("viewcache_render_cache_miss_total".to_string(), caller.clone())),
        Some(&1)
    );
    assert_eq!(
        counters.get(&("viewcache_render_cache_hit_total".to_string(), caller)),
        Some(&1)
    );
}
