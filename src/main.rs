use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use viewcache::{
    application::{error::AppError, site},
    cache::{CacheConfig, CacheStore, MemoryStore},
    config::{self, BlockArgs, Command, PageArgs, RenderArgs},
    infra::{error::InfraError, telemetry},
    presentation::views::{LinkView, builtin_templates},
    BlockOptions, BlockRegistry, PageOptions, RenderCache, RequestContext,
};

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let messages = error.messages();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?messages, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    let cache_config = CacheConfig::from(&settings);
    let store = Arc::new(MemoryStore::new(&cache_config));

    match cli_args.command {
        Command::Page(args) => run_page(cache_config, store, args),
        Command::Block(args) => run_block(cache_config, store, args),
    }
}

fn build_render_cache(
    config: CacheConfig,
    store: Arc<MemoryStore>,
    blocks: BlockRegistry,
) -> RenderCache {
    let templates = Arc::new(builtin_templates(&config));
    RenderCache::new(config, store as Arc<dyn CacheStore>, templates, blocks)
}

fn request_context(args: &RenderArgs) -> RequestContext {
    let ctx = RequestContext::new().with_user(args.user.clone());
    match args.device.as_ref() {
        Some(device) => ctx.with_device(device.clone()),
        None => ctx,
    }
}

fn run_page(
    config: CacheConfig,
    store: Arc<MemoryStore>,
    args: PageArgs,
) -> Result<(), AppError> {
    let renderer = build_render_cache(config, Arc::clone(&store), BlockRegistry::new());
    let ctx = request_context(&args.render);
    let options = PageOptions {
        path: args.path,
        data: args.data,
        tags: args.render.tags.clone(),
        ttl: args.render.ttl,
    };

    for round in 1..=args.render.repeat {
        let html = renderer.get_html(&ctx, &options)?;
        info!(round, path = %options.path, cached_entries = store.len(), "rendered page");
        println!("{html}");
    }
    Ok(())
}

fn run_block(
    config: CacheConfig,
    store: Arc<MemoryStore>,
    args: BlockArgs,
) -> Result<(), AppError> {
    let links: Vec<LinkView> = serde_json::from_str(&args.links)
        .map_err(|err| AppError::validation(format!("invalid --links: {err}")))?;
    let renderer = build_render_cache(config, Arc::clone(&store), site::block_registry(links));
    let ctx = request_context(&args.render);
    let options = BlockOptions {
        path: args.path,
        class_name: args.class_name,
        tags: args.render.tags.clone(),
        query: args.query,
        ttl: args.render.ttl,
        locals: args.locals,
    };

    for round in 1..=args.render.repeat {
        let html = renderer
            .render_block(&ctx, &options)?
            .ok_or_else(|| AppError::block_not_found(options.path.as_str()))?;
        info!(round, path = %options.path, cached_entries = store.len(), "rendered block");
        println!("{html}");
    }
    Ok(())
}
