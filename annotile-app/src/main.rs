use anyhow::Context;
use annotile::prelude::*;
use fxhash::FxHashMap;

/// Headless walkthrough: load a map configuration, seed an in-memory
/// annotation service and drive the annotation layer through pan, zoom,
/// draw and drag, logging what the tiles and features do.
///
/// Usage: `annotile-app [web | aoi | <config.json>]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config(std::env::args().nth(1).as_deref())?;
    let mut map = Map::from_config(&config).context("building map")?;
    let service = Arc::new(
        MemoryAnnotationService::new(
            Arc::clone(map.pyramid()),
            Arc::clone(map.projection()),
            config.overlay.bin_grid,
        )
        .with_annotations(seed_annotations(&map)),
    );

    let mut layer = AnnotationLayer::new("annotations", &map, Arc::clone(&service), &config)
        .context("creating annotation layer")?;
    layer.state_mut().add_listener(|key| log::debug!("shared state changed: {}", key));

    report(&map, &mut layer).await;

    let event = map.zoom_in();
    layer.on_map_event(&map, event);
    report(&map, &mut layer).await;

    let width = f64::from(map.viewport().width);
    let event = map.pan_by(-width / 2.0, 0.0);
    layer.on_map_event(&map, event);
    report(&map, &mut layer).await;

    let center = ViewportPixel::new(i64::from(map.viewport().width / 2), i64::from(map.viewport().height / 2));
    log::info!(
        "center pixel is tile {} bin {}",
        layer.tile_key_at(&map, center),
        layer.bin_key_at(&map, center)
    );
    if layer.draw_at_viewport_pixel(&map, center).is_some() {
        log::info!("drew a new annotation at {:?}", map.mapper().viewport_to_geo(center));
    }

    let picked = layer
        .overlay()
        .features()
        .iter()
        .find(|f| f.attributes.is_some())
        .map(|f| (f.id, f.position));
    if let Some((id, position)) = picked {
        let target = position.offset(map.viewport().resolution_x() * 20.0, 0.0);
        if let Some(surface) = layer.select(id) {
            log::info!("selected {}: {:?}", id, surface);
        }
        layer.unselect(id);
        layer.begin_drag(id);
        layer.drag_to(id, target);
        if layer.complete_drag(id) {
            log::info!("moved {} to {:?}", id, map.projection().unproject(target));
        }
        layer.unselect(id);
    }
    layer.flush_mutations().await;

    let event = map.zoom_out();
    layer.on_map_event(&map, event);
    report(&map, &mut layer).await;

    log::info!(
        "service holds {} annotations after {} fetches and {} mutations",
        service.annotations().len(),
        service.fetch_count(),
        service.mutations().len()
    );
    Ok(())
}

fn load_config(arg: Option<&str>) -> anyhow::Result<MapConfig> {
    let config = match arg {
        None | Some("web") => MapConfig::web_default(),
        Some("aoi") => {
            let mut config = MapConfig::area_of_interest(Bounds::from_coords(-10.0, 35.0, 30.0, 60.0));
            config.viewport.zoom = 1;
            config.overlay.bin_grid = BinGrid::square(4);
            config
        }
        Some(path) => MapConfig::from_file(path).with_context(|| format!("reading {}", path))?,
    };
    Ok(config)
}

/// A ring of annotations around the initial view center
fn seed_annotations(map: &Map) -> Vec<Annotation> {
    let center = map.projection().unproject(map.viewport().center);
    let extent = map.extent();
    let origin = map.projection().unproject(extent.min);
    let span = (center.lon - origin.lon).abs().max(1e-6);

    (0..12)
        .map(|i| {
            let angle = f64::from(i) * std::f64::consts::TAU / 12.0;
            let radius = span * (0.2 + 0.06 * f64::from(i));
            let at = GeoCoord::new(center.lon + radius * angle.cos(), center.lat + radius * angle.sin() * 0.5);
            Annotation::new(at, &format!("P{}", i % 3), &format!("site {}", i), "")
        })
        .collect()
}

async fn report(map: &Map, layer: &mut AnnotationLayer<MemoryAnnotationService>) {
    let ready = layer.sync_and_redraw().await;
    let range = map
        .tile_range_in_view()
        .map(|r| format!("level {} x {}..={} y {}..={}", r.level, r.min_x, r.max_x, r.min_y, r.max_y))
        .unwrap_or_else(|| "nothing".to_string());

    let mut per_priority: FxHashMap<String, usize> = FxHashMap::default();
    for feature in layer.overlay().features() {
        if let Some(attributes) = &feature.attributes {
            *per_priority.entry(attributes.annotation.priority().to_string()).or_default() += 1;
        }
    }
    let mut priorities: Vec<_> = per_priority.into_iter().collect();
    priorities.sort();

    log::info!(
        "zoom {}: {} in view, {} features {:?}, {}",
        map.zoom(),
        range,
        layer.overlay().len(),
        priorities,
        match ready {
            Some(r) if r.is_degraded() => format!("degraded ({} tiles failed)", r.failed.len()),
            Some(_) => "ready".to_string(),
            None => "not ready".to_string(),
        }
    );
}
