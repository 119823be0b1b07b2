//! Basic example of building yearly heatmaps from a few synthetic tracks.
//!
//! Run with: cargo run --example basic_heatmap

use chrono::{TimeZone, Utc};
use gps_heatmap::{Activity, ActivityType, Extent, HeatmapConfig, LatLon};

/// A straight-ish track starting at `start`, one point every ~20m.
fn track(start: LatLon, points: usize, heading: (f64, f64)) -> Vec<LatLon> {
    (0..points)
        .map(|i| {
            LatLon::new(
                start.latitude + heading.0 * i as f64 * 0.0002,
                start.longitude + heading.1 * i as f64 * 0.0002,
            )
        })
        .collect()
}

fn main() {
    let helsinki = LatLon::new(60.1699, 24.9384);

    let activities = vec![
        Activity::new(
            Some("Commute".to_string()),
            Utc.with_ymd_and_hms(2021, 3, 2, 7, 45, 0).unwrap(),
            ActivityType::from_file_stem("2021-03-02-Commute-Ride"),
        )
        .with_points(track(helsinki, 200, (0.0, 1.0))),
        Activity::new(
            Some("Evening Run".to_string()),
            Utc.with_ymd_and_hms(2021, 9, 14, 18, 0, 0).unwrap(),
            ActivityType::Run,
        )
        .with_points(track(helsinki, 80, (1.0, 1.0))),
        Activity::new(
            None,
            Utc.with_ymd_and_hms(2022, 5, 21, 10, 30, 0).unwrap(),
            ActivityType::Ride,
        )
        .with_points({
            // Recording paused and resumed across town
            let mut points = track(helsinki, 100, (0.0, 1.0));
            points.extend(track(LatLon::new(60.20, 25.05), 100, (-1.0, 0.0)));
            points
        }),
    ];

    let config = HeatmapConfig {
        groups: vec!["yearly".parse().unwrap(), "years".parse().unwrap()],
        ..Default::default()
    };
    let projection = config.projection().unwrap();
    let clusterer = config.clusterer().unwrap();

    println!("GPS Heatmap Example\n");
    println!(
        "Config: projection={}, scale={}m/px, max_gap={}m, clusterer={}\n",
        config.projection, config.scale, config.max_gap, clusterer
    );

    for activity in &activities {
        println!("  {} - {:.0}m", activity, activity.distance());
    }

    let lines = gps_heatmap::load_lines(&activities, &projection, config.max_gap);
    println!("\nLoaded {} polylines\n", lines.len());

    for mode in &config.groups {
        let layers = match gps_heatmap::build_layers(&lines, *mode, &clusterer) {
            Ok(layers) => layers,
            Err(e) => {
                println!("{}: {}", mode, e);
                continue;
            }
        };

        println!("Mode '{}':", mode);
        for layer in &layers {
            let label = layer.key.map_or_else(|| "all".to_string(), |k| k.to_string());
            let size = layer
                .extent(config.extent_margin)
                .as_ref()
                .map(Extent::size)
                .unwrap_or((0, 0));
            let buckets = layer.heatmap.histogram().len();
            println!(
                "  {}: {} lines, {} cells, {} distinct heat values, image {}x{}px",
                label,
                layer.lines.len(),
                layer.heatmap.len(),
                buckets,
                size.0,
                size.1
            );
        }
        println!();
    }
}
