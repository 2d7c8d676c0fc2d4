//! Property tests for the heuristic-only pipeline.

use printquote_engine::Pipeline;
use printquote_estimate::{Adhesion, EstimateSource, PrintConfiguration, Support, Units};
use printquote_mesh::{analyze_mesh, write_stl, Mesh, Triangle};
use proptest::prelude::*;

fn box_stl(dx: f32, dy: f32, dz: f32) -> Vec<u8> {
    let v = |x: f32, y: f32, z: f32| [x * dx, y * dy, z * dz];
    let quads = [
        [v(0., 0., 0.), v(0., 1., 0.), v(1., 1., 0.), v(1., 0., 0.)],
        [v(0., 0., 1.), v(1., 0., 1.), v(1., 1., 1.), v(0., 1., 1.)],
        [v(0., 0., 0.), v(1., 0., 0.), v(1., 0., 1.), v(0., 0., 1.)],
        [v(0., 1., 0.), v(0., 1., 1.), v(1., 1., 1.), v(1., 1., 0.)],
        [v(0., 0., 0.), v(0., 0., 1.), v(0., 1., 1.), v(0., 1., 0.)],
        [v(1., 0., 0.), v(1., 1., 0.), v(1., 1., 1.), v(1., 0., 1.)],
    ];
    let triangles = quads
        .iter()
        .flat_map(|[a, b, c, d]| [Triangle::new(*a, *b, *c), Triangle::new(*a, *c, *d)])
        .collect();
    write_stl(&Mesh::new(triangles))
}

fn arb_config() -> impl Strategy<Value = PrintConfiguration> {
    (
        (0.01f64..1.0, 0.0f64..=100.0, 0u32..8, 0u32..10, 0u32..10),
        (1.0f64..400.0, 1.0f64..400.0, 1.0f64..400.0),
        (0usize..3, 0usize..4, any::<bool>(), 1.0f64..500.0),
    )
        .prop_map(
            |(
                (layer_height, infill_percent, wall_count, top_layers, bottom_layers),
                (print_speed, infill_speed, wall_speed),
                (support, adhesion, inches, scale_percent),
            )| PrintConfiguration {
                layer_height,
                infill_percent,
                wall_count,
                top_layers,
                bottom_layers,
                print_speed,
                infill_speed,
                wall_speed,
                support: [Support::None, Support::Buildplate, Support::Everywhere][support],
                adhesion: [Adhesion::None, Adhesion::Skirt, Adhesion::Brim, Adhesion::Raft]
                    [adhesion],
                units: if inches { Units::Inches } else { Units::Mm },
                scale_percent,
                ..Default::default()
            },
        )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn pipeline_is_total(
        config in arb_config(),
        dims in (0.1f32..200.0, 0.1f32..200.0, 0.1f32..200.0),
    ) {
        let stl = box_stl(dims.0, dims.1, dims.2);
        let result = runtime().block_on(Pipeline::default().run(&stl, &config)).unwrap();

        prop_assert!(result.print_time_min.is_finite());
        prop_assert!(result.print_time_min >= 0.0);
        prop_assert!(result.filament_meters.is_finite());
        prop_assert!(result.layers >= 10);
        prop_assert_eq!(result.source, EstimateSource::Heuristic);
    }

    #[test]
    fn doubling_scale_multiplies_volume_by_eight(
        dims in (1.0f32..100.0, 1.0f32..100.0, 1.0f32..100.0),
        scale in 10.0f64..200.0,
        inches in any::<bool>(),
    ) {
        let stl = box_stl(dims.0, dims.1, dims.2);
        let units = if inches { Units::Inches } else { Units::Mm };
        let single = PrintConfiguration { scale_percent: scale, units, ..Default::default() };
        let double = PrintConfiguration { scale_percent: scale * 2.0, ..single.clone() };

        let rt = runtime();
        let a = rt.block_on(Pipeline::default().run_with_report(&stl, &single)).unwrap();
        let b = rt.block_on(Pipeline::default().run_with_report(&stl, &double)).unwrap();

        let raw = analyze_mesh(&stl).unwrap();
        let factor = single.scale_factor();
        prop_assert!((a.geometry.volume_mm3 - raw.volume_mm3 * factor.powi(3)).abs()
            <= 1e-9 * a.geometry.volume_mm3.max(1.0));
        prop_assert!((b.geometry.volume_mm3 - 8.0 * a.geometry.volume_mm3).abs()
            <= 1e-9 * b.geometry.volume_mm3.max(1.0));
        prop_assert!((b.geometry.height_mm - 2.0 * a.geometry.height_mm).abs()
            <= 1e-9 * b.geometry.height_mm.max(1.0));
    }
}
