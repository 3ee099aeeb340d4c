//! Physics core benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- narrowphase

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec3};
use rein_physics::broadphase::{AllPairs, Proxy};
use rein_physics::narrowphase::{clip, detect_contacts_3d, gjk, sat, EpaSettings, Penetration};
use rein_physics::shape::WorldPolyhedron;
use rein_physics::{
    attach_body, sync_transforms, Aabb, BodyDesc, BodyHandle, Collider3, ConvexPolyhedron, Dim3,
    PhysicsConfig3, PhysicsScene3, PolytopeAlgorithm, Transform3,
};

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn sphere_proxies(n: usize, spacing: f32) -> Vec<Proxy<Dim3>> {
    let side = (n as f32).cbrt().ceil() as usize;
    (0..n)
        .map(|i| {
            let center = Vec3::new(
                (i % side) as f32,
                ((i / side) % side) as f32,
                (i / (side * side)) as f32,
            ) * spacing;
            Proxy {
                handle: BodyHandle::from_raw_parts(i as u32, 0),
                aabb: Aabb::from_center_radius(center, 0.5),
                is_static: false,
            }
        })
        .collect()
}

/// Ground plus a grid of boxes resting on it.
fn resting_boxes(n: usize, config: PhysicsConfig3) -> PhysicsScene3 {
    let mut scene = PhysicsScene3::new(config);
    let _ = scene.add_body(BodyDesc::fixed(Collider3::half_space(Vec3::Y, 0.0)));
    let side = (n as f32).sqrt().ceil() as usize;
    for i in 0..n {
        let position = Vec3::new((i % side) as f32 * 1.5, 0.5, (i / side) as f32 * 1.5);
        let _ = scene.add_body(
            BodyDesc::new(Collider3::cuboid(Vec3::splat(0.5))).with_position(position),
        );
    }
    scene
}

/// Columns of boxes falling onto the ground.
fn falling_stacks(columns: usize, height: usize) -> PhysicsScene3 {
    let mut scene = PhysicsScene3::default();
    let _ = scene.add_body(BodyDesc::fixed(Collider3::half_space(Vec3::Y, 0.0)));
    for c in 0..columns {
        for h in 0..height {
            let position = Vec3::new(c as f32 * 2.0, 0.6 + h as f32 * 1.1, 0.0);
            let _ = scene.add_body(
                BodyDesc::new(Collider3::cuboid(Vec3::splat(0.5))).with_position(position),
            );
        }
    }
    scene
}

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn bench_broadphase(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("broadphase/dense");
        for &n in &[100, 500, 1000] {
            let proxies = sphere_proxies(n, 0.8);
            group.bench_with_input(BenchmarkId::from_parameter(n), &proxies, |b, proxies| {
                b.iter(|| AllPairs::new().find_pairs(proxies));
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/sparse");
        for &n in &[100, 500, 1000] {
            let proxies = sphere_proxies(n, 5.0);
            group.bench_with_input(BenchmarkId::from_parameter(n), &proxies, |b, proxies| {
                b.iter(|| AllPairs::new().find_pairs(proxies));
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    let hull = ConvexPolyhedron::cuboid(Vec3::splat(0.5));
    let a = WorldPolyhedron::new(&hull, &Transform3::identity());
    let hit = Transform3::from_position_rotation(
        Vec3::new(0.8, 0.2, 0.1),
        Quat::from_rotation_y(0.4) * Quat::from_rotation_x(0.3),
    );
    let b_hit = WorldPolyhedron::new(&hull, &hit);
    let miss = Transform3::from_position(Vec3::new(3.0, 0.0, 0.0));
    let b_miss = WorldPolyhedron::new(&hull, &miss);
    let settings = EpaSettings::from(&PhysicsConfig3::default());

    {
        let mut group = c.benchmark_group("narrowphase/gjk");
        group.bench_function("intersecting", |b| {
            b.iter(|| gjk::intersect_3d(&a, &b_hit));
        });
        group.bench_function("separated", |b| {
            b.iter(|| gjk::intersect_3d(&a, &b_miss));
        });
        group.bench_function("distance", |b| {
            b.iter(|| gjk::distance::<Dim3, _, _>(&a, &b_miss));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/epa");
        group.bench_function("box_box", |b| {
            b.iter(|| Dim3::penetration(&a, &b_hit, settings));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/sat");
        group.bench_function("intersecting", |b| {
            b.iter(|| sat::polyhedra(&a, &b_hit));
        });
        group.bench_function("separated", |b| {
            b.iter(|| sat::polyhedra(&a, &b_miss));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/clip");
        let resting = Transform3::from_position(Vec3::new(0.1, 0.99, -0.05));
        let b_resting = WorldPolyhedron::new(&hull, &resting);
        if let Some(separation) = sat::polyhedra(&a, &b_resting) {
            group.bench_function("face_face", |b| {
                b.iter(|| clip::polyhedra(&a, &b_resting, &separation, 0.02));
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/dispatch");
        let cube = Collider3::cuboid(Vec3::splat(0.5));
        let sphere = Collider3::sphere(0.5);
        let capsule = Collider3::capsule(0.3, 0.5);
        let ta = Transform3::identity();
        let tb = Transform3::from_position(Vec3::new(0.0, 0.95, 0.0));

        for algorithm in [PolytopeAlgorithm::GjkEpa, PolytopeAlgorithm::Sat] {
            let config = PhysicsConfig3 {
                polytope_algorithm: algorithm,
                ..Default::default()
            };
            let name = format!("box_box_{algorithm:?}");
            group.bench_function(name, |b| {
                b.iter(|| {
                    detect_contacts_3d(&cube.world_space(&ta), &cube.world_space(&tb), &config)
                });
            });
        }

        let config = PhysicsConfig3::default();
        group.bench_function("sphere_box", |b| {
            b.iter(|| {
                detect_contacts_3d(&sphere.world_space(&tb), &cube.world_space(&ta), &config)
            });
        });
        group.bench_function("capsule_box", |b| {
            b.iter(|| {
                detect_contacts_3d(&capsule.world_space(&tb), &cube.world_space(&ta), &config)
            });
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

fn bench_solver(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("solver/iterations");
        for &iterations in &[1, 4, 10, 20] {
            let config = PhysicsConfig3 {
                solver_iterations: iterations,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::from_parameter(iterations),
                &config,
                |b, config| {
                    b.iter_batched(
                        || resting_boxes(100, config.clone()),
                        |mut scene| scene.frame_step(1.0 / 60.0),
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/step");
        group.sample_size(30);
        for &n in &[10, 50, 100] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || resting_boxes(n, PhysicsConfig3::default()),
                    |mut scene| scene.step(1.0 / 60.0),
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/stacks_60frames");
        group.sample_size(10);
        for &height in &[2, 4, 8] {
            group.bench_with_input(BenchmarkId::from_parameter(height), &height, |b, &height| {
                b.iter_batched(
                    || falling_stacks(4, height),
                    |mut scene| {
                        for _ in 0..60 {
                            scene.frame_step(1.0 / 60.0);
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/ecs_sync");
        let mut scene = PhysicsScene3::default();
        let mut world = hecs::World::new();
        for i in 0..500 {
            let entity = world.spawn(());
            let desc = BodyDesc::new(Collider3::sphere(0.5))
                .with_position(Vec3::new(i as f32 * 2.0, 5.0, 0.0));
            let _ = attach_body(&mut scene, &mut world, entity, desc);
        }
        group.bench_function("sync_transforms_500", |b| {
            b.iter(|| sync_transforms(&scene, &mut world));
        });
        group.finish();
    }
}

criterion_group!(
    benches,
    bench_broadphase,
    bench_narrowphase,
    bench_solver,
    bench_pipeline,
);
criterion_main!(benches);
