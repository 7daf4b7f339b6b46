//! Benchmark for one render-loop frame.
//!
//! TARGET: a 500-particle frame on a 1920x1080 software canvas stays inside
//! a 60 Hz budget.
//!
//! Run with: cargo bench --package powerburst_render --bench frame_benchmark

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use powerburst_core::{Palette, ParticleLimits, ParticleSystem, Vec2};
use powerburst_render::{CommandSurface, PixelCanvas, RenderLoop};

fn loaded_system() -> ParticleSystem {
    let palette = Palette::rainbow();
    let mut system = ParticleSystem::with_seed(ParticleLimits::fixed(12, 500), 42);
    let mut x = 100.0;
    while system.len() < 500 {
        let _ = system.spawn(Vec2::new(x, 540.0), &palette);
        x += 9.0;
    }
    system
}

fn benchmark_pixel_canvas(c: &mut Criterion) {
    let mut canvas = PixelCanvas::new(1920, 1080);
    let mut render_loop = RenderLoop::new();
    c.bench_function("frame_pixel_canvas_500", |b| {
        b.iter_batched(
            loaded_system,
            |mut system| black_box(render_loop.render(&mut canvas, &mut system, 3)),
            BatchSize::SmallInput,
        );
    });
}

fn benchmark_command_surface(c: &mut Criterion) {
    let mut surface = CommandSurface::new(1920, 1080);
    let mut render_loop = RenderLoop::new();
    c.bench_function("frame_command_surface_500", |b| {
        b.iter_batched(
            loaded_system,
            |mut system| {
                let result = render_loop.render(&mut surface, &mut system, 3);
                black_box(surface.instance_bytes());
                surface.drain();
                result
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, benchmark_pixel_canvas, benchmark_command_surface);
criterion_main!(benches);
