//! # POWERBURST Demo
//!
//! Types a line of text into a headless terminal, renders the bursts and
//! writes a PPM snapshot of the overlay.
//!
//! Usage: `powerburst_demo [config.toml] [snapshot.ppm]`

use std::time::Duration;

use powerburst::{
    ConfigStore, CursorFrame, EffectController, HeadlessHost, HostHooks, TerminalHost,
    FRAME_INTERVAL,
};

const TEXT: &str = "cargo run --release -p powerburst";
const CELL_WIDTH: f64 = 9.0;
const KEYSTROKE: Duration = Duration::from_millis(45);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    POWERBURST DEMO v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let config_path = args.get(1).filter(|a| a.as_str() != "-");
    let snapshot_path = args.get(2).map_or("powerburst.ppm", String::as_str);

    let config = match config_path {
        Some(path) => ConfigStore::from_path(path)?,
        None => ConfigStore::from_toml_str("[powerburst]\nshake = true\ncolorMode = \"rainbow\"")?,
    };

    let mut host = HeadlessHost::new(480, 120).with_origin(12.0, 8.0);
    let hooks = HostHooks::new().on_decorated(|| println!("  Terminal: decorated"));
    let mut effect = EffectController::with_seed(&config, 0x5EED).with_hooks(hooks);

    if !effect.decorated(&mut host) {
        println!("  Effect:   NOT ATTACHED (see log)");
        return Ok(());
    }

    let settings = effect.settings();
    println!("  Mode:     {}", settings.color_mode.keyword());
    println!("  Size:     {} px", settings.particle_size);
    println!("  Burst:    {}..={}", settings.min_spawn_count, settings.max_spawn_count);
    println!("  Cap:      {}", settings.maximum_particles);
    println!("  Shake:    {}", if settings.shake { "on" } else { "off" });
    println!();

    let mut frames = 0u32;
    for (column, _) in TEXT.chars().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let x = column as f64 * CELL_WIDTH;
        let cursor = CursorFrame::at(x, 60.0).with_color("#fce94f");
        effect.cursor_moved(&mut host, &cursor);

        // Let the keystroke play out at 60 Hz.
        let deadline = host.now() + KEYSTROKE;
        while host.now() + FRAME_INTERVAL <= deadline {
            match host.step(&mut effect) {
                Some(result) => {
                    result?;
                    frames += 1;
                }
                None => host.advance(FRAME_INTERVAL),
            }
        }
    }

    if let Some(canvas) = effect.surface() {
        canvas.save_ppm(snapshot_path)?;
        println!(
            "  Snapshot: {} ({} lit pixels)",
            snapshot_path,
            canvas.painted_pixels()
        );
    }

    frames += host.run_until_idle(&mut effect, 10_000)?;
    let stats = effect.stats();
    effect.detach(&mut host);

    println!();
    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Frames rendered:    {}", frames);
    println!("│ Bursts:             {}", stats.particles.bursts);
    println!("│ Particles spawned:  {}", stats.particles.spawned_total);
    println!("│ Faded out:          {}", stats.particles.faded_total);
    println!("│ Evicted (cap):      {}", stats.particles.overflow_total);
    println!("│ Shakes:             {} ({} dropped)", stats.shakes, stats.shakes_dropped);
    println!("│ Loop went idle:     {} times", stats.render.idle_transitions);
    println!("└─────────────────────────────────────────────────────────────────┘");

    Ok(())
}
