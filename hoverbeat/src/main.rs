use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use nalgebra::Vector2;

use hoverbeat::{
    chart::{parse_chart_file, Chart, HitObject, ObjectId},
    config::Config,
    game::{
        conductor::{ClockSource, Conductor, ManualClock},
        input::{PointerSignal, SteadyRotation},
        judgement::{HitResult, JudgementOutcome, JudgementTarget},
        JudgementEngine,
    },
};

const DEFAULT_CONFIG_PATH: &str = "hoverbeat.toml";

/// Keeps the cursor on the earliest unresolved object.
struct AutoPilot {
    objects: Vec<HitObject>,
    radius: f64,
    cursor: Vector2<f64>,
    now: f64,
}

impl AutoPilot {
    fn new(chart: &Chart) -> Self {
        Self {
            objects: chart.hit_objects.clone(),
            radius: chart.difficulty.circle_radius(),
            cursor: Vector2::new(256.0, 192.0),
            now: f64::NEG_INFINITY,
        }
    }

    fn follow(&mut self, active: &[ObjectId], now: f64) {
        self.now = now;
        if let Some(object) = active.first().and_then(|id| self.objects.get(id.0)) {
            self.cursor = object.position_at(now);
        }
    }
}

impl PointerSignal for AutoPilot {
    fn is_on_object(&mut self, object: ObjectId) -> bool {
        self.objects
            .get(object.0)
            .map_or(false, |o| (o.position_at(self.now) - self.cursor).norm() <= self.radius)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    hits: usize,
    misses: usize,
}

#[derive(Debug, Default)]
struct SessionSummary {
    circles: Tally,
    slider_heads: Tally,
    checkpoints: Tally,
    sliders: Tally,
    spinners: Tally,
}

impl SessionSummary {
    fn record(&mut self, outcome: &JudgementOutcome) {
        let tally = match outcome.judgement.target {
            JudgementTarget::Circle => &mut self.circles,
            JudgementTarget::SliderHead => &mut self.slider_heads,
            JudgementTarget::SliderCheckpoint { .. } => &mut self.checkpoints,
            JudgementTarget::Slider { .. } => &mut self.sliders,
            JudgementTarget::Spinner { .. } => &mut self.spinners,
        };

        match outcome.judgement.result {
            HitResult::Hit => tally.hits += 1,
            HitResult::Miss => tally.misses += 1,
        }
    }

    fn log(&self) {
        for (name, tally) in [
            ("Circles", self.circles),
            ("Slider heads", self.slider_heads),
            ("Slider checkpoints", self.checkpoints),
            ("Sliders", self.sliders),
            ("Spinners", self.spinners),
        ] {
            log::info!("{name}: {} hit, {} missed", tally.hits, tally.misses);
        }
    }
}

fn load_chart(path: Option<&Path>) -> Chart {
    let Some(path) = path else {
        log::warn!("No chart given, using the fallback chart");
        return Chart::fallback();
    };

    match parse_chart_file(path) {
        Ok(parsed) => {
            if !parsed.warnings.is_empty() {
                log::warn!(
                    "{} warnings while parsing {}",
                    parsed.warnings.len(),
                    path.display()
                );
            }
            parsed.chart
        }
        Err(e) => {
            log::error!("{:#}, using the fallback chart", e);
            Chart::fallback()
        }
    }
}

fn play<C: ClockSource>(
    chart: Chart,
    clock: C,
    config: &Config,
    mut next_frame: impl FnMut(),
) -> SessionSummary {
    let mut autopilot = AutoPilot::new(&chart);
    let mut rotation = SteadyRotation::new(config.session.autoplay_rotation_deg_per_frame);
    let mut engine = JudgementEngine::new(chart, clock, &config.judgement);
    let mut summary = SessionSummary::default();

    while !engine.is_finished() {
        autopilot.follow(engine.active_objects(), engine.clock().now_ms());

        let report = engine.tick(&mut autopilot, &mut rotation);
        for outcome in &report.outcomes {
            summary.record(outcome);
        }

        next_frame();
    }

    summary
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let chart_arg = args.next().map(PathBuf::from);
    let config_path = args
        .next()
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    let config = Config::load(&config_path)?;
    let chart_path = chart_arg.or_else(|| config.session.chart_path.clone());
    let chart = load_chart(chart_path.as_deref());

    log::info!(
        "Playing {} - {} [{}], {} objects",
        chart.metadata.artist,
        chart.metadata.title,
        chart.metadata.version,
        chart.hit_objects.len()
    );

    let frame_duration_ms = config.session.frame_duration_ms();
    let summary = if config.session.realtime {
        let mut conductor = Conductor::new(config.session.pre_roll_ms);
        conductor.start();
        let frame = Duration::from_secs_f64(frame_duration_ms / 1000.0);
        play(chart, &conductor, &config, || thread::sleep(frame))
    } else {
        let clock = ManualClock::new(-config.session.pre_roll_ms);
        play(chart, &clock, &config, || clock.advance(frame_duration_ms))
    };

    summary.log();
    Ok(())
}

fn main() {
    let env = env_logger::Env::default()
        .filter_or("HOVERBEAT_LOG_LEVEL", "info")
        .write_style_or("HOVERBEAT_LOG_STYLE", "always");
    env_logger::init_from_env(env);

    log::info!("Starting Hoverbeat...");

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
