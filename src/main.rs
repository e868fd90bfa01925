//! Descent - headless runner
//!
//! Plays a run with a simple autopilot and logs a summary.
//!
//! Usage: `descent [TUNING.json [SEED]] [--seed N] [--frames N] [--dump-tuning]`

#[cfg(not(target_arch = "wasm32"))]
mod runner {
    use std::path::PathBuf;

    use clap::Parser;
    use descent::Tuning;
    use descent::consts::{MAX_SUBSTEPS, SIM_DT};
    use descent::sim::{GamePhase, Physics, SimEvent, Simulation, TickInput};

    const DEFAULT_SEED: u64 = 0x5eed;

    #[derive(Parser, Debug)]
    #[command(name = "descent")]
    #[command(about = "Play a headless descent run with an autopilot and log a summary")]
    pub struct Options {
        /// Tuning JSON file (built-in defaults when omitted)
        pub tuning: Option<PathBuf>,
        /// Seed, positional form
        #[arg(value_name = "SEED")]
        pub seed_pos: Option<u64>,
        /// Seed for the run
        #[arg(long, conflicts_with = "seed_pos")]
        pub seed: Option<u64>,
        /// Number of wall-clock frames to simulate
        #[arg(long, default_value_t = 60 * 60 * 5)]
        pub frames: u64,
        /// Print the effective tuning as JSON and exit
        #[arg(long)]
        pub dump_tuning: bool,
    }

    impl Options {
        pub fn seed(&self) -> u64 {
            self.seed.or(self.seed_pos).unwrap_or(DEFAULT_SEED)
        }
    }

    /// Fixed-step driver fed with uneven frame times
    struct Game {
        sim: Simulation,
        accumulator: f32,
        input: TickInput,
        runs: u32,
        best_score: u64,
        best_distance: u32,
        bounces: u64,
        evictions: u64,
    }

    impl Game {
        fn new(tuning: Tuning, seed: u64) -> Result<Self, descent::TuningError> {
            Ok(Self {
                sim: Simulation::new(tuning, seed)?,
                accumulator: 0.0,
                input: TickInput::default(),
                runs: 1,
                best_score: 0,
                best_distance: 0,
                bounces: 0,
                evictions: 0,
            })
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.autopilot();
                let input = self.input.clone();
                self.sim.tick(&input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.shoot = false;
                self.input.restart = false;
                self.collect_events();
            }
        }

        /// Steer under the nearest platform below and shoot enemies in line
        fn autopilot(&mut self) {
            if self.sim.phase() == GamePhase::GameOver {
                self.input.restart = true;
                return;
            }
            let physics = self.sim.physics();
            let Some(me) = physics.bounds(self.sim.player().body) else {
                return;
            };
            let below = self
                .sim
                .arena()
                .iter()
                .filter(|e| !e.destroyed && !e.is_bullet() && e.pos.y > me.bottom())
                .min_by(|a, b| a.pos.y.total_cmp(&b.pos.y));
            if let Some(target) = below {
                let dx = target.pos.x - me.center.x;
                self.input.horizontal = (dx / 40.0).clamp(-1.0, 1.0);
                self.input.shoot =
                    target.is_enemy() && dx.abs() < 12.0 && target.pos.y - me.center.y < 250.0;
            } else {
                self.input.horizontal = 0.0;
            }
        }

        fn collect_events(&mut self) {
            for event in self.sim.drain_events() {
                match event {
                    SimEvent::Bounce { .. } => self.bounces += 1,
                    SimEvent::Evicted { platforms, enemies } => {
                        self.evictions += (platforms + enemies) as u64
                    }
                    SimEvent::GameOver { score, distance } => {
                        self.best_score = self.best_score.max(score);
                        self.best_distance = self.best_distance.max(distance);
                    }
                    SimEvent::Restarted => self.runs += 1,
                    _ => {}
                }
            }
        }
    }

    pub fn run(opts: Options) -> Result<(), Box<dyn std::error::Error>> {
        let tuning = match &opts.tuning {
            Some(path) => Tuning::load(path)?,
            None => Tuning::default(),
        };
        if opts.dump_tuning {
            println!("{}", tuning.to_json()?);
            return Ok(());
        }

        let seed = opts.seed();
        log::info!("Descent (headless) starting with seed {}", seed);
        let mut game = Game::new(tuning, seed)?;
        for frame in 0..opts.frames {
            // Jittery frame pacing around 60 fps
            let dt = if frame % 3 == 0 { 0.020 } else { 0.015 };
            game.update(dt);
        }

        let hud = game.sim.hud();
        game.best_score = game.best_score.max(hud.score);
        game.best_distance = game.best_distance.max(hud.distance);
        let stats = game.sim.spawn_stats();
        log::info!(
            "Finished {} runs: best score {}, best distance {}m, {} bounces",
            game.runs,
            game.best_score,
            game.best_distance,
            game.bounces
        );
        log::info!(
            "Current run: score {}, level {}, {} platforms, {} enemies, {} contacts",
            hud.score,
            hud.level,
            hud.platforms,
            hud.enemies,
            hud.contacts
        );
        log::info!(
            "Spawned {} solid, {} breakable, {} enemies; cap hit {} times, {} evictions",
            stats.solid_spawned,
            stats.breakable_spawned,
            stats.enemies_spawned,
            stats.capped_top_ups,
            game.evictions
        );
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_positional_tuning_and_seed() {
            let opts = Options::try_parse_from(["descent", "hard.json", "42"]).unwrap();
            assert_eq!(opts.tuning, Some(PathBuf::from("hard.json")));
            assert_eq!(opts.seed(), 42);
            assert!(!opts.dump_tuning);
        }

        #[test]
        fn test_flags_and_defaults() {
            let opts = Options::try_parse_from(["descent"]).unwrap();
            assert_eq!(opts.seed(), DEFAULT_SEED);
            assert_eq!(opts.frames, 60 * 60 * 5);

            let opts = Options::try_parse_from([
                "descent",
                "--seed",
                "7",
                "--frames",
                "10",
                "--dump-tuning",
            ])
            .unwrap();
            assert_eq!(opts.tuning, None);
            assert_eq!(opts.seed(), 7);
            assert_eq!(opts.frames, 10);
            assert!(opts.dump_tuning);
        }

        #[test]
        fn test_bad_input_is_rejected() {
            assert!(Options::try_parse_from(["descent", "--seed", "many"]).is_err());
            assert!(Options::try_parse_from(["descent", "--bogus"]).is_err());
            assert!(Options::try_parse_from(["descent", "t.json", "1", "--seed", "2"]).is_err());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = runner::Options::parse();
    if let Err(e) = runner::run(opts) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless runner is native only
}
