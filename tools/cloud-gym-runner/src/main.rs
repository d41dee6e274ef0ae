use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use env_logger::Builder;
use rand::prelude::*;
use rand_pcg::Pcg64;

use cloud_gym::core::job::parse_jobs;
use cloud_gym::{Episode, SimulationSettings};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Agent {
    /// Never changes the fleet
    Noop,
    /// Picks uniformly random actions
    Random,
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Plays a single episode of the cloud provisioning simulation
struct Args {
    /// Path to YAML file with simulation settings
    #[arg(short, long)]
    config: PathBuf,

    /// Path to JSON file with jobs
    #[arg(short, long)]
    jobs: PathBuf,

    /// Agent choosing actions
    #[arg(short, long, value_enum, default_value_t = Agent::Noop)]
    agent: Agent,

    /// Random seed
    #[arg(short, long, default_value_t = 123)]
    seed: u64,

    /// Step limit overriding the episode length from settings
    #[arg(short, long)]
    max_steps: Option<u64>,
}

fn random_action(rng: &mut Pcg64, settings: &SimulationSettings, running_vms: usize) -> [i64; 4] {
    [
        rng.gen_range(0..3),
        rng.gen_range(0..settings.hosts_count.max(1) as i64),
        rng.gen_range(0..running_vms.max(1) as i64),
        rng.gen_range(0..3),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let mut settings = SimulationSettings::from_file(&args.config.to_string_lossy())?;
    if let Some(max_steps) = args.max_steps {
        settings.max_episode_length = max_steps;
    }
    let jobs = parse_jobs(&std::fs::read_to_string(&args.jobs)?)?;
    log::info!("Loaded {} jobs from {}", jobs.len(), args.jobs.display());

    let mut rng = Pcg64::seed_from_u64(args.seed);
    let mut episode = Episode::new("Sim0", settings.clone(), &jobs);
    episode.reset(args.seed);

    let mut steps = 0;
    let mut total_reward = 0.;
    let mut invalid_actions = 0;
    let result = loop {
        let action = match args.agent {
            Agent::Noop => [0; 4],
            Agent::Random => {
                let running_vms = episode
                    .simulation()
                    .map(|simulation| simulation.datacenter().running_vms().count())
                    .unwrap_or(0);
                random_action(&mut rng, &settings, running_vms)
            }
        };
        let result = episode.step(&action)?;
        steps += 1;
        total_reward += result.reward;
        if !result.info.is_valid {
            invalid_actions += 1;
        }
        if result.terminated || result.truncated {
            break result;
        }
    };

    println!("Steps executed: {}", steps);
    println!("Total reward: {:.6}", total_reward);
    println!("Invalid actions: {}", invalid_actions);
    println!("Final clock: {:.3}", episode.clock());
    println!("Peak running VMs: {}", result.info.peak_running_vms);
    println!("Peak waiting jobs: {}", result.info.peak_waiting_jobs);
    if result.terminated {
        println!("Episode terminated: all jobs finished");
    } else {
        println!("Episode truncated: step limit reached");
    }
    Ok(())
}
