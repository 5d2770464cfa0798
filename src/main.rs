use std::{
    fs::{self, File, OpenOptions},
    io::{prelude::*, BufReader, BufWriter},
    path::PathBuf,
};

use chrono::Local;
use log::{debug, error, info};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use vne_greedy::algorithms::batch::{self, sort_by_revenue};
use vne_greedy::error::{EmbedError, NetworkError, RequestError, UnknownName};
use vne_greedy::models::{
    network::Network,
    request::{RequestGenerator, VirtualNetworkRequest},
    topology::{FatTree, LeafSpine, RandomGraph, SubstrateGenerator, Topology},
};
use vne_greedy::operators::{
    mapping::GreedyMapping, path_finder::PathSearch, ranking::Algorithm,
};
use vne_greedy::utilities::{metrics::RunMetrics, stopwatch::Stopwatch};

#[derive(Debug, Error)]
enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Substrate file error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Could not start the thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    UnknownName(#[from] UnknownName),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
}

#[derive(Debug, Deserialize)]
struct Settings {
    results_folder: String,
    seed: u64,
    iterations: usize,
    threads: usize,
    algorithms: Vec<String>,
    num_vnrs_list: Vec<usize>,
    path_search: String,
    max_path_expansions: usize,
    topology: String,
    num_ports: usize,
    num_spine: usize,
    num_nodes: usize,
    link_probability: f64,
    node_capacity: (usize, usize),
    link_capacity: (usize, usize),
    substrate_file: Option<String>,
    vnr_nodes: (usize, usize),
    cpu_demand: (usize, usize),
    bw_demand: (usize, usize),
    vnr_link_probability: f64,
}

fn main() {
    pretty_env_logger::init_timed();

    if let Err(err) = run() {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunnerError> {
    let mut config = config::Config::default();
    config
        .merge(config::File::with_name("Config"))?
        .merge(config::Environment::with_prefix("APP"))?;
    let settings: Settings = config.try_into()?;

    let threads = match settings.threads {
        0 => num_cpus::get(),
        n => n,
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;

    let algorithms = settings
        .algorithms
        .iter()
        .map(|name| name.parse::<Algorithm>())
        .collect::<Result<Vec<_>, _>>()?;
    let topology: Topology = settings.topology.parse()?;
    let path_search = match settings.path_search.as_str() {
        "bfs" => PathSearch::Bfs,
        "enumerate" => PathSearch::Enumerate {
            max_expansions: settings.max_path_expansions,
        },
        other => {
            return Err(UnknownName {
                kind: "path search",
                name: other.to_string(),
            }
            .into())
        }
    };

    let results_folder = PathBuf::new().join(&settings.results_folder);
    let started = Local::now().to_rfc3339();

    info!(
        "Starting {} iterations on {} with {} threads",
        settings.iterations, topology, threads
    );

    let mut file = get_file(&results_folder, "results.csv")?;
    writeln!(
        file,
        "started,iteration,num_vnrs,algorithm,{}",
        RunMetrics::csv_header()
    )?;

    for iteration in 0..settings.iterations {
        let seed = settings.seed + iteration as u64;
        let mut rng = StdRng::seed_from_u64(seed);

        let substrate = load_substrate(&settings, topology, &mut rng)?;

        for &num_vnrs in &settings.num_vnrs_list {
            let mut requests = generate_requests(&settings, num_vnrs, &mut rng)?;
            sort_by_revenue(&mut requests);

            // Every algorithm starts from its own copy of the same substrate
            let runs = algorithms
                .par_iter()
                .map(|&algorithm| {
                    let mapping = GreedyMapping::from_algorithm(algorithm, seed, path_search);
                    let mut network = substrate.clone();

                    let stopwatch = Stopwatch::start_new();
                    let results = batch::run(&mut network, &requests, &mapping, |i, result| {
                        debug!("{} [{}]: {}", algorithm, i, result)
                    })?;
                    let metrics = RunMetrics::collect(&substrate, &network, &results, stopwatch.stop());

                    Ok((algorithm, metrics, network))
                })
                .collect::<Result<Vec<_>, EmbedError>>()?;

            for (algorithm, metrics, network) in runs {
                info!(
                    "Iteration {}, {} requests, {}: accepted {}/{}, revenue/cost {:.3}",
                    iteration,
                    num_vnrs,
                    algorithm,
                    metrics.num_accepted,
                    metrics.num_requests,
                    metrics.revenue_to_cost
                );

                writeln!(
                    file,
                    "{},{},{},{},{}",
                    started,
                    iteration,
                    num_vnrs,
                    algorithm,
                    metrics.to_csv_row()
                )?;

                let dump = format!("substrate_{}_{}_{}.dat", iteration, num_vnrs, algorithm);
                save_substrate(&results_folder, &dump, &network)?;
            }
        }
    }

    file.flush()?;

    Ok(())
}

fn load_substrate(
    settings: &Settings,
    topology: Topology,
    rng: &mut StdRng,
) -> Result<Network, RunnerError> {
    if let Some(path) = &settings.substrate_file {
        let reader = BufReader::new(File::open(path)?);
        let network: Network = bincode::deserialize_from(reader)?;

        return Ok(network);
    }

    let layout = match topology {
        Topology::FatTree => FatTree::new(settings.num_ports),
        Topology::LeafSpine => LeafSpine::new(settings.num_ports, settings.num_spine),
        Topology::Random => RandomGraph::new(settings.num_nodes, settings.link_probability, rng),
    };

    let generator = SubstrateGenerator {
        node_capacity: settings.node_capacity,
        link_capacity: settings.link_capacity,
    };

    Ok(generator.build(&layout, rng)?)
}

fn generate_requests(
    settings: &Settings,
    num_vnrs: usize,
    rng: &mut StdRng,
) -> Result<Vec<VirtualNetworkRequest>, RunnerError> {
    let generator = RequestGenerator {
        num_nodes: settings.vnr_nodes,
        cpu_demand: settings.cpu_demand,
        bw_demand: settings.bw_demand,
        link_probability: settings.vnr_link_probability,
    };

    let requests = (0..num_vnrs)
        .map(|id| generator.generate(id, rng))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(requests)
}

fn save_substrate(folder: &PathBuf, file: &str, network: &Network) -> Result<(), RunnerError> {
    let writer = get_file(folder, file)?;
    bincode::serialize_into(writer, network)?;

    Ok(())
}

fn get_file(folder: &PathBuf, file: &str) -> std::io::Result<BufWriter<File>> {
    fs::create_dir_all(folder)?;
    let path = folder.join(file);

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    Ok(BufWriter::new(file))
}
