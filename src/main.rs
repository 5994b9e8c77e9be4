/*
 * File: /main.rs
 * Created Date: Tuesday November 21st 2023
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 5:52:17 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Search tall inputs transposed
 * 2025-10-17		Zihan	Binary runs both search phases and writes the report
 */

use log::{error, info, LevelFilter};
use nomiss::config::{Config, RunConfig, USAGE};
use nomiss::matrix::{DataTable, MatrixIndex};
use nomiss::orientation::{transposed_file_name, write_matrix_stats, write_table, Orientation};
use nomiss::scratch::ScratchDir;
use nomiss::search::{BranchAndBoundSolver, ExactSolver, SearchPipeline};
use nomiss::summary::{
    cleaned_file_name, describe_matrix, summarize_results, write_cleaned_matrix,
    write_stats_to_file, RunSummary,
};
use std::env;
use std::error::Error;
use std::process;
use std::time::Instant;

const CONFIG_FILE: &str = "config.cfg";
const STATS_FILE: &str = "nomiss_stats.csv";
const MATRIX_STATS_FILE: &str = "matrix_stats.csv";

fn main() {
    if let Err(e) = nomiss::init_logger(LevelFilter::Info) {
        eprintln!("Failed to initialise logger: {}", e);
    }

    let config = match Config::new(env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let run_config = RunConfig::from_file(CONFIG_FILE)?;
    let start = Instant::now();

    let table = DataTable::read_tsv(
        config.get_data_file(),
        config.get_num_header_rows(),
        config.get_num_header_cols(),
    )?;
    info!(
        "Loaded {}: {} rows x {} cols",
        config.get_data_file(),
        table.num_data_rows(),
        table.num_data_cols()
    );

    let orientation = Orientation::of(&table);
    let transposed = orientation.apply(&table);
    if let Some(t) = &transposed {
        let path = transposed_file_name(config.get_data_file());
        write_table(&path, t)?;
        info!("Wrote {}", path.display());
    }
    let matrix = MatrixIndex::from_table(transposed.as_ref().unwrap_or(&table), config.get_na_symbol());
    describe_matrix(&matrix);
    if run_config.write_stats {
        write_matrix_stats(MATRIX_STATS_FILE, config.get_data_file(), &matrix)?;
    }

    let scratch = ScratchDir::create(&run_config.scratch_dir)?;
    let solver = BranchAndBoundSolver::new();
    let pipeline = SearchPipeline::builder()
        .with_options(run_config.search_options())
        .build();
    let outcome = pipeline.run(&matrix, &scratch, &solver)?;

    let best = orientation.restore(outcome.incumbent);
    let input_matrix = orientation.restore_matrix(&matrix);
    let summary = RunSummary::new(
        solver.name(),
        config.get_data_file(),
        start.elapsed().as_secs_f64(),
        &input_matrix,
        &best,
    );
    if run_config.print_summary {
        summarize_results(&summary);
    }
    if run_config.write_stats {
        write_stats_to_file(STATS_FILE, &summary)?;
    }

    let cleaned = cleaned_file_name(config.get_data_file());
    write_cleaned_matrix(&cleaned, &table, &best)?;
    info!("Wrote {}", cleaned.display());
    Ok(())
}
