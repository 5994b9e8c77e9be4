/**
 * File: /src/lib.rs
 * Created Date: Monday, January 22nd 2024
 * Author: Zihan
 * -----
 * Last Modified: Friday, 17th October 2025 5:40:31 pm
 * Modified By: Zihan Wu <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-10-18		Zihan	Orientation module
 * 2025-10-17		Zihan	Module tree for the complete-submatrix search
 */

pub mod config;
pub mod greedy;
pub mod matrix;
pub mod orientation;
pub mod pairs;
pub mod scratch;
pub mod search;
pub mod submatrix;
pub mod summary;
pub mod util;

use log::{LevelFilter, SetLoggerError};

pub use config::{Config, ConfigError, RunConfig};
pub use matrix::{Axis, DataTable, MatrixError, MatrixIndex};
pub use orientation::Orientation;
pub use pairs::PairCompatibilityTable;
pub use scratch::{ScratchDir, ScratchError};
pub use search::{BranchAndBoundSolver, ExactSolver, Incumbent, SearchError, SearchPipeline};

/// Install the process-wide logger. Fails if one is already set.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    simple_logger::SimpleLogger::new().with_level(level).init()
}
