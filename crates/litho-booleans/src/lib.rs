#![warn(missing_docs)]

//! Boolean composition of lithophane meshes.
//!
//! A base mesh is folded with an ordered list of [`FeatureMesh`]es, each a
//! union or a difference. The fold runs on a [`BooleanEngine`]:
//!
//! - [`InProcessEngine`]: BSP-tree CSG in [`csg`]
//! - [`ExternalEngine`]: a subprocess (Blender by default) driven through the
//!   JSON file protocol in [`protocol`]
//!
//! # Example
//!
//! ```ignore
//! use litho_booleans::{BooleanComposer, ExternalEngine, FeatureMesh};
//! use litho_pipeline::CancellationToken;
//!
//! let composer = BooleanComposer::new(Box::new(ExternalEngine::new("blender")));
//! let features = vec![FeatureMesh::subtractive("Hanger", hanger)];
//! let result = composer.compose(&lithophane, &features, &CancellationToken::new())?;
//! ```

pub mod csg;
pub mod engine;
pub mod error;
pub mod external;
pub mod in_process;
pub mod operation;
pub mod protocol;

pub use engine::{BooleanComposer, BooleanEngine};
pub use error::{BooleanError, Result};
pub use external::{ExternalEngine, BUNDLED_SCRIPT, DEFAULT_BATCH_ARGS, DEFAULT_TIMEOUT};
pub use in_process::InProcessEngine;
pub use operation::{plan, BooleanMode, BooleanOperation, FeatureMesh, Operand};
pub use protocol::{
    read_config, run_config, write_config, OperandRecord, OperationRecord, CONFIG_FILE_NAME,
    RESULT_FILE_NAME,
};
