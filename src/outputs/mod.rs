//! Output generation for run reports.
//!
//! # Submodules
//!
//! - [`json`]: Writes the changed polls of a run to a dated JSON report
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2024-03-01/
//! │   └── changes.json
//! └── 2024-03-02/
//!     └── changes.json
//! ```

pub mod json;
