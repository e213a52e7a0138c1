//! Measureset Storage Layer
//!
//! On-disk format of a storage location as written by the acquisition side:
//!
//! - **ekpy**: payload files, a CSV table behind an optional `key:::value` heading
//! - **trial**: saving a new measurement and appending it to `meta_data.csv`
//! - **error**: Error types
//!
//! # Layout
//!
//! ```text
//! data_dir/
//!   meta_data.csv      one row per trial (settings + trial + filename)
//!   pulse_0.csv        ekpy file for trial 0 of base "pulse"
//!   pulse_1.csv
//!   ...
//! ```
//!
//! The index and the payload loaders only ever read from this layout.

pub mod ekpy;
pub mod error;
pub mod trial;

pub use ekpy::{
    parse_ekpy_data, read_ekpy_data, read_heading, write_ekpy_data, EkpyData, Heading,
};
pub use error::{StorageError, StorageResult};
pub use trial::{SavedTrial, TrialWriter, FILENAME_FIELD, META_DATA_FILE, TRIAL_FIELD};
