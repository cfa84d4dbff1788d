//! Quality control: QARTOD flag evaluation for the SAMI sensors.
//!
//! ```text
//!   OoiDataset ──(data::record)──► PhsenRecord / Pco2wRecord
//!                                        │
//!                                        ▼
//!                               *_quality_checks
//!                                        │
//!                                        ▼
//!                         Vec<QartodFlag>  (worst case wins)
//! ```
pub mod flags;
pub mod pco2w;
pub mod phsen;
pub mod stats;

pub use flags::{FlagAccumulator, QartodFlag, flag_counts};
pub use pco2w::{Pco2wRecord, pco2w_quality_checks};
pub use phsen::{PhsenRecord, phsen_quality_checks};
