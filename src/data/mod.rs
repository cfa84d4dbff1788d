/// Data layer: core types, loading, record assembly and sample filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv          discrete sample .csv
///        │                                  │
///        ▼                                  ▼
///   ┌──────────┐                     ┌──────────┐
///   │  loader   │  parse → OoiDataset │  loader   │  → Vec<BottleSample>
///   └──────────┘                     └──────────┘
///        │                                  │
///        ▼                                  ▼
///   ┌──────────┐                     ┌──────────┐
///   │  record   │  → Phsen/Pco2w      │  filter   │  distance + depth
///   └──────────┘    records, flags   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  flags → CSV
///   └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod record;
