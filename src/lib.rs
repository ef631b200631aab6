//! narrative-web - Time-sliced topic co-occurrence networks.
//!
//! Turns per-period node and edge tables of discussion topics into
//! renderer-ready payloads: rotated layout, connectivity, cluster colors,
//! hover text and slice statistics, one immutable payload per period, plus
//! a bounded navigator for stepping through the periods.

pub mod colors;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod hover;
pub mod layout;
pub mod metrics;
pub mod navigator;
pub mod payload;
pub mod records;
pub mod sample;

pub use config::NarrativeConfig;
pub use error::{NavigationError, Result};
pub use navigator::TimeNavigator;
pub use payload::{RenderPayload, Session, SlicePayloadBuilder};
pub use records::{Dataset, Diagnostic, Period, RawRow, RecordStore};
