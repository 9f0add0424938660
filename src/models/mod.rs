pub mod bill;
pub mod format;
pub mod vehicle;

pub use bill::{Bill, BillLineItem, BillNotice, BillOutcome, SnapshotSide};
pub use format::{BillFormat, FileInfo, FormatRequest};
pub use vehicle::{Snapshot, VehicleRecord, VehicleState};
