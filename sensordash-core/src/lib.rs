//! # sensordash-core
//!
//! The in-memory half of the sensordash sync layer: what the dashboard knows
//! about every reporting client and its sensors, and who gets told when that
//! changes.
//!
//! - [`Snapshot`]: immutable, structurally shared `client → sensor → values`
//!   state. [`Snapshot::apply`] merges one [`SensorUpdate`] copy-on-write.
//! - [`ObserverRegistry`]: ordered callbacks with RAII [`Subscription`]s.
//! - [`SensorHub`]: the store, registry and bounded [`History`] behind one
//!   cloneable handle. This is what the connection manager feeds.
//! - [`view`]: read-only projections (sorting, flat rows, grouping).
//!
//! ## Usage
//!
//! ```
//! use sensordash_core::{SensorHub, SensorUpdate, SensorValue};
//!
//! let hub = SensorHub::new();
//! let _sub = hub.subscribe(|snapshot| {
//!     println!("{} clients", snapshot.len());
//! });
//!
//! hub.apply(SensorUpdate::scalar("c1", "t", 21.5));
//! assert_eq!(hub.client_sensors().sensor("c1", "t").and_then(|s| s.value()), Some(21.5));
//! ```

pub mod history;
pub mod hub;
pub mod model;
pub mod observer;
pub mod store;
pub mod view;

pub use history::{History, TimedValue, ValueSeries, DEFAULT_HISTORY_CAPACITY};
pub use hub::SensorHub;
pub use model::{ClientRecord, SensorReading, SensorUpdate, SensorValue, DEFAULT_VALUE_TYPE};
pub use observer::{ObserverRegistry, Subscription};
pub use store::Snapshot;
pub use view::{GroupBy, ParseViewError, SensorRow, SortOption};
